// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for the MSS authorization engine.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Consistent environment variable naming (`MSS_AUTHZ_*`)
//!
//! # Usage
//!
//! ```ignore
//! use mss_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("database at {}", config.database.url);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::AuthzConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthzServerConfig {
	pub database: DatabaseConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`MSS_AUTHZ_*`)
/// 2. Config file (`/etc/mss/authz.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<AuthzServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<AuthzServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Merge the given sources by precedence and finalize.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<AuthzServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = AuthzConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: AuthzConfigLayer) -> Result<AuthzServerConfig, ConfigError> {
	let database = layer.database.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	validate_config(&database)?;

	info!(
		database = %database.url,
		log_level = %logging.level,
		log_json = logging.json,
		"Authorization configuration loaded"
	);

	Ok(AuthzServerConfig { database, logging })
}

fn validate_config(database: &DatabaseConfig) -> Result<(), ConfigError> {
	if !database.url.starts_with("sqlite:") {
		return Err(ConfigError::Validation(format!(
			"database url must be a sqlite: URL, got '{}'",
			database.url
		)));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	struct FixedSource(Precedence, AuthzConfigLayer);

	impl ConfigSource for FixedSource {
		fn name(&self) -> &'static str {
			"fixed"
		}

		fn precedence(&self) -> Precedence {
			self.0
		}

		fn load(&self) -> Result<AuthzConfigLayer, ConfigError> {
			Ok(self.1.clone())
		}
	}

	fn database_layer(url: &str) -> AuthzConfigLayer {
		AuthzConfigLayer {
			database: Some(DatabaseConfigLayer {
				url: Some(url.to_string()),
			}),
			..Default::default()
		}
	}

	#[test]
	fn test_defaults_only() {
		let config = load_from_sources(vec![Box::new(DefaultsSource)]).unwrap();
		assert_eq!(config, AuthzServerConfig::default());
	}

	#[test]
	fn test_higher_precedence_wins_regardless_of_order() {
		let config = load_from_sources(vec![
			Box::new(FixedSource(
				Precedence::Environment,
				database_layer("sqlite:/env.db"),
			)),
			Box::new(FixedSource(
				Precedence::ConfigFile,
				database_layer("sqlite:/file.db"),
			)),
		])
		.unwrap();
		assert_eq!(config.database.url, "sqlite:/env.db");
	}

	#[test]
	fn test_non_sqlite_url_is_rejected() {
		let result = load_from_sources(vec![Box::new(FixedSource(
			Precedence::ConfigFile,
			database_layer("postgres://localhost/mss"),
		))]);
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}
}
