// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! MSS authorization administration binary.

use clap::Parser;
use mss_server_db::SqliteAuthorizationStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

mod cli;
mod commands;

use cli::Args;
use commands::Admin;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	// Parse CLI arguments
	let args = Args::parse();

	// Load .env file if present
	dotenvy::dotenv().ok();

	// Load configuration
	let config = match &args.config {
		Some(path) => mss_server_config::load_config_with_file(path)?,
		None => mss_server_config::load_config()?,
	};

	// Logs go to stderr; stdout carries the JSON result
	let fmt_layer = if config.logging.json {
		tracing_subscriber::fmt::layer()
			.json()
			.with_writer(std::io::stderr)
			.boxed()
	} else {
		tracing_subscriber::fmt::layer()
			.with_writer(std::io::stderr)
			.boxed()
	};
	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(fmt_layer)
		.init();

	tracing::debug!(database = %config.database.url, "opening authorization store");

	let pool = mss_server_db::create_pool(&config.database.url).await?;
	mss_server_db::run_migrations(&pool).await?;

	let admin = Admin::new(SqliteAuthorizationStore::new(pool));
	let output = admin.run(args.command).await?;
	println!("{}", serde_json::to_string_pretty(&output)?);

	Ok(())
}
