// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identifier types for users, services and authorizations.
//!
//! Identifiers are opaque strings: users and services come from the wider MSS
//! platform and are never parsed here. Freshly minted authorization ids are
//! UUID v4 strings produced by an [`IdGenerator`].

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(String);

		impl $name {
			/// Wrap an existing identifier.
			pub fn new(id: impl Into<String>) -> Self {
				Self(id.into())
			}

			/// Generate a new random identifier (UUID v4).
			pub fn generate() -> Self {
				Self(Uuid::new_v4().to_string())
			}

			/// Borrow the identifier as a string slice.
			pub fn as_str(&self) -> &str {
				&self.0
			}

			/// Get the inner string value.
			pub fn into_inner(self) -> String {
				self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str(&self.0)
			}
		}

		impl From<String> for $name {
			fn from(id: String) -> Self {
				Self(id)
			}
		}

		impl From<&str> for $name {
			fn from(id: &str) -> Self {
				Self(id.to_string())
			}
		}

		impl From<$name> for String {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(UserId, "Identifier of a platform user.");
define_id_type!(ServiceId, "Identifier of a service (homologation record).");
define_id_type!(AuthorizationId, "Identifier of a single authorization grant.");

// =============================================================================
// Id Generation
// =============================================================================

/// Source of fresh authorization identifiers.
///
/// Injected into the repository so tests can pin ids.
pub trait IdGenerator: Send + Sync {
	fn generate(&self) -> AuthorizationId;
}

/// Default generator producing UUID v4 strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
	fn generate(&self) -> AuthorizationId {
		AuthorizationId::generate()
	}
}

impl<F> IdGenerator for F
where
	F: Fn() -> AuthorizationId + Send + Sync,
{
	fn generate(&self) -> AuthorizationId {
		self()
	}
}
