// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! # mss-server-db
//!
//! SQLite persistence for the MSS authorization engine, via sqlx.
//!
//! [`SqliteAuthorizationStore`] implements [`mss_server_authz::AuthorizationStore`]
//! with inherent methods returning [`DbError`] and a trait impl converting to
//! [`mss_server_authz::StoreError`].
//!
//! ## Error Handling
//!
//! | Variant | When |
//! |---------|------|
//! | `NotFound` | A grant referenced by id vanished (update, transfer step) |
//! | `Conflict` | Unique `(user, service)` pair or duplicate service |
//! | `Sqlx` | Unexpected database errors, propagated via `?` |
//! | `Internal` | Unparseable stored data |
//!
//! ## Transfers
//!
//! Each [`mss_server_authz::TransferStep`] runs inside its own transaction, so
//! a `(target, service)` pair is observed either before or after the merge.

pub mod authorization;
pub mod error;
pub mod pool;

#[cfg(test)]
pub(crate) mod testing;

pub use authorization::SqliteAuthorizationStore;
pub use error::{DbError, Result};
pub use pool::{create_pool, run_migrations};
