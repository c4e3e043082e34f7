// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use mss_server_authz::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Conflict: {0}")]
	Conflict(String),

	#[error("Internal: {0}")]
	Internal(String),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

impl From<DbError> for StoreError {
	fn from(err: DbError) -> Self {
		match err {
			DbError::NotFound(what) => StoreError::NotFound(what),
			DbError::Conflict(what) => StoreError::Conflict(what),
			DbError::Internal(what) => StoreError::Corrupt(what),
			DbError::Serialization(e) => StoreError::Corrupt(e.to_string()),
			DbError::Sqlx(e) => StoreError::Backend(Box::new(e)),
		}
	}
}

pub type Result<T> = std::result::Result<T, DbError>;
