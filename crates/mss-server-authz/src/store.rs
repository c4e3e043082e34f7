// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Persistence contract for authorization grants.

use async_trait::async_trait;

use crate::authorization::{AuthorizationRecord, AuthorizationTier};
use crate::rights::Rights;
use crate::types::{AuthorizationId, ServiceId, UserId};

/// Errors reported by a persistence backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("not found: {0}")]
	NotFound(String),

	#[error("conflict: {0}")]
	Conflict(String),

	#[error("corrupt stored data: {0}")]
	Corrupt(String),

	#[error("storage backend error: {0}")]
	Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Partial update applied to a stored grant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationPatch {
	pub user_id: Option<UserId>,
	pub tier: Option<AuthorizationTier>,
	pub rights: Option<Rights>,
}

impl AuthorizationPatch {
	pub fn rights(rights: Rights) -> Self {
		Self {
			rights: Some(rights),
			..Default::default()
		}
	}

	pub fn is_empty(&self) -> bool {
		self.user_id.is_none() && self.tier.is_none() && self.rights.is_none()
	}
}

/// One step of an account transfer, applied atomically by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStep {
	/// The target holds nothing on the service: hand the grant over as-is.
	Reassign {
		authorization_id: AuthorizationId,
		target: UserId,
	},
	/// The target already holds an equal or stronger grant: drop the source's.
	///
	/// Stores refuse with `StoreError::Conflict` once `target_id` is gone.
	Discard {
		source_id: AuthorizationId,
		target_id: AuthorizationId,
	},
	/// The source owned the service: the target's grant becomes the owner one.
	///
	/// Stores refuse with `StoreError::Conflict` once `target_id` is gone.
	PromoteAndDiscard {
		target_id: AuthorizationId,
		source_id: AuthorizationId,
	},
}

#[async_trait]
pub trait AuthorizationStore: Send + Sync {
	async fn get_authorization(
		&self,
		id: &AuthorizationId,
	) -> Result<Option<AuthorizationRecord>, StoreError>;
	async fn get_authorization_for(
		&self,
		user_id: &UserId,
		service_id: &ServiceId,
	) -> Result<Option<AuthorizationRecord>, StoreError>;
	async fn list_authorizations(
		&self,
		user_id: &UserId,
	) -> Result<Vec<AuthorizationRecord>, StoreError>;
	async fn list_authorizations_for_service(
		&self,
		service_id: &ServiceId,
	) -> Result<Vec<AuthorizationRecord>, StoreError>;
	async fn insert_authorization(&self, record: &AuthorizationRecord) -> Result<(), StoreError>;
	async fn update_authorization(
		&self,
		id: &AuthorizationId,
		patch: &AuthorizationPatch,
	) -> Result<(), StoreError>;
	async fn delete_authorization(&self, id: &AuthorizationId) -> Result<bool, StoreError>;
	async fn user_exists(&self, user_id: &UserId) -> Result<bool, StoreError>;
	async fn service_exists(&self, service_id: &ServiceId) -> Result<bool, StoreError>;
	/// Apply one merge for a `(target, service)` pair as a single atomic unit.
	///
	/// Returns `StoreError::Conflict` when the plan no longer matches the stored
	/// pair, leaving both grants untouched.
	async fn apply_transfer_step(&self, step: &TransferStep) -> Result<(), StoreError>;
}
