// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory implementation of [`AuthorizationStore`].
//!
//! State lives in `HashMap`s behind a single `tokio::sync::RwLock`. Each
//! transfer step is applied under one write-lock acquisition, so readers see a
//! `(target, service)` pair either before or after the merge, never between.
//!
//! Nothing is durable. Used by tests and local tooling.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use crate::authorization::{AuthorizationRecord, AuthorizationTier};
use crate::rights::Rights;
use crate::store::{AuthorizationPatch, AuthorizationStore, StoreError, TransferStep};
use crate::types::{AuthorizationId, ServiceId, UserId};

#[derive(Debug, Default)]
struct MemoryState {
	users: HashSet<UserId>,
	services: HashSet<ServiceId>,
	authorizations: HashMap<AuthorizationId, AuthorizationRecord>,
}

impl MemoryState {
	fn find_for(&self, user_id: &UserId, service_id: &ServiceId) -> Option<&AuthorizationRecord> {
		self.authorizations
			.values()
			.find(|a| &a.user_id == user_id && &a.service_id == service_id)
	}

	fn check_pair_free(
		&self,
		user_id: &UserId,
		service_id: &ServiceId,
		except: Option<&AuthorizationId>,
	) -> Result<(), StoreError> {
		match self.find_for(user_id, service_id) {
			Some(existing) if Some(&existing.id) != except => Err(StoreError::Conflict(format!(
				"user {user_id} already holds authorization {} on service {service_id}",
				existing.id
			))),
			_ => Ok(()),
		}
	}

	fn check_merge_target(&self, target_id: &AuthorizationId) -> Result<(), StoreError> {
		if self.authorizations.contains_key(target_id) {
			Ok(())
		} else {
			Err(StoreError::Conflict(format!(
				"merge target {target_id} no longer exists"
			)))
		}
	}

	fn sorted(mut records: Vec<AuthorizationRecord>) -> Vec<AuthorizationRecord> {
		records.sort_by(|a, b| a.id.cmp(&b.id));
		records
	}
}

/// Volatile authorization store.
#[derive(Debug, Default)]
pub struct MemoryAuthorizationStore {
	state: RwLock<MemoryState>,
}

impl MemoryAuthorizationStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_user(mut self, user_id: impl Into<UserId>) -> Self {
		self.state.get_mut().users.insert(user_id.into());
		self
	}

	pub fn with_service(mut self, service_id: impl Into<ServiceId>) -> Self {
		self.state.get_mut().services.insert(service_id.into());
		self
	}

	/// Seed a raw record, bypassing every check. Lets tests plant divergent data.
	pub fn with_authorization(mut self, record: AuthorizationRecord) -> Self {
		self.state
			.get_mut()
			.authorizations
			.insert(record.id.clone(), record);
		self
	}

	pub async fn create_user(&self, user_id: UserId) {
		self.state.write().await.users.insert(user_id);
	}

	/// Register a service together with its owner grant.
	///
	/// # Errors
	/// Returns `StoreError::Conflict` if the service is already registered, or
	/// `StoreError::NotFound` if the owner is unknown.
	pub async fn create_service_with_owner(
		&self,
		service_id: ServiceId,
		owner_id: UserId,
		authorization_id: AuthorizationId,
	) -> Result<AuthorizationRecord, StoreError> {
		let mut state = self.state.write().await;
		if state.services.contains(&service_id) {
			return Err(StoreError::Conflict(format!(
				"service {service_id} already exists"
			)));
		}
		if !state.users.contains(&owner_id) {
			return Err(StoreError::NotFound(format!("user {owner_id}")));
		}

		let record = AuthorizationRecord::new(
			authorization_id,
			owner_id,
			service_id.clone(),
			AuthorizationTier::Owner,
			&Rights::all_write(),
		);
		state.services.insert(service_id);
		state
			.authorizations
			.insert(record.id.clone(), record.clone());
		Ok(record)
	}
}

#[async_trait]
impl AuthorizationStore for MemoryAuthorizationStore {
	async fn get_authorization(
		&self,
		id: &AuthorizationId,
	) -> Result<Option<AuthorizationRecord>, StoreError> {
		Ok(self.state.read().await.authorizations.get(id).cloned())
	}

	async fn get_authorization_for(
		&self,
		user_id: &UserId,
		service_id: &ServiceId,
	) -> Result<Option<AuthorizationRecord>, StoreError> {
		Ok(self
			.state
			.read()
			.await
			.find_for(user_id, service_id)
			.cloned())
	}

	async fn list_authorizations(
		&self,
		user_id: &UserId,
	) -> Result<Vec<AuthorizationRecord>, StoreError> {
		let state = self.state.read().await;
		let records = state
			.authorizations
			.values()
			.filter(|a| &a.user_id == user_id)
			.cloned()
			.collect();
		Ok(MemoryState::sorted(records))
	}

	async fn list_authorizations_for_service(
		&self,
		service_id: &ServiceId,
	) -> Result<Vec<AuthorizationRecord>, StoreError> {
		let state = self.state.read().await;
		let records = state
			.authorizations
			.values()
			.filter(|a| &a.service_id == service_id)
			.cloned()
			.collect();
		Ok(MemoryState::sorted(records))
	}

	async fn insert_authorization(&self, record: &AuthorizationRecord) -> Result<(), StoreError> {
		let mut state = self.state.write().await;
		if state.authorizations.contains_key(&record.id) {
			return Err(StoreError::Conflict(format!(
				"authorization {} already exists",
				record.id
			)));
		}
		state.check_pair_free(&record.user_id, &record.service_id, None)?;
		state
			.authorizations
			.insert(record.id.clone(), record.clone());
		Ok(())
	}

	async fn update_authorization(
		&self,
		id: &AuthorizationId,
		patch: &AuthorizationPatch,
	) -> Result<(), StoreError> {
		let mut state = self.state.write().await;
		let service_id = match state.authorizations.get(id) {
			Some(record) => record.service_id.clone(),
			None => return Err(StoreError::NotFound(format!("authorization {id}"))),
		};
		if let Some(user_id) = &patch.user_id {
			state.check_pair_free(user_id, &service_id, Some(id))?;
		}

		let record = state
			.authorizations
			.get_mut(id)
			.ok_or_else(|| StoreError::NotFound(format!("authorization {id}")))?;
		if let Some(user_id) = &patch.user_id {
			record.user_id = user_id.clone();
		}
		if let Some(tier) = patch.tier {
			record.tier = tier.as_str().to_string();
		}
		if let Some(rights) = &patch.rights {
			record.rights = rights.to_raw();
		}
		Ok(())
	}

	async fn delete_authorization(&self, id: &AuthorizationId) -> Result<bool, StoreError> {
		Ok(self.state.write().await.authorizations.remove(id).is_some())
	}

	async fn user_exists(&self, user_id: &UserId) -> Result<bool, StoreError> {
		Ok(self.state.read().await.users.contains(user_id))
	}

	async fn service_exists(&self, service_id: &ServiceId) -> Result<bool, StoreError> {
		Ok(self.state.read().await.services.contains(service_id))
	}

	async fn apply_transfer_step(&self, step: &TransferStep) -> Result<(), StoreError> {
		let mut state = self.state.write().await;
		match step {
			TransferStep::Reassign {
				authorization_id,
				target,
			} => {
				let service_id = state
					.authorizations
					.get(authorization_id)
					.map(|a| a.service_id.clone())
					.ok_or_else(|| StoreError::NotFound(format!("authorization {authorization_id}")))?;
				state.check_pair_free(target, &service_id, Some(authorization_id))?;
				if let Some(record) = state.authorizations.get_mut(authorization_id) {
					record.user_id = target.clone();
				}
			}
			TransferStep::Discard {
				source_id,
				target_id,
			} => {
				state.check_merge_target(target_id)?;
				state
					.authorizations
					.remove(source_id)
					.ok_or_else(|| StoreError::NotFound(format!("authorization {source_id}")))?;
			}
			TransferStep::PromoteAndDiscard {
				target_id,
				source_id,
			} => {
				state.check_merge_target(target_id)?;
				if !state.authorizations.contains_key(source_id) {
					return Err(StoreError::NotFound(format!("authorization {source_id}")));
				}
				let target = state
					.authorizations
					.get_mut(target_id)
					.ok_or_else(|| StoreError::NotFound(format!("authorization {target_id}")))?;
				target.tier = AuthorizationTier::Owner.as_str().to_string();
				target.rights = Rights::all_write().to_raw();
				state.authorizations.remove(source_id);
			}
		}
		Ok(())
	}
}
