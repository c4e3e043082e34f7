// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization repository.
//!
//! Coordinates lookups, contributor management and account transfers on top of
//! an [`AuthorizationStore`]. Every mutating operation runs its validation
//! chain in a fixed order and stops at the first failure, before touching the
//! store.

use std::sync::Arc;

use crate::authorization::{Authorization, AuthorizationRecord};
use crate::error::{AuthzError, Result};
use crate::rights::{RawRights, RequiredRights, Rights};
use crate::store::{AuthorizationPatch, AuthorizationStore, StoreError, TransferStep};
use crate::types::{AuthorizationId, IdGenerator, ServiceId, UserId, UuidGenerator};

/// Plans tried per grant before a transfer gives up on a contended pair.
const TRANSFER_STEP_ATTEMPTS: usize = 3;

/// Outcome of [`AuthorizationRepository::transfer_authorizations`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct TransferSummary {
	/// Grants handed over unchanged.
	pub reassigned: usize,
	/// Grants folded into one the target already held.
	pub merged: usize,
}

/// Decide what happens to `source` given the target's grant on the same service.
///
/// - no target grant: reassign the source grant
/// - source is owner: the target grant becomes the owner one
/// - otherwise the target grant wins and the source grant is dropped
pub fn plan_transfer_step(
	source: &Authorization,
	target: UserId,
	existing: Option<&Authorization>,
) -> TransferStep {
	match existing {
		None => TransferStep::Reassign {
			authorization_id: source.id.clone(),
			target,
		},
		Some(existing) if source.is_owner() => TransferStep::PromoteAndDiscard {
			target_id: existing.id.clone(),
			source_id: source.id.clone(),
		},
		Some(existing) => TransferStep::Discard {
			source_id: source.id.clone(),
			target_id: existing.id.clone(),
		},
	}
}

/// Repository over a pluggable store.
#[derive(Clone)]
pub struct AuthorizationRepository {
	store: Arc<dyn AuthorizationStore>,
	ids: Arc<dyn IdGenerator>,
}

impl AuthorizationRepository {
	/// Create a repository generating UUID v4 authorization ids.
	pub fn new(store: Arc<dyn AuthorizationStore>) -> Self {
		Self::with_id_generator(store, Arc::new(UuidGenerator))
	}

	pub fn with_id_generator(store: Arc<dyn AuthorizationStore>, ids: Arc<dyn IdGenerator>) -> Self {
		Self { store, ids }
	}

	fn hydrate(record: AuthorizationRecord) -> Result<Authorization> {
		Authorization::from_record(record).map_err(|e| {
			tracing::error!(error = %e, "failed to hydrate stored authorization");
			e
		})
	}

	fn hydrate_all(records: Vec<AuthorizationRecord>) -> Result<Vec<Authorization>> {
		records.into_iter().map(Self::hydrate).collect()
	}

	// =========================================================================
	// Lookups
	// =========================================================================

	#[tracing::instrument(skip(self), fields(authorization_id = %id))]
	pub async fn find_by_id(&self, id: &AuthorizationId) -> Result<Option<Authorization>> {
		self.store
			.get_authorization(id)
			.await?
			.map(Self::hydrate)
			.transpose()
	}

	#[tracing::instrument(skip(self), fields(user_id = %user_id, service_id = %service_id))]
	pub async fn find_for(
		&self,
		user_id: &UserId,
		service_id: &ServiceId,
	) -> Result<Option<Authorization>> {
		self.store
			.get_authorization_for(user_id, service_id)
			.await?
			.map(Self::hydrate)
			.transpose()
	}

	pub async fn exists(&self, user_id: &UserId, service_id: &ServiceId) -> Result<bool> {
		Ok(self.find_for(user_id, service_id).await?.is_some())
	}

	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	pub async fn list_for(&self, user_id: &UserId) -> Result<Vec<Authorization>> {
		Self::hydrate_all(self.store.list_authorizations(user_id).await?)
	}

	#[tracing::instrument(skip(self), fields(service_id = %service_id))]
	pub async fn list_for_service(&self, service_id: &ServiceId) -> Result<Vec<Authorization>> {
		Self::hydrate_all(self.store.list_authorizations_for_service(service_id).await?)
	}

	/// Grants of a service that `viewer` is allowed to see.
	///
	/// The owner sees everyone; a contributor sees the owner and themselves;
	/// anyone else sees nothing.
	#[tracing::instrument(skip(self), fields(viewer = %viewer, service_id = %service_id))]
	pub async fn list_visible_for_service(
		&self,
		viewer: &UserId,
		service_id: &ServiceId,
	) -> Result<Vec<Authorization>> {
		let all = self.list_for_service(service_id).await?;
		let viewer_is_owner = match all.iter().find(|a| &a.user_id == viewer) {
			Some(own) => own.is_owner(),
			None => return Ok(Vec::new()),
		};
		if viewer_is_owner {
			return Ok(all);
		}
		Ok(all
			.into_iter()
			.filter(|a| a.is_owner() || &a.user_id == viewer)
			.collect())
	}

	/// Whether `user_id` holds a grant on `service_id` meeting `required`.
	///
	/// A missing grant is a plain `false`.
	#[tracing::instrument(skip(self, required), fields(user_id = %user_id, service_id = %service_id))]
	pub async fn check_access(
		&self,
		user_id: &UserId,
		service_id: &ServiceId,
		required: &RequiredRights,
	) -> Result<bool> {
		let allowed = self
			.find_for(user_id, service_id)
			.await?
			.map(|a| a.has_rights(required))
			.unwrap_or(false);
		tracing::trace!(allowed, "access checked");
		Ok(allowed)
	}

	// =========================================================================
	// Contributor Management
	// =========================================================================

	/// Grant a contributor full write access on a service.
	///
	/// # Errors
	/// - `AuthzError::UserNotFound` if the contributor is unknown
	/// - `AuthzError::ServiceNotFound` if the service is unknown
	/// - `AuthzError::AuthorizationAlreadyExists` if the pair already has a grant
	#[tracing::instrument(skip(self), fields(contributor = %contributor, service_id = %service_id))]
	pub async fn add_contributor(
		&self,
		contributor: &UserId,
		service_id: &ServiceId,
	) -> Result<Authorization> {
		self.insert_contributor(contributor, service_id, Rights::all_write())
			.await
	}

	/// Grant a contributor an explicit rights map.
	///
	/// The payload shape is checked first; see [`Self::add_contributor`] for the rest.
	#[tracing::instrument(skip(self, rights), fields(contributor = %contributor, service_id = %service_id))]
	pub async fn add_contributor_with_rights(
		&self,
		contributor: &UserId,
		service_id: &ServiceId,
		rights: &RawRights,
	) -> Result<Authorization> {
		let rights = Rights::try_from_raw(rights)?;
		self.insert_contributor(contributor, service_id, rights)
			.await
	}

	async fn insert_contributor(
		&self,
		contributor: &UserId,
		service_id: &ServiceId,
		rights: Rights,
	) -> Result<Authorization> {
		if !self.store.user_exists(contributor).await? {
			return Err(AuthzError::UserNotFound(contributor.clone()));
		}
		if !self.store.service_exists(service_id).await? {
			return Err(AuthzError::ServiceNotFound(service_id.clone()));
		}
		if self.exists(contributor, service_id).await? {
			tracing::debug!("contributor already holds a grant");
			return Err(AuthzError::AuthorizationAlreadyExists {
				user: contributor.clone(),
				service: service_id.clone(),
			});
		}

		let authorization = Authorization::contributor(
			self.ids.generate(),
			contributor.clone(),
			service_id.clone(),
			rights,
		);
		self.store
			.insert_authorization(&authorization.to_record())
			.await?;

		tracing::debug!(authorization_id = %authorization.id, "contributor added");
		Ok(authorization)
	}

	/// Revoke a contributor's grant.
	///
	/// # Errors
	/// - `AuthzError::AuthorizationNotFound` if the pair has no grant
	/// - `AuthzError::CannotDeleteOwner` if the grant is the owner one
	#[tracing::instrument(skip(self), fields(contributor = %contributor, service_id = %service_id))]
	pub async fn remove_contributor(
		&self,
		contributor: &UserId,
		service_id: &ServiceId,
	) -> Result<()> {
		let authorization = self.find_for(contributor, service_id).await?.ok_or_else(|| {
			AuthzError::AuthorizationNotFound {
				user: contributor.clone(),
				service: service_id.clone(),
			}
		})?;
		if authorization.is_owner() {
			return Err(AuthzError::CannotDeleteOwner {
				user: contributor.clone(),
				service: service_id.clone(),
			});
		}

		self.store.delete_authorization(&authorization.id).await?;
		tracing::debug!(authorization_id = %authorization.id, "contributor removed");
		Ok(())
	}

	/// Overwrite the rights of a grant.
	///
	/// Owner grants accept the call but keep the maximal map.
	///
	/// # Errors
	/// - `AuthzError::IncoherentRights` if the payload is malformed (nothing is written)
	/// - `AuthzError::AuthorizationIdNotFound` if no grant has this id
	#[tracing::instrument(skip(self, rights), fields(authorization_id = %id))]
	pub async fn update_rights(&self, id: &AuthorizationId, rights: &RawRights) -> Result<Authorization> {
		let rights = Rights::try_from_raw(rights)?;
		let authorization = self
			.find_by_id(id)
			.await?
			.ok_or_else(|| AuthzError::AuthorizationIdNotFound(id.clone()))?;
		if authorization.is_owner() {
			tracing::warn!("rights update on owner grant ignored");
			return Ok(authorization);
		}

		self.store
			.update_authorization(id, &AuthorizationPatch::rights(rights))
			.await
			.map_err(|e| match e {
				StoreError::NotFound(_) => AuthzError::AuthorizationIdNotFound(id.clone()),
				other => AuthzError::Store(other),
			})?;
		tracing::debug!("authorization rights updated");
		Ok(authorization.with_rights(rights))
	}

	// =========================================================================
	// Account Transfer
	// =========================================================================

	/// Move every grant of `source` onto `target`, merging where both hold one.
	///
	/// Each `(target, service)` pair is updated atomically by the store.
	///
	/// # Errors
	/// - `AuthzError::UserNotFound` if either user is unknown (source checked first)
	/// - `AuthzError::TransferToSelf` if both ids are equal
	#[tracing::instrument(skip(self), fields(source = %source, target = %target))]
	pub async fn transfer_authorizations(
		&self,
		source: &UserId,
		target: &UserId,
	) -> Result<TransferSummary> {
		if !self.store.user_exists(source).await? {
			return Err(AuthzError::UserNotFound(source.clone()));
		}
		if !self.store.user_exists(target).await? {
			return Err(AuthzError::UserNotFound(target.clone()));
		}
		if source == target {
			return Err(AuthzError::TransferToSelf);
		}

		let mut summary = TransferSummary::default();
		for authorization in self.list_for(source).await? {
			match self.transfer_one(authorization, target).await? {
				Some(TransferStep::Reassign { .. }) => summary.reassigned += 1,
				Some(_) => summary.merged += 1,
				None => {}
			}
		}

		tracing::info!(
			reassigned = summary.reassigned,
			merged = summary.merged,
			"authorizations transferred"
		);
		Ok(summary)
	}

	/// Plan and apply the step for one source grant.
	///
	/// A step the store refuses as stale is planned again from fresh reads.
	/// Returns the step applied, or `None` if the source grant vanished.
	async fn transfer_one(
		&self,
		mut authorization: Authorization,
		target: &UserId,
	) -> Result<Option<TransferStep>> {
		let service_id = authorization.service_id.clone();
		let mut attempt = 1;
		loop {
			let existing = self.find_for(target, &service_id).await?;
			let step = plan_transfer_step(&authorization, target.clone(), existing.as_ref());

			match self.store.apply_transfer_step(&step).await {
				Ok(()) => return Ok(Some(step)),
				Err(StoreError::Conflict(reason)) if attempt < TRANSFER_STEP_ATTEMPTS => {
					tracing::warn!(
						service_id = %service_id,
						attempt,
						reason = %reason,
						"transfer step stale, replanning"
					);
					attempt += 1;
					match self.find_by_id(&authorization.id).await? {
						Some(current) if current.user_id == authorization.user_id => {
							authorization = current;
						}
						_ => return Ok(None),
					}
				}
				Err(e) => {
					tracing::error!(error = %e, service_id = %service_id, "transfer step failed");
					return Err(e.into());
				}
			}
		}
	}
}
