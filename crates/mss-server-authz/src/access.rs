// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access checks for request middleware.
//!
//! Middleware only needs `(user, service, required rights) -> allowed`. A
//! denial maps to `403 Forbidden`; an absent grant is a denial, not an error.

use async_trait::async_trait;
use http::StatusCode;

use crate::error::{AuthzError, Result};
use crate::repository::AuthorizationRepository;
use crate::rights::RequiredRights;
use crate::types::{ServiceId, UserId};

/// Result of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
	Granted,
	Denied,
}

impl AccessDecision {
	pub fn is_granted(&self) -> bool {
		matches!(self, AccessDecision::Granted)
	}

	/// Status the middleware should answer with, if it must stop the request.
	pub fn status_code(&self) -> Option<StatusCode> {
		match self {
			AccessDecision::Granted => None,
			AccessDecision::Denied => Some(StatusCode::FORBIDDEN),
		}
	}
}

impl From<bool> for AccessDecision {
	fn from(allowed: bool) -> Self {
		if allowed {
			AccessDecision::Granted
		} else {
			AccessDecision::Denied
		}
	}
}

#[async_trait]
pub trait AccessCheck: Send + Sync {
	async fn access_allowed(
		&self,
		user_id: &UserId,
		service_id: &ServiceId,
		required: &RequiredRights,
	) -> Result<bool>;

	async fn decide(
		&self,
		user_id: &UserId,
		service_id: &ServiceId,
		required: &RequiredRights,
	) -> Result<AccessDecision> {
		Ok(self
			.access_allowed(user_id, service_id, required)
			.await?
			.into())
	}

	/// Like [`AccessCheck::decide`], but a denial becomes `AuthzError::AccessDenied`.
	async fn ensure_access(
		&self,
		user_id: &UserId,
		service_id: &ServiceId,
		required: &RequiredRights,
	) -> Result<()> {
		match self.decide(user_id, service_id, required).await? {
			AccessDecision::Granted => Ok(()),
			AccessDecision::Denied => {
				tracing::debug!(user_id = %user_id, service_id = %service_id, "access denied");
				Err(AuthzError::AccessDenied)
			}
		}
	}
}

#[async_trait]
impl AccessCheck for AuthorizationRepository {
	async fn access_allowed(
		&self,
		user_id: &UserId,
		service_id: &ServiceId,
		required: &RequiredRights,
	) -> Result<bool> {
		self.check_access(user_id, service_id, required).await
	}
}
