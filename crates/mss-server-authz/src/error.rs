// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization error types.

use thiserror::Error;

use crate::store::StoreError;
use crate::types::{AuthorizationId, ServiceId, UserId};

/// Errors raised by the authorization engine.
#[derive(Debug, Error)]
pub enum AuthzError {
	// =========================================================================
	// Lookup Errors
	// =========================================================================
	/// The referenced user does not exist.
	#[error("user \"{0}\" does not exist")]
	UserNotFound(UserId),

	/// The referenced service does not exist.
	#[error("service \"{0}\" does not exist")]
	ServiceNotFound(ServiceId),

	/// No grant links this user to this service.
	#[error("no authorization for user \"{user}\" on service \"{service}\"")]
	AuthorizationNotFound { user: UserId, service: ServiceId },

	/// No grant carries this id.
	#[error("authorization \"{0}\" does not exist")]
	AuthorizationIdNotFound(AuthorizationId),

	// =========================================================================
	// Rule Violations
	// =========================================================================
	/// The user already holds a grant on the service.
	#[error("authorization already exists for user \"{user}\" on service \"{service}\"")]
	AuthorizationAlreadyExists { user: UserId, service: ServiceId },

	/// Owner grants cannot be revoked.
	#[error("cannot remove owner \"{user}\" from service \"{service}\"")]
	CannotDeleteOwner { user: UserId, service: ServiceId },

	/// A user cannot be transferred into themselves.
	#[error("cannot transfer a user's authorizations to the same user")]
	TransferToSelf,

	/// The rights payload does not name exactly the known rubriques.
	#[error(
		"rights must be an object of the form {{ [rubrique]: level }} covering DESCRIBE, SECURE, CERTIFY, RISKS and CONTACTS"
	)]
	IncoherentRights,

	/// The caller lacks the rights required for the operation.
	#[error("access denied")]
	AccessDenied,

	// =========================================================================
	// Internal Errors
	// =========================================================================
	/// A stored tier tag is not recognized.
	#[error("unknown authorization tier: {0}")]
	UnknownAuthorizationTier(String),

	/// The persistence collaborator failed.
	#[error(transparent)]
	Store(#[from] StoreError),
}

impl AuthzError {
	/// Returns true if this is an internal error that should not be exposed to users.
	pub fn is_internal(&self) -> bool {
		matches!(
			self,
			AuthzError::UnknownAuthorizationTier(_) | AuthzError::Store(_)
		)
	}

	/// Returns the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			// 403 Forbidden
			AuthzError::AccessDenied => 403,

			// 404 Not Found
			AuthzError::UserNotFound(_)
			| AuthzError::ServiceNotFound(_)
			| AuthzError::AuthorizationNotFound { .. }
			| AuthzError::AuthorizationIdNotFound(_) => 404,

			// 409 Conflict
			AuthzError::AuthorizationAlreadyExists { .. } => 409,

			// 422 Unprocessable Entity
			AuthzError::CannotDeleteOwner { .. }
			| AuthzError::TransferToSelf
			| AuthzError::IncoherentRights => 422,

			// 500 Internal Server Error
			AuthzError::UnknownAuthorizationTier(_) | AuthzError::Store(_) => 500,
		}
	}

	/// Stable machine-readable code for API payloads.
	pub fn code(&self) -> &'static str {
		match self {
			AuthzError::UserNotFound(_) => "USER_NOT_FOUND",
			AuthzError::ServiceNotFound(_) => "SERVICE_NOT_FOUND",
			AuthzError::AuthorizationNotFound { .. } | AuthzError::AuthorizationIdNotFound(_) => {
				"AUTHORIZATION_NOT_FOUND"
			}
			AuthzError::AuthorizationAlreadyExists { .. } => "AUTHORIZATION_ALREADY_EXISTS",
			AuthzError::CannotDeleteOwner { .. } => "CANNOT_DELETE_OWNER",
			AuthzError::TransferToSelf => "TRANSFER_TO_SELF",
			AuthzError::IncoherentRights => "INCOHERENT_RIGHTS",
			AuthzError::AccessDenied => "ACCESS_DENIED",
			AuthzError::UnknownAuthorizationTier(_) | AuthzError::Store(_) => "INTERNAL",
		}
	}
}

pub type Result<T> = std::result::Result<T, AuthzError>;
