// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization grants and their stored form.
//!
//! An [`Authorization`] links one user to one service, either as its owner or
//! as a contributor. [`AuthorizationRecord`] is the shape stored and sent over
//! the wire. Stored rows come back through [`Authorization::from_record`];
//! wire payloads through [`Authorization::from_wire`], which also requires a
//! complete rights map for contributors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AuthzError;
use crate::rights::{has_rights, RawRights, RequiredRights, Rights};
use crate::store::StoreError;
use crate::types::{AuthorizationId, ServiceId, UserId};

// =============================================================================
// Tiers
// =============================================================================

/// Tier tag as stored alongside a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorizationTier {
	Owner,
	Contributor,
}

impl AuthorizationTier {
	pub fn as_str(&self) -> &'static str {
		match self {
			AuthorizationTier::Owner => "OWNER",
			AuthorizationTier::Contributor => "CONTRIBUTOR",
		}
	}
}

impl fmt::Display for AuthorizationTier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for AuthorizationTier {
	type Err = AuthzError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"OWNER" => Ok(AuthorizationTier::Owner),
			"CONTRIBUTOR" => Ok(AuthorizationTier::Contributor),
			other => Err(AuthzError::UnknownAuthorizationTier(other.to_string())),
		}
	}
}

/// A grant's tier together with the rights it carries.
///
/// Owners carry no rights of their own: theirs are always the maximal map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tier {
	Owner,
	Contributor(Rights),
}

impl Tier {
	pub fn kind(&self) -> AuthorizationTier {
		match self {
			Tier::Owner => AuthorizationTier::Owner,
			Tier::Contributor(_) => AuthorizationTier::Contributor,
		}
	}
}

/// Condensed description of a grant's rights, as shown in contributor lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RightsSummary {
	Owner,
	Custom,
}

// =============================================================================
// Authorization
// =============================================================================

/// One user's grant on one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "AuthorizationRecord", try_from = "AuthorizationRecord")]
pub struct Authorization {
	pub id: AuthorizationId,
	pub user_id: UserId,
	pub service_id: ServiceId,
	pub tier: Tier,
}

impl Authorization {
	pub fn owner(id: AuthorizationId, user_id: UserId, service_id: ServiceId) -> Self {
		Self {
			id,
			user_id,
			service_id,
			tier: Tier::Owner,
		}
	}

	pub fn contributor(
		id: AuthorizationId,
		user_id: UserId,
		service_id: ServiceId,
		rights: Rights,
	) -> Self {
		Self {
			id,
			user_id,
			service_id,
			tier: Tier::Contributor(rights),
		}
	}

	/// Build the right variant from a stored record.
	///
	/// Owner records get the maximal map whatever was stored. Contributor
	/// records keep their stored rights; absent rubriques read as `None`.
	///
	/// # Errors
	/// - `AuthzError::UnknownAuthorizationTier` for an unrecognized tier tag
	/// - `AuthzError::Store` when contributor rights name an unknown rubrique
	pub fn from_record(record: AuthorizationRecord) -> Result<Self, AuthzError> {
		let tier = match record.tier.parse::<AuthorizationTier>()? {
			AuthorizationTier::Owner => Tier::Owner,
			AuthorizationTier::Contributor => {
				let rights = Rights::hydrate(&record.rights).map_err(|e| {
					StoreError::Corrupt(format!("authorization {}: {e}", record.id))
				})?;
				Tier::Contributor(rights)
			}
		};

		Ok(Self {
			id: record.id,
			user_id: record.user_id,
			service_id: record.service_id,
			tier,
		})
	}

	/// Build from a caller-supplied payload.
	///
	/// Same as [`Authorization::from_record`], except that contributor rights
	/// must name exactly the five rubriques.
	///
	/// # Errors
	/// - `AuthzError::UnknownAuthorizationTier` for an unrecognized tier tag
	/// - `AuthzError::IncoherentRights` for an incomplete or unknown rights map
	pub fn from_wire(record: AuthorizationRecord) -> Result<Self, AuthzError> {
		let tier = match record.tier.parse::<AuthorizationTier>()? {
			AuthorizationTier::Owner => Tier::Owner,
			AuthorizationTier::Contributor => Tier::Contributor(Rights::try_from_raw(&record.rights)?),
		};

		Ok(Self {
			id: record.id,
			user_id: record.user_id,
			service_id: record.service_id,
			tier,
		})
	}

	pub fn to_record(&self) -> AuthorizationRecord {
		AuthorizationRecord {
			id: self.id.clone(),
			user_id: self.user_id.clone(),
			service_id: self.service_id.clone(),
			tier: self.tier.kind().as_str().to_string(),
			rights: self.rights().to_raw(),
		}
	}

	pub fn is_owner(&self) -> bool {
		matches!(self.tier, Tier::Owner)
	}

	/// Effective rights: the maximal map for owners.
	pub fn rights(&self) -> Rights {
		match &self.tier {
			Tier::Owner => Rights::all_write(),
			Tier::Contributor(rights) => *rights,
		}
	}

	/// Replace a contributor's rights. Owners keep the maximal map.
	pub fn with_rights(mut self, rights: Rights) -> Self {
		if let Tier::Contributor(current) = &mut self.tier {
			*current = rights;
		}
		self
	}

	pub fn has_rights(&self, required: &RequiredRights) -> bool {
		has_rights(&self.rights(), required)
	}

	/// The tier decides: a contributor with full write access is still `Custom`.
	pub fn summary_level(&self) -> RightsSummary {
		match self.tier {
			Tier::Owner => RightsSummary::Owner,
			Tier::Contributor(_) => RightsSummary::Custom,
		}
	}

	/// Only owners may invite, edit or revoke contributors.
	pub fn can_manage_contributors(&self) -> bool {
		self.is_owner()
	}

	pub fn view(&self) -> AuthorizationView {
		AuthorizationView::from(self)
	}
}

impl From<Authorization> for AuthorizationRecord {
	fn from(authorization: Authorization) -> Self {
		authorization.to_record()
	}
}

impl TryFrom<AuthorizationRecord> for Authorization {
	type Error = AuthzError;

	fn try_from(record: AuthorizationRecord) -> Result<Self, Self::Error> {
		Authorization::from_wire(record)
	}
}

// =============================================================================
// Stored / Wire Form
// =============================================================================

/// Flat representation used by stores and on the wire.
///
/// `tier` stays a plain string so that unknown tags surface as
/// `AuthzError::UnknownAuthorizationTier` when hydrated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRecord {
	pub id: AuthorizationId,
	pub user_id: UserId,
	pub service_id: ServiceId,
	pub tier: String,
	#[serde(default)]
	pub rights: RawRights,
}

impl AuthorizationRecord {
	pub fn new(
		id: AuthorizationId,
		user_id: UserId,
		service_id: ServiceId,
		tier: AuthorizationTier,
		rights: &Rights,
	) -> Self {
		Self {
			id,
			user_id,
			service_id,
			tier: tier.as_str().to_string(),
			rights: rights.to_raw(),
		}
	}
}

/// Presentation of a grant in contributor listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationView {
	pub authorization_id: AuthorizationId,
	pub user_id: UserId,
	pub resume_rights_level: RightsSummary,
	pub rights: Rights,
}

impl From<&Authorization> for AuthorizationView {
	fn from(authorization: &Authorization) -> Self {
		Self {
			authorization_id: authorization.id.clone(),
			user_id: authorization.user_id.clone(),
			resume_rights_level: authorization.summary_level(),
			rights: authorization.rights(),
		}
	}
}
