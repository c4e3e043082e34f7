// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Permission lattice over the fixed set of rubriques.
//!
//! A [`Rights`] map assigns one [`Permission`] to each of the five
//! [`Rubrique`]s. [`RequiredRights`] is the partial map used by access checks:
//! rubriques it does not mention are not checked.
//!
//! Caller-supplied maps arrive as [`RawRights`] and go through
//! [`validate_rights_shape`] before anything else looks at them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::AuthzError;

/// Untyped rights payload, keyed by rubrique name.
pub type RawRights = BTreeMap<String, Permission>;

// =============================================================================
// Rubriques
// =============================================================================

/// Functional area of a service dossier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rubrique {
	/// Describe the service.
	Describe,
	/// Secure the service.
	Secure,
	/// Certify (homologate) the service.
	Certify,
	/// Risk assessment.
	Risks,
	/// Useful contacts.
	Contacts,
}

impl Rubrique {
	/// Returns every rubrique, in canonical order.
	pub fn all() -> &'static [Rubrique] {
		&[
			Rubrique::Describe,
			Rubrique::Secure,
			Rubrique::Certify,
			Rubrique::Risks,
			Rubrique::Contacts,
		]
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Rubrique::Describe => "DESCRIBE",
			Rubrique::Secure => "SECURE",
			Rubrique::Certify => "CERTIFY",
			Rubrique::Risks => "RISKS",
			Rubrique::Contacts => "CONTACTS",
		}
	}

	fn index(self) -> usize {
		self as usize
	}
}

impl fmt::Display for Rubrique {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Rubrique {
	type Err = UnknownRubrique;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Rubrique::all()
			.iter()
			.copied()
			.find(|r| r.as_str() == s)
			.ok_or_else(|| UnknownRubrique(s.to_string()))
	}
}

/// A rubrique name outside the fixed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown rubrique: {0}")]
pub struct UnknownRubrique(pub String);

// =============================================================================
// Permission Levels
// =============================================================================

/// Access level on a rubrique. Ordered `None < Read < Write`.
///
/// Serialized as the integers `0`, `1` and `2`.
#[derive(
	Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum Permission {
	#[default]
	None = 0,
	Read = 1,
	Write = 2,
}

impl Permission {
	/// Returns all levels from lowest to highest.
	pub fn all() -> &'static [Permission] {
		&[Permission::None, Permission::Read, Permission::Write]
	}

	/// Whether this level grants at least `required`.
	pub fn satisfies(self, required: Permission) -> bool {
		self >= required
	}
}

impl fmt::Display for Permission {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Permission::None => write!(f, "none"),
			Permission::Read => write!(f, "read"),
			Permission::Write => write!(f, "write"),
		}
	}
}

/// An integer outside `0..=2` where a permission level was expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid permission level: {0}")]
pub struct InvalidPermission(pub u8);

impl TryFrom<u8> for Permission {
	type Error = InvalidPermission;

	fn try_from(value: u8) -> Result<Self, Self::Error> {
		match value {
			0 => Ok(Permission::None),
			1 => Ok(Permission::Read),
			2 => Ok(Permission::Write),
			other => Err(InvalidPermission(other)),
		}
	}
}

impl From<Permission> for u8 {
	fn from(level: Permission) -> Self {
		level as u8
	}
}

/// `granted >= required`.
pub fn has_level(granted: Permission, required: Permission) -> bool {
	granted.satisfies(required)
}

// =============================================================================
// Complete Rights Map
// =============================================================================

/// One permission per rubrique; always complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rights([Permission; 5]);

impl Rights {
	/// The maximal map: `Write` everywhere. Owners always carry it.
	pub fn all_write() -> Self {
		Self([Permission::Write; 5])
	}

	pub fn all_none() -> Self {
		Self([Permission::None; 5])
	}

	pub fn get(&self, rubrique: Rubrique) -> Permission {
		self.0[rubrique.index()]
	}

	pub fn set(&mut self, rubrique: Rubrique, level: Permission) {
		self.0[rubrique.index()] = level;
	}

	pub fn with(mut self, rubrique: Rubrique, level: Permission) -> Self {
		self.set(rubrique, level);
		self
	}

	pub fn is_maximal(&self) -> bool {
		self.0.iter().all(|p| *p == Permission::Write)
	}

	pub fn iter(&self) -> impl Iterator<Item = (Rubrique, Permission)> + '_ {
		Rubrique::all().iter().map(move |r| (*r, self.get(*r)))
	}

	/// Validate a caller-supplied payload and convert it.
	///
	/// # Errors
	/// Returns `AuthzError::IncoherentRights` unless the payload names exactly
	/// the five rubriques.
	pub fn try_from_raw(raw: &RawRights) -> Result<Self, AuthzError> {
		validate_rights_shape(raw)?;
		let mut rights = Rights::all_none();
		for (key, level) in raw {
			let rubrique = key
				.parse::<Rubrique>()
				.map_err(|_| AuthzError::IncoherentRights)?;
			rights.set(rubrique, *level);
		}
		Ok(rights)
	}

	/// Rebuild rights from storage. Missing rubriques read as `None`.
	///
	/// # Errors
	/// Returns the offending key when the stored map names an unknown rubrique.
	pub fn hydrate(raw: &RawRights) -> Result<Self, UnknownRubrique> {
		let mut rights = Rights::all_none();
		for (key, level) in raw {
			rights.set(key.parse::<Rubrique>()?, *level);
		}
		Ok(rights)
	}

	pub fn to_raw(&self) -> RawRights {
		self.iter()
			.map(|(r, p)| (r.as_str().to_string(), p))
			.collect()
	}
}

impl Serialize for Rights {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		use serde::ser::SerializeMap;

		let mut map = serializer.serialize_map(Some(Rubrique::all().len()))?;
		for (rubrique, level) in self.iter() {
			map.serialize_entry(&rubrique, &level)?;
		}
		map.end()
	}
}

impl<'de> Deserialize<'de> for Rights {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let raw = RawRights::deserialize(deserializer)?;
		Rights::try_from_raw(&raw).map_err(serde::de::Error::custom)
	}
}

// =============================================================================
// Required Rights
// =============================================================================

/// Partial requirement map for access checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequiredRights(BTreeMap<Rubrique, Permission>);

impl RequiredRights {
	/// No requirement at all: satisfied by any existing grant.
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, rubrique: Rubrique, level: Permission) -> Self {
		self.0.insert(rubrique, level);
		self
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (Rubrique, Permission)> + '_ {
		self.0.iter().map(|(r, p)| (*r, *p))
	}

	/// Parse a middleware requirement payload.
	///
	/// # Errors
	/// Returns `AuthzError::IncoherentRights` if a key is not a rubrique.
	pub fn from_raw(raw: &RawRights) -> Result<Self, AuthzError> {
		raw.iter()
			.map(|(key, level)| {
				key.parse::<Rubrique>()
					.map(|r| (r, *level))
					.map_err(|_| AuthzError::IncoherentRights)
			})
			.collect::<Result<BTreeMap<_, _>, _>>()
			.map(Self)
	}
}

impl FromIterator<(Rubrique, Permission)> for RequiredRights {
	fn from_iter<I: IntoIterator<Item = (Rubrique, Permission)>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}

/// True when `granted` meets every level listed in `required`.
pub fn has_rights(granted: &Rights, required: &RequiredRights) -> bool {
	required
		.iter()
		.all(|(rubrique, level)| has_level(granted.get(rubrique), level))
}

// =============================================================================
// Coherence
// =============================================================================

/// Check that a payload names exactly the five rubriques.
///
/// # Errors
/// Returns `AuthzError::IncoherentRights` on a missing or extra key.
pub fn validate_rights_shape(raw: &RawRights) -> Result<(), AuthzError> {
	let coherent = raw.len() == Rubrique::all().len()
		&& Rubrique::all().iter().all(|r| raw.contains_key(r.as_str()));
	if coherent {
		Ok(())
	} else {
		Err(AuthzError::IncoherentRights)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn raw(entries: &[(&str, Permission)]) -> RawRights {
		entries
			.iter()
			.map(|(k, p)| (k.to_string(), *p))
			.collect()
	}

	fn full_raw(level: Permission) -> RawRights {
		Rubrique::all()
			.iter()
			.map(|r| (r.as_str().to_string(), level))
			.collect()
	}

	fn permission_strategy() -> impl Strategy<Value = Permission> {
		prop_oneof![
			Just(Permission::None),
			Just(Permission::Read),
			Just(Permission::Write),
		]
	}

	fn rights_strategy() -> impl Strategy<Value = Rights> {
		prop::array::uniform5(permission_strategy()).prop_map(Rights)
	}

	mod lattice {
		use super::*;

		#[test]
		fn levels_are_ordered() {
			assert!(Permission::None < Permission::Read);
			assert!(Permission::Read < Permission::Write);
		}

		#[test]
		fn write_implies_read() {
			assert!(has_level(Permission::Write, Permission::Read));
			assert!(!has_level(Permission::Read, Permission::Write));
			assert!(has_level(Permission::None, Permission::None));
		}

		#[test]
		fn empty_requirement_is_always_met() {
			assert!(has_rights(&Rights::all_none(), &RequiredRights::new()));
		}

		#[test]
		fn read_grant_fails_write_requirement() {
			let granted = Rights::all_none().with(Rubrique::Describe, Permission::Read);
			let read = RequiredRights::new().with(Rubrique::Describe, Permission::Read);
			let write = RequiredRights::new().with(Rubrique::Describe, Permission::Write);
			assert!(has_rights(&granted, &read));
			assert!(!has_rights(&granted, &write));
		}

		#[test]
		fn unmentioned_rubriques_are_not_checked() {
			let granted = Rights::all_none().with(Rubrique::Risks, Permission::Write);
			let required = RequiredRights::new().with(Rubrique::Risks, Permission::Read);
			assert!(has_rights(&granted, &required));
		}
	}

	mod permission_serde {
		use super::*;

		#[test]
		fn serializes_as_integer() {
			assert_eq!(serde_json::to_string(&Permission::Write).unwrap(), "2");
			assert_eq!(serde_json::to_string(&Permission::None).unwrap(), "0");
		}

		#[test]
		fn rejects_out_of_range_integer() {
			assert!(serde_json::from_str::<Permission>("3").is_err());
			assert_eq!(Permission::try_from(7), Err(InvalidPermission(7)));
		}
	}

	mod rubriques {
		use super::*;

		#[test]
		fn parses_canonical_names() {
			assert_eq!("CONTACTS".parse::<Rubrique>().unwrap(), Rubrique::Contacts);
			assert!("contacts".parse::<Rubrique>().is_err());
		}

		#[test]
		fn serializes_upper_case() {
			assert_eq!(
				serde_json::to_string(&Rubrique::Describe).unwrap(),
				"\"DESCRIBE\""
			);
		}
	}

	mod coherence {
		use super::*;

		#[test]
		fn accepts_exact_key_set() {
			assert!(validate_rights_shape(&full_raw(Permission::Read)).is_ok());
		}

		#[test]
		fn rejects_missing_key() {
			let mut payload = full_raw(Permission::Read);
			payload.remove("CONTACTS");
			assert!(matches!(
				validate_rights_shape(&payload),
				Err(AuthzError::IncoherentRights)
			));
		}

		#[test]
		fn rejects_extra_key() {
			let mut payload = full_raw(Permission::Read);
			payload.insert("BUDGET".to_string(), Permission::Read);
			assert!(validate_rights_shape(&payload).is_err());
		}

		#[test]
		fn rejects_substituted_key() {
			let mut payload = full_raw(Permission::Read);
			payload.remove("RISKS");
			payload.insert("risks".to_string(), Permission::Read);
			assert!(validate_rights_shape(&payload).is_err());
		}

		#[test]
		fn try_from_raw_keeps_levels() {
			let mut payload = full_raw(Permission::None);
			payload.insert("SECURE".to_string(), Permission::Write);
			let rights = Rights::try_from_raw(&payload).unwrap();
			assert_eq!(rights.get(Rubrique::Secure), Permission::Write);
			assert_eq!(rights.get(Rubrique::Describe), Permission::None);
		}
	}

	mod hydration {
		use super::*;

		#[test]
		fn missing_rubriques_read_as_none() {
			let rights = Rights::hydrate(&raw(&[("DESCRIBE", Permission::Write)])).unwrap();
			assert_eq!(rights.get(Rubrique::Describe), Permission::Write);
			assert_eq!(rights.get(Rubrique::Contacts), Permission::None);
		}

		#[test]
		fn unknown_rubrique_is_reported() {
			let err = Rights::hydrate(&raw(&[("HOMOLOGUER", Permission::Read)])).unwrap_err();
			assert_eq!(err, UnknownRubrique("HOMOLOGUER".to_string()));
		}
	}

	mod required {
		use super::*;

		#[test]
		fn from_raw_rejects_unknown_key() {
			let payload = raw(&[("DESCRIBE", Permission::Read), ("NOPE", Permission::Read)]);
			assert!(matches!(
				RequiredRights::from_raw(&payload),
				Err(AuthzError::IncoherentRights)
			));
		}

		#[test]
		fn from_raw_accepts_partial_map() {
			let payload = raw(&[("CERTIFY", Permission::Write)]);
			let required = RequiredRights::from_raw(&payload).unwrap();
			assert_eq!(
				required.iter().collect::<Vec<_>>(),
				vec![(Rubrique::Certify, Permission::Write)]
			);
		}
	}

	mod rights_serde {
		use super::*;

		#[test]
		fn serializes_every_rubrique() {
			let json = serde_json::to_value(Rights::all_write()).unwrap();
			assert_eq!(
				json,
				serde_json::json!({
					"DESCRIBE": 2, "SECURE": 2, "CERTIFY": 2, "RISKS": 2, "CONTACTS": 2
				})
			);
		}

		#[test]
		fn deserialization_requires_complete_map() {
			let result = serde_json::from_value::<Rights>(serde_json::json!({ "DESCRIBE": 1 }));
			assert!(result.is_err());
		}
	}

	proptest! {
		#[test]
		fn maximal_rights_meet_any_requirement(
			levels in prop::collection::btree_map(
				prop::sample::select(Rubrique::all().to_vec()),
				permission_strategy(),
				0..5,
			)
		) {
			let required: RequiredRights = levels.into_iter().collect();
			prop_assert!(has_rights(&Rights::all_write(), &required));
		}

		#[test]
		fn rights_satisfy_their_own_levels(rights in rights_strategy()) {
			let required: RequiredRights = rights.iter().collect();
			prop_assert!(has_rights(&rights, &required));
		}

		#[test]
		fn raw_conversion_preserves_levels(rights in rights_strategy()) {
			prop_assert_eq!(Rights::try_from_raw(&rights.to_raw()).unwrap(), rights);
		}
	}
}
