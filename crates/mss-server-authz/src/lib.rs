// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-service authorization engine for MSS homologations.
//!
//! This crate provides:
//! - A fixed permission lattice over five rubriques ([`Rubrique`], [`Permission`])
//! - The authorization entity with its two tiers, owner and contributor ([`Authorization`])
//! - The repository coordinating contributor management and account transfers
//!   ([`AuthorizationRepository`])
//! - The read-only access check consumed by request middleware ([`AccessCheck`])
//! - The persistence contract ([`AuthorizationStore`]) and an in-memory implementation
//!
//! # Tiers
//!
//! Every service has exactly one owner, whose rights are always the maximal map.
//! Contributors carry an explicit rights map that can be edited, and may be
//! revoked. Owners cannot be revoked while the service exists.
//!
//! # Transfers
//!
//! When an account is folded into another one, each grant of the source account
//! is either reassigned to the target or merged with the grant the target
//! already holds on the same service. See [`plan_transfer_step`].

pub mod access;
pub mod authorization;
pub mod error;
pub mod memory;
pub mod repository;
pub mod rights;
pub mod store;
pub mod types;

pub use access::{AccessCheck, AccessDecision};
pub use authorization::{
	Authorization, AuthorizationRecord, AuthorizationTier, AuthorizationView, RightsSummary, Tier,
};
pub use error::{AuthzError, Result};
pub use memory::MemoryAuthorizationStore;
pub use repository::{plan_transfer_step, AuthorizationRepository, TransferSummary};
pub use rights::{
	has_level, has_rights, validate_rights_shape, Permission, RawRights, RequiredRights, Rights,
	Rubrique,
};
pub use store::{AuthorizationPatch, AuthorizationStore, StoreError, TransferStep};
pub use types::{AuthorizationId, IdGenerator, ServiceId, UserId, UuidGenerator};
