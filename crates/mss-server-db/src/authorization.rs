// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Authorization repository for database operations.
//!
//! This module provides database access for:
//! - Authorization grants (owner and contributor tiers)
//! - The user and service registries grants refer to
//! - Atomic transfer steps when merging two accounts

use async_trait::async_trait;
use chrono::Utc;
use mss_server_authz::{
	AuthorizationId, AuthorizationPatch, AuthorizationRecord, AuthorizationStore, AuthorizationTier,
	RawRights, Rights, ServiceId, StoreError, TransferStep, UserId,
};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;

/// SQLite-backed authorization store.
///
/// Rights are stored as a JSON object keyed by rubrique name.
/// `(user_id, service_id)` is unique at the schema level.
#[derive(Clone)]
pub struct SqliteAuthorizationStore {
	pool: SqlitePool,
}

fn conflict_on_unique(e: sqlx::Error, what: impl FnOnce() -> String) -> DbError {
	match e {
		sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
			DbError::Conflict(what())
		}
		_ => DbError::Sqlx(e),
	}
}

impl SqliteAuthorizationStore {
	/// Create a new store with the given pool.
	///
	/// # Arguments
	/// * `pool` - SQLite connection pool with migrations applied
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	// =========================================================================
	// Registries
	// =========================================================================

	/// Register a user. Registering an existing user is a no-op.
	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	pub async fn create_user(&self, user_id: &UserId) -> Result<(), DbError> {
		sqlx::query("INSERT OR IGNORE INTO users (id, created_at) VALUES (?, ?)")
			.bind(user_id.as_str())
			.bind(Utc::now().to_rfc3339())
			.execute(&self.pool)
			.await?;

		tracing::debug!(user_id = %user_id, "user registered");
		Ok(())
	}

	/// Register a service together with its owner grant, in one transaction.
	///
	/// # Errors
	/// - `DbError::Conflict` if the service already exists
	/// - `DbError::NotFound` if the owner is not a registered user
	#[tracing::instrument(skip(self), fields(service_id = %service_id, owner_id = %owner_id))]
	pub async fn create_service_with_owner(
		&self,
		service_id: &ServiceId,
		owner_id: &UserId,
		authorization_id: &AuthorizationId,
	) -> Result<AuthorizationRecord, DbError> {
		if !self.user_exists(owner_id).await? {
			return Err(DbError::NotFound(format!("user {owner_id}")));
		}

		let now = Utc::now().to_rfc3339();
		let record = AuthorizationRecord::new(
			authorization_id.clone(),
			owner_id.clone(),
			service_id.clone(),
			AuthorizationTier::Owner,
			&Rights::all_write(),
		);
		let rights = serde_json::to_string(&record.rights)?;

		let mut tx = self.pool.begin().await?;

		sqlx::query("INSERT INTO services (id, created_at) VALUES (?, ?)")
			.bind(service_id.as_str())
			.bind(&now)
			.execute(&mut *tx)
			.await
			.map_err(|e| conflict_on_unique(e, || format!("service {service_id} already exists")))?;

		sqlx::query(
			r#"
			INSERT INTO authorizations (id, user_id, service_id, tier, rights, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(record.id.as_str())
		.bind(record.user_id.as_str())
		.bind(record.service_id.as_str())
		.bind(&record.tier)
		.bind(&rights)
		.bind(&now)
		.bind(&now)
		.execute(&mut *tx)
		.await?;

		tx.commit().await?;

		tracing::debug!(authorization_id = %record.id, "service created with owner");
		Ok(record)
	}

	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	pub async fn user_exists(&self, user_id: &UserId) -> Result<bool, DbError> {
		let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?")
			.bind(user_id.as_str())
			.fetch_one(&self.pool)
			.await?;
		Ok(count > 0)
	}

	#[tracing::instrument(skip(self), fields(service_id = %service_id))]
	pub async fn service_exists(&self, service_id: &ServiceId) -> Result<bool, DbError> {
		let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM services WHERE id = ?")
			.bind(service_id.as_str())
			.fetch_one(&self.pool)
			.await?;
		Ok(count > 0)
	}

	// =========================================================================
	// Authorization Queries
	// =========================================================================

	#[tracing::instrument(skip(self), fields(authorization_id = %id))]
	pub async fn get_authorization(
		&self,
		id: &AuthorizationId,
	) -> Result<Option<AuthorizationRecord>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, user_id, service_id, tier, rights
			FROM authorizations
			WHERE id = ?
			"#,
		)
		.bind(id.as_str())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_record(&r)).transpose()
	}

	#[tracing::instrument(skip(self), fields(user_id = %user_id, service_id = %service_id))]
	pub async fn get_authorization_for(
		&self,
		user_id: &UserId,
		service_id: &ServiceId,
	) -> Result<Option<AuthorizationRecord>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, user_id, service_id, tier, rights
			FROM authorizations
			WHERE user_id = ? AND service_id = ?
			"#,
		)
		.bind(user_id.as_str())
		.bind(service_id.as_str())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_record(&r)).transpose()
	}

	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	pub async fn list_authorizations(
		&self,
		user_id: &UserId,
	) -> Result<Vec<AuthorizationRecord>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, user_id, service_id, tier, rights
			FROM authorizations
			WHERE user_id = ?
			ORDER BY id
			"#,
		)
		.bind(user_id.as_str())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(|r| self.row_to_record(r)).collect()
	}

	#[tracing::instrument(skip(self), fields(service_id = %service_id))]
	pub async fn list_authorizations_for_service(
		&self,
		service_id: &ServiceId,
	) -> Result<Vec<AuthorizationRecord>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, user_id, service_id, tier, rights
			FROM authorizations
			WHERE service_id = ?
			ORDER BY id
			"#,
		)
		.bind(service_id.as_str())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(|r| self.row_to_record(r)).collect()
	}

	// =========================================================================
	// Authorization Mutations
	// =========================================================================

	/// Insert a grant.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if the id or the `(user, service)` pair is taken.
	#[tracing::instrument(skip(self, record), fields(authorization_id = %record.id))]
	pub async fn insert_authorization(&self, record: &AuthorizationRecord) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		let rights = serde_json::to_string(&record.rights)?;
		sqlx::query(
			r#"
			INSERT INTO authorizations (id, user_id, service_id, tier, rights, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(record.id.as_str())
		.bind(record.user_id.as_str())
		.bind(record.service_id.as_str())
		.bind(&record.tier)
		.bind(rights)
		.bind(&now)
		.bind(&now)
		.execute(&self.pool)
		.await
		.map_err(|e| {
			conflict_on_unique(e, || {
				format!(
					"user {} already holds a grant on service {}",
					record.user_id, record.service_id
				)
			})
		})?;

		tracing::debug!(authorization_id = %record.id, "authorization inserted");
		Ok(())
	}

	/// Apply a partial update.
	///
	/// # Errors
	/// Returns `DbError::NotFound` if no grant has this id.
	#[tracing::instrument(skip(self, patch), fields(authorization_id = %id))]
	pub async fn update_authorization(
		&self,
		id: &AuthorizationId,
		patch: &AuthorizationPatch,
	) -> Result<(), DbError> {
		let rights = patch
			.rights
			.as_ref()
			.map(|r| serde_json::to_string(&r.to_raw()))
			.transpose()?;

		let result = sqlx::query(
			r#"
			UPDATE authorizations
			SET user_id = COALESCE(?, user_id),
				tier = COALESCE(?, tier),
				rights = COALESCE(?, rights),
				updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(patch.user_id.as_ref().map(|u| u.as_str()))
		.bind(patch.tier.map(|t| t.as_str()))
		.bind(rights)
		.bind(Utc::now().to_rfc3339())
		.bind(id.as_str())
		.execute(&self.pool)
		.await
		.map_err(|e| conflict_on_unique(e, || format!("authorization {id} collides on reassignment")))?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("authorization {id}")));
		}

		tracing::debug!(authorization_id = %id, "authorization updated");
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(authorization_id = %id))]
	pub async fn delete_authorization(&self, id: &AuthorizationId) -> Result<bool, DbError> {
		let result = sqlx::query("DELETE FROM authorizations WHERE id = ?")
			.bind(id.as_str())
			.execute(&self.pool)
			.await?;

		let deleted = result.rows_affected() > 0;
		if deleted {
			tracing::debug!(authorization_id = %id, "authorization deleted");
		}
		Ok(deleted)
	}

	/// Apply one transfer step inside a single transaction.
	///
	/// # Errors
	/// - `DbError::NotFound` if the source grant vanished
	/// - `DbError::Conflict` if a reassignment hits an occupied pair or the
	///   merge target vanished
	#[tracing::instrument(skip(self))]
	pub async fn apply_transfer_step(&self, step: &TransferStep) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		let mut tx = self.pool.begin().await?;

		match step {
			TransferStep::Reassign {
				authorization_id,
				target,
			} => {
				let result =
					sqlx::query("UPDATE authorizations SET user_id = ?, updated_at = ? WHERE id = ?")
						.bind(target.as_str())
						.bind(&now)
						.bind(authorization_id.as_str())
						.execute(&mut *tx)
						.await
						.map_err(|e| {
							conflict_on_unique(e, || {
								format!("user {target} already holds a grant on that service")
							})
						})?;
				if result.rows_affected() == 0 {
					return Err(DbError::NotFound(format!("authorization {authorization_id}")));
				}
			}
			TransferStep::Discard {
				source_id,
				target_id,
			} => {
				let result = sqlx::query(
					r#"
					DELETE FROM authorizations
					WHERE id = ? AND EXISTS (SELECT 1 FROM authorizations WHERE id = ?)
					"#,
				)
				.bind(source_id.as_str())
				.bind(target_id.as_str())
				.execute(&mut *tx)
				.await?;
				if result.rows_affected() == 0 {
					return Err(Self::refused_merge(&mut tx, source_id, target_id).await);
				}
			}
			TransferStep::PromoteAndDiscard {
				target_id,
				source_id,
			} => {
				let rights = serde_json::to_string(&Rights::all_write().to_raw())?;
				let promoted = sqlx::query(
					"UPDATE authorizations SET tier = ?, rights = ?, updated_at = ? WHERE id = ?",
				)
				.bind(AuthorizationTier::Owner.as_str())
				.bind(rights)
				.bind(&now)
				.bind(target_id.as_str())
				.execute(&mut *tx)
				.await?;
				if promoted.rows_affected() == 0 {
					return Err(DbError::Conflict(format!(
						"merge target {target_id} no longer exists"
					)));
				}

				let deleted = sqlx::query("DELETE FROM authorizations WHERE id = ?")
					.bind(source_id.as_str())
					.execute(&mut *tx)
					.await?;
				if deleted.rows_affected() == 0 {
					return Err(DbError::NotFound(format!("authorization {source_id}")));
				}
			}
		}

		tx.commit().await?;

		tracing::debug!("transfer step applied");
		Ok(())
	}

	/// Explain why a guarded discard deleted nothing.
	async fn refused_merge(
		tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
		source_id: &AuthorizationId,
		target_id: &AuthorizationId,
	) -> DbError {
		let source_present: Result<i64, sqlx::Error> =
			sqlx::query_scalar("SELECT COUNT(*) FROM authorizations WHERE id = ?")
				.bind(source_id.as_str())
				.fetch_one(&mut **tx)
				.await;
		match source_present {
			Ok(0) => DbError::NotFound(format!("authorization {source_id}")),
			Ok(_) => DbError::Conflict(format!("merge target {target_id} no longer exists")),
			Err(e) => DbError::Sqlx(e),
		}
	}

	fn row_to_record(&self, row: &sqlx::sqlite::SqliteRow) -> Result<AuthorizationRecord, DbError> {
		let rights_json: String = row.get("rights");
		let rights: RawRights = serde_json::from_str(&rights_json).map_err(|e| {
			DbError::Internal(format!("Invalid rights for authorization: {e}"))
		})?;

		Ok(AuthorizationRecord {
			id: AuthorizationId::new(row.get::<String, _>("id")),
			user_id: UserId::new(row.get::<String, _>("user_id")),
			service_id: ServiceId::new(row.get::<String, _>("service_id")),
			tier: row.get("tier"),
			rights,
		})
	}
}

#[async_trait]
impl AuthorizationStore for SqliteAuthorizationStore {
	async fn get_authorization(
		&self,
		id: &AuthorizationId,
	) -> Result<Option<AuthorizationRecord>, StoreError> {
		Ok(self.get_authorization(id).await?)
	}

	async fn get_authorization_for(
		&self,
		user_id: &UserId,
		service_id: &ServiceId,
	) -> Result<Option<AuthorizationRecord>, StoreError> {
		Ok(self.get_authorization_for(user_id, service_id).await?)
	}

	async fn list_authorizations(
		&self,
		user_id: &UserId,
	) -> Result<Vec<AuthorizationRecord>, StoreError> {
		Ok(self.list_authorizations(user_id).await?)
	}

	async fn list_authorizations_for_service(
		&self,
		service_id: &ServiceId,
	) -> Result<Vec<AuthorizationRecord>, StoreError> {
		Ok(self.list_authorizations_for_service(service_id).await?)
	}

	async fn insert_authorization(&self, record: &AuthorizationRecord) -> Result<(), StoreError> {
		Ok(self.insert_authorization(record).await?)
	}

	async fn update_authorization(
		&self,
		id: &AuthorizationId,
		patch: &AuthorizationPatch,
	) -> Result<(), StoreError> {
		Ok(self.update_authorization(id, patch).await?)
	}

	async fn delete_authorization(&self, id: &AuthorizationId) -> Result<bool, StoreError> {
		Ok(self.delete_authorization(id).await?)
	}

	async fn user_exists(&self, user_id: &UserId) -> Result<bool, StoreError> {
		Ok(self.user_exists(user_id).await?)
	}

	async fn service_exists(&self, service_id: &ServiceId) -> Result<bool, StoreError> {
		Ok(self.service_exists(service_id).await?)
	}

	async fn apply_transfer_step(&self, step: &TransferStep) -> Result<(), StoreError> {
		Ok(self.apply_transfer_step(step).await?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{create_test_store, seed_service, seed_user};
	use mss_server_authz::{
		AuthorizationRepository, AuthzError, Permission, RequiredRights, Rubrique,
	};
	use std::sync::Arc;

	fn contributor(id: &str, user: &str, service: &str, rights: Rights) -> AuthorizationRecord {
		AuthorizationRecord::new(
			AuthorizationId::new(id),
			UserId::new(user),
			ServiceId::new(service),
			AuthorizationTier::Contributor,
			&rights,
		)
	}

	#[tokio::test]
	async fn insert_and_fetch_round_trip() {
		let store = create_test_store().await;
		seed_user(&store, "A").await;
		seed_user(&store, "999").await;
		seed_service(&store, "123", "999").await;

		let record = contributor(
			"c",
			"A",
			"123",
			Rights::all_none().with(Rubrique::Certify, Permission::Read),
		);
		store.insert_authorization(&record).await.unwrap();

		let by_id = store
			.get_authorization(&AuthorizationId::new("c"))
			.await
			.unwrap();
		let by_pair = store
			.get_authorization_for(&UserId::new("A"), &ServiceId::new("123"))
			.await
			.unwrap();
		assert_eq!(by_id, Some(record.clone()));
		assert_eq!(by_pair, Some(record));
	}

	#[tokio::test]
	async fn duplicate_pair_is_conflict() {
		let store = create_test_store().await;
		seed_user(&store, "A").await;
		seed_user(&store, "999").await;
		seed_service(&store, "123", "999").await;

		store
			.insert_authorization(&contributor("c1", "A", "123", Rights::all_none()))
			.await
			.unwrap();
		let err = store
			.insert_authorization(&contributor("c2", "A", "123", Rights::all_none()))
			.await
			.unwrap_err();
		assert!(matches!(err, DbError::Conflict(_)));
	}

	#[tokio::test]
	async fn service_creation_seeds_owner_and_rejects_duplicates() {
		let store = create_test_store().await;
		seed_user(&store, "999").await;

		let record = store
			.create_service_with_owner(
				&ServiceId::new("123"),
				&UserId::new("999"),
				&AuthorizationId::new("o"),
			)
			.await
			.unwrap();
		assert_eq!(record.tier, "OWNER");

		let err = store
			.create_service_with_owner(
				&ServiceId::new("123"),
				&UserId::new("999"),
				&AuthorizationId::new("o2"),
			)
			.await
			.unwrap_err();
		assert!(matches!(err, DbError::Conflict(_)));
		assert_eq!(
			store
				.list_authorizations_for_service(&ServiceId::new("123"))
				.await
				.unwrap()
				.len(),
			1
		);
	}

	#[tokio::test]
	async fn service_creation_requires_known_owner() {
		let store = create_test_store().await;
		let err = store
			.create_service_with_owner(
				&ServiceId::new("123"),
				&UserId::new("ghost"),
				&AuthorizationId::new("o"),
			)
			.await
			.unwrap_err();
		assert!(matches!(err, DbError::NotFound(_)));
	}

	#[tokio::test]
	async fn patch_updates_only_given_fields() {
		let store = create_test_store().await;
		seed_user(&store, "A").await;
		seed_user(&store, "999").await;
		seed_service(&store, "123", "999").await;
		store
			.insert_authorization(&contributor("c", "A", "123", Rights::all_write()))
			.await
			.unwrap();

		store
			.update_authorization(
				&AuthorizationId::new("c"),
				&AuthorizationPatch::rights(Rights::all_none()),
			)
			.await
			.unwrap();

		let stored = store
			.get_authorization(&AuthorizationId::new("c"))
			.await
			.unwrap()
			.unwrap();
		assert_eq!(stored.user_id, UserId::new("A"));
		assert_eq!(stored.tier, "CONTRIBUTOR");
		assert_eq!(stored.rights, Rights::all_none().to_raw());
	}

	#[tokio::test]
	async fn update_missing_is_not_found() {
		let store = create_test_store().await;
		let err = store
			.update_authorization(
				&AuthorizationId::new("nope"),
				&AuthorizationPatch::rights(Rights::all_none()),
			)
			.await
			.unwrap_err();
		assert!(matches!(err, DbError::NotFound(_)));
	}

	#[tokio::test]
	async fn corrupt_rights_surface_as_internal() {
		let store = create_test_store().await;
		seed_user(&store, "A").await;
		seed_user(&store, "999").await;
		seed_service(&store, "123", "999").await;
		sqlx::query(
			"INSERT INTO authorizations (id, user_id, service_id, tier, rights, created_at, updated_at) VALUES ('x', 'A', '123', 'CONTRIBUTOR', 'not json', '', '')",
		)
		.execute(&store.pool)
		.await
		.unwrap();

		let err = store
			.get_authorization(&AuthorizationId::new("x"))
			.await
			.unwrap_err();
		assert!(matches!(err, DbError::Internal(_)));
	}

	mod transfer_steps {
		use super::*;

		async fn setup() -> SqliteAuthorizationStore {
			let store = create_test_store().await;
			for user in ["999", "S", "T"] {
				seed_user(&store, user).await;
			}
			seed_service(&store, "123", "999").await;
			store
				.insert_authorization(&contributor("s", "S", "123", Rights::all_write()))
				.await
				.unwrap();
			store
		}

		#[tokio::test]
		async fn discard_refuses_vanished_target_and_keeps_source() {
			let store = setup().await;

			let err = store
				.apply_transfer_step(&TransferStep::Discard {
					source_id: AuthorizationId::new("s"),
					target_id: AuthorizationId::new("t"),
				})
				.await
				.unwrap_err();
			assert!(matches!(err, DbError::Conflict(_)));
			assert!(store
				.get_authorization(&AuthorizationId::new("s"))
				.await
				.unwrap()
				.is_some());
		}

		#[tokio::test]
		async fn discard_of_missing_source_is_not_found() {
			let store = setup().await;
			store
				.insert_authorization(&contributor("t", "T", "123", Rights::all_none()))
				.await
				.unwrap();

			let err = store
				.apply_transfer_step(&TransferStep::Discard {
					source_id: AuthorizationId::new("gone"),
					target_id: AuthorizationId::new("t"),
				})
				.await
				.unwrap_err();
			assert!(matches!(err, DbError::NotFound(_)));
		}

		#[tokio::test]
		async fn promote_refuses_vanished_target_and_rolls_back() {
			let store = setup().await;

			let err = store
				.apply_transfer_step(&TransferStep::PromoteAndDiscard {
					target_id: AuthorizationId::new("t"),
					source_id: AuthorizationId::new("own-123"),
				})
				.await
				.unwrap_err();
			assert!(matches!(err, DbError::Conflict(_)));

			let owner = store
				.get_authorization(&AuthorizationId::new("own-123"))
				.await
				.unwrap()
				.unwrap();
			assert_eq!(owner.tier, "OWNER");
		}

		#[tokio::test]
		async fn promote_of_missing_source_rolls_back_promotion() {
			let store = setup().await;

			let err = store
				.apply_transfer_step(&TransferStep::PromoteAndDiscard {
					target_id: AuthorizationId::new("s"),
					source_id: AuthorizationId::new("gone"),
				})
				.await
				.unwrap_err();
			assert!(matches!(err, DbError::NotFound(_)));

			let target = store
				.get_authorization(&AuthorizationId::new("s"))
				.await
				.unwrap()
				.unwrap();
			assert_eq!(target.tier, "CONTRIBUTOR");
		}

		#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
		async fn readers_never_observe_a_half_merged_pair() {
			const SERVICES: usize = 20;

			let dir = tempfile::tempdir().unwrap();
			let url = format!("sqlite:{}", dir.path().join("authz.db").display());
			let pool = crate::create_pool(&url).await.unwrap();
			crate::run_migrations(&pool).await.unwrap();
			let store = SqliteAuthorizationStore::new(pool);
			seed_user(&store, "S").await;
			seed_user(&store, "T").await;
			for n in 0..SERVICES {
				let service = n.to_string();
				seed_service(&store, &service, "S").await;
				store
					.insert_authorization(&contributor(
						&format!("t{n}"),
						"T",
						&service,
						Rights::all_none(),
					))
					.await
					.unwrap();
			}

			let repo = AuthorizationRepository::new(Arc::new(store.clone()));
			let done = Arc::new(std::sync::atomic::AtomicBool::new(false));
			let reader = {
				let repo = repo.clone();
				let done = done.clone();
				tokio::spawn(async move {
					let mut passes = 0;
					loop {
						let finished = done.load(std::sync::atomic::Ordering::Acquire);
						for n in 0..SERVICES {
							let grants = repo
								.list_for_service(&ServiceId::new(n.to_string()))
								.await
								.unwrap();
							assert_eq!(grants.iter().filter(|a| a.is_owner()).count(), 1);
							assert_eq!(
								grants
									.iter()
									.filter(|a| a.user_id == UserId::new("T"))
									.count(),
								1
							);
						}
						passes += 1;
						if finished {
							return passes;
						}
						tokio::task::yield_now().await;
					}
				})
			};

			let summary = repo
				.transfer_authorizations(&UserId::new("S"), &UserId::new("T"))
				.await
				.unwrap();
			done.store(true, std::sync::atomic::Ordering::Release);

			assert_eq!(summary.merged, SERVICES);
			assert!(reader.await.unwrap() >= 1);
		}
	}

	mod repository {
		use super::*;

		async fn setup() -> (SqliteAuthorizationStore, AuthorizationRepository) {
			let store = create_test_store().await;
			for user in ["999", "A", "S", "T"] {
				seed_user(&store, user).await;
			}
			seed_service(&store, "123", "999").await;
			let repo = AuthorizationRepository::new(Arc::new(store.clone()));
			(store, repo)
		}

		#[tokio::test]
		async fn owner_check_and_contributor_lifecycle() {
			let (_store, repo) = setup().await;
			let describe_read = RequiredRights::new().with(Rubrique::Describe, Permission::Read);
			assert!(repo
				.check_access(&UserId::new("999"), &ServiceId::new("123"), &describe_read)
				.await
				.unwrap());
			assert!(!repo
				.check_access(&UserId::new("456"), &ServiceId::new("123"), &RequiredRights::new())
				.await
				.unwrap());

			let added = repo
				.add_contributor(&UserId::new("A"), &ServiceId::new("123"))
				.await
				.unwrap();
			assert_eq!(added.rights(), Rights::all_write());

			let err = repo
				.add_contributor(&UserId::new("A"), &ServiceId::new("123"))
				.await
				.unwrap_err();
			assert!(matches!(err, AuthzError::AuthorizationAlreadyExists { .. }));

			repo.remove_contributor(&UserId::new("A"), &ServiceId::new("123"))
				.await
				.unwrap();
			assert!(!repo
				.exists(&UserId::new("A"), &ServiceId::new("123"))
				.await
				.unwrap());
		}

		#[tokio::test]
		async fn owner_removal_is_refused() {
			let (_store, repo) = setup().await;
			let err = repo
				.remove_contributor(&UserId::new("999"), &ServiceId::new("123"))
				.await
				.unwrap_err();
			assert!(matches!(err, AuthzError::CannotDeleteOwner { .. }));
		}

		#[tokio::test]
		async fn owner_transfer_onto_contributor_promotes() {
			let (store, repo) = setup().await;
			store
				.insert_authorization(&contributor("t", "T", "123", Rights::all_none()))
				.await
				.unwrap();

			repo.transfer_authorizations(&UserId::new("999"), &UserId::new("T"))
				.await
				.unwrap();

			let grants = repo
				.list_for_service(&ServiceId::new("123"))
				.await
				.unwrap();
			assert_eq!(grants.len(), 1);
			assert_eq!(grants[0].user_id, UserId::new("T"));
			assert!(grants[0].is_owner());
		}

		#[tokio::test]
		async fn contributor_merge_keeps_target_rights() {
			let (store, repo) = setup().await;
			let target_rights = Rights::all_none().with(Rubrique::Secure, Permission::Read);
			store
				.insert_authorization(&contributor("s", "S", "123", Rights::all_write()))
				.await
				.unwrap();
			store
				.insert_authorization(&contributor("t", "T", "123", target_rights))
				.await
				.unwrap();

			repo.transfer_authorizations(&UserId::new("S"), &UserId::new("T"))
				.await
				.unwrap();

			let target = repo
				.find_for(&UserId::new("T"), &ServiceId::new("123"))
				.await
				.unwrap()
				.unwrap();
			assert_eq!(target.rights(), target_rights);
			assert!(repo.list_for(&UserId::new("S")).await.unwrap().is_empty());
		}

		#[tokio::test]
		async fn disjoint_transfer_reassigns() {
			let (store, repo) = setup().await;
			seed_service(&store, "456", "S").await;

			let summary = repo
				.transfer_authorizations(&UserId::new("S"), &UserId::new("T"))
				.await
				.unwrap();
			assert_eq!(summary.reassigned, 1);

			let moved = repo
				.find_for(&UserId::new("T"), &ServiceId::new("456"))
				.await
				.unwrap()
				.unwrap();
			assert!(moved.is_owner());
		}
	}
}
