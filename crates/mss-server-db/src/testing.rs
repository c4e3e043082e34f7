// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use mss_server_authz::{AuthorizationId, ServiceId, UserId};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::authorization::SqliteAuthorizationStore;
use crate::pool::run_migrations;

pub async fn create_test_pool() -> SqlitePool {
	let pool = SqlitePoolOptions::new()
		.max_connections(1)
		.connect(":memory:")
		.await
		.unwrap();
	run_migrations(&pool).await.unwrap();
	pool
}

pub async fn create_test_store() -> SqliteAuthorizationStore {
	SqliteAuthorizationStore::new(create_test_pool().await)
}

pub async fn seed_user(store: &SqliteAuthorizationStore, id: &str) {
	store.create_user(&UserId::new(id)).await.unwrap();
}

/// Register `service` owned by `owner`; the owner grant id is `own-<service>`.
pub async fn seed_service(store: &SqliteAuthorizationStore, service: &str, owner: &str) {
	store
		.create_service_with_owner(
			&ServiceId::new(service),
			&UserId::new(owner),
			&AuthorizationId::new(format!("own-{service}")),
		)
		.await
		.unwrap();
}
