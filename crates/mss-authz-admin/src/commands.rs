// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Command execution against the SQLite store.

use anyhow::Context;
use mss_server_authz::{
	AuthorizationId, AuthorizationRepository, AuthorizationView, RawRights, RequiredRights,
	ServiceId, UserId,
};
use mss_server_db::SqliteAuthorizationStore;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::cli::Command;

pub struct Admin {
	store: SqliteAuthorizationStore,
	repo: AuthorizationRepository,
}

fn parse_rights(raw: &str) -> anyhow::Result<RawRights> {
	serde_json::from_str(raw).with_context(|| format!("invalid rights JSON: {raw}"))
}

impl Admin {
	pub fn new(store: SqliteAuthorizationStore) -> Self {
		let repo = AuthorizationRepository::new(Arc::new(store.clone()));
		Self { store, repo }
	}

	/// Run one command and return its JSON output.
	pub async fn run(&self, command: Command) -> anyhow::Result<Value> {
		match command {
			Command::CreateUser { user } => {
				self.store.create_user(&UserId::new(user.as_str())).await?;
				Ok(json!({ "userId": user }))
			}
			Command::CreateService { service, owner } => {
				let record = self
					.store
					.create_service_with_owner(
						&ServiceId::new(service),
						&UserId::new(owner),
						&AuthorizationId::generate(),
					)
					.await?;
				Ok(serde_json::to_value(record)?)
			}
			Command::AddContributor {
				user,
				service,
				rights,
			} => {
				let user = UserId::new(user);
				let service = ServiceId::new(service);
				let authorization = match rights {
					Some(raw) => {
						let rights = parse_rights(&raw)?;
						self.repo
							.add_contributor_with_rights(&user, &service, &rights)
							.await?
					}
					None => self.repo.add_contributor(&user, &service).await?,
				};
				Ok(serde_json::to_value(authorization)?)
			}
			Command::RemoveContributor { user, service } => {
				self.repo
					.remove_contributor(&UserId::new(user.as_str()), &ServiceId::new(service.as_str()))
					.await?;
				Ok(json!({ "removed": true, "userId": user, "serviceId": service }))
			}
			Command::UpdateRights {
				authorization,
				rights,
			} => {
				let rights = parse_rights(&rights)?;
				let updated = self
					.repo
					.update_rights(&AuthorizationId::new(authorization), &rights)
					.await?;
				Ok(serde_json::to_value(updated)?)
			}
			Command::List {
				user,
				service,
				viewer,
			} => match (user, service) {
				(Some(user), _) => {
					let authorizations = self.repo.list_for(&UserId::new(user)).await?;
					Ok(serde_json::to_value(authorizations)?)
				}
				(None, Some(service)) => {
					let service = ServiceId::new(service);
					let authorizations = match viewer {
						Some(viewer) => {
							self.repo
								.list_visible_for_service(&UserId::new(viewer), &service)
								.await?
						}
						None => self.repo.list_for_service(&service).await?,
					};
					let views: Vec<AuthorizationView> =
						authorizations.iter().map(AuthorizationView::from).collect();
					Ok(serde_json::to_value(views)?)
				}
				(None, None) => anyhow::bail!("either --user or --service is required"),
			},
			Command::Check {
				user,
				service,
				require,
			} => {
				let required = match require {
					Some(raw) => RequiredRights::from_raw(&parse_rights(&raw)?)?,
					None => RequiredRights::new(),
				};
				let allowed = self
					.repo
					.check_access(&UserId::new(user), &ServiceId::new(service), &required)
					.await?;
				Ok(json!({ "allowed": allowed }))
			}
			Command::Transfer { source, target } => {
				let summary = self
					.repo
					.transfer_authorizations(&UserId::new(source), &UserId::new(target))
					.await?;
				Ok(serde_json::to_value(summary)?)
			}
		}
	}
}
