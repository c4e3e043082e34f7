// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Administration tool for MSS service authorizations.
#[derive(Parser, Debug)]
#[command(
	name = "mss-authz-admin",
	about = "Manage service owners, contributors and account transfers",
	version
)]
pub struct Args {
	/// TOML configuration file (defaults to /etc/mss/authz.toml)
	#[arg(long, env = "MSS_AUTHZ_CONFIG")]
	pub config: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
	/// Register a user
	CreateUser { user: String },

	/// Register a service and grant ownership to an existing user
	CreateService {
		service: String,
		#[arg(long)]
		owner: String,
	},

	/// Invite a contributor (full write access unless --rights is given)
	AddContributor {
		user: String,
		service: String,
		/// Rights as JSON, e.g. '{"DESCRIBE":2,"SECURE":1,"CERTIFY":0,"RISKS":1,"CONTACTS":2}'
		#[arg(long)]
		rights: Option<String>,
	},

	/// Revoke a contributor
	RemoveContributor { user: String, service: String },

	/// Replace the rights of an authorization
	UpdateRights {
		authorization: String,
		/// Rights as JSON, naming every rubrique
		rights: String,
	},

	/// List authorizations of a user or of a service
	List {
		#[arg(long, conflicts_with = "service", required_unless_present = "service")]
		user: Option<String>,
		#[arg(long)]
		service: Option<String>,
		/// Only show what this user may see of the service
		#[arg(long, requires = "service")]
		viewer: Option<String>,
	},

	/// Check whether a user meets a rights requirement on a service
	Check {
		user: String,
		service: String,
		/// Partial rights as JSON, e.g. '{"DESCRIBE":1}'
		#[arg(long)]
		require: Option<String>,
	},

	/// Move every authorization of one account onto another
	Transfer { source: String, target: String },
}
