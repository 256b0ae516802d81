// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Startup hook that bootstraps the administrator account.

use async_trait::async_trait;

use crate::bootstrap::AdminProvisioner;
use crate::credential::PublicKeySource;

/// Username provisioned when none is configured.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// A component driven by the server lifecycle.
///
/// `start` runs once before the server accepts traffic and `stop` once at
/// shutdown. Neither can fail: a listener logs its own problems so that one
/// broken listener cannot keep the server from starting.
#[async_trait]
pub trait LifecycleListener: Send + Sync {
	fn name(&self) -> &'static str;

	async fn start(&self);

	async fn stop(&self);
}

/// Provisions the administrator account on start.
pub struct AdminBootstrapListener {
	provisioner: AdminProvisioner,
	username: String,
	make_admin: bool,
	key_source: PublicKeySource,
}

impl AdminBootstrapListener {
	/// Bootstrap `admin` as an administrator with the key from `$HOME`.
	pub fn new(provisioner: AdminProvisioner) -> Self {
		Self {
			provisioner,
			username: DEFAULT_ADMIN_USERNAME.to_string(),
			make_admin: true,
			key_source: PublicKeySource::default(),
		}
	}

	pub fn with_username(mut self, username: impl Into<String>) -> Self {
		self.username = username.into();
		self
	}

	pub fn with_make_admin(mut self, make_admin: bool) -> Self {
		self.make_admin = make_admin;
		self
	}

	pub fn with_key_source(mut self, key_source: PublicKeySource) -> Self {
		self.key_source = key_source;
		self
	}

	pub fn username(&self) -> &str {
		&self.username
	}
}

#[async_trait]
impl LifecycleListener for AdminBootstrapListener {
	fn name(&self) -> &'static str {
		"admin-bootstrap"
	}

	async fn start(&self) {
		let username = self.username.as_str();
		let public_key = self.key_source.load().await;

		match self
			.provisioner
			.provision(username, self.make_admin, public_key.as_deref())
			.await
		{
			Ok(report) if report.changed() => tracing::info!(
				username,
				account_id = %report.account_id,
				account_created = report.account_created,
				ssh_key_added = report.ssh_key_added,
				admin_granted = report.admin_granted,
				"administrator bootstrap complete"
			),
			Ok(report) => tracing::info!(
				username,
				account_id = %report.account_id,
				"administrator account already provisioned"
			),
			Err(e) => {
				tracing::error!(username, error = %e, "administrator bootstrap failed");
				tracing::warn!("Continuing startup without administrator bootstrap");
			}
		}
	}

	async fn stop(&self) {}
}
