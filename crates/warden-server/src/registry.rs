// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Extension points the server drives: lifecycle listeners and group backends.

use std::sync::Arc;
use warden_server_auth::{AccountId, GroupBackend, GroupBackendError, GroupId};
use warden_server_provisioning::LifecycleListener;

#[derive(Default)]
pub struct PluginRegistry {
	listeners: Vec<Arc<dyn LifecycleListener>>,
	group_backends: Vec<Arc<dyn GroupBackend>>,
}

impl PluginRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_listener(&mut self, listener: Arc<dyn LifecycleListener>) {
		tracing::debug!(listener = listener.name(), "lifecycle listener registered");
		self.listeners.push(listener);
	}

	pub fn add_group_backend(&mut self, backend: Arc<dyn GroupBackend>) {
		tracing::debug!(backend = backend.name(), "group backend registered");
		self.group_backends.push(backend);
	}

	pub fn listeners(&self) -> &[Arc<dyn LifecycleListener>] {
		&self.listeners
	}

	pub fn group_backends(&self) -> &[Arc<dyn GroupBackend>] {
		&self.group_backends
	}

	/// Start every listener in registration order.
	pub async fn start_all(&self) {
		for listener in &self.listeners {
			tracing::debug!(listener = listener.name(), "starting listener");
			listener.start().await;
		}
	}

	/// Stop every listener in reverse registration order.
	pub async fn stop_all(&self) {
		for listener in self.listeners.iter().rev() {
			tracing::debug!(listener = listener.name(), "stopping listener");
			listener.stop().await;
		}
	}

	/// First registered backend that handles `group_id`.
	pub fn group_backend_for(&self, group_id: GroupId) -> Option<&Arc<dyn GroupBackend>> {
		self.group_backends.iter().find(|b| b.handles(group_id))
	}

	/// Membership according to the backend for the group; `false` if no
	/// backend handles it.
	pub async fn is_member(
		&self,
		account_id: AccountId,
		group_id: GroupId,
	) -> Result<bool, GroupBackendError> {
		match self.group_backend_for(group_id) {
			Some(backend) => backend.is_member(account_id, group_id).await,
			None => {
				tracing::debug!(group_id = %group_id, "no backend handles group");
				Ok(false)
			}
		}
	}
}
