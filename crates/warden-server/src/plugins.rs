// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wiring for the account plugins.

use sqlx::sqlite::SqlitePool;
use std::sync::Arc;
use warden_server_config::BootstrapConfig;
use warden_server_db::{AccountCache, AccountRepository, InternalGroupBackend, MemoryAccountCache};
use warden_server_provisioning::{AdminBootstrapListener, AdminProvisioner, PublicKeySource};

use crate::registry::PluginRegistry;

/// Register the administrator bootstrap listener and the internal group
/// backend. Both share one account cache so a bootstrap promotion is visible to
/// membership checks straight away.
pub fn install_account_plugins(
	registry: &mut PluginRegistry,
	pool: SqlitePool,
	bootstrap: &BootstrapConfig,
) {
	let repo = AccountRepository::new(pool);
	let cache: Arc<dyn AccountCache> = Arc::new(MemoryAccountCache::new(Arc::new(repo.clone())));

	if bootstrap.enabled {
		let key_source = match &bootstrap.public_key_path {
			Some(path) => PublicKeySource::File(path.clone()),
			None => PublicKeySource::HomeDirectory,
		};
		let listener = AdminBootstrapListener::new(AdminProvisioner::new(
			Arc::new(repo.clone()),
			Arc::clone(&cache),
		))
		.with_username(bootstrap.username.clone())
		.with_make_admin(bootstrap.make_admin)
		.with_key_source(key_source);

		registry.add_listener(Arc::new(listener));
	} else {
		tracing::info!("administrator bootstrap disabled");
	}

	registry.add_group_backend(Arc::new(InternalGroupBackend::new(repo, cache)));
}
