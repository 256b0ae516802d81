// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cached account state used by authorization checks.
//!
//! Entries are filled on demand from the [`AccountStore`] and stay until
//! evicted. Anything that changes an account's group membership must evict the
//! account afterwards or checks keep seeing the old groups.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use warden_server_auth::{Account, AccountId, GroupId};

use crate::account::AccountStore;
use crate::error::DbError;

/// An account together with the groups it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
	pub account: Account,
	pub group_ids: BTreeSet<GroupId>,
}

impl AccountState {
	pub fn is_member_of(&self, group_id: GroupId) -> bool {
		self.group_ids.contains(&group_id)
	}
}

#[async_trait]
pub trait AccountCache: Send + Sync {
	/// Get an account's state, loading it on a miss. Unknown accounts are not
	/// cached.
	async fn get(&self, account_id: AccountId) -> Result<Option<AccountState>, DbError>;

	/// Drop any cached state for the account.
	async fn evict(&self, account_id: AccountId);
}

/// Process-local [`AccountCache`].
pub struct MemoryAccountCache {
	store: Arc<dyn AccountStore>,
	entries: RwLock<Entries>,
}

#[derive(Default)]
struct Entries {
	states: HashMap<AccountId, AccountState>,
	/// Bumped on every eviction. A load only fills the cache if no eviction
	/// happened while it was reading the store.
	evictions: u64,
}

impl MemoryAccountCache {
	pub fn new(store: Arc<dyn AccountStore>) -> Self {
		Self {
			store,
			entries: RwLock::new(Entries::default()),
		}
	}

	pub async fn len(&self) -> usize {
		self.entries.read().await.states.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.entries.read().await.states.is_empty()
	}

	async fn load(&self, account_id: AccountId) -> Result<Option<AccountState>, DbError> {
		let mut session = self.store.open_session().await?;

		let Some(account) = session.get_account(account_id).await? else {
			return Ok(None);
		};
		let group_ids = session
			.group_members_by_account(account_id)
			.await?
			.into_iter()
			.map(|m| m.group_id)
			.collect();

		Ok(Some(AccountState { account, group_ids }))
	}
}

#[async_trait]
impl AccountCache for MemoryAccountCache {
	#[tracing::instrument(skip(self), fields(account_id = %account_id))]
	async fn get(&self, account_id: AccountId) -> Result<Option<AccountState>, DbError> {
		let evictions = {
			let entries = self.entries.read().await;
			if let Some(state) = entries.states.get(&account_id) {
				return Ok(Some(state.clone()));
			}
			entries.evictions
		};

		let Some(state) = self.load(account_id).await? else {
			tracing::trace!("account not found");
			return Ok(None);
		};

		tracing::trace!(groups = state.group_ids.len(), "account state loaded");
		let mut entries = self.entries.write().await;
		if entries.evictions == evictions {
			entries.states.insert(account_id, state.clone());
		} else {
			tracing::trace!("eviction during load, not caching");
		}
		Ok(Some(state))
	}

	#[tracing::instrument(skip(self), fields(account_id = %account_id))]
	async fn evict(&self, account_id: AccountId) {
		let mut entries = self.entries.write().await;
		entries.evictions = entries.evictions.wrapping_add(1);
		if entries.states.remove(&account_id).is_some() {
			tracing::debug!("account evicted from cache");
		}
	}
}
