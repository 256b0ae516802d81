// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! [`GroupBackend`] for the server's own numbered groups.

use async_trait::async_trait;
use std::sync::Arc;
use warden_server_auth::{
	AccountId, GroupBackend, GroupBackendError, GroupDescription, GroupId,
	ANONYMOUS_USERS_GROUP_ID, REGISTERED_USERS_GROUP_ID,
};

use crate::account::AccountRepository;
use crate::cache::AccountCache;
use crate::error::DbError;

/// Answers membership of internal groups from the [`AccountCache`].
///
/// Anonymous users contains everyone; registered users contains every known
/// account. Other groups use the stored membership rows.
pub struct InternalGroupBackend {
	repo: AccountRepository,
	cache: Arc<dyn AccountCache>,
}

impl InternalGroupBackend {
	pub fn new(repo: AccountRepository, cache: Arc<dyn AccountCache>) -> Self {
		Self { repo, cache }
	}
}

fn lookup_error(e: DbError) -> GroupBackendError {
	GroupBackendError::Lookup(Box::new(e))
}

#[async_trait]
impl GroupBackend for InternalGroupBackend {
	fn name(&self) -> &'static str {
		"internal"
	}

	fn handles(&self, group_id: GroupId) -> bool {
		group_id.get() > 0
	}

	async fn get(&self, group_id: GroupId) -> Result<Option<GroupDescription>, GroupBackendError> {
		self.repo.get_group(group_id).await.map_err(lookup_error)
	}

	#[tracing::instrument(skip(self), fields(account_id = %account_id, group_id = %group_id))]
	async fn is_member(
		&self,
		account_id: AccountId,
		group_id: GroupId,
	) -> Result<bool, GroupBackendError> {
		if group_id == ANONYMOUS_USERS_GROUP_ID {
			return Ok(true);
		}

		let state = self.cache.get(account_id).await.map_err(lookup_error)?;
		Ok(match state {
			None => false,
			Some(_) if group_id == REGISTERED_USERS_GROUP_ID => true,
			Some(state) => state.is_member_of(group_id),
		})
	}
}
