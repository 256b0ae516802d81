// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Group membership backends.
//!
//! The host consults every registered [`GroupBackend`] when it needs to know
//! whether an account belongs to a group. A backend claims the groups it knows
//! about through [`GroupBackend::handles`].

use async_trait::async_trait;

use crate::types::{AccountId, GroupId};

/// Error raised by a backend that could not answer a membership query.
#[derive(Debug, thiserror::Error)]
pub enum GroupBackendError {
	#[error("group lookup failed: {0}")]
	Lookup(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Human-facing description of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDescription {
	pub id: GroupId,
	pub name: String,
}

#[async_trait]
pub trait GroupBackend: Send + Sync {
	/// Short name used in logs.
	fn name(&self) -> &'static str;

	/// Whether this backend is authoritative for `group_id`.
	fn handles(&self, group_id: GroupId) -> bool;

	async fn get(&self, group_id: GroupId) -> Result<Option<GroupDescription>, GroupBackendError>;

	async fn is_member(
		&self,
		account_id: AccountId,
		group_id: GroupId,
	) -> Result<bool, GroupBackendError>;
}
