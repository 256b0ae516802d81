// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Account records and the rows that hang off them.
//!
//! - [`Account`] - the account itself
//! - [`ExternalId`] - a login identity bound to an account
//! - [`AccountSshKey`] - an SSH public key registered for an account
//! - [`AccountGroupMember`] / [`AccountGroupMemberAudit`] - group membership and
//!   its audit trail

use chrono::{DateTime, Utc};

use crate::types::{AccountId, ExternalIdKey, GroupId};

/// A server account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
	pub id: AccountId,
	pub full_name: Option<String>,
	pub registered_on: DateTime<Utc>,
}

impl Account {
	/// Create an account registered now, with no display name.
	pub fn new(id: AccountId) -> Self {
		Self {
			id,
			full_name: None,
			registered_on: Utc::now(),
		}
	}

	pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
		self.full_name = Some(full_name.into());
		self
	}
}

/// An external identity bound to an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalId {
	pub key: ExternalIdKey,
	pub account_id: AccountId,
}

impl ExternalId {
	pub fn new(account_id: AccountId, key: ExternalIdKey) -> Self {
		Self { key, account_id }
	}
}

/// An SSH public key. `seq` starts at 1 for each account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSshKey {
	pub account_id: AccountId,
	pub seq: i32,
	pub ssh_public_key: String,
	pub valid: bool,
}

impl AccountSshKey {
	pub fn new(account_id: AccountId, seq: i32, ssh_public_key: impl Into<String>) -> Self {
		Self {
			account_id,
			seq,
			ssh_public_key: ssh_public_key.into(),
			valid: true,
		}
	}
}

/// Membership of an account in a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountGroupMember {
	pub account_id: AccountId,
	pub group_id: GroupId,
}

impl AccountGroupMember {
	pub fn new(account_id: AccountId, group_id: GroupId) -> Self {
		Self {
			account_id,
			group_id,
		}
	}
}

/// Audit entry recording who added a member and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountGroupMemberAudit {
	pub account_id: AccountId,
	pub group_id: GroupId,
	pub added_by: AccountId,
	pub added_on: DateTime<Utc>,
	pub removed_by: Option<AccountId>,
	pub removed_on: Option<DateTime<Utc>>,
}

impl AccountGroupMemberAudit {
	/// Audit entry for `member` being added by `added_by` at `added_on`.
	pub fn added(member: &AccountGroupMember, added_by: AccountId, added_on: DateTime<Utc>) -> Self {
		Self {
			account_id: member.account_id,
			group_id: member.group_id,
			added_by,
			added_on,
			removed_by: None,
			removed_on: None,
		}
	}
}
