// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Idempotent account bootstrap.
//!
//! [`AdminProvisioner::provision`] makes sure an account exists for a username,
//! optionally with an SSH key, and optionally in the administrators group.
//! Running it again for the same username changes nothing.

use chrono::Utc;
use std::sync::Arc;
use warden_server_auth::{
	Account, AccountGroupMember, AccountGroupMemberAudit, AccountId, AccountSshKey, ExternalId,
	ExternalIdKey, ADMINISTRATORS_GROUP_ID,
};
use warden_server_db::{AccountCache, AccountSession, AccountStore};

use crate::error::ProvisioningError;

/// Sequence number given to the first SSH key of an account.
const FIRST_SSH_KEY_SEQ: i32 = 1;

/// What a provisioning run changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionReport {
	pub account_id: AccountId,
	pub account_created: bool,
	pub ssh_key_added: bool,
	pub admin_granted: bool,
}

impl ProvisionReport {
	pub fn changed(&self) -> bool {
		self.account_created || self.ssh_key_added || self.admin_granted
	}
}

/// Creates accounts and grants administrator membership.
pub struct AdminProvisioner {
	store: Arc<dyn AccountStore>,
	cache: Arc<dyn AccountCache>,
}

impl AdminProvisioner {
	pub fn new(store: Arc<dyn AccountStore>, cache: Arc<dyn AccountCache>) -> Self {
		Self { store, cache }
	}

	/// Ensure an account exists for `username`.
	///
	/// A new account gets the username as its full name, `username` and
	/// `native` external identities, and `public_key` as SSH key 1 when given.
	/// An existing account is left as it is. With `make_admin`, the account is
	/// added to the administrators group unless it is already a member, and its
	/// cached state is evicted once the change is committed.
	///
	/// All writes share one session; nothing is committed if any step fails.
	///
	/// # Errors
	/// - `ProvisioningError::InvalidRequest` if `username` is blank
	/// - `ProvisioningError::StoreUnavailable` if no session can be opened
	/// - `ProvisioningError::Store` if a lookup or insert fails
	/// - `ProvisioningError::AccountNotFound` if the identity cannot be resolved
	///   back to an account
	#[tracing::instrument(skip(self, public_key), fields(has_public_key = public_key.is_some()))]
	pub async fn provision(
		&self,
		username: &str,
		make_admin: bool,
		public_key: Option<&str>,
	) -> Result<ProvisionReport, ProvisioningError> {
		if username.trim().is_empty() {
			return Err(ProvisioningError::InvalidRequest(
				"username must not be empty".to_string(),
			));
		}

		let mut session = self
			.store
			.open_session()
			.await
			.map_err(ProvisioningError::StoreUnavailable)?;

		let username_key = ExternalIdKey::username(username);

		let (mut account_id, account_created, ssh_key_added) =
			match session.get_external_id(&username_key).await? {
				Some(existing) => {
					tracing::info!(account_id = %existing.account_id, "account found");
					(existing.account_id, false, false)
				}
				None => {
					tracing::info!("account not found, creating");
					let (id, ssh_key_added) =
						create_account(&mut *session, username, public_key).await?;
					(id, true, ssh_key_added)
				}
			};

		let mut admin_granted = false;
		if make_admin {
			account_id = resolve_account(&mut *session, &username_key).await?;
			admin_granted = grant_admin(&mut *session, account_id).await?;
		}

		session.commit().await?;

		if admin_granted {
			self.cache.evict(account_id).await;
			tracing::info!(account_id = %account_id, "added to administrators");
		}

		Ok(ProvisionReport {
			account_id,
			account_created,
			ssh_key_added,
			admin_granted,
		})
	}
}

async fn create_account(
	session: &mut dyn AccountSession,
	username: &str,
	public_key: Option<&str>,
) -> Result<(AccountId, bool), ProvisioningError> {
	let id = session.next_account_id().await?;
	tracing::info!(account_id = %id, "new account id allocated");

	session
		.insert_account(&Account::new(id).with_full_name(username))
		.await?;
	session
		.insert_external_id(&ExternalId::new(id, ExternalIdKey::username(username)))
		.await?;
	session
		.insert_external_id(&ExternalId::new(id, ExternalIdKey::native(username)))
		.await?;

	let Some(public_key) = public_key else {
		return Ok((id, false));
	};
	session
		.insert_ssh_key(&AccountSshKey::new(id, FIRST_SSH_KEY_SEQ, public_key))
		.await?;
	tracing::info!(account_id = %id, "public key inserted");

	Ok((id, true))
}

/// Look the identity up again and load the account it points at.
async fn resolve_account(
	session: &mut dyn AccountSession,
	key: &ExternalIdKey,
) -> Result<AccountId, ProvisioningError> {
	let external_id = session
		.get_external_id(key)
		.await?
		.ok_or_else(|| ProvisioningError::AccountNotFound(key.to_string()))?;

	let account = session
		.get_account(external_id.account_id)
		.await?
		.ok_or_else(|| ProvisioningError::AccountNotFound(external_id.account_id.to_string()))?;

	Ok(account.id)
}

/// Returns `true` if membership was added, `false` if it already existed.
async fn grant_admin(
	session: &mut dyn AccountSession,
	account_id: AccountId,
) -> Result<bool, ProvisioningError> {
	let is_admin = session
		.group_members_by_account(account_id)
		.await?
		.iter()
		.any(|m| m.group_id == ADMINISTRATORS_GROUP_ID);

	if is_admin {
		tracing::info!(account_id = %account_id, "already in administrators");
		return Ok(false);
	}

	tracing::info!(account_id = %account_id, "adding to administrators");
	let member = AccountGroupMember::new(account_id, ADMINISTRATORS_GROUP_ID);
	session
		.insert_group_member_audit(&AccountGroupMemberAudit::added(&member, account_id, Utc::now()))
		.await?;
	session.insert_group_member(&member).await?;

	Ok(true)
}
