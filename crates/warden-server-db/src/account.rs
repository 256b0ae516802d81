// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Account repository for database operations.
//!
//! Writes go through an [`AccountSession`], a transaction on a single pooled
//! connection. Committing consumes the session; dropping it without committing
//! rolls back and hands the connection back to the pool, so the connection is
//! released on every exit path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
	sqlite::{Sqlite, SqlitePool, SqliteRow},
	Row, Transaction,
};
use warden_server_auth::{
	Account, AccountGroupMember, AccountGroupMemberAudit, AccountId, AccountSshKey, ExternalId,
	ExternalIdKey, GroupDescription, GroupId,
};

use crate::error::{map_insert_error, DbError};

const ACCOUNT_ID_SEQUENCE: &str = "account_id";

/// Entry point to the account tables.
#[async_trait]
pub trait AccountStore: Send + Sync {
	async fn open_session(&self) -> Result<Box<dyn AccountSession>, DbError>;
}

/// A unit of work against the account tables.
#[async_trait]
pub trait AccountSession: Send {
	async fn get_external_id(
		&mut self,
		key: &ExternalIdKey,
	) -> Result<Option<ExternalId>, DbError>;
	async fn get_account(&mut self, id: AccountId) -> Result<Option<Account>, DbError>;
	async fn next_account_id(&mut self) -> Result<AccountId, DbError>;
	async fn insert_account(&mut self, account: &Account) -> Result<(), DbError>;
	async fn insert_external_id(&mut self, external_id: &ExternalId) -> Result<(), DbError>;
	async fn insert_ssh_key(&mut self, key: &AccountSshKey) -> Result<(), DbError>;
	async fn group_members_by_account(
		&mut self,
		account_id: AccountId,
	) -> Result<Vec<AccountGroupMember>, DbError>;
	async fn insert_group_member(&mut self, member: &AccountGroupMember) -> Result<(), DbError>;
	async fn insert_group_member_audit(
		&mut self,
		audit: &AccountGroupMemberAudit,
	) -> Result<(), DbError>;
	/// Make every write in this session durable.
	async fn commit(self: Box<Self>) -> Result<(), DbError>;
}

/// Repository for account database operations.
#[derive(Clone)]
pub struct AccountRepository {
	pool: SqlitePool,
}

impl AccountRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Begin a transaction on a pooled connection.
	///
	/// # Errors
	/// Returns `DbError::Sqlx` if no connection can be acquired.
	#[tracing::instrument(skip(self))]
	pub async fn begin(&self) -> Result<SqliteAccountSession, DbError> {
		let tx = self.pool.begin().await?;
		tracing::trace!("account session opened");
		Ok(SqliteAccountSession { tx })
	}

	/// List every account, oldest ID first.
	#[tracing::instrument(skip(self))]
	pub async fn list_accounts(&self) -> Result<Vec<Account>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT account_id, full_name, registered_on
			FROM accounts
			ORDER BY account_id
			"#,
		)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_account).collect()
	}

	/// List the external identities bound to an account.
	#[tracing::instrument(skip(self), fields(account_id = %account_id))]
	pub async fn list_external_ids(&self, account_id: AccountId) -> Result<Vec<ExternalId>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT scheme, external_id, account_id
			FROM account_external_ids
			WHERE account_id = ?
			ORDER BY scheme, external_id
			"#,
		)
		.bind(account_id.get())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_external_id).collect()
	}

	/// List the SSH keys of an account in sequence order.
	#[tracing::instrument(skip(self), fields(account_id = %account_id))]
	pub async fn list_ssh_keys(&self, account_id: AccountId) -> Result<Vec<AccountSshKey>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT account_id, seq, ssh_public_key, valid
			FROM account_ssh_keys
			WHERE account_id = ?
			ORDER BY seq
			"#,
		)
		.bind(account_id.get())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_ssh_key).collect()
	}

	/// List the members of a group.
	#[tracing::instrument(skip(self), fields(group_id = %group_id))]
	pub async fn list_group_members(
		&self,
		group_id: GroupId,
	) -> Result<Vec<AccountGroupMember>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT account_id, group_id
			FROM account_group_members
			WHERE group_id = ?
			ORDER BY account_id
			"#,
		)
		.bind(group_id.get())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_group_member).collect()
	}

	/// List the membership audit trail of an account.
	#[tracing::instrument(skip(self), fields(account_id = %account_id))]
	pub async fn list_group_member_audits(
		&self,
		account_id: AccountId,
	) -> Result<Vec<AccountGroupMemberAudit>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT account_id, group_id, added_by, added_on, removed_by, removed_on
			FROM account_group_members_audit
			WHERE account_id = ?
			ORDER BY added_on
			"#,
		)
		.bind(account_id.get())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_audit).collect()
	}

	/// Get a group's description by ID.
	#[tracing::instrument(skip(self), fields(group_id = %group_id))]
	pub async fn get_group(&self, group_id: GroupId) -> Result<Option<GroupDescription>, DbError> {
		let row = sqlx::query("SELECT group_id, name FROM account_groups WHERE group_id = ?")
			.bind(group_id.get())
			.fetch_optional(&self.pool)
			.await?;

		row.as_ref().map(row_to_group).transpose()
	}
}

#[async_trait]
impl AccountStore for AccountRepository {
	async fn open_session(&self) -> Result<Box<dyn AccountSession>, DbError> {
		Ok(Box::new(self.begin().await?))
	}
}

/// [`AccountSession`] backed by a SQLite transaction.
pub struct SqliteAccountSession {
	tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl AccountSession for SqliteAccountSession {
	#[tracing::instrument(skip(self), fields(key = %key))]
	async fn get_external_id(
		&mut self,
		key: &ExternalIdKey,
	) -> Result<Option<ExternalId>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT scheme, external_id, account_id
			FROM account_external_ids
			WHERE scheme = ? AND external_id = ?
			"#,
		)
		.bind(key.scheme.as_str())
		.bind(&key.id)
		.fetch_optional(&mut *self.tx)
		.await?;

		row.as_ref().map(row_to_external_id).transpose()
	}

	#[tracing::instrument(skip(self), fields(account_id = %id))]
	async fn get_account(&mut self, id: AccountId) -> Result<Option<Account>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT account_id, full_name, registered_on
			FROM accounts
			WHERE account_id = ?
			"#,
		)
		.bind(id.get())
		.fetch_optional(&mut *self.tx)
		.await?;

		row.as_ref().map(row_to_account).transpose()
	}

	#[tracing::instrument(skip(self))]
	async fn next_account_id(&mut self) -> Result<AccountId, DbError> {
		let row = sqlx::query(
			r#"
			UPDATE sequences
			SET next_value = next_value + 1
			WHERE name = ?
			RETURNING next_value - 1 AS allocated
			"#,
		)
		.bind(ACCOUNT_ID_SEQUENCE)
		.fetch_optional(&mut *self.tx)
		.await?
		.ok_or_else(|| DbError::NotFound(format!("sequence {ACCOUNT_ID_SEQUENCE}")))?;

		let allocated: i64 = row.try_get("allocated")?;
		let id = i32::try_from(allocated)
			.map_err(|_| DbError::Internal(format!("account id {allocated} out of range")))?;

		tracing::debug!(account_id = id, "account id allocated");
		Ok(AccountId::new(id))
	}

	#[tracing::instrument(skip(self, account), fields(account_id = %account.id))]
	async fn insert_account(&mut self, account: &Account) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO accounts (account_id, full_name, registered_on)
			VALUES (?, ?, ?)
			"#,
		)
		.bind(account.id.get())
		.bind(account.full_name.as_deref())
		.bind(account.registered_on.to_rfc3339())
		.execute(&mut *self.tx)
		.await
		.map_err(|e| map_insert_error(e, || format!("account {}", account.id)))?;

		tracing::debug!(account_id = %account.id, "account created");
		Ok(())
	}

	#[tracing::instrument(skip(self, external_id), fields(key = %external_id.key, account_id = %external_id.account_id))]
	async fn insert_external_id(&mut self, external_id: &ExternalId) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO account_external_ids (scheme, external_id, account_id)
			VALUES (?, ?, ?)
			"#,
		)
		.bind(external_id.key.scheme.as_str())
		.bind(&external_id.key.id)
		.bind(external_id.account_id.get())
		.execute(&mut *self.tx)
		.await
		.map_err(|e| map_insert_error(e, || format!("external id {}", external_id.key)))?;

		tracing::debug!(key = %external_id.key, account_id = %external_id.account_id, "external id created");
		Ok(())
	}

	#[tracing::instrument(skip(self, key), fields(account_id = %key.account_id, seq = key.seq))]
	async fn insert_ssh_key(&mut self, key: &AccountSshKey) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO account_ssh_keys (account_id, seq, ssh_public_key, valid)
			VALUES (?, ?, ?, ?)
			"#,
		)
		.bind(key.account_id.get())
		.bind(key.seq)
		.bind(&key.ssh_public_key)
		.bind(key.valid as i32)
		.execute(&mut *self.tx)
		.await
		.map_err(|e| {
			map_insert_error(e, || {
				format!("ssh key {} for account {}", key.seq, key.account_id)
			})
		})?;

		tracing::debug!(account_id = %key.account_id, seq = key.seq, "ssh key created");
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(account_id = %account_id))]
	async fn group_members_by_account(
		&mut self,
		account_id: AccountId,
	) -> Result<Vec<AccountGroupMember>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT account_id, group_id
			FROM account_group_members
			WHERE account_id = ?
			ORDER BY group_id
			"#,
		)
		.bind(account_id.get())
		.fetch_all(&mut *self.tx)
		.await?;

		rows.iter().map(row_to_group_member).collect()
	}

	#[tracing::instrument(skip(self, member), fields(account_id = %member.account_id, group_id = %member.group_id))]
	async fn insert_group_member(&mut self, member: &AccountGroupMember) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO account_group_members (account_id, group_id)
			VALUES (?, ?)
			"#,
		)
		.bind(member.account_id.get())
		.bind(member.group_id.get())
		.execute(&mut *self.tx)
		.await
		.map_err(|e| {
			map_insert_error(e, || {
				format!(
					"account {} already in group {}",
					member.account_id, member.group_id
				)
			})
		})?;

		tracing::debug!(account_id = %member.account_id, group_id = %member.group_id, "group member added");
		Ok(())
	}

	#[tracing::instrument(skip(self, audit), fields(account_id = %audit.account_id, group_id = %audit.group_id))]
	async fn insert_group_member_audit(
		&mut self,
		audit: &AccountGroupMemberAudit,
	) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO account_group_members_audit
				(account_id, group_id, added_by, added_on, removed_by, removed_on)
			VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(audit.account_id.get())
		.bind(audit.group_id.get())
		.bind(audit.added_by.get())
		.bind(audit.added_on.to_rfc3339())
		.bind(audit.removed_by.map(AccountId::get))
		.bind(audit.removed_on.map(|d| d.to_rfc3339()))
		.execute(&mut *self.tx)
		.await?;

		Ok(())
	}

	#[tracing::instrument(skip(self))]
	async fn commit(self: Box<Self>) -> Result<(), DbError> {
		self.tx.commit().await?;
		tracing::trace!("account session committed");
		Ok(())
	}
}

fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>, DbError> {
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("Invalid {column}: {e}")))
}

fn row_to_account(row: &SqliteRow) -> Result<Account, DbError> {
	let registered_on: String = row.try_get("registered_on")?;

	Ok(Account {
		id: AccountId::new(row.try_get("account_id")?),
		full_name: row.try_get("full_name")?,
		registered_on: parse_timestamp(&registered_on, "registered_on")?,
	})
}

fn row_to_external_id(row: &SqliteRow) -> Result<ExternalId, DbError> {
	let scheme: String = row.try_get("scheme")?;
	let external_id: String = row.try_get("external_id")?;
	let key = format!("{scheme}:{external_id}")
		.parse::<ExternalIdKey>()
		.map_err(|e| DbError::Internal(format!("Invalid external id: {e}")))?;

	Ok(ExternalId {
		key,
		account_id: AccountId::new(row.try_get("account_id")?),
	})
}

fn row_to_ssh_key(row: &SqliteRow) -> Result<AccountSshKey, DbError> {
	let valid: i32 = row.try_get("valid")?;

	Ok(AccountSshKey {
		account_id: AccountId::new(row.try_get("account_id")?),
		seq: row.try_get("seq")?,
		ssh_public_key: row.try_get("ssh_public_key")?,
		valid: valid != 0,
	})
}

fn row_to_group_member(row: &SqliteRow) -> Result<AccountGroupMember, DbError> {
	Ok(AccountGroupMember {
		account_id: AccountId::new(row.try_get("account_id")?),
		group_id: GroupId::new(row.try_get("group_id")?),
	})
}

fn row_to_group(row: &SqliteRow) -> Result<GroupDescription, DbError> {
	Ok(GroupDescription {
		id: GroupId::new(row.try_get("group_id")?),
		name: row.try_get("name")?,
	})
}

fn row_to_audit(row: &SqliteRow) -> Result<AccountGroupMemberAudit, DbError> {
	let added_on: String = row.try_get("added_on")?;
	let removed_by: Option<i32> = row.try_get("removed_by")?;
	let removed_on: Option<String> = row.try_get("removed_on")?;

	Ok(AccountGroupMemberAudit {
		account_id: AccountId::new(row.try_get("account_id")?),
		group_id: GroupId::new(row.try_get("group_id")?),
		added_by: AccountId::new(row.try_get("added_by")?),
		added_on: parse_timestamp(&added_on, "added_on")?,
		removed_by: removed_by.map(AccountId::new),
		removed_on: removed_on
			.map(|d| parse_timestamp(&d, "removed_on"))
			.transpose()?,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_account_test_repo;
	use warden_server_auth::ADMINISTRATORS_GROUP_ID;

	async fn insert_account(repo: &AccountRepository, name: &str) -> AccountId {
		let mut session = repo.begin().await.unwrap();
		let id = session.next_account_id().await.unwrap();
		session
			.insert_account(&Account::new(id).with_full_name(name))
			.await
			.unwrap();
		session
			.insert_external_id(&ExternalId::new(id, ExternalIdKey::username(name)))
			.await
			.unwrap();
		Box::new(session).commit().await.unwrap();
		id
	}

	#[tokio::test]
	async fn test_next_account_id_is_sequential() {
		let repo = create_account_test_repo().await;
		let mut session = repo.begin().await.unwrap();

		let first = session.next_account_id().await.unwrap();
		let second = session.next_account_id().await.unwrap();

		assert_eq!(first, AccountId::new(1000000));
		assert_eq!(second, AccountId::new(1000001));
	}

	#[tokio::test]
	async fn test_create_and_lookup_by_external_id() {
		let repo = create_account_test_repo().await;
		let id = insert_account(&repo, "alice").await;

		let mut session = repo.begin().await.unwrap();
		let found = session
			.get_external_id(&ExternalIdKey::username("alice"))
			.await
			.unwrap()
			.unwrap();
		assert_eq!(found.account_id, id);

		let account = session.get_account(id).await.unwrap().unwrap();
		assert_eq!(account.full_name.as_deref(), Some("alice"));

		let missing = session
			.get_external_id(&ExternalIdKey::native("alice"))
			.await
			.unwrap();
		assert!(missing.is_none());
	}

	#[tokio::test]
	async fn test_undecodable_columns_are_errors() {
		let repo = create_account_test_repo().await;
		let id = insert_account(&repo, "erin").await;

		sqlx::query("UPDATE accounts SET registered_on = X'00FF'")
			.execute(&repo.pool)
			.await
			.unwrap();
		sqlx::query("UPDATE account_external_ids SET external_id = X'00FF'")
			.execute(&repo.pool)
			.await
			.unwrap();

		let mut session = repo.begin().await.unwrap();
		let err = session.get_account(id).await.unwrap_err();
		assert!(matches!(err, DbError::Sqlx(_)));
		drop(session);

		assert!(matches!(
			repo.list_accounts().await.unwrap_err(),
			DbError::Sqlx(_)
		));
		assert!(matches!(
			repo.list_external_ids(id).await.unwrap_err(),
			DbError::Sqlx(_)
		));
	}

	#[tokio::test]
	async fn test_dropped_session_rolls_back() {
		let repo = create_account_test_repo().await;

		{
			let mut session = repo.begin().await.unwrap();
			let id = session.next_account_id().await.unwrap();
			session.insert_account(&Account::new(id)).await.unwrap();
		}

		assert!(repo.list_accounts().await.unwrap().is_empty());

		// The sequence update was rolled back too.
		let mut session = repo.begin().await.unwrap();
		assert_eq!(
			session.next_account_id().await.unwrap(),
			AccountId::new(1000000)
		);
	}

	#[tokio::test]
	async fn test_duplicate_external_id_is_conflict() {
		let repo = create_account_test_repo().await;
		let first = insert_account(&repo, "bob").await;

		let mut session = repo.begin().await.unwrap();
		let second = session.next_account_id().await.unwrap();
		session.insert_account(&Account::new(second)).await.unwrap();
		let err = session
			.insert_external_id(&ExternalId::new(second, ExternalIdKey::username("bob")))
			.await
			.unwrap_err();

		assert!(matches!(err, DbError::Conflict(_)));
		assert_ne!(first, second);
	}

	#[tokio::test]
	async fn test_group_membership_round_trip() {
		let repo = create_account_test_repo().await;
		let id = insert_account(&repo, "carol").await;

		let mut session = repo.begin().await.unwrap();
		assert!(session.group_members_by_account(id).await.unwrap().is_empty());

		let member = AccountGroupMember::new(id, ADMINISTRATORS_GROUP_ID);
		let audit = AccountGroupMemberAudit::added(&member, id, Utc::now());
		session.insert_group_member_audit(&audit).await.unwrap();
		session.insert_group_member(&member).await.unwrap();

		let err = session.insert_group_member(&member).await.unwrap_err();
		assert!(matches!(err, DbError::Conflict(_)));

		assert_eq!(
			session.group_members_by_account(id).await.unwrap(),
			vec![member]
		);
		Box::new(session).commit().await.unwrap();

		assert_eq!(
			repo.list_group_members(ADMINISTRATORS_GROUP_ID).await.unwrap(),
			vec![member]
		);
		let audits = repo.list_group_member_audits(id).await.unwrap();
		assert_eq!(audits.len(), 1);
		assert_eq!(audits[0].added_by, id);
	}

	#[tokio::test]
	async fn test_unknown_group_is_rejected() {
		let repo = create_account_test_repo().await;
		let id = insert_account(&repo, "dave").await;

		let mut session = repo.begin().await.unwrap();
		let result = session
			.insert_group_member(&AccountGroupMember::new(id, GroupId::new(42)))
			.await;
		assert!(result.is_err());
	}

	#[tokio::test]
	async fn test_ssh_keys_listed_in_sequence_order() {
		let repo = create_account_test_repo().await;
		let id = insert_account(&repo, "erin").await;

		let mut session = repo.begin().await.unwrap();
		session
			.insert_ssh_key(&AccountSshKey::new(id, 2, "ssh-ed25519 BBBB"))
			.await
			.unwrap();
		session
			.insert_ssh_key(&AccountSshKey::new(id, 1, "ssh-rsa AAAA"))
			.await
			.unwrap();
		Box::new(session).commit().await.unwrap();

		let keys = repo.list_ssh_keys(id).await.unwrap();
		assert_eq!(keys.len(), 2);
		assert_eq!(keys[0].seq, 1);
		assert_eq!(keys[0].ssh_public_key, "ssh-rsa AAAA");
		assert!(keys[0].valid);
	}

	#[tokio::test]
	async fn test_get_group() {
		let repo = create_account_test_repo().await;

		let admins = repo.get_group(ADMINISTRATORS_GROUP_ID).await.unwrap().unwrap();
		assert_eq!(admins.name, "Administrators");
		assert!(repo.get_group(GroupId::new(99)).await.unwrap().is_none());
	}
}
