// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use warden_server_auth::{
	Account, AccountGroupMember, AccountGroupMemberAudit, AccountId, AccountSshKey, ExternalId,
	ExternalIdKey, ExternalIdScheme, GroupBackend, ADMINISTRATORS_GROUP_ID,
};
use warden_server_db::{
	testing::{create_account_test_pool, create_account_test_repo},
	AccountCache, AccountRepository, AccountSession,
	AccountState, AccountStore, DbError, InternalGroupBackend, MemoryAccountCache,
};
use warden_server_provisioning::{
	AdminBootstrapListener, AdminProvisioner, LifecycleListener, ProvisioningError,
	PublicKeySource,
};

const KEY: &str = "ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQC admin@host";

/// Cache that only records evictions.
#[derive(Default)]
struct RecordingCache {
	evicted: Mutex<Vec<AccountId>>,
}

impl RecordingCache {
	fn evicted(&self) -> Vec<AccountId> {
		self.evicted.lock().unwrap().clone()
	}
}

#[async_trait]
impl AccountCache for RecordingCache {
	async fn get(&self, _account_id: AccountId) -> Result<Option<AccountState>, DbError> {
		Ok(None)
	}

	async fn evict(&self, account_id: AccountId) {
		self.evicted.lock().unwrap().push(account_id);
	}
}

/// Store whose sessions can never be opened.
struct UnavailableStore;

#[async_trait]
impl AccountStore for UnavailableStore {
	async fn open_session(&self) -> Result<Box<dyn AccountSession>, DbError> {
		Err(DbError::Internal("connection refused".to_string()))
	}
}

/// Store whose sessions fail every membership insert.
struct FailingMembershipStore {
	repo: AccountRepository,
}

struct FailingMembershipSession {
	inner: Box<dyn AccountSession>,
}

#[async_trait]
impl AccountStore for FailingMembershipStore {
	async fn open_session(&self) -> Result<Box<dyn AccountSession>, DbError> {
		Ok(Box::new(FailingMembershipSession {
			inner: self.repo.open_session().await?,
		}))
	}
}

#[async_trait]
impl AccountSession for FailingMembershipSession {
	async fn get_external_id(
		&mut self,
		key: &ExternalIdKey,
	) -> Result<Option<ExternalId>, DbError> {
		self.inner.get_external_id(key).await
	}

	async fn get_account(&mut self, id: AccountId) -> Result<Option<Account>, DbError> {
		self.inner.get_account(id).await
	}

	async fn next_account_id(&mut self) -> Result<AccountId, DbError> {
		self.inner.next_account_id().await
	}

	async fn insert_account(&mut self, account: &Account) -> Result<(), DbError> {
		self.inner.insert_account(account).await
	}

	async fn insert_external_id(&mut self, external_id: &ExternalId) -> Result<(), DbError> {
		self.inner.insert_external_id(external_id).await
	}

	async fn insert_ssh_key(&mut self, key: &AccountSshKey) -> Result<(), DbError> {
		self.inner.insert_ssh_key(key).await
	}

	async fn group_members_by_account(
		&mut self,
		account_id: AccountId,
	) -> Result<Vec<AccountGroupMember>, DbError> {
		self.inner.group_members_by_account(account_id).await
	}

	async fn insert_group_member(&mut self, _member: &AccountGroupMember) -> Result<(), DbError> {
		Err(DbError::Internal("disk full".to_string()))
	}

	async fn insert_group_member_audit(
		&mut self,
		audit: &AccountGroupMemberAudit,
	) -> Result<(), DbError> {
		self.inner.insert_group_member_audit(audit).await
	}

	async fn commit(self: Box<Self>) -> Result<(), DbError> {
		self.inner.commit().await
	}
}

async fn make_provisioner() -> (AccountRepository, Arc<RecordingCache>, AdminProvisioner) {
	let repo = create_account_test_repo().await;
	let cache = Arc::new(RecordingCache::default());
	let provisioner = AdminProvisioner::new(Arc::new(repo.clone()), cache.clone());
	(repo, cache, provisioner)
}

#[tokio::test]
async fn test_admin_bootstrap_is_idempotent() {
	let (repo, cache, provisioner) = make_provisioner().await;

	let first = provisioner.provision("admin", true, None).await.unwrap();
	assert!(first.account_created);
	assert!(first.admin_granted);
	assert!(!first.ssh_key_added);

	let second = provisioner.provision("admin", true, None).await.unwrap();
	assert!(!second.changed());
	assert_eq!(second.account_id, first.account_id);

	assert_eq!(repo.list_accounts().await.unwrap().len(), 1);
	assert_eq!(repo.list_external_ids(first.account_id).await.unwrap().len(), 2);
	assert_eq!(
		repo.list_group_members(ADMINISTRATORS_GROUP_ID).await.unwrap(),
		vec![AccountGroupMember::new(first.account_id, ADMINISTRATORS_GROUP_ID)]
	);
	assert_eq!(
		repo.list_group_member_audits(first.account_id).await.unwrap().len(),
		1
	);
	assert_eq!(cache.evicted(), vec![first.account_id]);
}

#[tokio::test]
async fn test_new_identity_gets_account_and_both_identities() {
	let (repo, cache, provisioner) = make_provisioner().await;

	let report = provisioner.provision("alice", false, None).await.unwrap();
	assert!(report.account_created);
	assert!(!report.admin_granted);

	let accounts = repo.list_accounts().await.unwrap();
	assert_eq!(accounts.len(), 1);
	assert_eq!(accounts[0].id, report.account_id);
	assert_eq!(accounts[0].full_name.as_deref(), Some("alice"));

	let schemes: Vec<ExternalIdScheme> = repo
		.list_external_ids(report.account_id)
		.await
		.unwrap()
		.into_iter()
		.map(|e| {
			assert_eq!(e.key.id, "alice");
			e.key.scheme
		})
		.collect();
	assert_eq!(
		schemes,
		vec![ExternalIdScheme::Native, ExternalIdScheme::Username]
	);

	assert!(repo.list_ssh_keys(report.account_id).await.unwrap().is_empty());
	assert!(repo
		.list_group_members(ADMINISTRATORS_GROUP_ID)
		.await
		.unwrap()
		.is_empty());
	assert!(cache.evicted().is_empty());
}

#[tokio::test]
async fn test_public_key_attached_as_first_key() {
	let (repo, _cache, provisioner) = make_provisioner().await;

	let report = provisioner.provision("bob", false, Some(KEY)).await.unwrap();
	assert!(report.ssh_key_added);

	let keys = repo.list_ssh_keys(report.account_id).await.unwrap();
	assert_eq!(keys.len(), 1);
	assert_eq!(keys[0].seq, 1);
	assert_eq!(keys[0].ssh_public_key, KEY);
}

#[tokio::test]
async fn test_existing_account_promoted_once() {
	let (repo, cache, provisioner) = make_provisioner().await;
	let created = provisioner.provision("carol", false, None).await.unwrap();
	let before = repo.list_accounts().await.unwrap();
	let identities_before = repo.list_external_ids(created.account_id).await.unwrap();

	let promoted = provisioner.provision("carol", true, None).await.unwrap();
	assert!(!promoted.account_created);
	assert!(promoted.admin_granted);
	assert_eq!(promoted.account_id, created.account_id);

	assert_eq!(repo.list_accounts().await.unwrap(), before);
	assert_eq!(
		repo.list_external_ids(created.account_id).await.unwrap(),
		identities_before
	);
	assert_eq!(
		repo.list_group_members(ADMINISTRATORS_GROUP_ID).await.unwrap().len(),
		1
	);
	let audits = repo
		.list_group_member_audits(created.account_id)
		.await
		.unwrap();
	assert_eq!(audits.len(), 1);
	assert_eq!(audits[0].added_by, created.account_id);
	assert_eq!(cache.evicted(), vec![created.account_id]);

	let again = provisioner.provision("carol", true, None).await.unwrap();
	assert!(!again.changed());
	assert_eq!(
		repo.list_group_members(ADMINISTRATORS_GROUP_ID).await.unwrap().len(),
		1
	);
	assert_eq!(
		repo.list_group_member_audits(created.account_id)
			.await
			.unwrap()
			.len(),
		1
	);
	assert_eq!(cache.evicted().len(), 1);
}

#[tokio::test]
async fn test_existing_account_does_not_get_new_key() {
	let (repo, _cache, provisioner) = make_provisioner().await;
	let created = provisioner.provision("dave", false, None).await.unwrap();

	let report = provisioner.provision("dave", false, Some(KEY)).await.unwrap();
	assert!(!report.ssh_key_added);
	assert!(repo.list_ssh_keys(created.account_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_store_unavailable_is_reported() {
	let cache = Arc::new(RecordingCache::default());
	let provisioner = AdminProvisioner::new(Arc::new(UnavailableStore), cache.clone());

	let err = provisioner.provision("admin", true, None).await.unwrap_err();
	assert!(matches!(err, ProvisioningError::StoreUnavailable(_)));
	assert!(cache.evicted().is_empty());
}

#[tokio::test]
async fn test_blank_username_rejected_before_store_is_touched() {
	let provisioner = AdminProvisioner::new(
		Arc::new(UnavailableStore),
		Arc::new(RecordingCache::default()),
	);

	let err = provisioner.provision("  ", true, None).await.unwrap_err();
	assert!(matches!(err, ProvisioningError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_failed_promotion_leaves_no_partial_account() {
	let repo = create_account_test_repo().await;
	let cache = Arc::new(RecordingCache::default());
	let provisioner = AdminProvisioner::new(
		Arc::new(FailingMembershipStore { repo: repo.clone() }),
		cache.clone(),
	);

	let err = provisioner.provision("erin", true, Some(KEY)).await.unwrap_err();
	assert!(matches!(err, ProvisioningError::Store(_)));

	assert!(repo.list_accounts().await.unwrap().is_empty());
	assert!(cache.evicted().is_empty());
}

#[tokio::test]
async fn test_promotion_visible_through_group_backend() {
	let repo = create_account_test_repo().await;
	let cache = Arc::new(MemoryAccountCache::new(Arc::new(repo.clone())));
	let backend = InternalGroupBackend::new(repo.clone(), cache.clone());
	let provisioner = AdminProvisioner::new(Arc::new(repo.clone()), cache.clone());

	let created = provisioner.provision("frank", false, None).await.unwrap();
	assert!(!backend
		.is_member(created.account_id, ADMINISTRATORS_GROUP_ID)
		.await
		.unwrap());

	provisioner.provision("frank", true, None).await.unwrap();
	assert!(backend
		.is_member(created.account_id, ADMINISTRATORS_GROUP_ID)
		.await
		.unwrap());
}

#[tokio::test]
async fn test_listener_start_swallows_store_failure() {
	let provisioner = AdminProvisioner::new(
		Arc::new(UnavailableStore),
		Arc::new(RecordingCache::default()),
	);
	let listener =
		AdminBootstrapListener::new(provisioner).with_key_source(PublicKeySource::Disabled);

	listener.start().await;
	listener.stop().await;
}

#[tokio::test]
async fn test_undecodable_row_is_reported_not_panicked() {
	let pool = create_account_test_pool().await;
	let repo = AccountRepository::new(pool.clone());
	let provisioner =
		AdminProvisioner::new(Arc::new(repo.clone()), Arc::new(RecordingCache::default()));
	provisioner.provision("admin", false, None).await.unwrap();

	sqlx::query("UPDATE accounts SET registered_on = X'00FF'")
		.execute(&pool)
		.await
		.unwrap();

	let err = provisioner.provision("admin", true, None).await.unwrap_err();
	assert!(matches!(err, ProvisioningError::Store(DbError::Sqlx(_))));

	let listener =
		AdminBootstrapListener::new(provisioner).with_key_source(PublicKeySource::Disabled);
	let started = tokio::spawn(async move { listener.start().await }).await;
	assert!(started.is_ok());

	assert!(repo
		.list_group_members(ADMINISTRATORS_GROUP_ID)
		.await
		.unwrap()
		.is_empty());
}

#[tokio::test]
async fn test_listener_provisions_admin_with_key_file() {
	let (repo, _cache, provisioner) = make_provisioner().await;
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("id_rsa.pub");
	std::fs::write(&path, format!("{KEY}\n")).unwrap();

	let listener =
		AdminBootstrapListener::new(provisioner).with_key_source(PublicKeySource::File(path));
	assert_eq!(listener.username(), "admin");
	listener.start().await;

	let accounts = repo.list_accounts().await.unwrap();
	assert_eq!(accounts.len(), 1);
	assert_eq!(accounts[0].full_name.as_deref(), Some("admin"));

	let keys = repo.list_ssh_keys(accounts[0].id).await.unwrap();
	assert_eq!(keys.len(), 1);
	assert_eq!(keys[0].ssh_public_key, KEY);

	assert_eq!(
		repo.list_group_members(ADMINISTRATORS_GROUP_ID).await.unwrap(),
		vec![AccountGroupMember::new(accounts[0].id, ADMINISTRATORS_GROUP_ID)]
	);
}

#[tokio::test]
async fn test_listener_with_missing_key_file_still_provisions() {
	let (repo, _cache, provisioner) = make_provisioner().await;
	let dir = tempfile::tempdir().unwrap();

	let listener = AdminBootstrapListener::new(provisioner)
		.with_username("ops")
		.with_make_admin(false)
		.with_key_source(PublicKeySource::File(dir.path().join("missing.pub")));
	listener.start().await;

	let accounts = repo.list_accounts().await.unwrap();
	assert_eq!(accounts.len(), 1);
	assert!(repo.list_ssh_keys(accounts[0].id).await.unwrap().is_empty());
	assert!(repo
		.list_group_members(ADMINISTRATORS_GROUP_ID)
		.await
		.unwrap()
		.is_empty());
}
