// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core account types shared by the Warden server crates.
//!
//! - [`types`] - numeric ID newtypes and external identity keys
//! - [`account`] - account, identity, SSH key and group membership records
//! - [`group`] - the [`GroupBackend`] extension point

pub mod account;
pub mod group;
pub mod types;

pub use account::{Account, AccountGroupMember, AccountGroupMemberAudit, AccountSshKey, ExternalId};
pub use group::{GroupBackend, GroupBackendError, GroupDescription};
pub use types::{
	AccountId, ExternalIdKey, ExternalIdScheme, GroupId, ParseExternalIdError,
	ADMINISTRATORS_GROUP_ID, ANONYMOUS_USERS_GROUP_ID, REGISTERED_USERS_GROUP_ID,
};
