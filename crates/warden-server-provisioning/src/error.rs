// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use warden_server_db::DbError;

/// Errors that can occur while bootstrapping an account.
#[derive(Debug, thiserror::Error)]
pub enum ProvisioningError {
	#[error("account store unavailable: {0}")]
	StoreUnavailable(#[source] DbError),

	#[error("account store error: {0}")]
	Store(#[from] DbError),

	#[error("account not found: {0}")]
	AccountNotFound(String),

	#[error("invalid request: {0}")]
	InvalidRequest(String),
}

/// Why no public key could be read. Never fatal to provisioning.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
	#[error("HOME is not set")]
	HomeUnset,

	#[error("failed to read {}: {source}", .path.display())]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}
