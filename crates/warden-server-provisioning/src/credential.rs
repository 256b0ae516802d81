// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Locating the SSH public key attached to a bootstrapped account.
//!
//! A missing key is normal: the account is then created without credentials.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::CredentialError;

/// Key file looked up under the home directory.
pub const DEFAULT_PUBLIC_KEY_FILE: &str = ".ssh/id_rsa.pub";

/// Where the bootstrap public key comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PublicKeySource {
	/// `$HOME/.ssh/id_rsa.pub`, with `HOME` read at load time.
	#[default]
	HomeDirectory,
	/// A fixed file.
	File(PathBuf),
	/// Never attach a key.
	Disabled,
}

impl PublicKeySource {
	/// Load the key, or `None` if there is no usable key.
	pub async fn load(&self) -> Option<String> {
		let path = match self {
			PublicKeySource::Disabled => return None,
			PublicKeySource::File(path) => path.clone(),
			PublicKeySource::HomeDirectory => match public_key_path(std::env::var_os("HOME")) {
				Ok(path) => path,
				Err(e) => {
					tracing::info!(error = %e, "public key not found");
					return None;
				}
			},
		};

		tracing::info!(path = %path.display(), "reading public key");
		match read_public_key(&path).await {
			Ok(Some(key)) => Some(key),
			Ok(None) => {
				tracing::info!(path = %path.display(), "public key file is empty");
				None
			}
			Err(e) => {
				tracing::info!(error = %e, "public key not found");
				None
			}
		}
	}
}

/// Resolve the key path under `home`.
///
/// # Errors
/// Returns `CredentialError::HomeUnset` if `home` is missing or empty.
pub fn public_key_path(home: Option<OsString>) -> Result<PathBuf, CredentialError> {
	match home {
		Some(home) if !home.is_empty() => Ok(PathBuf::from(home).join(DEFAULT_PUBLIC_KEY_FILE)),
		_ => Err(CredentialError::HomeUnset),
	}
}

/// Read a public key file as UTF-8.
///
/// Surrounding whitespace is trimmed; a blank file yields `Ok(None)`.
///
/// # Errors
/// Returns `CredentialError::Read` if the file is missing, unreadable, or not
/// valid UTF-8.
pub async fn read_public_key(path: &Path) -> Result<Option<String>, CredentialError> {
	let content = tokio::fs::read_to_string(path)
		.await
		.map_err(|source| CredentialError::Read {
			path: path.to_path_buf(),
			source,
		})?;

	let key = content.trim();
	Ok((!key.is_empty()).then(|| key.to_string()))
}
