// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Administrator bootstrap configuration.

use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_BOOTSTRAP_USERNAME: &str = "admin";

/// Bootstrap configuration (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
	pub enabled: bool,
	pub username: String,
	pub make_admin: bool,
	/// Overrides `$HOME/.ssh/id_rsa.pub` when set.
	pub public_key_path: Option<PathBuf>,
}

impl Default for BootstrapConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			username: DEFAULT_BOOTSTRAP_USERNAME.to_string(),
			make_admin: true,
			public_key_path: None,
		}
	}
}

/// Bootstrap configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BootstrapConfigLayer {
	#[serde(default)]
	pub enabled: Option<bool>,
	#[serde(default)]
	pub username: Option<String>,
	#[serde(default)]
	pub make_admin: Option<bool>,
	#[serde(default)]
	pub public_key_path: Option<PathBuf>,
}

impl BootstrapConfigLayer {
	pub fn merge(&mut self, other: BootstrapConfigLayer) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.username.is_some() {
			self.username = other.username;
		}
		if other.make_admin.is_some() {
			self.make_admin = other.make_admin;
		}
		if other.public_key_path.is_some() {
			self.public_key_path = other.public_key_path;
		}
	}

	pub fn finalize(self) -> BootstrapConfig {
		BootstrapConfig {
			enabled: self.enabled.unwrap_or(true),
			username: self
				.username
				.unwrap_or_else(|| DEFAULT_BOOTSTRAP_USERNAME.to_string()),
			make_admin: self.make_admin.unwrap_or(true),
			public_key_path: self.public_key_path,
		}
	}
}
