// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Deserialize;

use crate::sections::{BootstrapConfigLayer, DatabaseConfigLayer, LoggingConfigLayer};

/// Partial server configuration as produced by a single source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
	#[serde(default)]
	pub bootstrap: Option<BootstrapConfigLayer>,
}

impl ServerConfigLayer {
	/// Merge `other` on top of `self`; values set in `other` win.
	pub fn merge(&mut self, other: ServerConfigLayer) {
		merge_section(&mut self.database, other.database, DatabaseConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
		merge_section(&mut self.bootstrap, other.bootstrap, BootstrapConfigLayer::merge);
	}
}

fn merge_section<T>(target: &mut Option<T>, other: Option<T>, merge: fn(&mut T, T)) {
	match (target.as_mut(), other) {
		(Some(current), Some(other)) => merge(current, other),
		(None, Some(other)) => *target = Some(other),
		(_, None) => {}
	}
}
