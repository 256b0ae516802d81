// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Warden server host.
//!
//! Builds the plugin registry at startup instead of relying on a container:
//! [`install_account_plugins`] registers the administrator bootstrap listener
//! and the internal group backend, and [`PluginRegistry`] drives them.

pub mod plugins;
pub mod registry;

pub use plugins::install_account_plugins;
pub use registry::PluginRegistry;
