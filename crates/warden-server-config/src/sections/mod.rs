// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod bootstrap;
mod database;
mod logging;

pub use bootstrap::{BootstrapConfig, BootstrapConfigLayer, DEFAULT_BOOTSTRAP_USERNAME};
pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
