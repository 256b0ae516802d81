// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for Warden server.
//!
//! Layered from built-in defaults, a TOML file and `WARDEN_SERVER_*`
//! environment variables, in increasing order of precedence.
//!
//! # Usage
//!
//! ```ignore
//! use warden_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("Bootstrapping {}", config.bootstrap.username);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub database: DatabaseConfig,
	pub logging: LoggingConfig,
	pub bootstrap: BootstrapConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`WARDEN_SERVER_*`)
/// 2. Config file (`/etc/warden/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Merge `sources` in precedence order and resolve the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let database = layer.database.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();
	let bootstrap = layer.bootstrap.unwrap_or_default().finalize();

	if bootstrap.enabled && bootstrap.username.trim().is_empty() {
		return Err(ConfigError::InvalidValue {
			key: "bootstrap.username".to_string(),
			message: "must not be empty when bootstrap is enabled".to_string(),
		});
	}

	info!(
		database = %database.url,
		log_level = %logging.level,
		bootstrap_enabled = bootstrap.enabled,
		bootstrap_username = %bootstrap.username,
		"configuration loaded"
	);

	Ok(ServerConfig {
		database,
		logging,
		bootstrap,
	})
}
