// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: defaults, TOML files and environment variables.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{BootstrapConfigLayer, DatabaseConfigLayer, LoggingConfigLayer};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file is not an error.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/warden/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: WARDEN_SERVER_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		load_from(&env_var)
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn parse_bool(name: &str, value: String) -> Result<bool, ConfigError> {
	match value.to_ascii_lowercase().as_str() {
		"true" | "1" | "yes" => Ok(true),
		"false" | "0" | "no" => Ok(false),
		_ => Err(ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid bool value '{value}'"),
		}),
	}
}

fn parse_u32(name: &str, value: String) -> Result<u32, ConfigError> {
	value.parse().map_err(|_| ConfigError::InvalidValue {
		key: name.to_string(),
		message: format!("invalid u32 value '{value}'"),
	})
}

fn load_from(lookup: &dyn Fn(&str) -> Option<String>) -> Result<ServerConfigLayer, ConfigError> {
	let bool_var = |name: &str| lookup(name).map(|v| parse_bool(name, v)).transpose();
	let u32_var = |name: &str| lookup(name).map(|v| parse_u32(name, v)).transpose();

	Ok(ServerConfigLayer {
		database: Some(DatabaseConfigLayer {
			url: lookup("WARDEN_SERVER_DATABASE_URL"),
			max_connections: u32_var("WARDEN_SERVER_DATABASE_MAX_CONNECTIONS")?,
		}),
		logging: Some(LoggingConfigLayer {
			level: lookup("WARDEN_SERVER_LOG_LEVEL"),
		}),
		bootstrap: Some(BootstrapConfigLayer {
			enabled: bool_var("WARDEN_SERVER_BOOTSTRAP_ENABLED")?,
			username: lookup("WARDEN_SERVER_BOOTSTRAP_USERNAME"),
			make_admin: bool_var("WARDEN_SERVER_BOOTSTRAP_MAKE_ADMIN")?,
			public_key_path: lookup("WARDEN_SERVER_BOOTSTRAP_PUBLIC_KEY_PATH").map(PathBuf::from),
		}),
	})
}
