// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions for accounts and groups.
//!
//! - **ID newtypes**: numeric wrappers for accounts ([`AccountId`]) and groups
//!   ([`GroupId`]) so the two can never be mixed up
//! - **Well-known groups**: the fixed IDs of the groups the host seeds at install
//!   time, most importantly [`ADMINISTRATORS_GROUP_ID`]
//! - **External identities**: [`ExternalIdKey`], a `(scheme, id)` pair that
//!   resolves to exactly one account

use std::fmt;
use std::str::FromStr;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
		pub struct $name(i32);

		impl $name {
			/// Wrap a raw numeric ID.
			pub const fn new(id: i32) -> Self {
				Self(id)
			}

			/// Get the raw numeric value.
			pub const fn get(self) -> i32 {
				self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<i32> for $name {
			fn from(id: i32) -> Self {
				Self(id)
			}
		}

		impl From<$name> for i32 {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(AccountId, "Numeric identifier for an account.");
define_id_type!(GroupId, "Numeric identifier for an account group.");

// =============================================================================
// Well-known groups
// =============================================================================

/// The administrators group. Matched by ID only, never by name.
pub const ADMINISTRATORS_GROUP_ID: GroupId = GroupId::new(1);

/// Every account that has signed in at least once.
pub const REGISTERED_USERS_GROUP_ID: GroupId = GroupId::new(2);

/// Any caller, authenticated or not.
pub const ANONYMOUS_USERS_GROUP_ID: GroupId = GroupId::new(3);

// =============================================================================
// External identities
// =============================================================================

/// Namespace an external identity key lives in.
///
/// The host's auth layer can resolve a login through either scheme, so an
/// account provisioned here is bound under both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalIdScheme {
	/// Login name chosen by the account.
	Username,
	/// The server's own built-in authentication realm.
	Native,
}

impl ExternalIdScheme {
	pub fn as_str(&self) -> &'static str {
		match self {
			ExternalIdScheme::Username => "username",
			ExternalIdScheme::Native => "native",
		}
	}
}

impl fmt::Display for ExternalIdScheme {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ExternalIdScheme {
	type Err = ParseExternalIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"username" => Ok(ExternalIdScheme::Username),
			"native" => Ok(ExternalIdScheme::Native),
			other => Err(ParseExternalIdError::UnknownScheme(other.to_string())),
		}
	}
}

/// Error returned when an external identity string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseExternalIdError {
	#[error("unknown external id scheme: {0}")]
	UnknownScheme(String),

	#[error("external id is missing a scheme prefix: {0}")]
	MissingScheme(String),
}

/// A `(scheme, id)` pair. At most one account owns any given key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExternalIdKey {
	pub scheme: ExternalIdScheme,
	pub id: String,
}

impl ExternalIdKey {
	pub fn new(scheme: ExternalIdScheme, id: impl Into<String>) -> Self {
		Self {
			scheme,
			id: id.into(),
		}
	}

	pub fn username(id: impl Into<String>) -> Self {
		Self::new(ExternalIdScheme::Username, id)
	}

	pub fn native(id: impl Into<String>) -> Self {
		Self::new(ExternalIdScheme::Native, id)
	}
}

impl fmt::Display for ExternalIdKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.scheme, self.id)
	}
}

impl FromStr for ExternalIdKey {
	type Err = ParseExternalIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (scheme, id) = s
			.split_once(':')
			.ok_or_else(|| ParseExternalIdError::MissingScheme(s.to_string()))?;
		Ok(Self::new(scheme.parse()?, id))
	}
}
