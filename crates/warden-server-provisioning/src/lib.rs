// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Administrator account bootstrap.
//!
//! On start the [`AdminBootstrapListener`] reads an optional SSH public key and
//! asks the [`AdminProvisioner`] to make sure the administrator account exists.
//! Failures are logged and never stop the server from starting.

pub mod bootstrap;
pub mod credential;
pub mod error;
pub mod listener;

pub use bootstrap::{AdminProvisioner, ProvisionReport};
pub use credential::{public_key_path, read_public_key, PublicKeySource, DEFAULT_PUBLIC_KEY_FILE};
pub use error::{CredentialError, ProvisioningError};
pub use listener::{AdminBootstrapListener, LifecycleListener, DEFAULT_ADMIN_USERNAME};
