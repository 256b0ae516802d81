// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database layer for Warden server.

pub mod account;
pub mod cache;
pub mod error;
pub mod group_backend;
pub mod migrations;
pub mod pool;
pub mod testing;

pub use account::{AccountRepository, AccountSession, AccountStore, SqliteAccountSession};
pub use cache::{AccountCache, AccountState, MemoryAccountCache};
pub use error::{DbError, Result};
pub use group_backend::InternalGroupBackend;
pub use migrations::run_migrations;
pub use pool::create_pool;
