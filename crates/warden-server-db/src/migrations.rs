// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Schema for the account tables.
//!
//! The tables mirror what the review server owns: accounts, their external
//! identities and SSH keys, and internal group membership with an audit trail.
//! The well-known groups are seeded here, never by the provisioner.

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

const MIGRATIONS: &[(&str, &str)] = &[
	("001_accounts", include_str!("../migrations/001_accounts.sql")),
	("002_groups", include_str!("../migrations/002_groups.sql")),
];

/// Run all account schema migrations.
///
/// # Errors
/// Returns `DbError::Sqlx` if a statement fails.
///
/// # Note
/// Migrations are idempotent - safe to run multiple times.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	for (name, sql) in MIGRATIONS {
		for stmt in sql.split(';').filter(|s| !s.trim().is_empty()) {
			sqlx::query(stmt).execute(pool).await?;
		}
		tracing::debug!(migration = name, "migration applied");
	}

	tracing::info!(count = MIGRATIONS.len(), "database migrations complete");
	Ok(())
}
