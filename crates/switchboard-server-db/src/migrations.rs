// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Schema for flags, their overrides, and the revision ledger.
//!
//! The unique indexes on `flag_values(flag_id)` and
//! `flag_user_values(flag_id, user_identity)` back up the read-before-write
//! uniqueness enforced by the resolution engine: a writer that loses a
//! creation race fails here and retries against the winner's row.

use sqlx::SqlitePool;

use crate::error::{DbError, Result};

const MIGRATIONS: &[(&str, &str)] = &[
	(
		"create_flags",
		r#"
		CREATE TABLE IF NOT EXISTS flags (
			id TEXT PRIMARY KEY NOT NULL,
			name TEXT NOT NULL UNIQUE,
			created_at TEXT NOT NULL
		)
		"#,
	),
	(
		"create_flag_values",
		r#"
		CREATE TABLE IF NOT EXISTS flag_values (
			id TEXT PRIMARY KEY NOT NULL,
			flag_id TEXT NOT NULL REFERENCES flags(id),
			value INTEGER NOT NULL,
			created_at TEXT NOT NULL,
			created_by TEXT,
			updated_at TEXT NOT NULL,
			updated_by TEXT,
			UNIQUE (flag_id)
		)
		"#,
	),
	(
		"create_flag_user_values",
		r#"
		CREATE TABLE IF NOT EXISTS flag_user_values (
			id TEXT PRIMARY KEY NOT NULL,
			flag_id TEXT NOT NULL REFERENCES flags(id),
			user_identity TEXT NOT NULL,
			value INTEGER NOT NULL,
			created_at TEXT NOT NULL,
			created_by TEXT,
			updated_at TEXT NOT NULL,
			updated_by TEXT,
			UNIQUE (flag_id, user_identity)
		)
		"#,
	),
	(
		"create_flag_value_revisions",
		r#"
		CREATE TABLE IF NOT EXISTS flag_value_revisions (
			value_id TEXT NOT NULL,
			sequence INTEGER NOT NULL,
			value_kind TEXT NOT NULL CHECK (value_kind IN ('global', 'user')),
			flag_id TEXT NOT NULL,
			user_identity TEXT,
			value INTEGER NOT NULL,
			change TEXT NOT NULL CHECK (change IN ('created', 'updated')),
			recorded_at TEXT NOT NULL,
			actor TEXT,
			PRIMARY KEY (value_id, sequence)
		)
		"#,
	),
	(
		"index_flag_value_revisions_flag",
		"CREATE INDEX IF NOT EXISTS idx_flag_value_revisions_flag ON flag_value_revisions(flag_id)",
	),
];

/// Applies the flags schema. Safe to run on every startup.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
	for &(name, sql) in MIGRATIONS {
		sqlx::query(sql)
			.execute(pool)
			.await
			.map_err(|source| DbError::Migration { name, source })?;
		tracing::trace!(migration = name, "migration applied");
	}

	tracing::debug!(count = MIGRATIONS.len(), "database migrations complete");
	Ok(())
}
