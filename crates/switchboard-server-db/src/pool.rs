// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{
	SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};

use crate::error::DbError;

/// How long a writer waits on a locked database before failing. A failure
/// here is what the upsert retry absorbs.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub const MAX_CONNECTIONS: u32 = 8;

fn is_in_memory(database_url: &str) -> bool {
	database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// Opens the flags database.
///
/// On-disk databases run in WAL mode so readers never block the single
/// writer. An in-memory database exists only while a connection holds it,
/// so its pool keeps exactly one connection open for the pool's lifetime.
///
/// # Errors
/// Returns `DbError::Internal` if the URL is invalid, `DbError::Sqlx` if the
/// connection fails.
#[tracing::instrument(skip(database_url))]
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, DbError> {
	let options = SqliteConnectOptions::from_str(database_url)
		.map_err(|e| DbError::Internal(format!("Invalid database URL: {e}")))?
		.foreign_keys(true)
		.busy_timeout(BUSY_TIMEOUT)
		.create_if_missing(true);

	let in_memory = is_in_memory(database_url);
	let pool = if in_memory {
		SqlitePoolOptions::new()
			.max_connections(1)
			.min_connections(1)
			.idle_timeout(None)
			.max_lifetime(None)
			.connect_with(options)
			.await?
	} else {
		SqlitePoolOptions::new()
			.max_connections(MAX_CONNECTIONS)
			.connect_with(
				options
					.journal_mode(SqliteJournalMode::Wal)
					.synchronous(SqliteSynchronous::Normal),
			)
			.await?
	};

	tracing::debug!(in_memory, "database pool created");
	Ok(pool)
}
