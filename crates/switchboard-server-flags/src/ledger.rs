// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Version ledger: append-only revisions for global and per-user values.
//!
//! Stores append a revision in the same atomic operation that inserts or
//! updates the value it describes, so a value never exists in a state the
//! ledger has not recorded.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use switchboard_flags_core::{
	FlagId, GlobalValue, Revision, RevisionChange, UserValue, ValueId, ValueKind,
};

use crate::error::{FlagsServerError, Result};

/// Read side of the ledger.
#[async_trait]
pub trait RevisionLedger: Send + Sync {
	/// Revisions of one value, oldest first. Empty for unknown ids.
	async fn list_revisions(&self, value_id: ValueId) -> Result<Vec<Revision>>;
}

/// A revision before the ledger has assigned its sequence number.
#[derive(Debug, Clone)]
pub struct PendingRevision {
	pub value_id: ValueId,
	pub kind: ValueKind,
	pub flag_id: FlagId,
	pub user: Option<String>,
	pub value: bool,
	pub change: RevisionChange,
	pub recorded_at: DateTime<Utc>,
	pub actor: Option<String>,
}

impl PendingRevision {
	pub fn for_global(value: &GlobalValue, change: RevisionChange) -> Self {
		Self {
			value_id: value.id,
			kind: ValueKind::Global,
			flag_id: value.flag_id,
			user: None,
			value: value.value,
			change,
			recorded_at: value.updated_at,
			actor: value.updated_by.clone(),
		}
	}

	pub fn for_user(value: &UserValue, change: RevisionChange) -> Self {
		Self {
			value_id: value.id,
			kind: ValueKind::User,
			flag_id: value.flag_id,
			user: Some(value.user.clone()),
			value: value.value,
			change,
			recorded_at: value.updated_at,
			actor: value.updated_by.clone(),
		}
	}

	pub fn into_revision(self, sequence: u64) -> Revision {
		Revision {
			value_id: self.value_id,
			sequence,
			kind: self.kind,
			flag_id: self.flag_id,
			user: self.user,
			value: self.value,
			change: self.change,
			recorded_at: self.recorded_at,
			actor: self.actor,
		}
	}
}

/// Appends a revision inside an open SQLite transaction.
///
/// The `(value_id, sequence)` primary key turns two concurrent appends for
/// the same value into a failed transaction rather than a duplicate.
pub(crate) async fn append_sqlite(
	conn: &mut SqliteConnection,
	pending: PendingRevision,
) -> Result<Revision> {
	let next: i64 = sqlx::query_scalar(
		r#"
		SELECT COALESCE(MAX(sequence), 0) + 1
		FROM flag_value_revisions
		WHERE value_id = ?
		"#,
	)
	.bind(pending.value_id.0.to_string())
	.fetch_one(&mut *conn)
	.await?;

	sqlx::query(
		r#"
		INSERT INTO flag_value_revisions (value_id, sequence, value_kind, flag_id, user_identity,
										  value, change, recorded_at, actor)
		VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
		"#,
	)
	.bind(pending.value_id.0.to_string())
	.bind(next)
	.bind(pending.kind.as_str())
	.bind(pending.flag_id.0.to_string())
	.bind(&pending.user)
	.bind(pending.value)
	.bind(pending.change.as_str())
	.bind(pending.recorded_at.to_rfc3339())
	.bind(&pending.actor)
	.execute(&mut *conn)
	.await?;

	let sequence = u64::try_from(next)
		.map_err(|_| FlagsServerError::Internal("Invalid revision sequence".to_string()))?;
	Ok(pending.into_revision(sequence))
}

/// Appends a revision to an in-memory history.
pub(crate) fn append_memory(history: &mut Vec<Revision>, pending: PendingRevision) -> Revision {
	let revision = pending.into_revision(history.len() as u64 + 1);
	history.push(revision.clone());
	revision
}

#[derive(sqlx::FromRow)]
pub(crate) struct RevisionRow {
	value_id: String,
	sequence: i64,
	value_kind: String,
	flag_id: String,
	user_identity: Option<String>,
	value: bool,
	change: String,
	recorded_at: String,
	actor: Option<String>,
}

impl TryFrom<RevisionRow> for Revision {
	type Error = FlagsServerError;

	fn try_from(row: RevisionRow) -> Result<Self> {
		Ok(Revision {
			value_id: row
				.value_id
				.parse()
				.map_err(|_| FlagsServerError::Internal("Invalid value ID".to_string()))?,
			sequence: u64::try_from(row.sequence)
				.map_err(|_| FlagsServerError::Internal("Invalid revision sequence".to_string()))?,
			kind: row.value_kind.parse()?,
			flag_id: row
				.flag_id
				.parse()
				.map_err(|_| FlagsServerError::Internal("Invalid flag ID".to_string()))?,
			user: row.user_identity,
			value: row.value,
			change: row.change.parse()?,
			recorded_at: chrono::DateTime::parse_from_rfc3339(&row.recorded_at)
				.map_err(|_| FlagsServerError::Internal("Invalid recorded_at".to_string()))?
				.with_timezone(&Utc),
			actor: row.actor,
		})
	}
}
