// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::instrument;

use switchboard_flags_core::{
	Flag, FlagId, GlobalValue, Revision, RevisionChange, UserValue, ValueId,
};

use crate::error::{FlagsServerError, Result};
use crate::ledger::{self, PendingRevision, RevisionLedger, RevisionRow};

/// Flag lookup and creation.
#[async_trait]
pub trait FlagStore: Send + Sync {
	async fn get_flag_by_name(&self, name: &str) -> Result<Option<Flag>>;

	/// Inserts a flag. Fails with a conflict if the name is already taken.
	async fn create_flag(&self, flag: &Flag) -> Result<()>;

	/// Lists up to `limit` flags in name order, strictly after `after` when given.
	async fn list_flags(&self, after: Option<&str>, limit: u32) -> Result<Vec<Flag>>;
}

/// Access to the global override of each flag.
#[async_trait]
pub trait GlobalValueStore: Send + Sync {
	async fn get_global_value(&self, flag_id: FlagId) -> Result<Option<GlobalValue>>;

	/// Inserts a new global value together with its first revision.
	async fn insert_global_value(&self, value: &GlobalValue) -> Result<Revision>;

	/// Updates an existing global value in place and appends a revision.
	///
	/// Fails with a conflict if the row no longer exists.
	async fn update_global_value(&self, value: &GlobalValue) -> Result<Revision>;

	/// Returns whether a row was removed.
	async fn delete_global_value(&self, flag_id: FlagId) -> Result<bool>;
}

/// Access to per-user overrides.
#[async_trait]
pub trait UserValueStore: Send + Sync {
	async fn get_user_value(&self, flag_id: FlagId, user: &str) -> Result<Option<UserValue>>;

	async fn insert_user_value(&self, value: &UserValue) -> Result<Revision>;

	async fn update_user_value(&self, value: &UserValue) -> Result<Revision>;

	async fn delete_user_value(&self, flag_id: FlagId, user: &str) -> Result<bool>;

	/// Removes every user override of a flag, returning how many were removed.
	async fn delete_user_values(&self, flag_id: FlagId) -> Result<u64>;
}

/// Everything the resolution engine needs from one backend.
pub trait FlagsRepository: FlagStore + GlobalValueStore + UserValueStore + RevisionLedger {}

impl<T> FlagsRepository for T where T: FlagStore + GlobalValueStore + UserValueStore + RevisionLedger {}

/// SQLite implementation of the flags repository.
#[derive(Clone)]
pub struct SqliteFlagsRepository {
	pool: SqlitePool,
}

impl SqliteFlagsRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

/// Maps unique-key violations to [`FlagsServerError::Conflict`].
fn write_error(e: sqlx::Error, what: &str) -> FlagsServerError {
	match &e {
		sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
			FlagsServerError::Conflict(format!("{what} already exists"))
		}
		_ => FlagsServerError::Database(e),
	}
}

#[async_trait]
impl FlagStore for SqliteFlagsRepository {
	#[instrument(skip(self), fields(flag_name = %name))]
	async fn get_flag_by_name(&self, name: &str) -> Result<Option<Flag>> {
		let row = sqlx::query_as::<_, FlagRow>(
			r#"
			SELECT id, name, created_at
			FROM flags
			WHERE name = ?
			"#,
		)
		.bind(name)
		.fetch_optional(&self.pool)
		.await?;

		row.map(TryInto::try_into).transpose()
	}

	#[instrument(skip(self, flag), fields(flag_id = %flag.id, flag_name = %flag.name))]
	async fn create_flag(&self, flag: &Flag) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO flags (id, name, created_at)
			VALUES (?, ?, ?)
			"#,
		)
		.bind(flag.id.0.to_string())
		.bind(&flag.name)
		.bind(flag.created_at.to_rfc3339())
		.execute(&self.pool)
		.await
		.map_err(|e| write_error(e, "flag"))?;

		Ok(())
	}

	#[instrument(skip(self))]
	async fn list_flags(&self, after: Option<&str>, limit: u32) -> Result<Vec<Flag>> {
		let rows = sqlx::query_as::<_, FlagRow>(
			r#"
			SELECT id, name, created_at
			FROM flags
			WHERE ? IS NULL OR name > ?
			ORDER BY name ASC
			LIMIT ?
			"#,
		)
		.bind(after)
		.bind(after)
		.bind(i64::from(limit))
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(TryInto::try_into).collect()
	}
}

#[async_trait]
impl GlobalValueStore for SqliteFlagsRepository {
	#[instrument(skip(self), fields(flag_id = %flag_id))]
	async fn get_global_value(&self, flag_id: FlagId) -> Result<Option<GlobalValue>> {
		let row = sqlx::query_as::<_, GlobalValueRow>(
			r#"
			SELECT id, flag_id, value, created_at, created_by, updated_at, updated_by
			FROM flag_values
			WHERE flag_id = ?
			"#,
		)
		.bind(flag_id.0.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(TryInto::try_into).transpose()
	}

	#[instrument(skip(self, value), fields(value_id = %value.id, flag_id = %value.flag_id))]
	async fn insert_global_value(&self, value: &GlobalValue) -> Result<Revision> {
		let mut tx = self.pool.begin().await?;

		sqlx::query(
			r#"
			INSERT INTO flag_values (id, flag_id, value, created_at, created_by, updated_at, updated_by)
			VALUES (?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(value.id.0.to_string())
		.bind(value.flag_id.0.to_string())
		.bind(value.value)
		.bind(value.created_at.to_rfc3339())
		.bind(&value.created_by)
		.bind(value.updated_at.to_rfc3339())
		.bind(&value.updated_by)
		.execute(&mut *tx)
		.await
		.map_err(|e| write_error(e, "global value"))?;

		let revision = ledger::append_sqlite(
			&mut tx,
			PendingRevision::for_global(value, RevisionChange::Created),
		)
		.await?;

		tx.commit().await?;
		Ok(revision)
	}

	#[instrument(skip(self, value), fields(value_id = %value.id, flag_id = %value.flag_id))]
	async fn update_global_value(&self, value: &GlobalValue) -> Result<Revision> {
		let mut tx = self.pool.begin().await?;

		let result = sqlx::query(
			r#"
			UPDATE flag_values
			SET value = ?, updated_at = ?, updated_by = ?
			WHERE id = ?
			"#,
		)
		.bind(value.value)
		.bind(value.updated_at.to_rfc3339())
		.bind(&value.updated_by)
		.bind(value.id.0.to_string())
		.execute(&mut *tx)
		.await?;

		if result.rows_affected() == 0 {
			return Err(FlagsServerError::Conflict(format!(
				"global value {} was removed concurrently",
				value.id
			)));
		}

		let revision = ledger::append_sqlite(
			&mut tx,
			PendingRevision::for_global(value, RevisionChange::Updated),
		)
		.await?;

		tx.commit().await?;
		Ok(revision)
	}

	#[instrument(skip(self), fields(flag_id = %flag_id))]
	async fn delete_global_value(&self, flag_id: FlagId) -> Result<bool> {
		let result = sqlx::query(
			r#"
			DELETE FROM flag_values WHERE flag_id = ?
			"#,
		)
		.bind(flag_id.0.to_string())
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected() > 0)
	}
}

#[async_trait]
impl UserValueStore for SqliteFlagsRepository {
	#[instrument(skip(self), fields(flag_id = %flag_id, user = %user))]
	async fn get_user_value(&self, flag_id: FlagId, user: &str) -> Result<Option<UserValue>> {
		let row = sqlx::query_as::<_, UserValueRow>(
			r#"
			SELECT id, flag_id, user_identity, value, created_at, created_by, updated_at, updated_by
			FROM flag_user_values
			WHERE flag_id = ? AND user_identity = ?
			"#,
		)
		.bind(flag_id.0.to_string())
		.bind(user)
		.fetch_optional(&self.pool)
		.await?;

		row.map(TryInto::try_into).transpose()
	}

	#[instrument(skip(self, value), fields(value_id = %value.id, flag_id = %value.flag_id, user = %value.user))]
	async fn insert_user_value(&self, value: &UserValue) -> Result<Revision> {
		let mut tx = self.pool.begin().await?;

		sqlx::query(
			r#"
			INSERT INTO flag_user_values (id, flag_id, user_identity, value, created_at, created_by,
										  updated_at, updated_by)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(value.id.0.to_string())
		.bind(value.flag_id.0.to_string())
		.bind(&value.user)
		.bind(value.value)
		.bind(value.created_at.to_rfc3339())
		.bind(&value.created_by)
		.bind(value.updated_at.to_rfc3339())
		.bind(&value.updated_by)
		.execute(&mut *tx)
		.await
		.map_err(|e| write_error(e, "user value"))?;

		let revision =
			ledger::append_sqlite(&mut tx, PendingRevision::for_user(value, RevisionChange::Created))
				.await?;

		tx.commit().await?;
		Ok(revision)
	}

	#[instrument(skip(self, value), fields(value_id = %value.id, flag_id = %value.flag_id, user = %value.user))]
	async fn update_user_value(&self, value: &UserValue) -> Result<Revision> {
		let mut tx = self.pool.begin().await?;

		let result = sqlx::query(
			r#"
			UPDATE flag_user_values
			SET value = ?, updated_at = ?, updated_by = ?
			WHERE id = ?
			"#,
		)
		.bind(value.value)
		.bind(value.updated_at.to_rfc3339())
		.bind(&value.updated_by)
		.bind(value.id.0.to_string())
		.execute(&mut *tx)
		.await?;

		if result.rows_affected() == 0 {
			return Err(FlagsServerError::Conflict(format!(
				"user value {} was removed concurrently",
				value.id
			)));
		}

		let revision =
			ledger::append_sqlite(&mut tx, PendingRevision::for_user(value, RevisionChange::Updated))
				.await?;

		tx.commit().await?;
		Ok(revision)
	}

	#[instrument(skip(self), fields(flag_id = %flag_id, user = %user))]
	async fn delete_user_value(&self, flag_id: FlagId, user: &str) -> Result<bool> {
		let result = sqlx::query(
			r#"
			DELETE FROM flag_user_values WHERE flag_id = ? AND user_identity = ?
			"#,
		)
		.bind(flag_id.0.to_string())
		.bind(user)
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected() > 0)
	}

	#[instrument(skip(self), fields(flag_id = %flag_id))]
	async fn delete_user_values(&self, flag_id: FlagId) -> Result<u64> {
		let result = sqlx::query(
			r#"
			DELETE FROM flag_user_values WHERE flag_id = ?
			"#,
		)
		.bind(flag_id.0.to_string())
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected())
	}
}

#[async_trait]
impl RevisionLedger for SqliteFlagsRepository {
	#[instrument(skip(self), fields(value_id = %value_id))]
	async fn list_revisions(&self, value_id: ValueId) -> Result<Vec<Revision>> {
		let rows = sqlx::query_as::<_, RevisionRow>(
			r#"
			SELECT value_id, sequence, value_kind, flag_id, user_identity, value, change,
				   recorded_at, actor
			FROM flag_value_revisions
			WHERE value_id = ?
			ORDER BY sequence ASC
			"#,
		)
		.bind(value_id.0.to_string())
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(TryInto::try_into).collect()
	}
}

// Database row types for sqlx

fn parse_timestamp(value: &str, field: &str) -> Result<chrono::DateTime<chrono::Utc>> {
	chrono::DateTime::parse_from_rfc3339(value)
		.map_err(|_| FlagsServerError::Internal(format!("Invalid {field}")))
		.map(|dt| dt.with_timezone(&chrono::Utc))
}

#[derive(sqlx::FromRow)]
struct FlagRow {
	id: String,
	name: String,
	created_at: String,
}

impl TryFrom<FlagRow> for Flag {
	type Error = FlagsServerError;

	fn try_from(row: FlagRow) -> Result<Self> {
		Ok(Flag {
			id: row
				.id
				.parse()
				.map_err(|_| FlagsServerError::Internal("Invalid flag ID".to_string()))?,
			name: row.name,
			created_at: parse_timestamp(&row.created_at, "created_at")?,
		})
	}
}

#[derive(sqlx::FromRow)]
struct GlobalValueRow {
	id: String,
	flag_id: String,
	value: bool,
	created_at: String,
	created_by: Option<String>,
	updated_at: String,
	updated_by: Option<String>,
}

impl TryFrom<GlobalValueRow> for GlobalValue {
	type Error = FlagsServerError;

	fn try_from(row: GlobalValueRow) -> Result<Self> {
		Ok(GlobalValue {
			id: row
				.id
				.parse()
				.map_err(|_| FlagsServerError::Internal("Invalid value ID".to_string()))?,
			flag_id: row
				.flag_id
				.parse()
				.map_err(|_| FlagsServerError::Internal("Invalid flag ID".to_string()))?,
			value: row.value,
			created_at: parse_timestamp(&row.created_at, "created_at")?,
			created_by: row.created_by,
			updated_at: parse_timestamp(&row.updated_at, "updated_at")?,
			updated_by: row.updated_by,
		})
	}
}

#[derive(sqlx::FromRow)]
struct UserValueRow {
	id: String,
	flag_id: String,
	user_identity: String,
	value: bool,
	created_at: String,
	created_by: Option<String>,
	updated_at: String,
	updated_by: Option<String>,
}

impl TryFrom<UserValueRow> for UserValue {
	type Error = FlagsServerError;

	fn try_from(row: UserValueRow) -> Result<Self> {
		Ok(UserValue {
			id: row
				.id
				.parse()
				.map_err(|_| FlagsServerError::Internal("Invalid value ID".to_string()))?,
			flag_id: row
				.flag_id
				.parse()
				.map_err(|_| FlagsServerError::Internal("Invalid flag ID".to_string()))?,
			user: row.user_identity,
			value: row.value,
			created_at: parse_timestamp(&row.created_at, "created_at")?,
			created_by: row.created_by,
			updated_at: parse_timestamp(&row.updated_at, "updated_at")?,
			updated_by: row.updated_by,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use switchboard_flags_core::ValueKind;
	use switchboard_server_db::testing::create_flags_test_pool;

	async fn make_repo() -> SqliteFlagsRepository {
		SqliteFlagsRepository::new(create_flags_test_pool().await)
	}

	async fn make_flag(repo: &SqliteFlagsRepository, name: &str) -> Flag {
		let flag = Flag::new(name);
		repo.create_flag(&flag).await.unwrap();
		flag
	}

	#[tokio::test]
	async fn test_create_and_get_flag() {
		let repo = make_repo().await;
		let flag = make_flag(&repo, "checkout.v2").await;

		let found = repo.get_flag_by_name("checkout.v2").await.unwrap().unwrap();
		assert_eq!(found.id, flag.id);
		assert_eq!(found.name, "checkout.v2");
		assert!(repo.get_flag_by_name("missing").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_duplicate_flag_name_conflicts() {
		let repo = make_repo().await;
		make_flag(&repo, "dup").await;

		let err = repo.create_flag(&Flag::new("dup")).await.unwrap_err();
		assert!(matches!(err, FlagsServerError::Conflict(_)));
	}

	#[tokio::test]
	async fn test_list_flags_in_name_order_after_key() {
		let repo = make_repo().await;
		for name in ["gamma", "alpha", "beta", "delta"] {
			make_flag(&repo, name).await;
		}

		let first: Vec<String> = repo
			.list_flags(None, 3)
			.await
			.unwrap()
			.into_iter()
			.map(|f| f.name)
			.collect();
		assert_eq!(first, vec!["alpha", "beta", "delta"]);

		let rest: Vec<String> = repo
			.list_flags(Some("delta"), 3)
			.await
			.unwrap()
			.into_iter()
			.map(|f| f.name)
			.collect();
		assert_eq!(rest, vec!["gamma"]);
	}

	#[tokio::test]
	async fn test_global_value_insert_update_delete() {
		let repo = make_repo().await;
		let flag = make_flag(&repo, "global").await;

		let mut value = GlobalValue::new(flag.id);
		value.apply(true, Some("alice"), true);
		let created = repo.insert_global_value(&value).await.unwrap();
		assert_eq!(created.sequence, 1);
		assert_eq!(created.change, RevisionChange::Created);

		let mut stored = repo.get_global_value(flag.id).await.unwrap().unwrap();
		assert!(stored.value);
		assert_eq!(stored.created_by.as_deref(), Some("alice"));

		stored.apply(false, Some("bob"), false);
		let updated = repo.update_global_value(&stored).await.unwrap();
		assert_eq!(updated.sequence, 2);
		assert_eq!(updated.actor.as_deref(), Some("bob"));

		let stored = repo.get_global_value(flag.id).await.unwrap().unwrap();
		assert!(!stored.value);
		assert_eq!(stored.created_by.as_deref(), Some("alice"));
		assert_eq!(stored.updated_by.as_deref(), Some("bob"));

		assert!(repo.delete_global_value(flag.id).await.unwrap());
		assert!(!repo.delete_global_value(flag.id).await.unwrap());
		assert!(repo.get_global_value(flag.id).await.unwrap().is_none());

		// History survives the delete.
		let revisions = repo.list_revisions(stored.id).await.unwrap();
		assert_eq!(revisions.len(), 2);
		assert_eq!(revisions[0].kind, ValueKind::Global);
		assert!(revisions[0].value);
		assert!(!revisions[1].value);
	}

	#[tokio::test]
	async fn test_second_global_value_for_flag_conflicts() {
		let repo = make_repo().await;
		let flag = make_flag(&repo, "racy").await;

		repo
			.insert_global_value(&GlobalValue::with_value(flag.id, true))
			.await
			.unwrap();
		let err = repo
			.insert_global_value(&GlobalValue::with_value(flag.id, false))
			.await
			.unwrap_err();
		assert!(matches!(err, FlagsServerError::Conflict(_)));

		// The failed insert left neither a row change nor a revision behind.
		let stored = repo.get_global_value(flag.id).await.unwrap().unwrap();
		assert!(stored.value);
		assert_eq!(repo.list_revisions(stored.id).await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_update_of_removed_value_conflicts() {
		let repo = make_repo().await;
		let flag = make_flag(&repo, "gone").await;

		let value = GlobalValue::with_value(flag.id, true);
		repo.insert_global_value(&value).await.unwrap();
		repo.delete_global_value(flag.id).await.unwrap();

		let err = repo.update_global_value(&value).await.unwrap_err();
		assert!(matches!(err, FlagsServerError::Conflict(_)));
		assert_eq!(repo.list_revisions(value.id).await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_user_values_scoped_by_flag_and_user() {
		let repo = make_repo().await;
		let flag = make_flag(&repo, "users").await;
		let other = make_flag(&repo, "other").await;

		for user in ["u1", "u2", "u3"] {
			repo
				.insert_user_value(&UserValue::with_value(flag.id, user, true))
				.await
				.unwrap();
		}
		repo
			.insert_user_value(&UserValue::with_value(other.id, "u1", false))
			.await
			.unwrap();

		let u2 = repo.get_user_value(flag.id, "u2").await.unwrap().unwrap();
		assert_eq!(u2.user, "u2");
		assert!(u2.value);

		let dup = repo
			.insert_user_value(&UserValue::with_value(flag.id, "u2", false))
			.await
			.unwrap_err();
		assert!(matches!(dup, FlagsServerError::Conflict(_)));

		assert!(repo.delete_user_value(flag.id, "u1").await.unwrap());
		assert!(!repo.delete_user_value(flag.id, "u1").await.unwrap());
		assert_eq!(repo.delete_user_values(flag.id).await.unwrap(), 2);
		assert!(repo.get_user_value(flag.id, "u3").await.unwrap().is_none());

		// Other flags are untouched.
		assert!(repo.get_user_value(other.id, "u1").await.unwrap().is_some());
	}

	#[tokio::test]
	async fn test_user_value_revisions() {
		let repo = make_repo().await;
		let flag = make_flag(&repo, "history").await;

		let mut value = UserValue::new(flag.id, "u1");
		value.apply(true, None, true);
		repo.insert_user_value(&value).await.unwrap();
		value.apply(false, Some("ops"), false);
		repo.update_user_value(&value).await.unwrap();

		let revisions = repo.list_revisions(value.id).await.unwrap();
		assert_eq!(revisions.len(), 2);
		assert_eq!(revisions[0].kind, ValueKind::User);
		assert_eq!(revisions[0].user.as_deref(), Some("u1"));
		assert_eq!(revisions[0].change, RevisionChange::Created);
		assert_eq!(revisions[1].change, RevisionChange::Updated);
		assert_eq!(revisions[1].actor.as_deref(), Some("ops"));
		assert!(repo.list_revisions(ValueId::new()).await.unwrap().is_empty());
	}
}
