// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Integration tests for the resolution engine over SQLite.
//!
//! Tests cover:
//! - Precedence of user, global and default values
//! - Lazy flag creation and paged listing, including the empty name
//! - Rejection of zero page sizes
//! - Revision history across toggles and clears
//! - Durability across pool reopen

use std::sync::Arc;

use switchboard_server_db::testing::create_flags_test_pool;
use switchboard_server_db::{create_pool, run_migrations};
use switchboard_server_flags::{
	FlagService, FlagsError, FlagsServerError, RevisionChange, RevisionLedger,
	SqliteFlagsRepository,
};
use tempfile::tempdir;

async fn setup_service() -> (FlagService, Arc<SqliteFlagsRepository>) {
	let pool = create_flags_test_pool().await;
	let repo = Arc::new(SqliteFlagsRepository::new(pool));
	(FlagService::new(repo.clone()), repo)
}

#[tokio::test]
async fn test_user_override_beats_global() {
	let (service, _) = setup_service().await;

	service.set_user("f1", "u1", false).await.unwrap();
	service.set_global("f1", true).await.unwrap();

	assert!(!service.resolve("f1", "u1", true).await.unwrap());
	assert!(service.resolve("f1", "u2", false).await.unwrap());

	assert!(service.clear_user("f1", "u1").await.unwrap());
	assert!(service.resolve("f1", "u1", false).await.unwrap());

	assert!(service.clear_global("f1").await.unwrap());
	assert!(!service.resolve("f1", "u1", false).await.unwrap());
	assert!(service.resolve("f1", "u1", true).await.unwrap());
}

#[tokio::test]
async fn test_reads_register_flags_for_listing() {
	let (service, _) = setup_service().await;

	for name in ["zeta", "alpha", "mid"] {
		service.get_value(name, "u1").await.unwrap();
	}
	service.get_value("alpha", "u2").await.unwrap();

	let first = service.get_flags(None, Some(2)).await.unwrap();
	assert_eq!(first.flags, vec!["alpha", "mid"]);
	assert!(first.cursor.is_none());

	let second = service
		.get_flags(first.next_cursor.as_deref(), Some(2))
		.await
		.unwrap();
	assert_eq!(second.flags, vec!["zeta"]);
	assert!(second.next_cursor.is_none());
}

#[tokio::test]
async fn test_empty_flag_name_is_an_ordinary_flag() {
	let (service, _) = setup_service().await;

	assert!(!service.resolve("", "u1", false).await.unwrap());
	service.set_user("", "u1", true).await.unwrap();
	assert!(service.resolve("", "u1", false).await.unwrap());
	service.create_flag("b").await.unwrap();

	let first = service.get_flags(None, Some(1)).await.unwrap();
	assert_eq!(first.flags, vec![""]);
	let second = service
		.get_flags(first.next_cursor.as_deref(), Some(1))
		.await
		.unwrap();
	assert_eq!(second.flags, vec!["b"]);
}

#[tokio::test]
async fn test_zero_page_size_is_rejected() {
	let (service, _) = setup_service().await;
	service.create_flag("a").await.unwrap();

	let err = service.get_flags(None, Some(0)).await.unwrap_err();
	assert!(matches!(
		err,
		FlagsServerError::Flags(FlagsError::InvalidPageSize(_))
	));
}

#[tokio::test]
async fn test_toggle_history() {
	let (service, repo) = setup_service().await;
	let service = service.with_actor("ops");

	let mut value = false;
	for _ in 0..10 {
		value = !value;
		service.set_global("toggled", value).await.unwrap();
	}

	let history = service.global_history("toggled").await.unwrap();
	assert_eq!(history.len(), 10);
	assert_eq!(history[0].change, RevisionChange::Created);
	assert!(history[0].value);
	assert!(!history[9].value);
	assert!(history.iter().all(|r| r.actor.as_deref() == Some("ops")));
	assert!(history.windows(2).all(|w| w[0].sequence + 1 == w[1].sequence));

	let value_id = history[0].value_id;
	service.clear_global("toggled").await.unwrap();
	assert!(service.global_history("toggled").await.unwrap().is_empty());
	assert_eq!(repo.list_revisions(value_id).await.unwrap().len(), 10);
}

#[tokio::test]
async fn test_clear_all_users_leaves_other_flags() {
	let (service, _) = setup_service().await;

	for user in ["u1", "u2", "u3"] {
		service.set_user("target", user, true).await.unwrap();
	}
	service.set_user("bystander", "u1", true).await.unwrap();

	assert_eq!(service.clear_all_users("target").await.unwrap(), 3);
	assert!(service.user_value("target", "u1").await.unwrap().is_none());
	assert!(service.user_value("bystander", "u1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_values_survive_reopen() {
	let dir = tempdir().unwrap();
	let url = format!("sqlite:{}", dir.path().join("flags.db").display());

	{
		let pool = create_pool(&url).await.unwrap();
		run_migrations(&pool).await.unwrap();
		let service = FlagService::new(Arc::new(SqliteFlagsRepository::new(pool.clone())));
		service.set_global("durable", false).await.unwrap();
		service.set_user("durable", "u1", true).await.unwrap();
		pool.close().await;
	}

	let pool = create_pool(&url).await.unwrap();
	run_migrations(&pool).await.unwrap();
	let service = FlagService::new(Arc::new(SqliteFlagsRepository::new(pool)));

	assert!(service.resolve("durable", "u1", false).await.unwrap());
	assert!(!service.resolve("durable", "u2", true).await.unwrap());
	assert_eq!(service.get_flags(None, None).await.unwrap().flags, vec!["durable"]);
}
