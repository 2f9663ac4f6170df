// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Flag directory: name to identity, with lazy creation.

use switchboard_flags_core::{Flag, FlagCursor, FlagId, FlagPage, FlagsError};
use tracing::{debug, info};

use crate::error::Result;
use crate::repository::FlagStore;
use crate::retry::upsert_with_retry;
use crate::values::Staged;

async fn stage_flag(store: &dyn FlagStore, name: &str) -> Result<Staged<Flag>> {
	Ok(match store.get_flag_by_name(name).await? {
		Some(flag) => Staged::existing(flag),
		None => Staged::new(Flag::new(name)),
	})
}

async fn persist_flag(store: &dyn FlagStore, staged: Staged<Flag>) -> Result<FlagId> {
	if staged.is_new {
		store.create_flag(&staged.value).await?;
		info!(flag_id = %staged.value.id, flag_name = %staged.value.name, "flag created");
	}
	Ok(staged.value.id)
}

/// Returns the identity of `name`, creating the flag if it does not exist.
///
/// Any string is a name, the empty one included. A creator that loses a race
/// for the same new name re-reads on its retry and returns the winner's
/// identity.
pub async fn ensure_flag(store: &dyn FlagStore, name: &str) -> Result<FlagId> {
	upsert_with_retry(
		"flag",
		move || stage_flag(store, name),
		move |staged| persist_flag(store, staged),
	)
	.await
}

/// Lists one page of at most `limit` flag names in name order.
pub async fn list_flags(store: &dyn FlagStore, cursor: Option<&str>, limit: u32) -> Result<FlagPage> {
	if limit == 0 {
		return Err(FlagsError::InvalidPageSize("page size must be at least 1".to_string()).into());
	}
	let position = FlagCursor::parse(cursor)?;
	let after = position.as_ref().map(|c| c.after.as_str());

	let rows = store.list_flags(after, limit.saturating_add(1)).await?;
	debug!(rows = rows.len(), limit, "listed flags");

	Ok(FlagPage::from_rows(
		rows.into_iter().map(|f| f.name).collect(),
		limit,
		cursor.filter(|c| !c.is_empty()).map(str::to_string),
	))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::FlagsServerError;
	use crate::memory::InMemoryFlagsRepository;
	use async_trait::async_trait;
	use std::sync::atomic::{AtomicBool, Ordering};

	#[tokio::test]
	async fn test_ensure_creates_once() {
		let repo = InMemoryFlagsRepository::new();
		let first = ensure_flag(&repo, "f1").await.unwrap();
		let second = ensure_flag(&repo, "f1").await.unwrap();
		assert_eq!(first, second);
		assert_eq!(repo.list_flags(None, 10).await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_ensure_accepts_empty_name() {
		let repo = InMemoryFlagsRepository::new();
		let first = ensure_flag(&repo, "").await.unwrap();
		let second = ensure_flag(&repo, "").await.unwrap();
		assert_eq!(first, second);

		ensure_flag(&repo, "a").await.unwrap();
		let page = list_flags(&repo, None, 10).await.unwrap();
		assert_eq!(page.flags, vec!["", "a"]);
	}

	#[tokio::test]
	async fn test_list_rejects_zero_limit() {
		let repo = InMemoryFlagsRepository::new();
		ensure_flag(&repo, "a").await.unwrap();

		let err = list_flags(&repo, None, 0).await.unwrap_err();
		assert!(matches!(
			err,
			FlagsServerError::Flags(FlagsError::InvalidPageSize(_))
		));
	}

	/// Lets a rival creator win between this caller's read and its insert.
	struct RacingFlagStore {
		inner: InMemoryFlagsRepository,
		raced: AtomicBool,
	}

	#[async_trait]
	impl FlagStore for RacingFlagStore {
		async fn get_flag_by_name(&self, name: &str) -> Result<Option<Flag>> {
			self.inner.get_flag_by_name(name).await
		}

		async fn create_flag(&self, flag: &Flag) -> Result<()> {
			if !self.raced.swap(true, Ordering::SeqCst) {
				self.inner.create_flag(&Flag::new(flag.name.clone())).await?;
			}
			self.inner.create_flag(flag).await
		}

		async fn list_flags(&self, after: Option<&str>, limit: u32) -> Result<Vec<Flag>> {
			self.inner.list_flags(after, limit).await
		}
	}

	#[tokio::test]
	async fn test_ensure_adopts_race_winner() {
		let store = RacingFlagStore {
			inner: InMemoryFlagsRepository::new(),
			raced: AtomicBool::new(false),
		};

		let id = ensure_flag(&store, "contended").await.unwrap();
		let winner = store.get_flag_by_name("contended").await.unwrap().unwrap();
		assert_eq!(id, winner.id);
		assert_eq!(store.list_flags(None, 10).await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_list_pages_through_all_flags() {
		let repo = InMemoryFlagsRepository::new();
		for name in ["e", "a", "d", "b", "c"] {
			ensure_flag(&repo, name).await.unwrap();
		}

		let mut seen = Vec::new();
		let mut cursor: Option<String> = None;
		loop {
			let page = list_flags(&repo, cursor.as_deref(), 2).await.unwrap();
			assert!(page.flags.len() <= 2);
			seen.extend(page.flags);
			match page.next_cursor {
				Some(next) => cursor = Some(next),
				None => break,
			}
		}
		assert_eq!(seen, vec!["a", "b", "c", "d", "e"]);
	}

	#[tokio::test]
	async fn test_list_rejects_bad_cursor() {
		let repo = InMemoryFlagsRepository::new();
		let err = list_flags(&repo, Some("%%%"), 2).await.unwrap_err();
		assert!(matches!(
			err,
			FlagsServerError::Flags(FlagsError::InvalidCursor(_))
		));
	}
}
