// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Global and per-user value upserts.
//!
//! An upsert reads the existing row or constructs a new one, applies the
//! write, and persists it, all under [`upsert_with_retry`]. Persisting is an
//! insert for a constructed row and an in-place update for a read one.

use switchboard_flags_core::{FlagId, GlobalValue, Revision, UserValue};

use crate::error::Result;
use crate::repository::{GlobalValueStore, UserValueStore};
use crate::retry::upsert_with_retry;

/// A record produced by the read step of an upsert.
#[derive(Debug, Clone)]
pub struct Staged<T> {
	pub value: T,
	/// Constructed by this attempt rather than read from storage.
	pub is_new: bool,
}

impl<T> Staged<T> {
	pub fn new(value: T) -> Self {
		Self {
			value,
			is_new: true,
		}
	}

	pub fn existing(value: T) -> Self {
		Self {
			value,
			is_new: false,
		}
	}
}

async fn stage_global(
	store: &dyn GlobalValueStore,
	flag_id: FlagId,
	value: bool,
	actor: Option<&str>,
) -> Result<Staged<GlobalValue>> {
	let mut staged = match store.get_global_value(flag_id).await? {
		Some(existing) => Staged::existing(existing),
		None => Staged::new(GlobalValue::new(flag_id)),
	};
	staged.value.apply(value, actor, staged.is_new);
	Ok(staged)
}

async fn persist_global(
	store: &dyn GlobalValueStore,
	staged: Staged<GlobalValue>,
) -> Result<Revision> {
	if staged.is_new {
		store.insert_global_value(&staged.value).await
	} else {
		store.update_global_value(&staged.value).await
	}
}

/// Sets the global value of a flag, returning the revision it produced.
pub async fn upsert_global(
	store: &dyn GlobalValueStore,
	flag_id: FlagId,
	value: bool,
	actor: Option<&str>,
) -> Result<Revision> {
	upsert_with_retry(
		"global value",
		move || stage_global(store, flag_id, value, actor),
		move |staged| persist_global(store, staged),
	)
	.await
}

async fn stage_user(
	store: &dyn UserValueStore,
	flag_id: FlagId,
	user: &str,
	value: bool,
	actor: Option<&str>,
) -> Result<Staged<UserValue>> {
	let mut staged = match store.get_user_value(flag_id, user).await? {
		Some(existing) => Staged::existing(existing),
		None => Staged::new(UserValue::new(flag_id, user)),
	};
	staged.value.apply(value, actor, staged.is_new);
	Ok(staged)
}

async fn persist_user(store: &dyn UserValueStore, staged: Staged<UserValue>) -> Result<Revision> {
	if staged.is_new {
		store.insert_user_value(&staged.value).await
	} else {
		store.update_user_value(&staged.value).await
	}
}

/// Sets one user's value of a flag, returning the revision it produced.
pub async fn upsert_user(
	store: &dyn UserValueStore,
	flag_id: FlagId,
	user: &str,
	value: bool,
	actor: Option<&str>,
) -> Result<Revision> {
	upsert_with_retry(
		"user value",
		move || stage_user(store, flag_id, user, value, actor),
		move |staged| persist_user(store, staged),
	)
	.await
}
