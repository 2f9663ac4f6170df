// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory flags repository.
//!
//! Behaves like the SQLite backend, including unique-key conflicts, so the
//! resolution engine can be exercised without a database.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use switchboard_flags_core::{
	Flag, FlagId, GlobalValue, Revision, RevisionChange, UserValue, ValueId,
};

use crate::error::{FlagsServerError, Result};
use crate::ledger::{self, PendingRevision, RevisionLedger};
use crate::repository::{FlagStore, GlobalValueStore, UserValueStore};

#[derive(Default)]
struct MemoryState {
	/// Keyed by name so listing is in name order.
	flags: BTreeMap<String, Flag>,
	globals: HashMap<FlagId, GlobalValue>,
	users: HashMap<(FlagId, String), UserValue>,
	revisions: HashMap<ValueId, Vec<Revision>>,
}

#[derive(Default)]
pub struct InMemoryFlagsRepository {
	state: Mutex<MemoryState>,
}

impl InMemoryFlagsRepository {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl FlagStore for InMemoryFlagsRepository {
	async fn get_flag_by_name(&self, name: &str) -> Result<Option<Flag>> {
		Ok(self.state.lock().await.flags.get(name).cloned())
	}

	async fn create_flag(&self, flag: &Flag) -> Result<()> {
		let mut state = self.state.lock().await;
		if state.flags.contains_key(&flag.name) {
			return Err(FlagsServerError::Conflict("flag already exists".to_string()));
		}
		state.flags.insert(flag.name.clone(), flag.clone());
		Ok(())
	}

	async fn list_flags(&self, after: Option<&str>, limit: u32) -> Result<Vec<Flag>> {
		let state = self.state.lock().await;
		Ok(
			state
				.flags
				.values()
				.filter(|f| after.map_or(true, |a| f.name.as_str() > a))
				.take(limit as usize)
				.cloned()
				.collect(),
		)
	}
}

#[async_trait]
impl GlobalValueStore for InMemoryFlagsRepository {
	async fn get_global_value(&self, flag_id: FlagId) -> Result<Option<GlobalValue>> {
		Ok(self.state.lock().await.globals.get(&flag_id).cloned())
	}

	async fn insert_global_value(&self, value: &GlobalValue) -> Result<Revision> {
		let mut state = self.state.lock().await;
		if state.globals.contains_key(&value.flag_id) {
			return Err(FlagsServerError::Conflict(
				"global value already exists".to_string(),
			));
		}
		state.globals.insert(value.flag_id, value.clone());
		let history = state.revisions.entry(value.id).or_default();
		Ok(ledger::append_memory(
			history,
			PendingRevision::for_global(value, RevisionChange::Created),
		))
	}

	async fn update_global_value(&self, value: &GlobalValue) -> Result<Revision> {
		let mut state = self.state.lock().await;
		match state.globals.get_mut(&value.flag_id) {
			Some(existing) if existing.id == value.id => *existing = value.clone(),
			_ => {
				return Err(FlagsServerError::Conflict(format!(
					"global value {} was removed concurrently",
					value.id
				)))
			}
		}
		let history = state.revisions.entry(value.id).or_default();
		Ok(ledger::append_memory(
			history,
			PendingRevision::for_global(value, RevisionChange::Updated),
		))
	}

	async fn delete_global_value(&self, flag_id: FlagId) -> Result<bool> {
		Ok(self.state.lock().await.globals.remove(&flag_id).is_some())
	}
}

#[async_trait]
impl UserValueStore for InMemoryFlagsRepository {
	async fn get_user_value(&self, flag_id: FlagId, user: &str) -> Result<Option<UserValue>> {
		let state = self.state.lock().await;
		Ok(state.users.get(&(flag_id, user.to_string())).cloned())
	}

	async fn insert_user_value(&self, value: &UserValue) -> Result<Revision> {
		let mut state = self.state.lock().await;
		let key = (value.flag_id, value.user.clone());
		if state.users.contains_key(&key) {
			return Err(FlagsServerError::Conflict("user value already exists".to_string()));
		}
		state.users.insert(key, value.clone());
		let history = state.revisions.entry(value.id).or_default();
		Ok(ledger::append_memory(
			history,
			PendingRevision::for_user(value, RevisionChange::Created),
		))
	}

	async fn update_user_value(&self, value: &UserValue) -> Result<Revision> {
		let mut state = self.state.lock().await;
		match state.users.get_mut(&(value.flag_id, value.user.clone())) {
			Some(existing) if existing.id == value.id => *existing = value.clone(),
			_ => {
				return Err(FlagsServerError::Conflict(format!(
					"user value {} was removed concurrently",
					value.id
				)))
			}
		}
		let history = state.revisions.entry(value.id).or_default();
		Ok(ledger::append_memory(
			history,
			PendingRevision::for_user(value, RevisionChange::Updated),
		))
	}

	async fn delete_user_value(&self, flag_id: FlagId, user: &str) -> Result<bool> {
		let mut state = self.state.lock().await;
		Ok(state.users.remove(&(flag_id, user.to_string())).is_some())
	}

	async fn delete_user_values(&self, flag_id: FlagId) -> Result<u64> {
		let mut state = self.state.lock().await;
		let before = state.users.len();
		state.users.retain(|(id, _), _| *id != flag_id);
		Ok((before - state.users.len()) as u64)
	}
}

#[async_trait]
impl RevisionLedger for InMemoryFlagsRepository {
	async fn list_revisions(&self, value_id: ValueId) -> Result<Vec<Revision>> {
		let state = self.state.lock().await;
		Ok(state.revisions.get(&value_id).cloned().unwrap_or_default())
	}
}
