// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resolution engine.
//!
//! Resolution order for a (flag, user) pair:
//! 1. The user's override, if any
//! 2. The flag's global override, if any
//! 3. The caller-supplied default
//!
//! Every operation first ensures the flag exists, so any name a caller has
//! referenced shows up in [`FlagService::get_flags`].

use std::sync::Arc;

use switchboard_flags_core::{
	FlagId, FlagPage, GlobalValue, PageLimits, Revision, UserValue,
};
use tracing::{debug, instrument};

use crate::directory;
use crate::error::Result;
use crate::ledger::RevisionLedger;
use crate::repository::{FlagStore, FlagsRepository, GlobalValueStore, UserValueStore};
use crate::values;

#[derive(Clone)]
pub struct FlagService {
	flags: Arc<dyn FlagStore>,
	globals: Arc<dyn GlobalValueStore>,
	users: Arc<dyn UserValueStore>,
	ledger: Arc<dyn RevisionLedger>,
	limits: PageLimits,
	actor: Option<String>,
}

impl FlagService {
	/// Builds a service over a single backend.
	pub fn new<R>(repository: Arc<R>) -> Self
	where
		R: FlagsRepository + 'static,
	{
		Self::from_stores(
			repository.clone(),
			repository.clone(),
			repository.clone(),
			repository,
		)
	}

	/// Builds a service from separately provided storage contracts.
	pub fn from_stores(
		flags: Arc<dyn FlagStore>,
		globals: Arc<dyn GlobalValueStore>,
		users: Arc<dyn UserValueStore>,
		ledger: Arc<dyn RevisionLedger>,
	) -> Self {
		Self {
			flags,
			globals,
			users,
			ledger,
			limits: PageLimits::default(),
			actor: None,
		}
	}

	pub fn with_page_limits(mut self, limits: PageLimits) -> Self {
		self.limits = limits;
		self
	}

	/// Records `actor` on every value this service writes.
	pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
		self.actor = Some(actor.into());
		self
	}

	pub fn actor(&self) -> Option<&str> {
		self.actor.as_deref()
	}

	async fn ensure(&self, flag_name: &str) -> Result<FlagId> {
		directory::ensure_flag(self.flags.as_ref(), flag_name).await
	}

	/// Makes a flag discoverable before any value is set.
	#[instrument(skip(self))]
	pub async fn create_flag(&self, flag_name: &str) -> Result<()> {
		self.ensure(flag_name).await?;
		Ok(())
	}

	/// Lists flag names in name order. `limit` is capped by the page limits
	/// and a limit of zero is rejected.
	#[instrument(skip(self))]
	pub async fn get_flags(&self, cursor: Option<&str>, limit: Option<u32>) -> Result<FlagPage> {
		let limit = self.limits.clamp(limit)?;
		directory::list_flags(self.flags.as_ref(), cursor, limit).await
	}

	/// Resolves a flag for a user, falling back to `default` when neither a
	/// user nor a global override exists. Nothing is written for the default.
	#[instrument(skip(self))]
	pub async fn resolve(&self, flag_name: &str, user: &str, default: bool) -> Result<bool> {
		let flag_id = self.ensure(flag_name).await?;

		if let Some(value) = self.users.get_user_value(flag_id, user).await? {
			debug!(value = value.value, "resolved from user override");
			return Ok(value.value);
		}

		if let Some(value) = self.globals.get_global_value(flag_id).await? {
			debug!(value = value.value, "resolved from global override");
			return Ok(value.value);
		}

		debug!(value = default, "resolved from default");
		Ok(default)
	}

	/// Resolves with an implicit default of `true`.
	pub async fn get_value(&self, flag_name: &str, user: &str) -> Result<bool> {
		self.resolve(flag_name, user, true).await
	}

	#[deprecated(note = "use `resolve`")]
	pub async fn get_flag(&self, flag_name: &str, user: &str, default: bool) -> Result<bool> {
		self.resolve(flag_name, user, default).await
	}

	/// Sets the global override, returning the revision it produced.
	#[instrument(skip(self))]
	pub async fn set_global(&self, flag_name: &str, value: bool) -> Result<Revision> {
		let flag_id = self.ensure(flag_name).await?;
		values::upsert_global(self.globals.as_ref(), flag_id, value, self.actor()).await
	}

	/// Sets a user override, returning the revision it produced.
	#[instrument(skip(self))]
	pub async fn set_user(&self, flag_name: &str, user: &str, value: bool) -> Result<Revision> {
		let flag_id = self.ensure(flag_name).await?;
		values::upsert_user(self.users.as_ref(), flag_id, user, value, self.actor()).await
	}

	/// Removes the global override. Returns whether one existed.
	#[instrument(skip(self))]
	pub async fn clear_global(&self, flag_name: &str) -> Result<bool> {
		let flag_id = self.ensure(flag_name).await?;
		self.globals.delete_global_value(flag_id).await
	}

	/// Removes one user's override. Returns whether one existed.
	#[instrument(skip(self))]
	pub async fn clear_user(&self, flag_name: &str, user: &str) -> Result<bool> {
		let flag_id = self.ensure(flag_name).await?;
		self.users.delete_user_value(flag_id, user).await
	}

	/// Removes every user override of a flag. Returns how many were removed.
	#[instrument(skip(self))]
	pub async fn clear_all_users(&self, flag_name: &str) -> Result<u64> {
		let flag_id = self.ensure(flag_name).await?;
		self.users.delete_user_values(flag_id).await
	}

	pub async fn global_value(&self, flag_name: &str) -> Result<Option<GlobalValue>> {
		let flag_id = self.ensure(flag_name).await?;
		self.globals.get_global_value(flag_id).await
	}

	pub async fn user_value(&self, flag_name: &str, user: &str) -> Result<Option<UserValue>> {
		let flag_id = self.ensure(flag_name).await?;
		self.users.get_user_value(flag_id, user).await
	}

	/// Revisions of the live global value, oldest first.
	///
	/// Empty when the flag has no global value. History of a cleared value is
	/// still reachable through [`RevisionLedger::list_revisions`].
	#[instrument(skip(self))]
	pub async fn global_history(&self, flag_name: &str) -> Result<Vec<Revision>> {
		match self.global_value(flag_name).await? {
			Some(value) => self.ledger.list_revisions(value.id).await,
			None => Ok(Vec::new()),
		}
	}

	/// Revisions of one user's live value, oldest first.
	#[instrument(skip(self))]
	pub async fn user_history(&self, flag_name: &str, user: &str) -> Result<Vec<Revision>> {
		match self.user_value(flag_name, user).await? {
			Some(value) => self.ledger.list_revisions(value.id).await,
			None => Ok(Vec::new()),
		}
	}
}
