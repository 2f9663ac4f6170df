// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::FlagId;

/// Unique identifier for a stored override, global or per-user.
///
/// Revisions are keyed by this identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueId(pub Uuid);

impl ValueId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for ValueId {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Display for ValueId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for ValueId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// Override applied to every user without a more specific one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalValue {
	pub id: ValueId,
	pub flag_id: FlagId,
	pub value: bool,
	pub created_at: DateTime<Utc>,
	pub created_by: Option<String>,
	pub updated_at: DateTime<Utc>,
	pub updated_by: Option<String>,
}

impl GlobalValue {
	/// Constructs an unsaved global value, `false` until set.
	pub fn new(flag_id: FlagId) -> Self {
		Self::with_value(flag_id, false)
	}

	pub fn with_value(flag_id: FlagId, value: bool) -> Self {
		let now = Utc::now();
		Self {
			id: ValueId::new(),
			flag_id,
			value,
			created_at: now,
			created_by: None,
			updated_at: now,
			updated_by: None,
		}
	}

	/// Applies a write, stamping the audit columns.
	///
	/// `is_new` marks a value that has not been persisted yet, in which case
	/// the creation columns are stamped as well.
	pub fn apply(&mut self, value: bool, actor: Option<&str>, is_new: bool) {
		let now = Utc::now();
		self.value = value;
		self.updated_at = now;
		self.updated_by = actor.map(str::to_string);
		if is_new {
			self.created_at = now;
			self.created_by = actor.map(str::to_string);
		}
	}
}

/// Override applied to a single user. Takes precedence over [`GlobalValue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserValue {
	pub id: ValueId,
	pub flag_id: FlagId,
	pub user: String,
	pub value: bool,
	pub created_at: DateTime<Utc>,
	pub created_by: Option<String>,
	pub updated_at: DateTime<Utc>,
	pub updated_by: Option<String>,
}

impl UserValue {
	pub fn new(flag_id: FlagId, user: impl Into<String>) -> Self {
		Self::with_value(flag_id, user, false)
	}

	pub fn with_value(flag_id: FlagId, user: impl Into<String>, value: bool) -> Self {
		let now = Utc::now();
		Self {
			id: ValueId::new(),
			flag_id,
			user: user.into(),
			value,
			created_at: now,
			created_by: None,
			updated_at: now,
			updated_by: None,
		}
	}

	pub fn apply(&mut self, value: bool, actor: Option<&str>, is_new: bool) {
		let now = Utc::now();
		self.value = value;
		self.updated_at = now;
		self.updated_by = actor.map(str::to_string);
		if is_new {
			self.created_at = now;
			self.created_by = actor.map(str::to_string);
		}
	}
}
