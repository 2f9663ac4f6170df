// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FlagsError;
use crate::{FlagId, ValueId};

/// Which store a revisioned value lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
	Global,
	User,
}

impl ValueKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			ValueKind::Global => "global",
			ValueKind::User => "user",
		}
	}
}

impl std::fmt::Display for ValueKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for ValueKind {
	type Err = FlagsError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"global" => Ok(ValueKind::Global),
			"user" => Ok(ValueKind::User),
			_ => Err(FlagsError::InvalidValueKind(s.to_string())),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionChange {
	Created,
	Updated,
}

impl RevisionChange {
	pub fn as_str(&self) -> &'static str {
		match self {
			RevisionChange::Created => "created",
			RevisionChange::Updated => "updated",
		}
	}
}

impl std::fmt::Display for RevisionChange {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for RevisionChange {
	type Err = FlagsError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"created" => Ok(RevisionChange::Created),
			"updated" => Ok(RevisionChange::Updated),
			_ => Err(FlagsError::InvalidRevisionChange(s.to_string())),
		}
	}
}

/// Immutable snapshot of a value at one point in its write history.
///
/// `sequence` starts at 1 for the write that created the value and grows by
/// one for every later update. Revisions outlive the value they describe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
	pub value_id: ValueId,
	pub sequence: u64,
	pub kind: ValueKind,
	pub flag_id: FlagId,
	/// Set for user values only
	pub user: Option<String>,
	pub value: bool,
	pub change: RevisionChange,
	pub recorded_at: DateTime<Utc>,
	pub actor: Option<String>,
}
