// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlagId(pub Uuid);

impl FlagId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for FlagId {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Display for FlagId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for FlagId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// A named boolean toggle.
///
/// Flags are created lazily the first time any operation references their
/// name and are never updated or removed afterwards. Only their values are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
	pub id: FlagId,
	/// Globally unique, compared byte for byte. Any string is a valid name,
	/// including the empty one.
	pub name: String,
	pub created_at: DateTime<Utc>,
}

impl Flag {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			id: FlagId::new(),
			name: name.into(),
			created_at: Utc::now(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_new_flag_has_fresh_identity() {
		let a = Flag::new("feature.a");
		let b = Flag::new("feature.a");
		assert_eq!(a.name, b.name);
		assert_ne!(a.id, b.id);
	}

	#[test]
	fn test_empty_and_blank_names_are_kept_verbatim() {
		assert_eq!(Flag::new("").name, "");
		assert_eq!(Flag::new(" ").name, " ");
	}

	#[test]
	fn test_flag_id_parse() {
		let id = FlagId::new();
		let parsed: FlagId = id.to_string().parse().unwrap();
		assert_eq!(id, parsed);
		assert!("not-a-uuid".parse::<FlagId>().is_err());
	}

	proptest! {
		#[test]
		fn flag_json_preserves_any_name(name in "\\PC{0,64}") {
			let flag = Flag::new(name.clone());
			let json = serde_json::to_string(&flag).unwrap();
			let back: Flag = serde_json::from_str(&json).unwrap();
			prop_assert_eq!(back.name, name);
			prop_assert_eq!(back.id, flag.id);
		}
	}
}
