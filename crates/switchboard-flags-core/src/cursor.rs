// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cursor pagination for flag listings.
//!
//! Flags are listed in name order. A cursor records the last name of the
//! previous page, so the next page starts strictly after it. Cursors are
//! URL-safe base64 over a small JSON document and must be treated as opaque.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

use crate::error::{FlagsError, Result};

/// Position in a name-ordered flag listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagCursor {
	pub after: String,
}

impl FlagCursor {
	pub fn after(name: impl Into<String>) -> Self {
		Self { after: name.into() }
	}

	pub fn encode(&self) -> String {
		// Serializing a single string field cannot fail.
		let json = serde_json::to_vec(self).unwrap_or_default();
		URL_SAFE_NO_PAD.encode(json)
	}

	pub fn decode(token: &str) -> Result<Self> {
		let bytes = URL_SAFE_NO_PAD
			.decode(token)
			.map_err(|e| FlagsError::InvalidCursor(format!("not base64: {e}")))?;
		serde_json::from_slice(&bytes)
			.map_err(|e| FlagsError::InvalidCursor(format!("malformed cursor: {e}")))
	}

	/// Parses an incoming cursor. Absent and empty tokens both mean "first page".
	pub fn parse(token: Option<&str>) -> Result<Option<Self>> {
		match token {
			None => Ok(None),
			Some(t) if t.is_empty() => Ok(None),
			Some(t) => Self::decode(t).map(Some),
		}
	}
}

/// One page of flag names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagPage {
	pub flags: Vec<String>,
	/// The cursor this page was requested with
	pub cursor: Option<String>,
	/// None when this is the last page
	pub next_cursor: Option<String>,
}

impl FlagPage {
	/// Builds a page from up to `limit + 1` ordered names.
	///
	/// Callers fetch one row more than they return; its presence is what
	/// signals that another page exists.
	pub fn from_rows(mut rows: Vec<String>, limit: u32, cursor: Option<String>) -> Self {
		let limit = limit as usize;
		let next_cursor = if rows.len() > limit {
			rows.truncate(limit);
			rows.last().map(|name| FlagCursor::after(name.clone()).encode())
		} else {
			None
		};

		Self {
			flags: rows,
			cursor,
			next_cursor,
		}
	}
}

/// Bounds applied to caller-supplied page sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
	pub default_page_size: u32,
	pub max_page_size: u32,
}

impl Default for PageLimits {
	fn default() -> Self {
		Self {
			default_page_size: 50,
			max_page_size: 500,
		}
	}
}

impl PageLimits {
	/// Resolves a requested page size: a missing limit takes the default and
	/// anything above the maximum is capped. A size of zero is rejected.
	pub fn clamp(&self, limit: Option<u32>) -> Result<u32> {
		match limit.unwrap_or(self.default_page_size).min(self.max_page_size) {
			0 => Err(FlagsError::InvalidPageSize(
				"page size must be at least 1".to_string(),
			)),
			n => Ok(n),
		}
	}
}
