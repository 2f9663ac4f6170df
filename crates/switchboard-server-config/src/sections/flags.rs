// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Flag service configuration: listing page sizes and the recorded actor.

use serde::Deserialize;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 500;

#[derive(Debug, Clone)]
pub struct FlagsConfig {
	/// Page size when a listing request gives no limit.
	pub default_page_size: u32,
	/// Upper bound applied to requested page sizes.
	pub max_page_size: u32,
	/// Name stamped on values this process writes.
	pub actor: Option<String>,
}

impl Default for FlagsConfig {
	fn default() -> Self {
		Self {
			default_page_size: DEFAULT_PAGE_SIZE,
			max_page_size: MAX_PAGE_SIZE,
			actor: None,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlagsConfigLayer {
	#[serde(default)]
	pub default_page_size: Option<u32>,
	#[serde(default)]
	pub max_page_size: Option<u32>,
	#[serde(default)]
	pub actor: Option<String>,
}

impl FlagsConfigLayer {
	pub fn merge(&mut self, other: FlagsConfigLayer) {
		if other.default_page_size.is_some() {
			self.default_page_size = other.default_page_size;
		}
		if other.max_page_size.is_some() {
			self.max_page_size = other.max_page_size;
		}
		if other.actor.is_some() {
			self.actor = other.actor;
		}
	}

	pub fn finalize(self) -> FlagsConfig {
		FlagsConfig {
			default_page_size: self.default_page_size.unwrap_or(DEFAULT_PAGE_SIZE),
			max_page_size: self.max_page_size.unwrap_or(MAX_PAGE_SIZE),
			actor: self.actor,
		}
	}
}
