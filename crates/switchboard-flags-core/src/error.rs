// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FlagsError>;

#[derive(Debug, Error)]
pub enum FlagsError {
	#[error("invalid page size: {0}")]
	InvalidPageSize(String),

	#[error("invalid cursor: {0}")]
	InvalidCursor(String),

	#[error("invalid value kind: {0}")]
	InvalidValueKind(String),

	#[error("invalid revision change: {0}")]
	InvalidRevisionChange(String),
}
