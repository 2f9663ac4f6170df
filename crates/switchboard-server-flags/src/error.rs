// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use switchboard_flags_core::FlagsError;
use switchboard_server_db::DbError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FlagsServerError>;

#[derive(Debug, Error)]
pub enum FlagsServerError {
	#[error("Database error: {0}")]
	Database(#[from] sqlx::Error),

	#[error("Database setup error: {0}")]
	Db(#[from] DbError),

	/// A write collided with a concurrent writer, e.g. a unique key that was
	/// free when read was taken before this writer persisted.
	#[error("Conflict: {0}")]
	Conflict(String),

	#[error(transparent)]
	Flags(#[from] FlagsError),

	#[error("Internal error: {0}")]
	Internal(String),
}
