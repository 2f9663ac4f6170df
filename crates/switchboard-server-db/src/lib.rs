// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database layer for Switchboard: pool setup and the flags schema.

pub mod error;
pub mod migrations;
pub mod pool;
pub mod testing;

pub use error::{DbError, Result};
pub use migrations::run_migrations;
pub use pool::create_pool;
pub use sqlx::SqlitePool;
