// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Feature flag storage and resolution for Switchboard.
//!
//! A flag is a named boolean. Its value for a user is the user's override if
//! one exists, else the flag's global override, else a caller-supplied
//! default. Flags are created on first reference.
//!
//! # Architecture
//!
//! - `directory` - Name to identity, with lazy creation and paged listing
//! - `values` - Global and per-user upserts
//! - `retry` - Retry-once wrapper around read-then-write sequences
//! - `ledger` - Append-only revision history of value writes
//! - `repository` - Storage contracts and the SQLite backend
//! - `memory` - In-memory backend
//! - `service` - Resolution engine composing the above
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use switchboard_server_flags::{FlagService, SqliteFlagsRepository};
//!
//! let service = FlagService::new(Arc::new(SqliteFlagsRepository::new(pool)));
//!
//! service.set_global("checkout.v2", true).await?;
//! service.set_user("checkout.v2", "u1", false).await?;
//!
//! assert!(!service.resolve("checkout.v2", "u1", true).await?);
//! assert!(service.resolve("checkout.v2", "u2", false).await?);
//! ```

pub mod directory;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod repository;
pub mod retry;
pub mod service;
pub mod values;

pub use error::{FlagsServerError, Result};
pub use ledger::RevisionLedger;
pub use memory::InMemoryFlagsRepository;
pub use repository::{
	FlagStore, FlagsRepository, GlobalValueStore, SqliteFlagsRepository, UserValueStore,
};
pub use retry::{upsert_with_retry, UPSERT_ATTEMPTS};
pub use service::FlagService;

// Re-export core types for convenience
pub use switchboard_flags_core::*;
