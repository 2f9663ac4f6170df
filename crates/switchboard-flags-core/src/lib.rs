// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Switchboard feature flags system.
//!
//! This crate provides the shared domain types used by the storage backends and
//! the resolution engine (`switchboard-server-flags`).
//!
//! # Overview
//!
//! - Flags are named boolean toggles with a stable random identity
//! - A flag has at most one global override and at most one override per user
//! - Every create or update of an override is recorded as a [`Revision`]
//! - Flag listings are paginated with opaque cursors ([`FlagCursor`])
//!
//! # Example
//!
//! ```
//! use switchboard_flags_core::{Flag, GlobalValue, UserValue};
//!
//! let flag = Flag::new("checkout.new_flow");
//! let global = GlobalValue::new(flag.id);
//! assert!(!global.value);
//!
//! let user = UserValue::with_value(flag.id, "user-123", true);
//! assert!(user.value);
//! ```

pub mod cursor;
pub mod error;
pub mod flag;
pub mod revision;
pub mod value;

pub use cursor::{FlagCursor, FlagPage, PageLimits};
pub use error::{FlagsError, Result};
pub use flag::{Flag, FlagId};
pub use revision::{Revision, RevisionChange, ValueKind};
pub use value::{GlobalValue, UserValue, ValueId};
