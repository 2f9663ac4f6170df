// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded-retry upsert.
//!
//! Two writers can both read "no row" and both try to create one. Storage
//! rejects one of them; re-running the loser's whole read-modify-persist
//! cycle makes it observe the winner's row and update it instead. One retry
//! absorbs exactly one such collision. Heavier contention can still surface
//! an error to the caller.

use std::future::Future;

use tracing::{debug, warn};

use crate::error::Result;

/// Total attempts: the first try plus one retry.
pub const UPSERT_ATTEMPTS: u32 = 2;

/// Runs `read` then `persist`, repeating the pair once if either fails.
///
/// `read` looks up the existing record or constructs a new one and applies
/// the mutation; `persist` writes what `read` produced. Errors are not
/// classified: any failure triggers the retry, and the error of the final
/// attempt is returned unchanged.
pub async fn upsert_with_retry<T, O, Read, ReadFut, Persist, PersistFut>(
	target: &'static str,
	mut read: Read,
	mut persist: Persist,
) -> Result<O>
where
	Read: FnMut() -> ReadFut,
	ReadFut: Future<Output = Result<T>>,
	Persist: FnMut(T) -> PersistFut,
	PersistFut: Future<Output = Result<O>>,
{
	let mut attempt = 1;
	loop {
		let outcome = match read().await {
			Ok(staged) => persist(staged).await,
			Err(e) => Err(e),
		};

		match outcome {
			Ok(output) => {
				debug!(target_kind = target, attempt, "upsert persisted");
				return Ok(output);
			}
			Err(e) if attempt < UPSERT_ATTEMPTS => {
				warn!(target_kind = target, attempt, error = %e, "upsert attempt failed, retrying");
				attempt += 1;
			}
			Err(e) => return Err(e),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::FlagsServerError;
	use std::sync::atomic::{AtomicU32, Ordering};

	#[tokio::test]
	async fn test_first_attempt_succeeds() {
		let reads = &AtomicU32::new(0);
		let persists = &AtomicU32::new(0);

		let out = upsert_with_retry(
			"test",
			move || async move {
				reads.fetch_add(1, Ordering::SeqCst);
				Ok(5)
			},
			move |staged: i32| async move {
				persists.fetch_add(1, Ordering::SeqCst);
				Ok(staged * 2)
			},
		)
		.await
		.unwrap();

		assert_eq!(out, 10);
		assert_eq!(reads.load(Ordering::SeqCst), 1);
		assert_eq!(persists.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn test_persist_failure_reruns_read() {
		let reads = &AtomicU32::new(0);
		let persists = &AtomicU32::new(0);

		let out = upsert_with_retry(
			"test",
			move || async move { Ok(reads.fetch_add(1, Ordering::SeqCst)) },
			move |seen: u32| async move {
				if persists.fetch_add(1, Ordering::SeqCst) == 0 {
					Err(FlagsServerError::Conflict("lost race".to_string()))
				} else {
					Ok(seen)
				}
			},
		)
		.await
		.unwrap();

		// The second persist sees the second read.
		assert_eq!(out, 1);
		assert_eq!(reads.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn test_second_failure_propagates() {
		let persists = &AtomicU32::new(0);

		let err = upsert_with_retry(
			"test",
			move || async move { Ok(()) },
			move |_: ()| async move {
				let n = persists.fetch_add(1, Ordering::SeqCst);
				Err::<(), _>(FlagsServerError::Internal(format!("attempt {n}")))
			},
		)
		.await
		.unwrap_err();

		assert_eq!(persists.load(Ordering::SeqCst), UPSERT_ATTEMPTS);
		assert!(matches!(err, FlagsServerError::Internal(ref m) if m == "attempt 1"));
	}

	#[tokio::test]
	async fn test_read_failure_is_retried() {
		let reads = &AtomicU32::new(0);

		let out = upsert_with_retry(
			"test",
			move || async move {
				if reads.fetch_add(1, Ordering::SeqCst) == 0 {
					Err(FlagsServerError::Internal("busy".to_string()))
				} else {
					Ok("row")
				}
			},
			|row: &'static str| async move { Ok(row.len()) },
		)
		.await
		.unwrap();

		assert_eq!(out, 3);
		assert_eq!(reads.load(Ordering::SeqCst), 2);
	}
}
