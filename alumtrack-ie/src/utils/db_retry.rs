//! Database lock retry
//!
//! SQLite allows one writer at a time. When two uploads overlap, a write can
//! fail with "database is locked" after the connection busy timeout. Such
//! failures are retried with exponential backoff (10 ms doubling up to 1 s)
//! until `max_wait_ms` has elapsed; every other error is returned at once.

use std::future::Future;
use std::time::{Duration, Instant};

use crate::store::StoreError;

const INITIAL_BACKOFF_MS: u64 = 10;
const MAX_BACKOFF_MS: u64 = 1_000;

/// True for SQLITE_BUSY / SQLITE_LOCKED style failures
pub fn is_lock_error(err: &StoreError) -> bool {
    match err {
        StoreError::Database(db_err) => {
            let text = db_err.to_string();
            text.contains("database is locked") || text.contains("database table is locked")
        }
        _ => false,
    }
}

/// Run `operation`, retrying while it fails with a lock error
pub async fn retry_on_lock<F, Fut, T>(
    operation_name: &str,
    max_wait_ms: u64,
    mut operation: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let start = Instant::now();
    let max_wait = Duration::from_millis(max_wait_ms);
    let mut attempts: u32 = 0;
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        attempts += 1;

        let err = match operation().await {
            Ok(value) => {
                if attempts > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempts,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Database write succeeded after lock retry"
                    );
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !is_lock_error(&err) {
            return Err(err);
        }

        let elapsed = start.elapsed();
        if elapsed >= max_wait {
            tracing::error!(
                operation = operation_name,
                attempts,
                elapsed_ms = elapsed.as_millis() as u64,
                max_wait_ms,
                "Giving up on locked database"
            );
            return Err(StoreError::LockTimeout {
                attempts,
                elapsed_ms: elapsed.as_millis() as u64,
            });
        }

        let sleep_ms = backoff_ms.min(max_wait.saturating_sub(elapsed).as_millis() as u64).max(1);
        tracing::warn!(
            operation = operation_name,
            attempts,
            backoff_ms = sleep_ms,
            "Database locked, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_millis(sleep_ms)).await;
        backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
    }
}
