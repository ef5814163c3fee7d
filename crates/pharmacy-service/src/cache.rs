//! # TTL Cache
//!
//! A single cached value with an expiry, shared between the dashboard
//! readers and the workflows that invalidate it.
//!
//! ```text
//! get_or_recompute(f)
//!   │
//!   ├── fresh value?  → clone it
//!   ├── f() Ok(v)     → store (v, now), return v
//!   └── f() Err(e)    → Err(e, stale value if any)
//!
//! invalidate()        → drops the value; the next read recomputes
//! ```
//!
//! The lock is held across the recompute so concurrent readers wait for
//! one computation instead of running their own.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Failure of a recompute, carrying whatever was cached before.
#[derive(Debug)]
pub struct Stale<T, E> {
    pub error: E,
    pub previous: Option<T>,
}

#[derive(Debug)]
pub struct TtlCache<T> {
    ttl: Duration,
    slot: Mutex<Option<(T, Instant)>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        TtlCache {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Returns the cached value if still fresh, otherwise recomputes it.
    pub async fn get_or_recompute<F, Fut, E>(&self, f: F) -> Result<T, Stale<T, E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut slot = self.slot.lock().await;

        if let Some((value, stored_at)) = slot.as_ref() {
            if stored_at.elapsed() < self.ttl {
                return Ok(value.clone());
            }
        }

        match f().await {
            Ok(value) => {
                *slot = Some((value.clone(), Instant::now()));
                Ok(value)
            }
            Err(error) => Err(Stale {
                error,
                previous: slot.as_ref().map(|(value, _)| value.clone()),
            }),
        }
    }

    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }
}
