//! Rate-limit governor: one shared "do not query before T" timestamp.
//!
//! A single 429 from the accrual authority must slow the whole pipeline,
//! not just the worker that received it, so every checker worker holds an
//! `Arc<Governor>` and consults it before each outbound query.
//!
//! The governor is an explicitly constructed, injected value — never a
//! static — so tests can instantiate independent instances.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Lock-protected pause state with monotonic-advance semantics.
#[derive(Debug, Default)]
pub struct Governor {
    paused_until: Mutex<Option<Instant>>,
}

impl Governor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rate-limit signal: advance the pause deadline to
    /// `now + retry_after` if that is later than the current one.
    ///
    /// Monotonic advance only — a stale, smaller pause from one worker must
    /// never regress a larger one set by a concurrent worker.
    pub fn observe(&self, retry_after: Duration) {
        let candidate = Instant::now() + retry_after;
        let mut guard = self.paused_until.lock().unwrap();
        match *guard {
            Some(existing) if existing >= candidate => {}
            _ => *guard = Some(candidate),
        }
    }

    /// Time left until queries may resume, or `None` when not paused.
    pub fn pause_remaining(&self) -> Option<Duration> {
        let guard = self.paused_until.lock().unwrap();
        let until = (*guard)?;
        let now = Instant::now();
        (until > now).then(|| until - now)
    }

    /// Block (async sleep) until the pause deadline has passed.
    ///
    /// Re-checks after waking: a concurrent worker may have advanced the
    /// deadline while this one slept.
    pub async fn wait_if_paused(&self) {
        loop {
            let until = {
                let guard = self.paused_until.lock().unwrap();
                match *guard {
                    Some(t) if t > Instant::now() => t,
                    _ => return,
                }
            };
            tokio::time::sleep_until(until).await;
        }
    }
}
