//! Scripted [`AccrualApi`] for pipeline scenarios.
//!
//! Outcomes are consumed from a global queue in call order; once the script
//! is exhausted every further call answers with the configured fallback.
//! Each call is logged with its order number and a `tokio::time::Instant`
//! timestamp, so pacing assertions work under a paused test clock.
//!
//! Script and log live under one lock: the n-th logged call is always the
//! call that consumed the n-th scripted outcome, even under concurrent
//! workers.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use loy_accrual::{AccrualApi, AccrualOutcome};
use tokio::time::Instant;

/// One recorded accrual call.
#[derive(Clone, Debug)]
pub struct AccrualCall {
    pub order: String,
    pub at: Instant,
}

struct Inner {
    script: VecDeque<AccrualOutcome>,
    log: Vec<AccrualCall>,
}

pub struct ScriptedAccrual {
    inner: Mutex<Inner>,
    fallback: AccrualOutcome,
}

impl ScriptedAccrual {
    /// `fallback` answers every call once `script` runs out.
    pub fn new(script: impl IntoIterator<Item = AccrualOutcome>, fallback: AccrualOutcome) -> Self {
        Self {
            inner: Mutex::new(Inner {
                script: script.into_iter().collect(),
                log: Vec::new(),
            }),
            fallback,
        }
    }

    /// Everything answered with `outcome`.
    pub fn always(outcome: AccrualOutcome) -> Self {
        Self::new([], outcome)
    }

    pub fn calls(&self) -> Vec<AccrualCall> {
        self.inner.lock().unwrap().log.clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().unwrap().log.len()
    }
}

#[async_trait]
impl AccrualApi for ScriptedAccrual {
    async fn check(&self, order_number: &str) -> AccrualOutcome {
        let mut inner = self.inner.lock().unwrap();
        inner.log.push(AccrualCall {
            order: order_number.to_string(),
            at: Instant::now(),
        });
        inner
            .script
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}
