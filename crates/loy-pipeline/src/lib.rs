//! Order-reconciliation pipeline.
//!
//! One cycle: fetch non-terminal orders → stream them onto a shared work
//! queue → N checker workers query the accrual authority (respecting the
//! shared [`Governor`]) → results fan in over one channel → the consumer
//! persists each update and credits the owner on a transition into
//! PROCESSED.
//!
//! The periodic driver never overlaps cycles: a new tick is not serviced
//! until the previous cycle's fan-in has closed. On shutdown the in-flight
//! cycle drains rather than being aborted mid-write.
//!
//! Failure policy: per-order failures are isolated. A transient accrual
//! error or an unavailable store drops that order for the cycle; its
//! persisted status is unchanged, so the next fetch picks it up again.
//! Nothing here is fatal to the process.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use loy_accrual::{AccrualApi, AccrualOutcome};
use loy_db::Repository;
use loy_schemas::{Order, OrderStatus};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

mod governor;

pub use governor::Governor;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the reconciliation pipeline. Values only — how they are
/// sourced (flags/env) is the daemon's concern.
#[derive(Clone, Debug)]
pub struct ReconcileConfig {
    /// Interval between cycle starts.
    pub poll_interval: Duration,
    /// Number of concurrent checker workers (>= 1; 0 is clamped to 1).
    pub worker_count: usize,
    /// Fixed delay a worker applies after a successful check, bounding the
    /// per-worker query rate. Not applied when retrying a rate-limited
    /// order.
    pub request_delay: Duration,
    /// Backoff used for 429 responses that carry no usable Retry-After.
    pub default_backoff: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            worker_count: 2,
            request_delay: Duration::from_secs(2),
            default_backoff: Duration::from_secs(60),
        }
    }
}

// ---------------------------------------------------------------------------
// Cycle report
// ---------------------------------------------------------------------------

/// What one cycle did. Returned for logging and scenario assertions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Orders returned by the non-terminal fetch.
    pub fetched: usize,
    /// Status transitions actually applied by the store.
    pub updated: usize,
    /// Credits issued (one per order that transitioned into PROCESSED).
    pub credited: usize,
    /// Orders dropped for this cycle (not-found / transient / store
    /// failure); they stay non-terminal and are re-fetched next cycle.
    pub dropped: usize,
}

// ---------------------------------------------------------------------------
// One cycle
// ---------------------------------------------------------------------------

/// Run a single fetch → check → fan-in → consume cycle to completion.
pub async fn run_cycle(
    repo: &Arc<dyn Repository>,
    accrual: &Arc<dyn AccrualApi>,
    governor: &Arc<Governor>,
    cfg: &ReconcileConfig,
) -> CycleReport {
    let mut report = CycleReport::default();

    let orders = match repo.fetch_nonterminal_orders().await {
        Ok(orders) => orders,
        Err(e) => {
            warn!(error = %e, "order fetch failed; cycle skipped");
            return report;
        }
    };
    report.fetched = orders.len();
    if orders.is_empty() {
        return report;
    }

    // Shared feed: workers steal the next order under a short-held lock, so
    // no order is assigned twice and an idle worker is never starved while
    // another has a backlog.
    let feed: Arc<Mutex<VecDeque<Order>>> = Arc::new(Mutex::new(orders.into_iter().collect()));

    // Fan-in: every worker owns a sender clone; the channel closes once the
    // last worker finishes its share, which is the cycle's barrier.
    let (results_tx, mut results_rx) = mpsc::unbounded_channel::<CheckResult>();

    let workers = cfg.worker_count.max(1);
    let mut handles = Vec::with_capacity(workers);
    for worker_id in 0..workers {
        let feed = Arc::clone(&feed);
        let accrual = Arc::clone(accrual);
        let governor = Arc::clone(governor);
        let results_tx = results_tx.clone();
        let request_delay = cfg.request_delay;
        handles.push(tokio::spawn(async move {
            check_worker(worker_id, feed, accrual, governor, results_tx, request_delay).await;
        }));
    }
    drop(results_tx);

    // Consume concurrently with the workers; ends when the channel closes.
    while let Some(result) = results_rx.recv().await {
        match result {
            CheckResult::Updated(order) => consume_update(repo, order, &mut report).await,
            CheckResult::Dropped => report.dropped += 1,
        }
    }

    for h in handles {
        // Workers have already finished (the channel closed); this only
        // surfaces a panic instead of losing it.
        if let Err(e) = h.await {
            error!(error = %e, "checker worker panicked");
        }
    }

    report
}

/// Per-order result flowing through the fan-in channel.
enum CheckResult {
    Updated(Order),
    Dropped,
}

async fn check_worker(
    worker_id: usize,
    feed: Arc<Mutex<VecDeque<Order>>>,
    accrual: Arc<dyn AccrualApi>,
    governor: Arc<Governor>,
    results_tx: mpsc::UnboundedSender<CheckResult>,
    request_delay: Duration,
) {
    loop {
        let Some(mut order) = feed.lock().unwrap().pop_front() else {
            return;
        };

        // Inner retry loop: a rate-limited order is retried by the same
        // worker after the shared pause elapses, without the inter-request
        // delay. Everything else settles the order for this cycle.
        loop {
            governor.wait_if_paused().await;

            match accrual.check(&order.number).await {
                AccrualOutcome::Resolved { status, accrual } => {
                    order.status = status;
                    if status == OrderStatus::Processed {
                        order.accrual = accrual;
                    }
                    let _ = results_tx.send(CheckResult::Updated(order));
                    tokio::time::sleep(request_delay).await;
                    break;
                }
                AccrualOutcome::RateLimited { retry_after } => {
                    warn!(
                        worker_id,
                        order = %order.number,
                        ?retry_after,
                        "accrual rate limit; pausing all workers"
                    );
                    governor.observe(retry_after);
                    // retry the same order; no additional fixed delay
                }
                AccrualOutcome::NotFound => {
                    debug!(worker_id, order = %order.number, "order unknown to accrual authority");
                    let _ = results_tx.send(CheckResult::Dropped);
                    break;
                }
                AccrualOutcome::Transient(msg) => {
                    warn!(worker_id, order = %order.number, error = %msg, "accrual check failed; order deferred to next cycle");
                    let _ = results_tx.send(CheckResult::Dropped);
                    break;
                }
            }
        }
    }
}

async fn consume_update(repo: &Arc<dyn Repository>, order: Order, report: &mut CycleReport) {
    match repo.persist_order_update(&order).await {
        Ok(true) => {
            report.updated += 1;
            if order.status == OrderStatus::Processed {
                match repo.credit_balance(order.user_id, order.accrual).await {
                    Ok(()) => {
                        report.credited += 1;
                        info!(order = %order.number, user_id = order.user_id, accrual = %order.accrual, "order processed; balance credited");
                    }
                    Err(e) => {
                        // The order is already terminal, so this credit will
                        // not be retried by a later cycle. Surface loudly.
                        error!(order = %order.number, user_id = order.user_id, error = %e, "credit failed after processed transition");
                    }
                }
            }
        }
        Ok(false) => {
            // Already advanced by a concurrent writer: no-op, and in
            // particular no credit — that writer performed it.
            debug!(order = %order.number, "order already advanced; update skipped");
        }
        Err(e) => {
            report.dropped += 1;
            warn!(order = %order.number, error = %e, "order update failed; deferred to next cycle");
        }
    }
}

// ---------------------------------------------------------------------------
// Periodic driver
// ---------------------------------------------------------------------------

/// Drive cycles on a fixed interval until `shutdown` flips to `true`.
///
/// The select races the ticker only while idle: once a cycle starts it is
/// awaited to completion, so cycles never overlap and shutdown drains the
/// in-flight cycle instead of aborting it mid-write.
pub async fn run(
    repo: Arc<dyn Repository>,
    accrual: Arc<dyn AccrualApi>,
    governor: Arc<Governor>,
    cfg: ReconcileConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(cfg.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first interval tick fires immediately; consume it so the first
    // real cycle runs one poll_interval after startup.
    ticker.tick().await;

    info!(
        poll_interval = ?cfg.poll_interval,
        workers = cfg.worker_count.max(1),
        "reconciliation driver started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = run_cycle(&repo, &accrual, &governor, &cfg).await;
                if report.fetched > 0 {
                    info!(
                        fetched = report.fetched,
                        updated = report.updated,
                        credited = report.credited,
                        dropped = report.dropped,
                        "reconciliation cycle complete"
                    );
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("reconciliation driver stopped");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_reference_values() {
        let cfg = ReconcileConfig::default();
        assert_eq!(cfg.poll_interval, Duration::from_secs(10));
        assert_eq!(cfg.worker_count, 2);
        assert_eq!(cfg.request_delay, Duration::from_secs(2));
        assert_eq!(cfg.default_backoff, Duration::from_secs(60));
    }

    #[test]
    fn zero_workers_is_clamped_not_deadlocked() {
        let cfg = ReconcileConfig {
            worker_count: 0,
            ..ReconcileConfig::default()
        };
        assert_eq!(cfg.worker_count.max(1), 1);
    }
}
