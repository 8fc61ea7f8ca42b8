//! Scenario: cycles with nothing to do, and cycles that cannot fetch.
//!
//! # Invariants under test
//!
//! 1. Zero non-terminal orders: the cycle performs no accrual calls and no
//!    ledger calls.
//! 2. StorageUnavailable on fetch: the cycle is skipped without touching the
//!    accrual authority, and the next cycle self-heals.
//! 3. Per-order failures are isolated: one transient failure never aborts
//!    the rest of the batch.

use std::sync::Arc;

use loy_accrual::{AccrualApi, AccrualOutcome};
use loy_db::Repository;
use loy_pipeline::{run_cycle, Governor, ReconcileConfig};
use loy_schemas::{Cents, OrderStatus, UserBalance};
use loy_testkit::{MemoryRepository, ScriptedAccrual};

fn single_worker() -> ReconcileConfig {
    ReconcileConfig {
        worker_count: 1,
        ..ReconcileConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn empty_fetch_makes_no_calls() {
    let repo = Arc::new(MemoryRepository::new());
    let accrual = Arc::new(ScriptedAccrual::always(AccrualOutcome::NotFound));

    let repo_dyn: Arc<dyn Repository> = repo.clone();
    let accrual_dyn: Arc<dyn AccrualApi> = accrual.clone();
    let governor = Arc::new(Governor::new());

    let report = run_cycle(&repo_dyn, &accrual_dyn, &governor, &single_worker()).await;

    assert_eq!(report, Default::default());
    assert_eq!(accrual.call_count(), 0);
    assert_eq!(repo.credit_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_fetch_skips_cycle_then_self_heals() {
    let repo = Arc::new(MemoryRepository::new());
    let uid = repo.seed_user("dave", UserBalance::default()).await;
    repo.seed_order("79927398713", uid, OrderStatus::Registered)
        .await;
    repo.fail_next_fetch();

    let accrual = Arc::new(ScriptedAccrual::always(AccrualOutcome::Resolved {
        status: OrderStatus::Processed,
        accrual: Cents::new(100),
    }));

    let repo_dyn: Arc<dyn Repository> = repo.clone();
    let accrual_dyn: Arc<dyn AccrualApi> = accrual.clone();
    let governor = Arc::new(Governor::new());
    let cfg = single_worker();

    let skipped = run_cycle(&repo_dyn, &accrual_dyn, &governor, &cfg).await;
    assert_eq!(skipped.fetched, 0);
    assert_eq!(accrual.call_count(), 0, "no accrual call without a fetch");

    // Next tick: storage is back, the order reconciles normally.
    let healed = run_cycle(&repo_dyn, &accrual_dyn, &governor, &cfg).await;
    assert_eq!(healed.fetched, 1);
    assert_eq!(healed.credited, 1);
    assert_eq!(repo.balance_of(uid).await.unwrap().current, Cents::new(100));
}

#[tokio::test(start_paused = true)]
async fn transient_failure_is_isolated_to_its_order() {
    let repo = Arc::new(MemoryRepository::new());
    let uid = repo.seed_user("erin", UserBalance::default()).await;
    // BTreeMap fetch order: sorted by number.
    repo.seed_order("2377225624", uid, OrderStatus::Processing).await;
    repo.seed_order("4532015112830366", uid, OrderStatus::Processing).await;
    repo.seed_order("79927398713", uid, OrderStatus::Processing).await;

    let accrual = Arc::new(ScriptedAccrual::new(
        [
            AccrualOutcome::Transient("connection reset".into()),
            AccrualOutcome::Resolved {
                status: OrderStatus::Processed,
                accrual: Cents::new(500),
            },
            AccrualOutcome::Resolved {
                status: OrderStatus::Invalid,
                accrual: Cents::ZERO,
            },
        ],
        AccrualOutcome::NotFound,
    ));

    let repo_dyn: Arc<dyn Repository> = repo.clone();
    let accrual_dyn: Arc<dyn AccrualApi> = accrual.clone();
    let governor = Arc::new(Governor::new());

    let report = run_cycle(&repo_dyn, &accrual_dyn, &governor, &single_worker()).await;

    assert_eq!(report.fetched, 3);
    assert_eq!(report.dropped, 1, "only the failing order is dropped");
    assert_eq!(report.updated, 2);
    assert_eq!(report.credited, 1, "INVALID terminal never credits");

    assert_eq!(
        repo.order_status("2377225624").await,
        Some(OrderStatus::Processing),
        "failed order keeps its persisted status for the next cycle"
    );
    assert_eq!(
        repo.order_status("4532015112830366").await,
        Some(OrderStatus::Processed)
    );
    assert_eq!(
        repo.order_status("79927398713").await,
        Some(OrderStatus::Invalid)
    );
    assert_eq!(repo.balance_of(uid).await.unwrap().current, Cents::new(500));
}
