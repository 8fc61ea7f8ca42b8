//! Scenario: idempotent crediting across consecutive cycles.
//!
//! # Invariants under test
//!
//! 1. An order the authority resolves to PROCESSED is persisted terminal and
//!    credits the owner exactly once.
//! 2. A second cycle over the same dataset fetches nothing (terminal orders
//!    leave the fetch set) and issues no accrual or ledger calls.
//! 3. A stale duplicate update of an already-terminal order is a no-op and
//!    never credits.

use std::sync::Arc;

use loy_accrual::{AccrualApi, AccrualOutcome};
use loy_db::Repository;
use loy_pipeline::{run_cycle, Governor, ReconcileConfig};
use loy_schemas::{Cents, Order, OrderStatus, UserBalance};
use loy_testkit::{MemoryRepository, ScriptedAccrual};

#[tokio::test(start_paused = true)]
async fn processed_order_credits_exactly_once() {
    let repo = Arc::new(MemoryRepository::new());
    let uid = repo.seed_user("alice", UserBalance::default()).await;
    repo.seed_order("79927398713", uid, OrderStatus::Registered)
        .await;

    let accrual = Arc::new(ScriptedAccrual::always(AccrualOutcome::Resolved {
        status: OrderStatus::Processed,
        accrual: Cents::new(72998),
    }));

    let repo_dyn: Arc<dyn Repository> = repo.clone();
    let accrual_dyn: Arc<dyn AccrualApi> = accrual.clone();
    let governor = Arc::new(Governor::new());
    let cfg = ReconcileConfig::default();

    let first = run_cycle(&repo_dyn, &accrual_dyn, &governor, &cfg).await;
    assert_eq!(first.fetched, 1);
    assert_eq!(first.updated, 1);
    assert_eq!(first.credited, 1);

    let second = run_cycle(&repo_dyn, &accrual_dyn, &governor, &cfg).await;
    assert_eq!(second.fetched, 0, "terminal orders must leave the fetch set");
    assert_eq!(second.credited, 0);

    assert_eq!(accrual.call_count(), 1, "no accrual call in the second cycle");
    assert_eq!(repo.credit_calls(), 1, "exactly one credit ever");

    let balance = repo.balance_of(uid).await.unwrap();
    assert_eq!(balance.current, Cents::new(72998));
    assert_eq!(balance.withdrawn, Cents::ZERO);

    assert_eq!(
        repo.order_status("79927398713").await,
        Some(OrderStatus::Processed)
    );
}

#[tokio::test(start_paused = true)]
async fn stale_terminal_update_is_swallowed_without_credit() {
    let repo = Arc::new(MemoryRepository::new());
    let uid = repo.seed_user("bob", UserBalance::default()).await;
    repo.seed_order("79927398713", uid, OrderStatus::Processed)
        .await;

    // A racing writer re-submitting the terminal transition must observe a
    // Conflict-as-no-op, not an error and not a second credit.
    let stale = Order {
        number: "79927398713".to_string(),
        user_id: uid,
        status: OrderStatus::Processed,
        accrual: Cents::new(72998),
        uploaded_at: chrono::Utc::now(),
    };
    let applied = repo.persist_order_update(&stale).await.unwrap();
    assert!(!applied);
    assert_eq!(repo.credit_calls(), 0);
    assert_eq!(repo.balance_of(uid).await.unwrap().current, Cents::ZERO);
}
