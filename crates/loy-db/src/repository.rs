//! Persistence contract consumed by the pipeline, the ledger paths, and the
//! daemon handlers.
//!
//! Implementations must be object-safe (`Arc<dyn Repository>`) so tests can
//! substitute the in-memory repository from `loy-testkit`.

use async_trait::async_trait;
use loy_schemas::{Cents, Order, User, UserBalance, Withdrawal};

use crate::error::RepoError;

#[async_trait]
pub trait Repository: Send + Sync {
    // -- reconciliation surface ---------------------------------------------

    /// All orders whose status is REGISTERED or PROCESSING, oldest first.
    async fn fetch_nonterminal_orders(&self) -> Result<Vec<Order>, RepoError>;

    /// Persist an order's new status/accrual.
    ///
    /// Returns `Ok(true)` when the transition was applied, `Ok(false)` when
    /// the order no longer exists or its status already advanced past the
    /// given transition (a concurrent-cycle race). Callers must not credit
    /// on the `false` case.
    async fn persist_order_update(&self, order: &Order) -> Result<bool, RepoError>;

    // -- ledger surface -----------------------------------------------------

    /// Atomically add `amount` to the user's spendable balance.
    async fn credit_balance(&self, user_id: i64, amount: Cents) -> Result<(), RepoError>;

    /// Atomically: verify funds, subtract `amount` from current, add it to
    /// withdrawn, and record the withdrawal — all in one transaction.
    /// Fails with [`RepoError::InsufficientFunds`] with no partial effect.
    async fn debit_balance(
        &self,
        user_id: i64,
        order_number: &str,
        amount: Cents,
    ) -> Result<(), RepoError>;

    /// Current balance snapshot for one user.
    async fn balance_of(&self, user_id: i64) -> Result<UserBalance, RepoError>;

    // -- account & submission surface ---------------------------------------

    /// Register a new user with a zero balance.
    /// Fails with [`RepoError::AlreadyExists`] when the login is taken.
    async fn create_user(&self, login: &str, password: &str) -> Result<User, RepoError>;

    /// Look up a user by login. [`RepoError::BadCredentials`] when absent,
    /// so login failures are indistinguishable from wrong passwords.
    async fn user_by_login(&self, login: &str) -> Result<User, RepoError>;

    async fn user_by_id(&self, user_id: i64) -> Result<User, RepoError>;

    /// Accept a submitted order (status REGISTERED).
    /// [`RepoError::AlreadyExists`] when this user already submitted it,
    /// [`RepoError::Conflict`] when another user owns the number.
    async fn create_order(&self, user_id: i64, number: &str) -> Result<(), RepoError>;

    /// All of a user's orders, oldest first.
    async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, RepoError>;

    /// All of a user's withdrawals, oldest first.
    async fn withdrawals_for_user(&self, user_id: i64) -> Result<Vec<Withdrawal>, RepoError>;
}
