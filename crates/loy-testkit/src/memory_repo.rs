//! In-memory [`Repository`] with the exact error taxonomy of the Postgres
//! implementation, for in-process scenario tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use loy_db::{RepoError, Repository};
use loy_schemas::{Cents, Order, OrderStatus, User, UserBalance, Withdrawal};
use tokio::sync::Mutex;

#[derive(Default)]
struct State {
    users: HashMap<i64, User>,
    next_user_id: i64,
    /// Keyed by order number; BTreeMap keeps fetch order deterministic.
    orders: BTreeMap<String, Order>,
    withdrawals: Vec<Withdrawal>,
}

/// In-memory repository. All semantics — Conflict-as-no-op updates, atomic
/// debit, insufficient-funds rejection — mirror `PgRepository`.
#[derive(Default)]
pub struct MemoryRepository {
    state: Mutex<State>,
    fail_next_fetch: AtomicBool,
    fetch_calls: AtomicUsize,
    credit_calls: AtomicUsize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user directly; returns its id.
    pub async fn seed_user(&self, login: &str, balance: UserBalance) -> i64 {
        let mut st = self.state.lock().await;
        st.next_user_id += 1;
        let id = st.next_user_id;
        st.users.insert(
            id,
            User {
                id,
                login: login.to_string(),
                password: "opaque".to_string(),
                balance,
            },
        );
        id
    }

    /// Seed an order in the given status.
    pub async fn seed_order(&self, number: &str, user_id: i64, status: OrderStatus) {
        let mut st = self.state.lock().await;
        st.orders.insert(
            number.to_string(),
            Order {
                number: number.to_string(),
                user_id,
                status,
                accrual: Cents::ZERO,
                uploaded_at: Utc::now(),
            },
        );
    }

    /// Make the next `fetch_nonterminal_orders` fail with
    /// StorageUnavailable.
    pub fn fail_next_fetch(&self) {
        self.fail_next_fetch.store(true, Ordering::SeqCst);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn credit_calls(&self) -> usize {
        self.credit_calls.load(Ordering::SeqCst)
    }

    pub async fn order_status(&self, number: &str) -> Option<OrderStatus> {
        let st = self.state.lock().await;
        st.orders.get(number).map(|o| o.status)
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn fetch_nonterminal_orders(&self) -> Result<Vec<Order>, RepoError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_next_fetch.swap(false, Ordering::SeqCst) {
            return Err(RepoError::StorageUnavailable("injected".into()));
        }
        let st = self.state.lock().await;
        Ok(st
            .orders
            .values()
            .filter(|o| !o.status.is_terminal())
            .cloned()
            .collect())
    }

    async fn persist_order_update(&self, order: &Order) -> Result<bool, RepoError> {
        let mut st = self.state.lock().await;
        match st.orders.get_mut(&order.number) {
            Some(existing) if !existing.status.is_terminal() => {
                existing.status = order.status;
                existing.accrual = order.accrual;
                Ok(true)
            }
            // Missing or already advanced past this transition: no-op.
            _ => Ok(false),
        }
    }

    async fn credit_balance(&self, user_id: i64, amount: Cents) -> Result<(), RepoError> {
        self.credit_calls.fetch_add(1, Ordering::SeqCst);
        let mut st = self.state.lock().await;
        let user = st.users.get_mut(&user_id).ok_or(RepoError::NotFound)?;
        user.balance.current += amount;
        Ok(())
    }

    async fn debit_balance(
        &self,
        user_id: i64,
        order_number: &str,
        amount: Cents,
    ) -> Result<(), RepoError> {
        let mut st = self.state.lock().await;
        let user = st.users.get_mut(&user_id).ok_or(RepoError::NotFound)?;
        if user.balance.current < amount {
            return Err(RepoError::InsufficientFunds);
        }
        user.balance.current -= amount;
        user.balance.withdrawn += amount;
        st.withdrawals.push(Withdrawal {
            user_id,
            order: order_number.to_string(),
            sum: amount,
            processed_at: Utc::now(),
        });
        Ok(())
    }

    async fn balance_of(&self, user_id: i64) -> Result<UserBalance, RepoError> {
        let st = self.state.lock().await;
        st.users
            .get(&user_id)
            .map(|u| u.balance)
            .ok_or(RepoError::NotFound)
    }

    async fn create_user(&self, login: &str, password: &str) -> Result<User, RepoError> {
        let mut st = self.state.lock().await;
        if st.users.values().any(|u| u.login == login) {
            return Err(RepoError::AlreadyExists);
        }
        st.next_user_id += 1;
        let id = st.next_user_id;
        let user = User {
            id,
            login: login.to_string(),
            password: password.to_string(),
            balance: UserBalance::default(),
        };
        st.users.insert(id, user.clone());
        Ok(user)
    }

    async fn user_by_login(&self, login: &str) -> Result<User, RepoError> {
        let st = self.state.lock().await;
        st.users
            .values()
            .find(|u| u.login == login)
            .cloned()
            .ok_or(RepoError::BadCredentials)
    }

    async fn user_by_id(&self, user_id: i64) -> Result<User, RepoError> {
        let st = self.state.lock().await;
        st.users.get(&user_id).cloned().ok_or(RepoError::NotFound)
    }

    async fn create_order(&self, user_id: i64, number: &str) -> Result<(), RepoError> {
        let mut st = self.state.lock().await;
        if let Some(existing) = st.orders.get(number) {
            return Err(if existing.user_id == user_id {
                RepoError::AlreadyExists
            } else {
                RepoError::Conflict
            });
        }
        st.orders.insert(
            number.to_string(),
            Order {
                number: number.to_string(),
                user_id,
                status: OrderStatus::Registered,
                accrual: Cents::ZERO,
                uploaded_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, RepoError> {
        let st = self.state.lock().await;
        let mut orders: Vec<Order> = st
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.uploaded_at);
        Ok(orders)
    }

    async fn withdrawals_for_user(&self, user_id: i64) -> Result<Vec<Withdrawal>, RepoError> {
        let st = self.state.lock().await;
        Ok(st
            .withdrawals
            .iter()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect())
    }
}
