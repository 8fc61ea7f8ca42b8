//! Postgres-backed [`Repository`] implementation.
//!
//! Ledger semantics:
//! - Credit and debit are single transactions that take a `FOR UPDATE` row
//!   lock on the user, so concurrent mutations of one balance serialize and
//!   no update is lost.
//! - `persist_order_update` encodes the forward-only status invariant in the
//!   UPDATE's WHERE clause: a row that already reached a terminal status
//!   matches zero rows and the call reports a no-op instead of regressing it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use loy_schemas::{Cents, Order, OrderStatus, User, UserBalance, Withdrawal};
use sqlx::PgPool;
use tracing::info;

use crate::error::RepoError;
use crate::repository::Repository;

pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type OrderRow = (String, i64, String, i64, DateTime<Utc>);

fn order_from_row(row: OrderRow) -> Result<Order, RepoError> {
    let (number, user_id, status, accrual, uploaded_at) = row;
    let status = OrderStatus::parse(&status)
        .ok_or_else(|| RepoError::StorageUnavailable(format!("unknown order status {status:?}")))?;
    Ok(Order {
        number,
        user_id,
        status,
        accrual: Cents::new(accrual),
        uploaded_at,
    })
}

type UserRow = (i64, String, String, i64, i64);

fn user_from_row(row: UserRow) -> User {
    let (id, login, password, current, withdrawn) = row;
    User {
        id,
        login,
        password,
        balance: UserBalance {
            current: Cents::new(current),
            withdrawn: Cents::new(withdrawn),
        },
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

#[async_trait]
impl Repository for PgRepository {
    async fn fetch_nonterminal_orders(&self) -> Result<Vec<Order>, RepoError> {
        let rows: Vec<OrderRow> = sqlx::query_as(
            r#"
            select number, user_id, status, accrual, uploaded_at
            from orders
            where status in ('REGISTERED', 'PROCESSING')
            order by uploaded_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(order_from_row).collect()
    }

    async fn persist_order_update(&self, order: &Order) -> Result<bool, RepoError> {
        let res = sqlx::query(
            r#"
            update orders
            set status = $2, accrual = $3
            where number = $1
              and status in ('REGISTERED', 'PROCESSING')
            "#,
        )
        .bind(&order.number)
        .bind(order.status.as_str())
        .bind(order.accrual.raw())
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected() > 0)
    }

    async fn credit_balance(&self, user_id: i64, amount: Cents) -> Result<(), RepoError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent credit/debit for this user.
        let _: (i64,) = sqlx::query_as("select balance_current from users where id = $1 for update")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("update users set balance_current = balance_current + $2 where id = $1")
            .bind(user_id)
            .bind(amount.raw())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(user_id, amount = %amount, "credited balance");
        Ok(())
    }

    async fn debit_balance(
        &self,
        user_id: i64,
        order_number: &str,
        amount: Cents,
    ) -> Result<(), RepoError> {
        let mut tx = self.pool.begin().await?;

        let (current,): (i64,) =
            sqlx::query_as("select balance_current from users where id = $1 for update")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;

        if Cents::new(current) < amount {
            // Dropping the transaction rolls it back; nothing was written.
            return Err(RepoError::InsufficientFunds);
        }

        sqlx::query(
            r#"
            update users
            set balance_current = balance_current - $2,
                balance_withdrawn = balance_withdrawn + $2
            where id = $1
            "#,
        )
        .bind(user_id)
        .bind(amount.raw())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "insert into withdrawals (user_id, order_number, sum) values ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(order_number)
        .bind(amount.raw())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(user_id, order = order_number, amount = %amount, "debited balance");
        Ok(())
    }

    async fn balance_of(&self, user_id: i64) -> Result<UserBalance, RepoError> {
        let (current, withdrawn): (i64, i64) =
            sqlx::query_as("select balance_current, balance_withdrawn from users where id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(UserBalance {
            current: Cents::new(current),
            withdrawn: Cents::new(withdrawn),
        })
    }

    async fn create_user(&self, login: &str, password: &str) -> Result<User, RepoError> {
        let row: Result<UserRow, sqlx::Error> = sqlx::query_as(
            r#"
            insert into users (login, password)
            values ($1, $2)
            returning id, login, password, balance_current, balance_withdrawn
            "#,
        )
        .bind(login)
        .bind(password)
        .fetch_one(&self.pool)
        .await;

        match row {
            Ok(r) => Ok(user_from_row(r)),
            Err(e) if is_unique_violation(&e) => Err(RepoError::AlreadyExists),
            Err(e) => Err(e.into()),
        }
    }

    async fn user_by_login(&self, login: &str) -> Result<User, RepoError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            select id, login, password, balance_current, balance_withdrawn
            from users where login = $1
            "#,
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        row.map(user_from_row).ok_or(RepoError::BadCredentials)
    }

    async fn user_by_id(&self, user_id: i64) -> Result<User, RepoError> {
        let row: UserRow = sqlx::query_as(
            r#"
            select id, login, password, balance_current, balance_withdrawn
            from users where id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(user_from_row(row))
    }

    async fn create_order(&self, user_id: i64, number: &str) -> Result<(), RepoError> {
        let res = sqlx::query("insert into orders (number, user_id) values ($1, $2)")
            .bind(number)
            .bind(user_id)
            .execute(&self.pool)
            .await;

        match res {
            Ok(_) => {
                info!(order = number, user_id, "order accepted");
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => {
                // Same number, same user => idempotent resubmission.
                // Same number, different user => real conflict.
                let (owner,): (i64,) =
                    sqlx::query_as("select user_id from orders where number = $1")
                        .bind(number)
                        .fetch_one(&self.pool)
                        .await?;
                if owner == user_id {
                    Err(RepoError::AlreadyExists)
                } else {
                    Err(RepoError::Conflict)
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, RepoError> {
        let rows: Vec<OrderRow> = sqlx::query_as(
            r#"
            select number, user_id, status, accrual, uploaded_at
            from orders
            where user_id = $1
            order by uploaded_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(order_from_row).collect()
    }

    async fn withdrawals_for_user(&self, user_id: i64) -> Result<Vec<Withdrawal>, RepoError> {
        let rows: Vec<(i64, String, i64, DateTime<Utc>)> = sqlx::query_as(
            r#"
            select user_id, order_number, sum, processed_at
            from withdrawals
            where user_id = $1
            order by processed_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(user_id, order, sum, processed_at)| Withdrawal {
                user_id,
                order,
                sum: Cents::new(sum),
                processed_at,
            })
            .collect())
    }
}
