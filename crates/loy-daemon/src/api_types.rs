//! Wire types for the user API.
//!
//! Monetary JSON fields carry decimal major units (the published API shape);
//! conversion to and from [`Cents`] happens only here, at the edge.

use chrono::{DateTime, Utc};
use loy_schemas::{Cents, Order, OrderStatus, UserBalance, Withdrawal};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct OrderView {
    pub number: String,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accrual: Option<f64>,
    pub uploaded_at: DateTime<Utc>,
}

impl From<Order> for OrderView {
    fn from(o: Order) -> Self {
        Self {
            number: o.number,
            // accrual is published only once the order is processed
            accrual: (o.status == OrderStatus::Processed).then(|| o.accrual.to_major_f64()),
            status: o.status,
            uploaded_at: o.uploaded_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BalanceView {
    pub current: f64,
    pub withdrawn: f64,
}

impl From<UserBalance> for BalanceView {
    fn from(b: UserBalance) -> Self {
        Self {
            current: b.current.to_major_f64(),
            withdrawn: b.withdrawn.to_major_f64(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub order: String,
    /// Decimal major units.
    pub sum: f64,
}

impl WithdrawRequest {
    pub fn sum_cents(&self) -> Cents {
        Cents::from_major_f64(self.sum)
    }
}

#[derive(Debug, Serialize)]
pub struct WithdrawalView {
    pub order: String,
    pub sum: f64,
    pub processed_at: DateTime<Utc>,
}

impl From<Withdrawal> for WithdrawalView {
    fn from(w: Withdrawal) -> Self {
        Self {
            order: w.order,
            sum: w.sum.to_major_f64(),
            processed_at: w.processed_at,
        }
    }
}
