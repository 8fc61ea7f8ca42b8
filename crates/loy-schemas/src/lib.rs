//! Shared domain types for the loyalty core.
//!
//! This crate defines **only** data: the fixed-point money type, order and
//! user records, and their status vocabulary. No IO, no storage logic, no
//! pipeline logic belongs here — those live in `loy-db` and `loy-pipeline`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod money;

pub use money::Cents;

// ---------------------------------------------------------------------------
// OrderStatus
// ---------------------------------------------------------------------------

/// Processing status of a submitted order.
///
/// Transitions are monotonic forward only:
/// `Registered -> Processing -> {Processed | Invalid}`. A terminal status
/// never regresses; the storage layer enforces this on every update.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Registered,
    Processing,
    Invalid,
    Processed,
}

impl OrderStatus {
    /// Terminal statuses are never re-reconciled.
    pub const fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Invalid | OrderStatus::Processed)
    }

    /// Canonical TEXT encoding used in the database and on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Registered => "REGISTERED",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Invalid => "INVALID",
            OrderStatus::Processed => "PROCESSED",
        }
    }

    /// Parse the canonical TEXT encoding. Unknown strings are `None`.
    pub fn parse(s: &str) -> Option<OrderStatus> {
        match s {
            "REGISTERED" => Some(OrderStatus::Registered),
            "PROCESSING" => Some(OrderStatus::Processing),
            "INVALID" => Some(OrderStatus::Invalid),
            "PROCESSED" => Some(OrderStatus::Processed),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Order
// ---------------------------------------------------------------------------

/// A loyalty order as tracked by the reconciliation pipeline.
///
/// `accrual` is meaningful only once `status` is [`OrderStatus::Processed`];
/// it is set exactly once, at that transition, and immutable thereafter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Checksum-valid order identifier (see `loy-luhn`).
    pub number: String,
    /// Owning user.
    pub user_id: i64,
    pub status: OrderStatus,
    /// Points earned, in cents. Zero until processed.
    pub accrual: Cents,
    pub uploaded_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// User & balance
// ---------------------------------------------------------------------------

/// A user's transactional points balance.
///
/// Invariants (enforced by the ledger transactions in `loy-db`):
/// - `current >= 0` in every reachable state.
/// - `withdrawn` is monotonically non-decreasing.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBalance {
    pub current: Cents,
    pub withdrawn: Cents,
}

/// A registered user. Credentials are opaque to the core; the balance is
/// mutated exclusively through the ledger operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub login: String,
    /// Opaque credential string; no hashing scheme is prescribed here.
    pub password: String,
    pub balance: UserBalance,
}

// ---------------------------------------------------------------------------
// Withdrawal
// ---------------------------------------------------------------------------

/// A completed balance withdrawal. Created atomically with its debit;
/// immutable once written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub user_id: i64,
    /// Checksum-valid order-like reference supplied by the user.
    pub order: String,
    pub sum: Cents,
    pub processed_at: DateTime<Utc>,
}
