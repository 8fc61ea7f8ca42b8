//! In-process fakes for cross-crate scenario tests: an in-memory
//! [`loy_db::Repository`] and a scripted accrual authority.
//!
//! Nothing here touches the network or a database; every scenario that uses
//! this crate runs deterministically under `tokio::time::pause`.

mod memory_repo;
mod scripted_accrual;

pub use memory_repo::MemoryRepository;
pub use scripted_accrual::{AccrualCall, ScriptedAccrual};
