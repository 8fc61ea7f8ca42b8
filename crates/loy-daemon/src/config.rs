//! Process configuration: command-line flags with environment overrides.
//!
//! Short flags and env names match the original service contract
//! (`-a`/RUN_ADDRESS, `-d`/DATABASE_URI, `-r`/ACCRUAL_SYSTEM_ADDRESS);
//! pipeline tuning knobs are env-only with reference defaults.

use std::time::Duration;

use clap::Parser;
use loy_pipeline::ReconcileConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "loy-daemon")]
#[command(about = "Loyalty points service", long_about = None)]
pub struct Config {
    /// Address and port to serve the user API on.
    #[arg(short = 'a', long = "address", env = "RUN_ADDRESS", default_value = "0.0.0.0:8080")]
    pub run_address: String,

    /// PostgreSQL DSN.
    #[arg(short = 'd', long = "database-uri", env = "DATABASE_URI")]
    pub database_uri: String,

    /// Accrual authority base URL.
    #[arg(short = 'r', long = "accrual-address", env = "ACCRUAL_SYSTEM_ADDRESS")]
    pub accrual_address: String,

    /// Seconds between reconciliation cycles.
    #[arg(long, env = "LOY_POLL_INTERVAL_SECS", default_value_t = 10)]
    pub poll_interval_secs: u64,

    /// Concurrent checker workers per cycle (>= 1).
    #[arg(long, env = "LOY_WORKER_COUNT", default_value_t = 2)]
    pub worker_count: usize,

    /// Fixed delay after each successful accrual query, per worker, in
    /// seconds.
    #[arg(long, env = "LOY_REQUEST_DELAY_SECS", default_value_t = 2)]
    pub request_delay_secs: u64,

    /// Backoff for 429 responses without a Retry-After header, in seconds.
    #[arg(long, env = "LOY_DEFAULT_BACKOFF_SECS", default_value_t = 60)]
    pub default_backoff_secs: u64,
}

impl Config {
    pub fn reconcile(&self) -> ReconcileConfig {
        ReconcileConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            worker_count: self.worker_count,
            request_delay: Duration::from_secs(self.request_delay_secs),
            default_backoff: Duration::from_secs(self.default_backoff_secs),
        }
    }

    pub fn default_backoff(&self) -> Duration {
        Duration::from_secs(self.default_backoff_secs)
    }
}
