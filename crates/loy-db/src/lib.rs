//! Persistence layer: the [`Repository`] contract and its Postgres
//! implementation.
//!
//! Connection setup and migrations live here; all query logic is in
//! [`pg::PgRepository`]. The trait is what the rest of the workspace depends
//! on — the pipeline and daemon never see a `PgPool` directly.

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

mod error;
mod pg;
mod repository;

pub use error::RepoError;
pub use pg::PgRepository;
pub use repository::Repository;

pub const ENV_DB_URL: &str = "LOY_DATABASE_URL";

/// Connect to Postgres with a bounded pool.
pub async fn connect(url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Connect using `LOY_DATABASE_URL` (tests, tooling).
pub async fn connect_from_env() -> Result<PgPool> {
    let url =
        std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url).await
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}
