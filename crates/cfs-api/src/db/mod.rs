//! # Database Persistence
//!
//! Optional PostgreSQL persistence for the ledger's transaction log.
//! When `DATABASE_URL` is set, committed transactions are written
//! through after the in-memory append and reloaded at startup; when it
//! is absent, the API runs in-memory only.
//!
//! All queries are runtime-checked (`sqlx::query` / `query_as`), so the
//! crate builds without a live database.

pub mod transactions;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Create a connection pool from `DATABASE_URL`, if set.
///
/// Returns `Ok(None)` when the variable is absent (in-memory mode) and
/// an error when it is set but the database is unreachable — a
/// configured database that cannot be reached is a startup failure,
/// not a silent downgrade.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::info!("DATABASE_URL not set; running with in-memory state only");
            return Ok(None);
        }
    };
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;
    ensure_schema(&pool).await?;
    tracing::info!("database pool initialized");
    Ok(Some(pool))
}

/// Create the transactions table if it does not exist. Idempotent.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ledger_transactions (
            id UUID PRIMARY KEY,
            tx_type TEXT NOT NULL,
            amount_cents BIGINT NOT NULL,
            category TEXT NOT NULL,
            occurred_at TIMESTAMPTZ NOT NULL,
            reference_kind TEXT,
            reference_id UUID,
            seq BIGSERIAL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
