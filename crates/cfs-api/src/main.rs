//! # cfs-api — Binary Entry Point
//!
//! Starts the Axum HTTP server. Binds to a configurable port (default
//! 8080); `DATABASE_URL` enables ledger persistence, `PAYROLL_CADENCE`
//! and `PAYROLL_ANCHOR` seed the period scheduler.

use anyhow::Context;
use chrono::NaiveDate;

use cfs_api::state::{AppConfig, AppState};
use cfs_payroll::Cadence;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = config_from_env()?;
    let port = config.port;

    let db_pool = cfs_api::db::init_pool()
        .await
        .context("database initialization failed")?;

    let state = AppState::with_config(config, db_pool);
    state
        .hydrate_from_db()
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("database hydration failed")?;

    let app = cfs_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("campus finance API listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind listener")?;
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

fn config_from_env() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let port = match std::env::var("PORT") {
        Ok(value) => value.parse().context("PORT must be a number")?,
        Err(_) => defaults.port,
    };
    let cadence = match std::env::var("PAYROLL_CADENCE") {
        Ok(value) => match value.as_str() {
            "MONTHLY" => Cadence::Monthly,
            "BI_WEEKLY" => Cadence::BiWeekly,
            other => anyhow::bail!("PAYROLL_CADENCE must be MONTHLY or BI_WEEKLY, got {other:?}"),
        },
        Err(_) => defaults.cadence,
    };
    let anchor = match std::env::var("PAYROLL_ANCHOR") {
        Ok(value) => value
            .parse::<NaiveDate>()
            .context("PAYROLL_ANCHOR must be a YYYY-MM-DD date")?,
        Err(_) => defaults.anchor,
    };

    Ok(AppConfig {
        port,
        cadence,
        anchor,
    })
}
