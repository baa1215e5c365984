//! privilege-migrate — one-shot cleanup of redundant privilege records.
//!
//! Reads config from flags or env vars (a `.env` file is honored):
//!   PRIVILEGE_DATABASE_URL    — Postgres connection string (required)
//!   PRIVILEGE_MAX_CONNECTIONS — pool size (default: 2)
//!
//! Safe to re-run: already-reconciled pairs are left alone.

mod cli;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use privilege_core::run_reconciliation;
use privilege_postgres::PgPrivilegeStore;

use crate::cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,privilege_migrate=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let policy = cli.policy();

    let store = PgPrivilegeStore::connect(&cli.database_url, cli.max_connections)
        .await
        .context("opening privilege store")?;
    tracing::info!(
        relationships = ?policy.relationships,
        tie_break = %policy.tie_break,
        dry_run = policy.dry_run,
        "connected, starting reconciliation"
    );

    let report = run_reconciliation(&store, &policy)
        .await
        .context("reconciliation aborted; re-run to finish remaining pairs")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", output::render_summary(&report));
    }

    store.pool().close().await;
    Ok(())
}
