//! Ledger reconciliation for Ledgerpost.
//!
//! Replays every account's ledger and checks every journal, then prints
//! what drifted.
//!
//! Usage:
//!   audit                 - Reconcile every tenant
//!   audit <tenant-id>...  - Reconcile the given tenants
//!
//! Exits with status 1 when any discrepancy is found.

use std::process::ExitCode;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use ledgerpost_db::{AuditRepository, connect_with};
use ledgerpost_shared::AppConfig;
use ledgerpost_shared::types::TenantId;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledgerpost=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let db = connect_with(&config.database)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");

    let audit = AuditRepository::new(db);

    let mut tenants = std::env::args()
        .skip(1)
        .map(|arg| {
            Uuid::parse_str(&arg)
                .map(TenantId::from_uuid)
                .with_context(|| format!("invalid tenant id '{arg}'"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    if tenants.is_empty() {
        tenants = audit.tenant_ids().await?;
    }

    let mut drifted = 0usize;
    for tenant_id in tenants {
        let report = audit.reconcile_tenant(tenant_id).await?;
        println!(
            "tenant {tenant_id}: {} accounts, {} journals, {} discrepancies",
            report.accounts_checked,
            report.journals_checked,
            report.discrepancies.len()
        );
        for discrepancy in &report.discrepancies {
            println!("  {discrepancy}");
        }
        if !report.is_clean() {
            drifted += 1;
        }
    }

    if drifted > 0 {
        println!("{drifted} tenant(s) out of balance");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
