//! Database seeder for Ledgerpost development and testing.
//!
//! Seeds a demo tenant with a small chart of accounts, a sales voucher type,
//! sales order and invoice templates, their role mappings and an open
//! fiscal year. Running it twice is a no-op.
//!
//! Usage: cargo run --bin seeder

use std::collections::HashMap;

use anyhow::Context;
use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use ledgerpost_core::ledger::{AccountType, EntryType};
use ledgerpost_db::repositories::{
    CreateAccountInput, CreateFiscalYearInput, CreateTemplateInput, CreateVoucherTypeInput,
    TemplateRuleInput,
};
use ledgerpost_db::{
    AccountMappingRepository, AccountRepository, FiscalRepository, TemplateRepository,
    VoucherTypeRepository, connect_with,
};
use ledgerpost_shared::{AppConfig, AppError, AppResult};
use ledgerpost_shared::types::{AccountId, TenantId, VoucherTypeId};

/// Demo tenant ID (consistent across runs)
const DEMO_TENANT_ID: Uuid = Uuid::from_u128(1);

/// Chart of accounts: code, name, type, mapped role.
const ACCOUNTS: &[(&str, &str, AccountType, &str)] = &[
    ("1100", "Accounts receivable", AccountType::Asset, "ACCOUNTS_RECEIVABLE"),
    ("2200", "GST payable", AccountType::Liability, "GST_OUTPUT"),
    ("4000", "Sales", AccountType::Income, "SALES"),
    ("4100", "Freight recovered", AccountType::Income, "FREIGHT"),
    ("5900", "Round-off", AccountType::Expense, "ROUND_OFF"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
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

    let tenant_id = TenantId::from_uuid(DEMO_TENANT_ID);
    if let Err(err) = seed(&db, tenant_id).await {
        error!(
            code = err.error_code(),
            category = ?err.category(),
            "Seeding failed: {}",
            err.message()
        );
        return Err(err.into());
    }
    Ok(())
}

async fn seed(db: &DatabaseConnection, tenant_id: TenantId) -> AppResult<()> {
    let voucher_types = VoucherTypeRepository::new(db.clone());
    if !voucher_types.list_voucher_types(tenant_id).await?.is_empty() {
        info!(tenant_id = %tenant_id, "Demo tenant already seeded, skipping");
        return Ok(());
    }

    let roles = seed_accounts(db, tenant_id).await?;
    info!(accounts = roles.len(), "Seeded chart of accounts");

    let voucher_type = voucher_types
        .create_voucher_type(CreateVoucherTypeInput {
            tenant_id,
            code: "SALES".into(),
            name: "Sales voucher".into(),
            prefix: "SV-".into(),
            number_width: None,
        })
        .await?;
    let voucher_type = VoucherTypeId::from_uuid(voucher_type.id);

    seed_templates(db, tenant_id, voucher_type).await?;
    info!("Seeded sales templates");

    let mappings = AccountMappingRepository::new(db.clone());
    for (role, account_id) in &roles {
        mappings
            .upsert_mapping(tenant_id, role, None, *account_id)
            .await?;
    }

    seed_fiscal_year(db, tenant_id).await?;
    info!(tenant_id = %tenant_id, "Seeding complete");
    Ok(())
}

async fn seed_accounts(
    db: &DatabaseConnection,
    tenant_id: TenantId,
) -> AppResult<HashMap<&'static str, AccountId>> {
    let accounts = AccountRepository::new(db.clone());
    let mut roles = HashMap::new();
    for &(code, name, account_type, role) in ACCOUNTS {
        let account = accounts
            .create_account(CreateAccountInput {
                tenant_id,
                code: code.into(),
                name: name.into(),
                account_type,
            })
            .await?;
        roles.insert(role, AccountId::from_uuid(account.id));
    }
    Ok(roles)
}

fn rule(
    line_number: i32,
    role: &str,
    entry_type: EntryType,
    amount_source: &str,
    percentage: Option<Decimal>,
) -> TemplateRuleInput {
    TemplateRuleInput {
        line_number,
        account_role: Some(role.into()),
        account_id: None,
        entry_type,
        amount_source: amount_source.into(),
        percentage,
        narration: None,
    }
}

async fn seed_templates(
    db: &DatabaseConnection,
    tenant_id: TenantId,
    voucher_type_id: VoucherTypeId,
) -> AppResult<()> {
    let templates = TemplateRepository::new(db.clone());

    templates
        .create_template(CreateTemplateInput {
            tenant_id,
            code: "SO_POST".into(),
            name: "Sales order".into(),
            transaction_type: "SALES_ORDER".into(),
            voucher_type_id,
            rules: vec![
                rule(1, "ACCOUNTS_RECEIVABLE", EntryType::Debit, "TOTAL_AMOUNT", None),
                rule(2, "SALES", EntryType::Credit, "TOTAL_AMOUNT", None),
            ],
        })
        .await?;

    templates
        .create_template(CreateTemplateInput {
            tenant_id,
            code: "SI_POST".into(),
            name: "Sales invoice".into(),
            transaction_type: "SALES_INVOICE".into(),
            voucher_type_id,
            rules: vec![
                rule(1, "ACCOUNTS_RECEIVABLE", EntryType::Debit, "TOTAL_AMOUNT", None),
                rule(2, "SALES", EntryType::Credit, "TAXABLE_AMOUNT", None),
                rule(3, "GST_OUTPUT", EntryType::Credit, "GST_AMOUNT", None),
                rule(4, "FREIGHT", EntryType::Credit, "FREIGHT_AMOUNT", None),
                rule(5, "ROUND_OFF", EntryType::Credit, "ROUND_OFF", None),
            ],
        })
        .await?;

    Ok(())
}

async fn seed_fiscal_year(db: &DatabaseConnection, tenant_id: TenantId) -> AppResult<()> {
    let year = Utc::now().year();
    let (Some(start), Some(end)) = (
        NaiveDate::from_ymd_opt(year, 1, 1),
        NaiveDate::from_ymd_opt(year, 12, 31),
    ) else {
        return Err(AppError::internal(format!("no calendar dates for {year}")));
    };

    let fiscal = FiscalRepository::new(db.clone());
    let created = fiscal
        .create_fiscal_year(CreateFiscalYearInput {
            tenant_id,
            name: format!("FY{year}"),
            start_date: start,
            end_date: end,
        })
        .await?;
    fiscal.activate(tenant_id, created.id).await?;
    info!(fiscal_year = %created.name, "Seeded fiscal year");
    Ok(())
}
