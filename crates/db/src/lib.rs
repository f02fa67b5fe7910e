//! Database layer with `SeaORM` entities, repositories and the posting store.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - [`SeaOrmPostingStore`], the `PostgreSQL` side of the posting engine
//! - Repositories for posting configuration, vouchers and reconciliation
//! - Database migrations

mod convert;
pub mod entities;
pub mod error;
pub mod migration;
pub mod repositories;
pub mod store;

pub use repositories::{
    AccountMappingRepository, AccountRepository, AuditRepository, FiscalRepository,
    TemplateRepository, VoucherRepository, VoucherTypeRepository,
};
pub use store::{SeaOrmPostingStore, SeaOrmTx};

use std::time::Duration;

use ledgerpost_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a pooled connection sized by `config`.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}
