//! Configuration writes reach a running engine through cache invalidation.

mod common;

use std::sync::Arc;

use rust_decimal_macros::dec;

use common::{sales_order, seed_tenant, start_db};
use ledgerpost_core::ledger::{AccountType, EntryType};
use ledgerpost_core::posting::TenantConfigCache;
use ledgerpost_core::{PostingEngine, PostingError};
use ledgerpost_db::repositories::{
    ConfigError, CreateAccountInput, CreateTemplateInput, TemplateRuleInput,
};
use ledgerpost_db::{
    AccountMappingRepository, AccountRepository, SeaOrmPostingStore, TemplateRepository,
};
use ledgerpost_shared::PostingSettings;
use ledgerpost_shared::types::{AccountId, TemplateId};

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_mapping_change_invalidates_engine_cache() {
    let pg = start_db().await;
    let tenant = seed_tenant(&pg.db).await;

    let settings = PostingSettings::default();
    let cache = TenantConfigCache::from_settings(&settings);
    let engine = PostingEngine::with_cache(
        SeaOrmPostingStore::from_settings(pg.db.clone(), &settings),
        cache.clone(),
        settings,
    );

    let resolved = engine
        .resolve_account(tenant.tenant_id, "SALES", None)
        .await
        .unwrap();
    assert_eq!(resolved, tenant.sales);

    let services = AccountRepository::new(pg.db.clone())
        .create_account(CreateAccountInput {
            tenant_id: tenant.tenant_id,
            code: "4100".into(),
            name: "Service income".into(),
            account_type: AccountType::Income,
        })
        .await
        .unwrap();
    let services = AccountId::from_uuid(services.id);

    AccountMappingRepository::new(pg.db.clone())
        .with_invalidation(Arc::new(cache.clone()))
        .upsert_mapping(tenant.tenant_id, "sales", Some("services"), services)
        .await
        .unwrap();

    let module = engine
        .resolve_account(tenant.tenant_id, "SALES", Some("SERVICES"))
        .await
        .unwrap();
    assert_eq!(module, services);
    let fallback = engine
        .resolve_account(tenant.tenant_id, "SALES", Some("RETAIL"))
        .await
        .unwrap();
    assert_eq!(fallback, tenant.sales);

    let mut request = sales_order(&tenant, dec!(40));
    request.module = Some("services".into());
    engine.post(&request).await.unwrap();
    let income = AccountRepository::new(pg.db.clone())
        .find_account(tenant.tenant_id, services)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(income.balance, dec!(40));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_template_writes_are_validated_and_toggle() {
    let pg = start_db().await;
    let tenant = seed_tenant(&pg.db).await;

    let settings = PostingSettings::default();
    let cache = TenantConfigCache::from_settings(&settings);
    let engine = PostingEngine::with_cache(
        SeaOrmPostingStore::from_settings(pg.db.clone(), &settings),
        cache.clone(),
        settings,
    );
    let templates = TemplateRepository::new(pg.db.clone()).with_invalidation(Arc::new(cache));

    let err = templates
        .create_template(CreateTemplateInput {
            tenant_id: tenant.tenant_id,
            code: "SO_POST".into(),
            name: "Duplicate".into(),
            transaction_type: "SALES_ORDER".into(),
            voucher_type_id: tenant.voucher_type,
            rules: vec![TemplateRuleInput {
                line_number: 1,
                account_role: Some("SALES".into()),
                account_id: None,
                entry_type: EntryType::Credit,
                amount_source: "TOTAL_AMOUNT".into(),
                percentage: None,
                narration: None,
            }],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateCode(_)));

    let err = templates
        .create_template(CreateTemplateInput {
            tenant_id: tenant.tenant_id,
            code: "PO_POST".into(),
            name: "Purchase".into(),
            transaction_type: "PURCHASE_ORDER".into(),
            voucher_type_id: tenant.voucher_type,
            rules: vec![TemplateRuleInput {
                line_number: 1,
                account_role: None,
                account_id: Some(AccountId::new()),
                entry_type: EntryType::Debit,
                amount_source: "TOTAL_AMOUNT".into(),
                percentage: None,
                narration: None,
            }],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigError::AccountNotFound(_)));

    let so = engine
        .resolve_template(tenant.tenant_id, "SALES_ORDER")
        .await
        .unwrap();
    templates
        .set_active(tenant.tenant_id, so.id, false)
        .await
        .unwrap();

    let err = engine
        .post(&sales_order(&tenant, dec!(10)))
        .await
        .unwrap_err();
    assert!(matches!(err, PostingError::TemplateNotFound { .. }));

    let listed = templates.list_templates(tenant.tenant_id).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(
        templates
            .find_template(tenant.tenant_id, TemplateId::new())
            .await
            .unwrap()
            .is_none()
    );
}
