//! Conversions between entity models and core domain types.

use chrono::{DateTime, Utc};
use sea_orm::Set;

use ledgerpost_core::fiscal::FiscalYear;
use ledgerpost_core::ledger::{AccountSnapshot, JournalLine, JournalTotals};
use ledgerpost_core::posting::{
    AccountRoleMapping, BusinessReference, Journal, RuleTarget, TemplateRule, TransactionTemplate,
    Voucher,
};
use ledgerpost_shared::types::{
    AccountId, CurrencyId, FiscalYearId, JournalId, TemplateId, TemplateRuleId, TenantId, UserId,
    VoucherId, VoucherTypeId,
};

use crate::entities::{
    account_type_mappings, accounts, fiscal_years, journal_details, journals,
    transaction_template_rules, transaction_templates, vouchers,
};

fn utc(at: sea_orm::prelude::DateTimeWithTimeZone) -> DateTime<Utc> {
    at.with_timezone(&Utc)
}

pub(crate) fn template_from_models(
    template: transaction_templates::Model,
    rules: Vec<transaction_template_rules::Model>,
) -> TransactionTemplate {
    let mut rules: Vec<TemplateRule> = rules.into_iter().map(rule_from_model).collect();
    rules.sort_by_key(|r| r.line_number);
    TransactionTemplate {
        id: TemplateId::from_uuid(template.id),
        tenant_id: TenantId::from_uuid(template.tenant_id),
        code: template.code,
        name: template.name,
        transaction_type: template.transaction_type,
        voucher_type_id: VoucherTypeId::from_uuid(template.voucher_type_id),
        is_active: template.is_active,
        rules,
    }
}

fn rule_from_model(rule: transaction_template_rules::Model) -> TemplateRule {
    let target = match rule.account_id {
        Some(id) => RuleTarget::Account(AccountId::from_uuid(id)),
        None => RuleTarget::Role(rule.account_type.unwrap_or_default()),
    };
    TemplateRule {
        id: TemplateRuleId::from_uuid(rule.id),
        line_number: rule.line_number,
        target,
        entry_type: rule.entry_type.into(),
        amount_source: rule.amount_source,
        percentage: rule.percentage,
        narration: rule.narration,
    }
}

pub(crate) fn mapping_from_model(mapping: account_type_mappings::Model) -> AccountRoleMapping {
    AccountRoleMapping {
        role: mapping.account_type,
        module: mapping.module,
        account_id: AccountId::from_uuid(mapping.account_id),
    }
}

pub(crate) fn fiscal_year_from_model(year: fiscal_years::Model) -> FiscalYear {
    FiscalYear {
        id: FiscalYearId::from_uuid(year.id),
        tenant_id: TenantId::from_uuid(year.tenant_id),
        name: year.name,
        start_date: year.start_date,
        end_date: year.end_date,
        is_active: year.is_active,
        is_closed: year.is_closed,
    }
}

pub(crate) fn snapshot_from_model(account: &accounts::Model) -> AccountSnapshot {
    AccountSnapshot {
        account_id: AccountId::from_uuid(account.id),
        account_type: account.account_type.into(),
        balance: account.balance,
        version: account.version,
        is_active: account.is_active,
    }
}

pub(crate) fn voucher_from_model(voucher: vouchers::Model) -> Voucher {
    Voucher {
        id: VoucherId::from_uuid(voucher.id),
        tenant_id: TenantId::from_uuid(voucher.tenant_id),
        voucher_number: voucher.voucher_number,
        voucher_type_id: VoucherTypeId::from_uuid(voucher.voucher_type_id),
        voucher_date: voucher.voucher_date,
        transaction_type: voucher.transaction_type,
        template_id: voucher.template_id.map(TemplateId::from_uuid),
        module: voucher.module,
        reference: BusinessReference {
            reference_type: voucher.reference_type,
            reference_id: voucher.reference_id,
            reference_number: voucher.reference_number,
        },
        total_amount: voucher.total_amount,
        currency_id: voucher.currency_id.map(CurrencyId::from_uuid),
        exchange_rate: voucher.exchange_rate,
        base_currency_amount: voucher.base_currency_amount,
        narration: voucher.narration,
        is_posted: voucher.is_posted,
        is_deleted: voucher.is_deleted,
        is_reversal: voucher.is_reversal,
        reversed_voucher_id: voucher.reversed_voucher_id.map(VoucherId::from_uuid),
        reversal_voucher_id: voucher.reversal_voucher_id.map(VoucherId::from_uuid),
        reversal_reason: voucher.reversal_reason,
        reversed_at: voucher.reversed_at.map(utc),
        reversed_by: voucher.reversed_by.map(UserId::from_uuid),
        idempotency_key: voucher.idempotency_key,
        created_by: UserId::from_uuid(voucher.created_by),
        created_at: utc(voucher.created_at),
        posted_by: voucher.posted_by.map(UserId::from_uuid),
        posted_at: voucher.posted_at.map(utc),
    }
}

pub(crate) fn voucher_active_model(voucher: &Voucher) -> vouchers::ActiveModel {
    let created_at = voucher.created_at.into();
    vouchers::ActiveModel {
        id: Set(voucher.id.into_inner()),
        tenant_id: Set(voucher.tenant_id.into_inner()),
        voucher_number: Set(voucher.voucher_number.clone()),
        voucher_type_id: Set(voucher.voucher_type_id.into_inner()),
        voucher_date: Set(voucher.voucher_date),
        transaction_type: Set(voucher.transaction_type.clone()),
        template_id: Set(voucher.template_id.map(TemplateId::into_inner)),
        module: Set(voucher.module.clone()),
        reference_type: Set(voucher.reference.reference_type.clone()),
        reference_id: Set(voucher.reference.reference_id),
        reference_number: Set(voucher.reference.reference_number.clone()),
        total_amount: Set(voucher.total_amount),
        currency_id: Set(voucher.currency_id.map(CurrencyId::into_inner)),
        exchange_rate: Set(voucher.exchange_rate),
        base_currency_amount: Set(voucher.base_currency_amount),
        narration: Set(voucher.narration.clone()),
        is_posted: Set(voucher.is_posted),
        is_deleted: Set(voucher.is_deleted),
        is_reversal: Set(voucher.is_reversal),
        reversed_voucher_id: Set(voucher.reversed_voucher_id.map(VoucherId::into_inner)),
        reversal_voucher_id: Set(voucher.reversal_voucher_id.map(VoucherId::into_inner)),
        reversal_reason: Set(voucher.reversal_reason.clone()),
        reversed_at: Set(voucher.reversed_at.map(Into::into)),
        reversed_by: Set(voucher.reversed_by.map(UserId::into_inner)),
        idempotency_key: Set(voucher.idempotency_key.clone()),
        created_by: Set(voucher.created_by.into_inner()),
        created_at: Set(created_at),
        posted_by: Set(voucher.posted_by.map(UserId::into_inner)),
        posted_at: Set(voucher.posted_at.map(Into::into)),
        deleted_by: Set(None),
        deleted_at: Set(None),
        updated_at: Set(created_at),
    }
}

pub(crate) fn journal_from_models(
    voucher_id: VoucherId,
    journal: journals::Model,
    details: Vec<journal_details::Model>,
) -> Journal {
    let mut lines: Vec<JournalLine> = details
        .into_iter()
        .map(|d| JournalLine {
            line_number: d.line_number,
            account_id: AccountId::from_uuid(d.account_id),
            debit: d.debit_amount,
            credit: d.credit_amount,
            narration: d.narration,
        })
        .collect();
    lines.sort_by_key(|l| l.line_number);
    Journal {
        id: JournalId::from_uuid(journal.id),
        voucher_id,
        totals: JournalTotals {
            total_debit: journal.total_debit,
            total_credit: journal.total_credit,
        },
        lines,
    }
}
