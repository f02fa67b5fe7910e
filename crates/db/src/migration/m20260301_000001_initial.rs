//! Initial database migration.
//!
//! Creates the posting schema: chart of accounts, voucher types, templates
//! and role mappings, vouchers, journals, ledgers and fiscal years, plus the
//! triggers that keep journals balanced and ledger rows append-only.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: CONFIGURATION
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(VOUCHER_TYPES_SQL).await?;
        db.execute_unprepared(TEMPLATES_SQL).await?;
        db.execute_unprepared(ACCOUNT_TYPE_MAPPINGS_SQL).await?;
        db.execute_unprepared(FISCAL_YEARS_SQL).await?;

        // ============================================================
        // PART 3: POSTINGS
        // ============================================================
        db.execute_unprepared(VOUCHERS_SQL).await?;
        db.execute_unprepared(JOURNALS_SQL).await?;
        db.execute_unprepared(LEDGERS_SQL).await?;

        // ============================================================
        // PART 4: TRIGGERS & FUNCTIONS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE account_type AS ENUM (
    'ASSET',
    'LIABILITY',
    'EQUITY',
    'INCOME',
    'EXPENSE'
);

CREATE TYPE entry_type AS ENUM ('DEBIT', 'CREDIT');
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL,
    code VARCHAR(50) NOT NULL,
    name VARCHAR(255) NOT NULL,
    account_type account_type NOT NULL,
    balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    version BIGINT NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (tenant_id, code),
    CONSTRAINT chk_account_version CHECK (version >= 0)
);

CREATE INDEX idx_accounts_tenant ON accounts(tenant_id);
";

const VOUCHER_TYPES_SQL: &str = r"
CREATE TABLE voucher_types (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL,
    code VARCHAR(50) NOT NULL,
    name VARCHAR(255) NOT NULL,
    prefix VARCHAR(20) NOT NULL,
    number_width INTEGER,
    last_number BIGINT NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (tenant_id, code),
    CONSTRAINT chk_number_width CHECK (number_width IS NULL OR number_width BETWEEN 1 AND 18),
    CONSTRAINT chk_last_number CHECK (last_number >= 0)
);
";

const TEMPLATES_SQL: &str = r"
CREATE TABLE transaction_templates (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL,
    code VARCHAR(50) NOT NULL,
    name VARCHAR(255) NOT NULL,
    transaction_type VARCHAR(100) NOT NULL,
    voucher_type_id UUID NOT NULL REFERENCES voucher_types(id),
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (tenant_id, code)
);

CREATE INDEX idx_templates_type ON transaction_templates(tenant_id, transaction_type)
    WHERE is_active;

CREATE TABLE transaction_template_rules (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL,
    template_id UUID NOT NULL REFERENCES transaction_templates(id) ON DELETE CASCADE,
    line_number INTEGER NOT NULL,
    account_id UUID REFERENCES accounts(id),
    account_type VARCHAR(100),
    entry_type entry_type NOT NULL,
    amount_source VARCHAR(100) NOT NULL,
    percentage NUMERIC(9, 4),
    narration VARCHAR(500),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (template_id, line_number),
    CONSTRAINT chk_rule_target CHECK (account_id IS NOT NULL OR account_type IS NOT NULL)
);
";

const ACCOUNT_TYPE_MAPPINGS_SQL: &str = r"
CREATE TABLE account_type_mappings (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL,
    account_type VARCHAR(100) NOT NULL,
    module VARCHAR(100),
    account_id UUID NOT NULL REFERENCES accounts(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

-- One mapping per (role, module); NULL module is its own slot
CREATE UNIQUE INDEX uq_mapping_module ON account_type_mappings(tenant_id, account_type, module)
    WHERE module IS NOT NULL;
CREATE UNIQUE INDEX uq_mapping_default ON account_type_mappings(tenant_id, account_type)
    WHERE module IS NULL;
";

const FISCAL_YEARS_SQL: &str = r"
CREATE TABLE fiscal_years (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL,
    name VARCHAR(50) NOT NULL,
    start_date DATE NOT NULL,
    end_date DATE NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT false,
    is_closed BOOLEAN NOT NULL DEFAULT false,
    closed_by UUID,
    closed_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (tenant_id, name),
    CONSTRAINT chk_fiscal_year_dates CHECK (start_date < end_date)
);

CREATE INDEX idx_fiscal_years_range ON fiscal_years(tenant_id, start_date, end_date);
CREATE UNIQUE INDEX uq_fiscal_years_active ON fiscal_years(tenant_id) WHERE is_active;
";

const VOUCHERS_SQL: &str = r"
CREATE TABLE vouchers (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL,
    voucher_number VARCHAR(50) NOT NULL,
    voucher_type_id UUID NOT NULL REFERENCES voucher_types(id),
    voucher_date DATE NOT NULL,
    transaction_type VARCHAR(100) NOT NULL,
    template_id UUID REFERENCES transaction_templates(id),
    module VARCHAR(100),
    reference_type VARCHAR(100) NOT NULL,
    reference_id UUID NOT NULL,
    reference_number VARCHAR(100),
    total_amount NUMERIC(19, 4) NOT NULL,
    currency_id UUID,
    exchange_rate NUMERIC(19, 10),
    base_currency_amount NUMERIC(19, 4),
    narration TEXT,
    is_posted BOOLEAN NOT NULL DEFAULT false,
    is_deleted BOOLEAN NOT NULL DEFAULT false,
    is_reversal BOOLEAN NOT NULL DEFAULT false,
    reversed_voucher_id UUID REFERENCES vouchers(id),
    reversal_voucher_id UUID REFERENCES vouchers(id),
    reversal_reason TEXT,
    reversed_at TIMESTAMPTZ,
    reversed_by UUID,
    idempotency_key VARCHAR(128),
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    posted_by UUID,
    posted_at TIMESTAMPTZ,
    deleted_by UUID,
    deleted_at TIMESTAMPTZ,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (tenant_id, voucher_type_id, voucher_number),
    CONSTRAINT chk_exchange_rate_positive CHECK (exchange_rate IS NULL OR exchange_rate > 0),
    CONSTRAINT chk_currency_has_rate CHECK (currency_id IS NULL OR exchange_rate IS NOT NULL),
    CONSTRAINT chk_reversal_link CHECK (is_reversal = (reversed_voucher_id IS NOT NULL))
);

CREATE UNIQUE INDEX uq_vouchers_idempotency ON vouchers(tenant_id, idempotency_key)
    WHERE idempotency_key IS NOT NULL;
CREATE UNIQUE INDEX uq_vouchers_reversed ON vouchers(reversed_voucher_id)
    WHERE reversed_voucher_id IS NOT NULL;
CREATE INDEX idx_vouchers_reference ON vouchers(tenant_id, reference_type, reference_id);
CREATE INDEX idx_vouchers_date ON vouchers(tenant_id, voucher_date);
";

const JOURNALS_SQL: &str = r"
CREATE TABLE journals (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL,
    voucher_id UUID NOT NULL UNIQUE REFERENCES vouchers(id),
    total_debit NUMERIC(19, 4) NOT NULL,
    total_credit NUMERIC(19, 4) NOT NULL,
    is_balanced BOOLEAN NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_journal_balanced CHECK (is_balanced AND total_debit = total_credit)
);

CREATE TABLE journal_details (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL,
    journal_id UUID NOT NULL REFERENCES journals(id),
    line_number INTEGER NOT NULL,
    account_id UUID NOT NULL REFERENCES accounts(id),
    debit_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    credit_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    narration VARCHAR(500),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (journal_id, line_number),
    CONSTRAINT chk_detail_one_sided CHECK (
        (debit_amount > 0 AND credit_amount = 0) OR (debit_amount = 0 AND credit_amount > 0)
    )
);

CREATE INDEX idx_journal_details_account ON journal_details(account_id);
";

const LEDGERS_SQL: &str = r"
CREATE TABLE ledgers (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL,
    account_id UUID NOT NULL REFERENCES accounts(id),
    voucher_id UUID NOT NULL REFERENCES vouchers(id),
    line_number INTEGER NOT NULL,
    transaction_date DATE NOT NULL,
    debit_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    credit_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    account_version BIGINT NOT NULL,
    previous_balance NUMERIC(19, 4) NOT NULL,
    balance NUMERIC(19, 4) NOT NULL,
    narration VARCHAR(500),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (account_id, account_version),
    CONSTRAINT chk_ledger_one_sided CHECK (
        (debit_amount > 0 AND credit_amount = 0) OR (debit_amount = 0 AND credit_amount > 0)
    )
);

CREATE INDEX idx_ledgers_voucher ON ledgers(voucher_id);
CREATE INDEX idx_ledgers_account_date ON ledgers(account_id, transaction_date);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: check_journal_balance
-- Ensures the details of a journal balance and match its header
-- ============================================================
CREATE OR REPLACE FUNCTION check_journal_balance()
RETURNS TRIGGER AS $$
DECLARE
    sum_debit NUMERIC(19, 4);
    sum_credit NUMERIC(19, 4);
    header_debit NUMERIC(19, 4);
BEGIN
    SELECT COALESCE(SUM(debit_amount), 0), COALESCE(SUM(credit_amount), 0)
    INTO sum_debit, sum_credit
    FROM journal_details
    WHERE journal_id = NEW.journal_id;

    SELECT total_debit INTO header_debit
    FROM journals
    WHERE id = NEW.journal_id;

    IF sum_debit <> sum_credit OR sum_debit <> header_debit THEN
        RAISE EXCEPTION 'Journal % is not balanced. Debit: %, Credit: %, Header: %',
            NEW.journal_id, sum_debit, sum_credit, header_debit;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE CONSTRAINT TRIGGER trg_check_journal_balance
AFTER INSERT ON journal_details
DEFERRABLE INITIALLY DEFERRED
FOR EACH ROW
EXECUTE FUNCTION check_journal_balance();

-- ============================================================
-- FUNCTION: prevent_append_only_modification
-- Ledger rows and journal details are never updated or deleted
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_append_only_modification()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'Table % is append-only. Post a reversing voucher instead.', TG_TABLE_NAME;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_ledgers_append_only
BEFORE UPDATE OR DELETE ON ledgers
FOR EACH ROW
EXECUTE FUNCTION prevent_append_only_modification();

CREATE TRIGGER trg_journal_details_append_only
BEFORE UPDATE OR DELETE ON journal_details
FOR EACH ROW
EXECUTE FUNCTION prevent_append_only_modification();

-- ============================================================
-- FUNCTION: prevent_posted_voucher_modification
-- Posted vouchers keep their amounts and dates; only the reversal link may be set
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_posted_voucher_modification()
RETURNS TRIGGER AS $$
BEGIN
    IF TG_OP = 'DELETE' THEN
        IF OLD.is_posted THEN
            RAISE EXCEPTION 'Cannot delete posted voucher %.', OLD.voucher_number;
        END IF;
        RETURN OLD;
    END IF;

    IF OLD.is_posted AND (
        NEW.total_amount <> OLD.total_amount
        OR NEW.voucher_date <> OLD.voucher_date
        OR NEW.voucher_number <> OLD.voucher_number
        OR NOT NEW.is_posted
        OR NEW.is_deleted
    ) THEN
        RAISE EXCEPTION 'Cannot modify posted voucher %. Post a reversing voucher instead.',
            OLD.voucher_number;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_posted_voucher_mod
BEFORE UPDATE OR DELETE ON vouchers
FOR EACH ROW
EXECUTE FUNCTION prevent_posted_voucher_modification();
";

const DROP_ALL_SQL: &str = r"
-- ============================================================
-- DROP ALL: Rollback migration
-- Order matters due to foreign key constraints
-- ============================================================

DROP TRIGGER IF EXISTS trg_prevent_posted_voucher_mod ON vouchers;
DROP TRIGGER IF EXISTS trg_journal_details_append_only ON journal_details;
DROP TRIGGER IF EXISTS trg_ledgers_append_only ON ledgers;
DROP TRIGGER IF EXISTS trg_check_journal_balance ON journal_details;

DROP FUNCTION IF EXISTS prevent_posted_voucher_modification();
DROP FUNCTION IF EXISTS prevent_append_only_modification();
DROP FUNCTION IF EXISTS check_journal_balance();

DROP TABLE IF EXISTS ledgers CASCADE;
DROP TABLE IF EXISTS journal_details CASCADE;
DROP TABLE IF EXISTS journals CASCADE;
DROP TABLE IF EXISTS vouchers CASCADE;
DROP TABLE IF EXISTS fiscal_years CASCADE;
DROP TABLE IF EXISTS account_type_mappings CASCADE;
DROP TABLE IF EXISTS transaction_template_rules CASCADE;
DROP TABLE IF EXISTS transaction_templates CASCADE;
DROP TABLE IF EXISTS voucher_types CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;

DROP TYPE IF EXISTS entry_type CASCADE;
DROP TYPE IF EXISTS account_type CASCADE;
";
