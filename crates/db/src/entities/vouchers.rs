//! `SeaORM` Entity for vouchers table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "vouchers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub voucher_number: String,
    pub voucher_type_id: Uuid,
    pub voucher_date: Date,
    pub transaction_type: String,
    pub template_id: Option<Uuid>,
    pub module: Option<String>,
    pub reference_type: String,
    pub reference_id: Uuid,
    pub reference_number: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_amount: Decimal,
    pub currency_id: Option<Uuid>,
    #[sea_orm(column_type = "Decimal(Some((19, 10)))", nullable)]
    pub exchange_rate: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub base_currency_amount: Option<Decimal>,
    pub narration: Option<String>,
    pub is_posted: bool,
    pub is_deleted: bool,
    pub is_reversal: bool,
    pub reversed_voucher_id: Option<Uuid>,
    pub reversal_voucher_id: Option<Uuid>,
    pub reversal_reason: Option<String>,
    pub reversed_at: Option<DateTimeWithTimeZone>,
    pub reversed_by: Option<Uuid>,
    pub idempotency_key: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub posted_by: Option<Uuid>,
    pub posted_at: Option<DateTimeWithTimeZone>,
    pub deleted_by: Option<Uuid>,
    pub deleted_at: Option<DateTimeWithTimeZone>,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::voucher_types::Entity",
        from = "Column::VoucherTypeId",
        to = "super::voucher_types::Column::Id"
    )]
    VoucherTypes,
    #[sea_orm(has_one = "super::journals::Entity")]
    Journals,
}

impl Related<super::voucher_types::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VoucherTypes.def()
    }
}

impl Related<super::journals::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Journals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
