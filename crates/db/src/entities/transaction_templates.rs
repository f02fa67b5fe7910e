//! `SeaORM` Entity for transaction_templates table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transaction_templates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub code: String,
    pub name: String,
    pub transaction_type: String,
    pub voucher_type_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transaction_template_rules::Entity")]
    TransactionTemplateRules,
    #[sea_orm(
        belongs_to = "super::voucher_types::Entity",
        from = "Column::VoucherTypeId",
        to = "super::voucher_types::Column::Id"
    )]
    VoucherTypes,
}

impl Related<super::transaction_template_rules::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionTemplateRules.def()
    }
}

impl Related<super::voucher_types::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VoucherTypes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
