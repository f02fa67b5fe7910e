//! `SeaORM` Entity for transaction_template_rules table.
//!
//! `account_type` holds the account role a rule resolves through; a rule
//! with `account_id` set bypasses role resolution.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::EntryType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transaction_template_rules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub template_id: Uuid,
    pub line_number: i32,
    pub account_id: Option<Uuid>,
    pub account_type: Option<String>,
    pub entry_type: EntryType,
    pub amount_source: String,
    #[sea_orm(column_type = "Decimal(Some((9, 4)))", nullable)]
    pub percentage: Option<Decimal>,
    pub narration: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transaction_templates::Entity",
        from = "Column::TemplateId",
        to = "super::transaction_templates::Column::Id",
        on_delete = "Cascade"
    )]
    TransactionTemplates,
}

impl Related<super::transaction_templates::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionTemplates.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
