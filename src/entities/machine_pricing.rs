//! Machine pricing entity - Commercial terms for a machine.
//! Most machines are sold on quotation, so `is_quote_only` defaults to true.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Machine pricing database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "machine_pricing")]
pub struct Model {
    /// Owning machine
    #[sea_orm(primary_key, auto_increment = false)]
    pub machine_id: i64,
    /// List price, if one is published
    pub base_price: Option<f64>,
    /// ISO 4217 currency code
    pub currency: String,
    /// Human-readable range, e.g. "10k-15k"
    pub price_range: Option<String>,
    /// Price is only given on request
    pub is_quote_only: bool,
    /// Free-form notes for the sales team
    pub price_notes: Option<String>,
}

/// Defines relationships with the owning machine
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each pricing row belongs to one machine
    #[sea_orm(
        belongs_to = "super::machine::Entity",
        from = "Column::MachineId",
        to = "super::machine::Column::Id",
        on_delete = "Cascade"
    )]
    Machine,
}

impl Related<super::machine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Machine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
