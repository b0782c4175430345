//! Machine specification entity - Technical data attached to a machine.
//!
//! Keyed by the owning machine's id; the foreign key cascades on delete.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Machine specification database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "machine_specifications")]
pub struct Model {
    /// Owning machine
    #[sea_orm(primary_key, auto_increment = false)]
    pub machine_id: i64,
    /// Throughput or load capacity, free text (e.g. "500 kg/h")
    pub capacity: Option<String>,
    /// Operating speed, free text
    pub speed: Option<String>,
    /// Motor power, free text
    pub power: Option<String>,
    /// Width in millimetres
    pub width: Option<f64>,
    /// Height in millimetres
    pub height: Option<f64>,
    /// Depth in millimetres
    pub depth: Option<f64>,
    /// Weight in kilograms
    pub weight: Option<f64>,
    /// JSON array of material names
    pub materials: Json,
    /// JSON array of certification names
    pub certifications: Json,
}

/// Defines relationships with the owning machine
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each specification belongs to one machine
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
