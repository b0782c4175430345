//! Machine entity - An industrial machine listed in the catalog.
//!
//! The slug is unique across the table and the status column only ever holds one
//! of the [`MachineStatus`] values. Specifications and pricing live in their own
//! tables and are removed by the store when the machine row is deleted.

use crate::errors::Error;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Lifecycle tag governing whether a machine is visible on the public site.
///
/// Every state may move to every other state.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum MachineStatus {
    /// Not yet visible; the state every new machine starts in
    #[default]
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Visible on the public site
    #[sea_orm(string_value = "published")]
    Published,
    /// Retired from the public site but kept in the admin
    #[sea_orm(string_value = "archived")]
    Archived,
}

impl MachineStatus {
    /// All statuses, in the order the admin UI lists them.
    pub const ALL: [Self; 3] = [Self::Draft, Self::Published, Self::Archived];

    /// Wire and storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }

    /// Exact, case-sensitive match against the three wire values.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MachineStatus {
    type Err = Error;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| Error::validation(format!("invalid status: {value}")))
    }
}

/// Machine database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "machines")]
pub struct Model {
    /// Surrogate key assigned by the store; never reused
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name, never empty
    pub name: String,
    /// Manufacturer model designation, free text
    pub model: String,
    /// URL-safe identifier used in public paths
    #[sea_orm(unique)]
    pub slug: String,
    /// Long description shown on the detail page
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// Teaser text for listings
    pub short_description: String,
    /// Lifecycle status
    pub status: MachineStatus,
    /// Category reference; categories are managed elsewhere
    pub category_id: Option<i64>,
    /// Highlighted on the landing page
    pub featured: bool,
    /// Display ordering hint, not unique
    pub sort_order: i32,
    /// Public path or external URL of the main picture
    pub main_image: Option<String>,
    /// Admin user that created the row
    pub created_by: Option<i64>,
    /// Admin user that last edited the row
    pub updated_by: Option<i64>,
    /// When the machine was created
    pub created_at: DateTimeUtc,
    /// When the machine was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Machine and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Technical data sheet, at most one per machine
    #[sea_orm(has_one = "super::machine_specification::Entity")]
    Specification,
    /// Commercial terms, at most one per machine
    #[sea_orm(has_one = "super::machine_pricing::Entity")]
    Pricing,
}

impl Related<super::machine_specification::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Specification.def()
    }
}

impl Related<super::machine_pricing::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pricing.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
