//! Entity module - SeaORM entity definitions for the catalog tables.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod machine;
pub mod machine_pricing;
pub mod machine_specification;

// Re-export specific types to avoid conflicts
pub use machine::{Column as MachineColumn, Entity as Machine, MachineStatus, Model as MachineModel};
pub use machine_pricing::{
    Column as MachinePricingColumn, Entity as MachinePricing, Model as MachinePricingModel,
};
pub use machine_specification::{
    Column as MachineSpecificationColumn, Entity as MachineSpecification,
    Model as MachineSpecificationModel,
};
