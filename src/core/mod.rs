//! Core layer - framework-agnostic machine lifecycle logic.
//!
//! Nothing in here knows about HTTP. Handlers in [`crate::api`] translate
//! requests into calls on [`MachineService`] and [`ImageIngestor`].

/// Upload validation and blob storage
pub mod image;
/// Create, update, delete and status changes with slug uniqueness
pub mod machine;
/// Queries and writes against the machine tables
pub mod repository;
/// URL slug derivation
pub mod slug;

pub use image::{BlobStore, ImageIngestor, LocalBlobStore};
pub use machine::{MachineDetail, MachineInput, MachineService};
pub use repository::{MachineFilter, MachineRepository, PageRequest};
