//! Database configuration module.
//!
//! Opens the `SeaORM` connection and creates the catalog tables from the entity
//! definitions with `Schema::create_table_from_entity`, so the schema always
//! matches the Rust structs. The `machines` table carries a unique constraint on
//! `slug`, which is what actually keeps slugs unique when two admins save at
//! the same time. Specification and pricing rows reference their machine with
//! `ON DELETE CASCADE`.

use crate::config::AppConfig;
use crate::entities::{Machine, MachineColumn, MachinePricing, MachineSpecification};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Name of the composite index backing the status filter and date ordering.
pub const STATUS_CREATED_AT_INDEX: &str = "idx_machines_status_created_at";

/// Gets the database URL from the `DATABASE_URL` environment variable, falling back
/// to the value in the loaded configuration.
#[must_use]
pub fn get_database_url(config: &AppConfig) -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| config.database_url.clone())
}

/// Establishes a connection to the database at `database_url`.
///
/// For file-backed `SQLite` URLs the parent directory is created first, since
/// `SQLite` will create the file but not the folder it lives in.
#[instrument(skip_all)]
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    if let Some(parent) = sqlite_parent_dir(database_url) {
        debug!("Ensuring database directory {:?} exists", parent);
        std::fs::create_dir_all(parent)?;
    }

    let db = Database::connect(database_url).await?;
    info!("Database connection established");
    Ok(db)
}

fn sqlite_parent_dir(database_url: &str) -> Option<&Path> {
    let path = database_url.strip_prefix("sqlite://")?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    Path::new(path)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
}

/// Creates all catalog tables and indexes if they do not exist yet.
///
/// Safe to call on every start-up.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut machine_table = schema.create_table_from_entity(Machine);
    let mut specification_table = schema.create_table_from_entity(MachineSpecification);
    let mut pricing_table = schema.create_table_from_entity(MachinePricing);

    machine_table.if_not_exists();
    specification_table.if_not_exists();
    pricing_table.if_not_exists();

    db.execute(builder.build(&machine_table)).await?;
    db.execute(builder.build(&specification_table)).await?;
    db.execute(builder.build(&pricing_table)).await?;

    let status_index = Index::create()
        .name(STATUS_CREATED_AT_INDEX)
        .table(Machine)
        .col(MachineColumn::Status)
        .col(MachineColumn::CreatedAt)
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&status_index)).await?;

    debug!("Catalog tables ensured");
    Ok(())
}
