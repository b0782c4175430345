//! Shared test utilities for the machine catalog.
//!
//! This module provides helpers for setting up in-memory databases, building
//! machine rows with sensible defaults, and fake image payloads.

use crate::{
    core::{
        image::BlobStore,
        machine::MachineService,
        repository::{MachineFields, MachineRepository},
    },
    entities::MachineStatus,
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Routes test logs through the test harness writer. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all database tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// A repository over a fresh in-memory database.
pub async fn setup_test_repository() -> Result<MachineRepository> {
    Ok(MachineRepository::new(setup_test_db().await?))
}

/// A service over a fresh in-memory database.
pub async fn setup_test_service() -> Result<MachineService> {
    Ok(MachineService::new(setup_test_repository().await?))
}

/// Machine column values with sensible defaults.
///
/// # Defaults
/// * `model`: `"T-1"`
/// * `status`: draft
/// * `featured`: false, `sort_order`: 0
/// * no category, image, specifications or pricing
pub fn test_fields(name: &str, slug: &str) -> MachineFields {
    MachineFields {
        name: name.to_string(),
        model: "T-1".to_string(),
        slug: slug.to_string(),
        description: format!("{name} description"),
        short_description: String::new(),
        status: MachineStatus::Draft,
        category_id: None,
        featured: false,
        sort_order: 0,
        main_image: None,
        specifications: None,
        pricing: None,
    }
}

/// Blob store that keeps objects in memory and serves them under `/uploads`.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.lock().map_or(0, |objects| objects.len())
    }
}

impl BlobStore for InMemoryBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| Error::Io(std::io::Error::other("blob store lock poisoned")))?;
        if objects.contains_key(key) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                key.to_string(),
            )));
        }
        objects.insert(key.to_string(), bytes.to_vec());
        Ok(format!("/uploads/{key}"))
    }
}

/// Minimal PNG signature followed by padding.
pub fn png_bytes() -> Vec<u8> {
    let mut bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&[0u8; 24]);
    bytes
}

/// JPEG start-of-image marker followed by padding.
pub fn jpeg_bytes() -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.extend_from_slice(&[0u8; 28]);
    bytes
}

/// RIFF/WEBP container header.
pub fn webp_bytes() -> Vec<u8> {
    let mut bytes = b"RIFF\x24\x00\x00\x00WEBPVP8 ".to_vec();
    bytes.extend_from_slice(&[0u8; 20]);
    bytes
}

/// GIF89a header; a real image format that uploads still reject.
pub fn gif_bytes() -> Vec<u8> {
    let mut bytes = b"GIF89a".to_vec();
    bytes.extend_from_slice(&[0u8; 26]);
    bytes
}
