//! Image ingestion - validates uploaded machine pictures and hands them to a blob store.
//!
//! The format check looks at the file's leading bytes only. The client-declared
//! content type and the filename extension are never trusted for that decision.

use crate::errors::{Error, Result};
use chrono::Utc;
use rand::Rng;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

/// Largest accepted upload, in bytes.
pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

/// Media types accepted by [`ImageIngestor::ingest`].
pub const ALLOWED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// Storage backend for uploaded objects.
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `key` and returns the public URL of the object.
    ///
    /// Must create its container on first use and must fail rather than
    /// replace an existing object.
    fn put(&self, key: &str, bytes: &[u8]) -> impl Future<Output = Result<String>> + Send;
}

/// Blob store backed by a local directory that is served under a URL prefix.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    url_prefix: String,
}

impl LocalBlobStore {
    /// Creates a store writing into `root`, whose files are reachable under `url_prefix`.
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.into(),
        }
    }

    /// Directory objects are written to.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String> {
        tokio::fs::create_dir_all(&self.root).await?;

        let path = self.root.join(key);
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        debug!("Wrote {} bytes to {}", bytes.len(), path.display());

        Ok(format!("{}/{key}", self.url_prefix.trim_end_matches('/')))
    }
}

/// Detects the media type of an image from its signature bytes.
///
/// Recognises the formats an admin is likely to upload; anything else is `None`.
#[must_use]
pub fn sniff_mime(content: &[u8]) -> Option<&'static str> {
    if content.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }
    if content.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if content.len() >= 12 && &content[0..4] == b"RIFF" && &content[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if content.starts_with(b"GIF87a") || content.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if content.starts_with(b"BM") {
        return Some("image/bmp");
    }
    None
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

/// Lower-cased extension of the declared filename, or the sniffed type's usual
/// extension when the declared one is missing or not plain alphanumerics.
fn storage_extension(declared_filename: &str, mime: &str) -> String {
    Path::new(declared_filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| extension_for_mime(mime).to_string())
}

/// `machine_<timestamp>_<6-hex>.<ext>`
fn generate_object_key(extension: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let suffix: u32 = rand::thread_rng().gen_range(0..=0x00FF_FFFF);
    format!("machine_{timestamp}_{suffix:06x}.{extension}")
}

/// Validates uploaded images and persists them through a [`BlobStore`].
#[derive(Debug, Clone)]
pub struct ImageIngestor<S = LocalBlobStore> {
    store: S,
}

impl<S: BlobStore> ImageIngestor<S> {
    /// Wraps a blob store.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Validates `bytes` and stores them, returning the public URL.
    ///
    /// # Errors
    /// - `Error::Validation("size exceeds limit")` above [`MAX_IMAGE_BYTES`]
    /// - `Error::Validation("unsupported format")` unless the content sniffs as
    ///   JPEG, PNG or WebP
    /// - `Error::Io` if the blob store fails
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn ingest(&self, bytes: &[u8], declared_filename: &str) -> Result<String> {
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(Error::validation("size exceeds limit"));
        }

        let mime = sniff_mime(bytes)
            .filter(|mime| ALLOWED_MIME_TYPES.contains(mime))
            .ok_or_else(|| Error::validation("unsupported format"))?;

        let key = generate_object_key(&storage_extension(declared_filename, mime));
        let url = self.store.put(&key, bytes).await?;
        info!("Stored {} image as {}", mime, url);
        Ok(url)
    }
}
