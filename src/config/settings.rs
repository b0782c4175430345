//! Application settings.
//!
//! Settings come from a TOML file (`MACHINE_CATALOG_CONFIG`, default
//! `./config.toml`). Every field has a default, so a missing file is not an
//! error. Secrets may be supplied through the environment instead: `DATABASE_URL`
//! and `CSRF_TOKEN` take precedence over the file.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming the settings file.
pub const CONFIG_PATH_ENV: &str = "MACHINE_CATALOG_CONFIG";

/// Top-level settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Socket address the HTTP server listens on
    pub bind_address: String,
    /// `SeaORM` connection URL
    pub database_url: String,
    /// Directory uploaded images are written to
    pub upload_dir: PathBuf,
    /// Public URL prefix the upload directory is served under
    pub upload_url_prefix: String,
    /// Where HTML-mode actions redirect to
    pub dashboard_path: String,
    /// Request body limit for the action endpoint
    pub max_body_bytes: usize,
    /// Shared CSRF token expected on mutating requests
    pub csrf_token: Option<String>,
    /// Accounts allowed into the admin endpoints
    pub admins: Vec<AdminAccount>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            database_url: "sqlite://data/machine_catalog.sqlite?mode=rwc".to_string(),
            upload_dir: PathBuf::from("public/uploads"),
            upload_url_prefix: "/uploads".to_string(),
            dashboard_path: "/admin/dashboard?section=machines".to_string(),
            max_body_bytes: 8 * 1024 * 1024,
            csrf_token: None,
            admins: Vec::new(),
        }
    }
}

/// An admin account recognised by the bearer-token auth gate.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AdminAccount {
    /// Bearer token presented in the `Authorization` header
    pub token: String,
    /// User id recorded in `created_by` / `updated_by`
    pub id: i64,
    /// Display name
    pub username: String,
}

/// Parses settings from a TOML file.
///
/// # Errors
/// Returns `Error::Config` if the file cannot be read or is not valid TOML.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;
    parse_config(&contents)
}

/// Parses settings from a TOML string.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Reads an optional environment override. A set but non-UTF-8 value is an error.
fn env_override(name: &str) -> Result<Option<String>> {
    match std::env::var(name) {
        Ok(value) => {
            debug!("Using {} from the environment", name);
            Ok(Some(value))
        }
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Loads the settings file named by `MACHINE_CATALOG_CONFIG` (or `config.toml`),
/// then applies environment overrides.
///
/// A missing file falls back to the defaults; an unreadable or malformed one is an error.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path =
        std::env::var(CONFIG_PATH_ENV).map_or_else(|_| PathBuf::from("config.toml"), PathBuf::from);

    let mut config = if path.exists() {
        let config = load_config(&path)?;
        info!("Loaded configuration from {}", path.display());
        config
    } else {
        warn!(
            "Configuration file {} not found, using defaults",
            path.display()
        );
        AppConfig::default()
    };

    if let Some(url) = env_override("DATABASE_URL")? {
        config.database_url = url;
    }
    if let Some(token) = env_override("CSRF_TOKEN")? {
        config.csrf_token = Some(token);
    }
    if config.csrf_token.is_none() {
        warn!("No CSRF token configured; every mutating request will be rejected");
    }
    if config.admins.is_empty() {
        warn!("No admin accounts configured; the admin API will reject all requests");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            bind_address = "0.0.0.0:9000"
            database_url = "sqlite::memory:"
            upload_dir = "/var/lib/catalog/uploads"
            upload_url_prefix = "/media"
            csrf_token = "s3cret"

            [[admins]]
            token = "abc"
            id = 7
            username = "maria"
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:9000");
        assert_eq!(config.upload_dir, PathBuf::from("/var/lib/catalog/uploads"));
        assert_eq!(config.upload_url_prefix, "/media");
        assert_eq!(config.csrf_token.as_deref(), Some("s3cret"));
        assert_eq!(config.admins.len(), 1);
        assert_eq!(config.admins[0].id, 7);
        // Unspecified fields keep their defaults
        assert_eq!(config.max_body_bytes, 8 * 1024 * 1024);
        assert_eq!(config.dashboard_path, "/admin/dashboard?section=machines");
    }

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.bind_address, "127.0.0.1:8080");
        assert!(config.admins.is_empty());
        assert!(config.csrf_token.is_none());
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = parse_config("bind_address = [");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("/nonexistent/catalog/config.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_env_override_absent() {
        assert!(
            env_override("MACHINE_CATALOG_TEST_NEVER_SET")
                .unwrap()
                .is_none()
        );
    }
}
