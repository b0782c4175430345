//! Application State
//!
//! Shared state passed to all API handlers.

use super::guards::{AuthGate, CsrfGuard, StaticCsrfGuard, TokenAuthGate};
use crate::config::AppConfig;
use crate::core::{ImageIngestor, LocalBlobStore, MachineRepository, MachineService};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Machine reads and writes
    pub service: MachineService,
    /// Validates and stores uploaded images
    pub images: ImageIngestor<LocalBlobStore>,
    /// Checks the CSRF token of mutating requests
    pub csrf: Arc<dyn CsrfGuard>,
    /// Resolves the acting admin
    pub auth: Arc<dyn AuthGate>,
    /// Settings the state was built from
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wires the bundled collaborators from settings.
    pub fn from_config(config: AppConfig, db: DatabaseConnection) -> Self {
        let images = ImageIngestor::new(LocalBlobStore::new(
            config.upload_dir.clone(),
            config.upload_url_prefix.clone(),
        ));
        Self {
            service: MachineService::new(MachineRepository::new(db)),
            images,
            csrf: Arc::new(StaticCsrfGuard::new(config.csrf_token.clone())),
            auth: Arc::new(TokenAuthGate::new(config.admins.clone())),
            config: Arc::new(config),
        }
    }

    /// Replaces the CSRF guard.
    #[must_use]
    pub fn with_csrf_guard(mut self, guard: Arc<dyn CsrfGuard>) -> Self {
        self.csrf = guard;
        self
    }

    /// Replaces the auth gate.
    #[must_use]
    pub fn with_auth_gate(mut self, gate: Arc<dyn AuthGate>) -> Self {
        self.auth = gate;
        self
    }
}
