//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::config::Config;
use crate::services::Extractor;

/// State shared across all HTTP handlers. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Downloader used to populate request workspaces.
    pub extractor: Arc<dyn Extractor>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
