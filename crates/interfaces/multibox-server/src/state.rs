use std::sync::Arc;

use anyhow::{Context, Result};
use camino::Utf8Path;
use multibox_core::Catalog;
use multibox_infra::WindowManager;
use multibox_prefs::CopyOrchestrator;
use tokio::sync::Mutex;
use tracing::info;

use crate::settings::ServerSettings;

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub(crate) settings: Arc<ServerSettings>,
    pub(crate) orchestrator: CopyOrchestrator,
    pub(crate) windows: Arc<dyn WindowManager>,
    /// Held by the blocking copy task until it finishes; copies never overlap.
    pub(crate) copy_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(
        settings: ServerSettings,
        catalog: Arc<Catalog>,
        windows: Arc<dyn WindowManager>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            orchestrator: CopyOrchestrator::new(catalog),
            windows,
            copy_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &Catalog {
        self.orchestrator.catalog()
    }
}

/// The catalog override at `path`, or the built-in catalog.
pub fn load_catalog(path: Option<&Utf8Path>) -> Result<Catalog> {
    let Some(path) = path else {
        return Ok(Catalog::builtin());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog file {path}"))?;
    let catalog =
        Catalog::from_json(&json).with_context(|| format!("Invalid catalog file {path}"))?;
    info!("Loaded {} preference item(s) from {}", catalog.len(), path);
    Ok(catalog)
}
