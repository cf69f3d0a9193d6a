//! Local HTTP companion server for the multibox control panel.
//!
//! Routes:
//! - `GET /` control panel page from the static folder
//! - `GET /preference_items` the preference catalog
//! - `POST /copy_preferences` copy preference files between characters
//! - `POST /launch` start game clients
//! - `POST /check_and_focus_window` report running characters that clash with a launch
//! - `POST /focus_launcher_window` bring the launcher window forward
//! - `POST /close_running_instances` close the clients of the selected accounts

pub mod routes;
pub mod settings;
pub mod state;
pub mod wire;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

pub use routes::router;
pub use settings::{ServerSettings, SettingsStore};
pub use state::{load_catalog, AppState};

/// Bind to the configured address and serve until Ctrl+C.
pub async fn serve(state: AppState) -> Result<()> {
    let addr = state.settings().socket_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(
        "Companion server listening on http://{}",
        listener.local_addr().context("Listener has no local address")?
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down");
        })
        .await
        .context("Server error")?;
    Ok(())
}
