use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use camino::Utf8PathBuf;
use multibox_config::LAUNCHER_WINDOW_TITLE;
use multibox_core::{find_conflicts, ConflictReport, PreferenceItem};
use multibox_infra::desktop::{close_client_windows, running_characters};
use multibox_infra::{ClientLauncher, ClientLogin, FocusOutcome, LaunchError, WindowError};
use multibox_prefs::{CopyReport, PrefsError};
use tracing::{error, info, warn};

use crate::state::AppState;
use crate::wire::{
    AccountsBody, CloseResponse, ConflictResponse, CopyPreferencesBody, LaunchBody,
    LaunchResponse, StatusBody,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/preference_items", get(preference_items))
        .route("/copy_preferences", post(copy_preferences))
        .route("/launch", post(launch))
        .route("/check_and_focus_window", post(check_and_focus_window))
        .route("/focus_launcher_window", post(focus_launcher_window))
        .route("/close_running_instances", post(close_running_instances))
        .with_state(state)
}

/// Error answer with a `{status: "error", message}` body.
#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<PrefsError> for ApiError {
    fn from(e: PrefsError) -> Self {
        if e.is_fatal() {
            Self::bad_request(e.to_string())
        } else {
            Self::internal(e.to_string())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(StatusBody::new("error", self.message))).into_response()
    }
}

async fn index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let Some(dir) = state.settings.static_dir.as_ref() else {
        return Err(ApiError::not_found("Control panel is not installed"));
    };
    let path = dir.join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Ok(Html(html)),
        Err(e) => {
            warn!("Could not read {}: {}", path, e);
            Err(ApiError::not_found(format!("Control panel not found at {path}")))
        }
    }
}

async fn preference_items(State(state): State<AppState>) -> Json<Vec<PreferenceItem>> {
    Json(state.catalog().items().to_vec())
}

async fn copy_preferences(
    State(state): State<AppState>,
    payload: Result<Json<CopyPreferencesBody>, JsonRejection>,
) -> Result<Json<CopyReport>, ApiError> {
    let Json(body) = payload?;
    let request = body
        .into_request(state.settings.preferences_root.as_deref())
        .map_err(ApiError::bad_request)?;

    // The blocking task owns the guard; the lock is held until the copy ends,
    // even when the client disconnects first.
    let guard = state.copy_lock.clone().lock_owned().await;
    let orchestrator = state.orchestrator.clone();
    let report = tokio::task::spawn_blocking(move || {
        let _guard = guard;
        orchestrator.execute(&request)
    })
    .await
    .map_err(|e| ApiError::internal(format!("Preference copy task failed: {e}")))?
    .map_err(|e| {
        warn!("Preference copy rejected: {}", e);
        ApiError::from(e)
    })?;
    Ok(Json(report))
}

async fn launch(
    State(state): State<AppState>,
    payload: Result<Json<LaunchBody>, JsonRejection>,
) -> Result<Json<LaunchResponse>, ApiError> {
    let Json(body) = payload?;
    let game_folder = non_empty_or(body.game_folder, state.settings.game_folder.as_ref());
    let dll_folder = non_empty_or(body.dll_folder, state.settings.dll_folder.as_ref());
    if game_folder.is_empty() || dll_folder.is_empty() || body.characters.is_empty() {
        return Err(ApiError::bad_request("Missing required data."));
    }

    let launcher = ClientLauncher::new(game_folder, dll_folder);
    launcher.verify().map_err(|e| match e {
        LaunchError::LauncherMissing(_) | LaunchError::GameFolderMissing(_) => {
            ApiError::not_found(e.to_string())
        }
        LaunchError::Config(msg) => ApiError::bad_request(msg),
        other => ApiError::internal(other.to_string()),
    })?;

    let logins: Vec<ClientLogin> = body.characters.into_iter().map(Into::into).collect();
    info!("Launch requested for {} character(s)", logins.len());
    let summary = tokio::task::spawn_blocking(move || launcher.launch_all(&logins))
        .await
        .map_err(|e| ApiError::internal(format!("Launch task failed: {e}")))?;

    let response = if summary.errors.is_empty() {
        info!("All {} characters launched successfully", summary.launched.len());
        LaunchResponse {
            status: "success",
            message: "All selected characters launched successfully!".to_string(),
            launched: summary.launched,
            errors: Vec::new(),
        }
    } else {
        warn!(
            "Partial success - Launched: {}, Errors: {}",
            summary.launched.len(),
            summary.errors.len()
        );
        LaunchResponse {
            status: "partial_success",
            message: "Some launches failed.".to_string(),
            launched: summary.launched,
            errors: summary.errors,
        }
    };
    Ok(Json(response))
}

fn non_empty_or(value: String, fallback: Option<&Utf8PathBuf>) -> String {
    if value.trim().is_empty() {
        fallback.map(|p| p.to_string()).unwrap_or_default()
    } else {
        value
    }
}

async fn check_and_focus_window(
    State(state): State<AppState>,
    payload: Result<Json<AccountsBody>, JsonRejection>,
) -> (StatusCode, Json<ConflictResponse>) {
    let reply = |code: StatusCode,
                 status: &'static str,
                 message: String,
                 report: ConflictReport| {
        (
            code,
            Json(ConflictResponse {
                status,
                message,
                report,
            }),
        )
    };

    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            return reply(
                StatusCode::BAD_REQUEST,
                "error",
                format!("Invalid request body: {}", rejection.body_text()),
                ConflictReport::default(),
            );
        }
    };
    if !body.is_complete() {
        error!("No account data provided for checking");
        return reply(
            StatusCode::BAD_REQUEST,
            "error",
            "No account data provided".to_string(),
            ConflictReport::default(),
        );
    }
    if !state.windows.is_supported() {
        warn!("{}", WindowError::Unsupported);
        return reply(
            StatusCode::OK,
            "unsupported",
            "Window checking is only supported on Windows".to_string(),
            ConflictReport::default(),
        );
    }

    let running = match running_characters(state.windows.as_ref()) {
        Ok(running) => running,
        Err(e) => {
            error!("Error checking windows: {}", e);
            return reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "error",
                format!("Error checking windows: {e}"),
                ConflictReport::default(),
            );
        }
    };

    let report = find_conflicts(&body.all_accounts, &body.selected_accounts, &running);
    if report.has_conflicts() {
        let message = format!(
            "Found conflicts for {} account(s)",
            report.conflicted_accounts.len()
        );
        warn!("{}", message);
        reply(StatusCode::OK, "conflicts_found", message, report)
    } else {
        info!(
            "No conflicts found. {} running character(s) detected but none conflict with selected accounts",
            report.running_characters.len()
        );
        reply(
            StatusCode::OK,
            "no_conflicts",
            "No conflicts detected - safe to launch".to_string(),
            report,
        )
    }
}

async fn focus_launcher_window(
    State(state): State<AppState>,
) -> Result<Json<StatusBody>, ApiError> {
    if !state.windows.is_supported() {
        return Ok(Json(StatusBody::new(
            "unsupported",
            "Window focusing is only supported on Windows",
        )));
    }

    let windows = state.windows.clone();
    let outcome = tokio::task::spawn_blocking(move || windows.focus_window(LAUNCHER_WINDOW_TITLE))
        .await
        .map_err(|e| ApiError::internal(format!("Focus task failed: {e}")))?
        .map_err(|e| {
            error!("Error focusing launcher window: {}", e);
            ApiError::internal(format!("Error focusing window: {e}"))
        })?;

    let body = match outcome {
        FocusOutcome::Focused => StatusBody::new(
            "success",
            format!("Launcher window '{LAUNCHER_WINDOW_TITLE}' brought to foreground"),
        ),
        FocusOutcome::FoundButNotFocused(reason) => {
            warn!("Could not focus launcher window: {}", reason);
            StatusBody::new(
                "partial_success",
                format!("Found launcher window but could not focus it: {reason}"),
            )
        }
        FocusOutcome::NotFound => {
            info!("Launcher window not found: {}", LAUNCHER_WINDOW_TITLE);
            StatusBody::new(
                "not_found",
                format!("Launcher window '{LAUNCHER_WINDOW_TITLE}' not found"),
            )
        }
    };
    Ok(Json(body))
}

async fn close_running_instances(
    State(state): State<AppState>,
    payload: Result<Json<AccountsBody>, JsonRejection>,
) -> Result<Json<CloseResponse>, ApiError> {
    let Json(body) = payload?;
    if !body.is_complete() {
        return Err(ApiError::bad_request("No accounts specified"));
    }
    if !state.windows.is_supported() {
        return Ok(Json(CloseResponse {
            status: "unsupported",
            message: "Window management is only supported on Windows".to_string(),
            closed: 0,
        }));
    }

    let windows = state.windows.clone();
    let closed = tokio::task::spawn_blocking(move || -> Result<usize, WindowError> {
        let running = running_characters(windows.as_ref())?;
        let report = find_conflicts(&body.all_accounts, &body.selected_accounts, &running);
        let characters: Vec<String> = report
            .conflicts
            .into_iter()
            .map(|conflict| {
                info!(
                    "Will close window for character {} (account: {})",
                    conflict.character, conflict.account
                );
                conflict.character
            })
            .collect();
        close_client_windows(windows.as_ref(), &characters)
    })
    .await
    .map_err(|e| ApiError::internal(format!("Close task failed: {e}")))?
    .map_err(|e| {
        error!("Error closing game instances: {}", e);
        ApiError::internal(format!("Error closing game instances: {e}"))
    })?;

    Ok(Json(CloseResponse {
        status: "success",
        message: format!("Closed {closed} game instances"),
        closed,
    }))
}
