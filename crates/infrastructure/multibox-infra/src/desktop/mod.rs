//! Desktop window access: finding running clients, focusing and closing them.
//!
//! Only Windows has a real implementation; everywhere else the platform
//! manager reports itself as unsupported and every call fails with
//! [`WindowError::Unsupported`].

use std::sync::Arc;

use multibox_config::CLIENT_WINDOW_PREFIX;
use multibox_core::accounts::character_from_title;
use thiserror::Error;

#[cfg(target_os = "windows")]
mod win32;

#[derive(Debug, Error)]
pub enum WindowError {
    #[error("Window management is only supported on Windows")]
    Unsupported,
    #[error("Window API error: {0}")]
    Platform(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusOutcome {
    Focused,
    /// The window exists but could not be brought to the foreground.
    FoundButNotFocused(String),
    NotFound,
}

pub trait WindowManager: Send + Sync {
    fn is_supported(&self) -> bool;

    /// Titles of all visible top-level windows.
    fn visible_window_titles(&self) -> Result<Vec<String>, WindowError>;

    /// Restore and foreground the first visible window titled exactly `title`.
    fn focus_window(&self, title: &str) -> Result<FocusOutcome, WindowError>;

    /// Ask every visible window whose title is in `titles` to close.
    /// Returns how many windows were asked.
    fn close_windows(&self, titles: &[String]) -> Result<usize, WindowError>;
}

/// Names of the characters whose client windows are currently visible.
pub fn running_characters(wm: &dyn WindowManager) -> Result<Vec<String>, WindowError> {
    Ok(wm
        .visible_window_titles()?
        .iter()
        .filter_map(|title| character_from_title(title, CLIENT_WINDOW_PREFIX).map(str::to_string))
        .collect())
}

/// Close the client windows of the given characters (exact names as they
/// appear in the window titles).
pub fn close_client_windows(
    wm: &dyn WindowManager,
    characters: &[String],
) -> Result<usize, WindowError> {
    let titles: Vec<String> = characters
        .iter()
        .map(|name| format!("{CLIENT_WINDOW_PREFIX}{name}"))
        .collect();
    if titles.is_empty() {
        return Ok(0);
    }
    wm.close_windows(&titles)
}

pub struct UnsupportedWindowManager;

impl WindowManager for UnsupportedWindowManager {
    fn is_supported(&self) -> bool {
        false
    }

    fn visible_window_titles(&self) -> Result<Vec<String>, WindowError> {
        Err(WindowError::Unsupported)
    }

    fn focus_window(&self, _title: &str) -> Result<FocusOutcome, WindowError> {
        Err(WindowError::Unsupported)
    }

    fn close_windows(&self, _titles: &[String]) -> Result<usize, WindowError> {
        Err(WindowError::Unsupported)
    }
}

/// The window manager for the current platform.
pub fn platform_window_manager() -> Arc<dyn WindowManager> {
    #[cfg(target_os = "windows")]
    {
        Arc::new(win32::Win32WindowManager)
    }

    #[cfg(not(target_os = "windows"))]
    {
        Arc::new(UnsupportedWindowManager)
    }
}
