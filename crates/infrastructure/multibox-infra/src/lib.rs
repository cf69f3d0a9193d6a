pub mod desktop;
pub mod launcher;

// Re-exports for convenience
pub use desktop::{platform_window_manager, FocusOutcome, WindowError, WindowManager};
pub use launcher::{ClientLauncher, ClientLogin, LaunchError, LaunchSummary, LaunchedClient};
