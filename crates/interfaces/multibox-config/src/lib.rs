//! Central configuration constants for runtime limits and defaults.

use std::time::Duration;

/// Default address the companion server binds to.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";

/// Default port for the companion server.
pub const DEFAULT_PORT: u16 = 5000;

/// Title prefix of a running game client window; the character name follows it.
pub const CLIENT_WINDOW_PREFIX: &str = "Anarchy Online - ";

/// Exact title of the launcher window focused after a launch batch.
pub const LAUNCHER_WINDOW_TITLE: &str = "Knows Modded AO#";

/// File name of the quick-launcher assembly inside the DLL folder.
pub const LAUNCHER_DLL_NAME: &str = "AOQuickLauncher.dll";

/// Host program used to run the launcher assembly.
pub const LAUNCHER_HOST_PROGRAM: &str = "dotnet";

/// Environment variable telling the launcher where the game is installed.
pub const GAME_PATH_ENV: &str = "AOPath";

/// How long a freshly spawned client is watched for an immediate failure.
pub const LAUNCH_PROBE_WINDOW: Duration = Duration::from_millis(500);

/// Delay between the two close messages sent to a client window.
pub const CLOSE_REPEAT_DELAY: Duration = Duration::from_millis(100);

/// Folder name prefix of a preference backup set.
pub const BACKUP_DIR_PREFIX: &str = "PrefsBackup";

/// `chrono` format of the timestamp appended to a backup set folder.
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Backup folder name for a request started at `timestamp` (already formatted).
pub fn backup_dir_name(timestamp: &str) -> String {
    format!("{BACKUP_DIR_PREFIX}_{timestamp}")
}

/// True when a path component names a backup set folder.
pub fn is_backup_dir_name(name: &str) -> bool {
    name.strip_prefix(BACKUP_DIR_PREFIX)
        .is_some_and(|rest| rest.starts_with('_'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_names_round_trip_through_detection() {
        let name = backup_dir_name("20240102_030405");
        assert_eq!(name, "PrefsBackup_20240102_030405");
        assert!(is_backup_dir_name(&name));
        assert!(!is_backup_dir_name("PrefsBackupX"));
        assert!(!is_backup_dir_name("Containers"));
    }
}
