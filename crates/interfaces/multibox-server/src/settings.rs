use std::fs;
use std::io::Write;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use directories::ProjectDirs;
use multibox_config::{DEFAULT_BIND_ADDR, DEFAULT_PORT};
use serde::{Deserialize, Serialize};
use tracing::debug;

const QUALIFIER: &str = "com";
const ORG: &str = "multibox";
const APP: &str = "companion";
const SETTINGS_FILE: &str = "settings.json";

/// Runtime settings of the companion server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    pub bind: String,
    pub port: u16,
    /// Used when a copy request names no preferences folder.
    pub preferences_root: Option<Utf8PathBuf>,
    /// JSON file replacing the built-in preference catalog.
    pub catalog_path: Option<Utf8PathBuf>,
    /// Folder holding the control panel's `index.html`.
    pub static_dir: Option<Utf8PathBuf>,
    pub game_folder: Option<Utf8PathBuf>,
    pub dll_folder: Option<Utf8PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND_ADDR.to_string(),
            port: DEFAULT_PORT,
            preferences_root: None,
            catalog_path: None,
            static_dir: None,
            game_folder: None,
            dll_folder: None,
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Loads and saves [`ServerSettings`] as JSON in a config directory.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    dir: Utf8PathBuf,
}

impl SettingsStore {
    /// Store in the platform config directory.
    pub fn new() -> Result<Self> {
        let proj_dirs = ProjectDirs::from(QUALIFIER, ORG, APP)
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        let dir = Utf8PathBuf::from_path_buf(proj_dirs.config_dir().to_path_buf())
            .map_err(|p| anyhow::anyhow!("Config directory is not UTF-8: {}", p.display()))?;
        Ok(Self { dir })
    }

    pub fn at(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> Utf8PathBuf {
        self.dir.join(SETTINGS_FILE)
    }

    /// Saved settings, or the defaults when nothing was saved yet.
    pub fn load(&self) -> Result<ServerSettings> {
        let path = self.path();
        if !path.exists() {
            debug!("No settings at {}, using defaults", path);
            return Ok(ServerSettings::default());
        }
        let content = fs::read_to_string(&path).context("Failed to read settings")?;
        let settings: ServerSettings =
            serde_json::from_str(&content).with_context(|| format!("Invalid settings in {path}"))?;
        Ok(settings)
    }

    pub fn save(&self, settings: &ServerSettings) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)
                .with_context(|| format!("Failed to create config directory {}", self.dir))?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        atomic_write(&self.path(), json.as_bytes()).context("Failed to write settings")?;
        Ok(())
    }
}

fn atomic_write(path: &Utf8Path, contents: &[u8]) -> Result<()> {
    let tmp_path = Utf8PathBuf::from(format!("{path}.tmp"));

    let mut file = fs::File::create(&tmp_path)
        .with_context(|| format!("Failed to create temp file {tmp_path}"))?;
    file.write_all(contents)
        .with_context(|| format!("Failed to write temp file {tmp_path}"))?;
    file.sync_all()
        .with_context(|| format!("Failed to sync temp file {tmp_path}"))?;
    drop(file);

    match fs::rename(&tmp_path, path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            fs::remove_file(path).ok();
            fs::rename(&tmp_path, path)
                .with_context(|| format!("Failed to replace destination file {path}"))
        }
        Err(e) => {
            fs::remove_file(&tmp_path).ok();
            Err(e).with_context(|| format!("Failed to move {tmp_path} to {path}"))
        }
    }
}
