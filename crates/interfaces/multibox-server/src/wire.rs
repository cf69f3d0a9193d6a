//! JSON bodies exchanged with the control panel.
//!
//! Request fields default to empty so that missing data reaches the
//! handlers and is judged there. A target missing its id is reported against
//! that target alone. Bodies that do not parse at all are answered with a
//! 400 `status: "error"` body by the routes.

use camino::{Utf8Path, Utf8PathBuf};
use multibox_core::identity::deserialize_character_id;
use multibox_core::{Account, CharacterIdentity, ConflictReport};
use multibox_infra::ClientLogin;
use multibox_prefs::CopyRequest;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct StatusBody {
    pub status: &'static str,
    pub message: String,
}

impl StatusBody {
    pub fn new(status: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyPreferencesBody {
    #[serde(default)]
    pub preferences_root: Option<Utf8PathBuf>,
    #[serde(default)]
    pub source_account: String,
    #[serde(default, deserialize_with = "deserialize_character_id")]
    pub source_character_id: String,
    #[serde(default)]
    pub targets: Vec<CharacterIdentity>,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default = "default_make_backup")]
    pub make_backup: bool,
}

fn default_make_backup() -> bool {
    true
}

impl CopyPreferencesBody {
    /// Build the orchestrator request, falling back to `default_root` when
    /// the body names no preferences folder.
    pub fn into_request(self, default_root: Option<&Utf8Path>) -> Result<CopyRequest, String> {
        let preferences_root = match self.preferences_root {
            Some(root) if !root.as_str().trim().is_empty() => root,
            _ => default_root
                .map(Utf8Path::to_path_buf)
                .ok_or_else(|| "Preferences folder is required".to_string())?,
        };
        Ok(CopyRequest {
            preferences_root,
            source: CharacterIdentity::new(self.source_account, self.source_character_id),
            targets: self.targets,
            selected_item_ids: self.items,
            make_backup: self.make_backup,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchCharacter {
    #[serde(default)]
    pub account_name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, deserialize_with = "deserialize_character_id")]
    pub character_id: String,
}

impl From<LaunchCharacter> for ClientLogin {
    fn from(c: LaunchCharacter) -> Self {
        ClientLogin {
            account_name: c.account_name,
            password: c.password,
            character_id: c.character_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchBody {
    #[serde(default)]
    pub game_folder: String,
    #[serde(default)]
    pub dll_folder: String,
    #[serde(default)]
    pub characters: Vec<LaunchCharacter>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LaunchResponse {
    pub status: &'static str,
    pub message: String,
    pub launched: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountsBody {
    #[serde(default)]
    pub all_accounts: Vec<Account>,
    #[serde(default)]
    pub selected_accounts: Vec<String>,
}

impl AccountsBody {
    pub fn is_complete(&self) -> bool {
        !self.all_accounts.is_empty() && !self.selected_accounts.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConflictResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(flatten)]
    pub report: ConflictReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct CloseResponse {
    pub status: &'static str,
    pub message: String,
    pub closed: usize,
}
