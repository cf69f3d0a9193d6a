pub mod commands;

use camino::Utf8PathBuf;
use multibox_infra::ClientLogin;

/// Parse `ACCOUNT:PASSWORD:CHARACTER_ID`. The password may itself contain colons.
pub fn parse_login(s: &str) -> Result<ClientLogin, String> {
    let (account, rest) = s
        .split_once(':')
        .ok_or_else(|| format!("expected ACCOUNT:PASSWORD:ID, got '{s}'"))?;
    let (password, id) = rest
        .rsplit_once(':')
        .ok_or_else(|| "expected ACCOUNT:PASSWORD:ID".to_string())?;
    let login = ClientLogin {
        account_name: account.trim().to_string(),
        password: password.to_string(),
        character_id: id.trim().to_string(),
    };
    if !login.is_complete() {
        return Err("account, password and character id must all be set".to_string());
    }
    Ok(login)
}

/// Overrides applied on top of the saved server settings.
#[derive(Debug, Clone, Default)]
pub struct ServeOverrides {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub preferences_root: Option<Utf8PathBuf>,
    pub catalog: Option<Utf8PathBuf>,
    pub static_dir: Option<Utf8PathBuf>,
    pub game_folder: Option<Utf8PathBuf>,
    pub dll_folder: Option<Utf8PathBuf>,
    /// Write the merged settings back to the config directory.
    pub save: bool,
}
