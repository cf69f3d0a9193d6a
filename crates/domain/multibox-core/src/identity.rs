use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::path_utils::PrefPath;

/// Canonical prefix of a character preference folder (`Char<id>`).
pub const CHARACTER_DIR_PREFIX: &str = "Char";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("account name is empty")]
    EmptyAccount,
    #[error("character id is empty")]
    EmptyCharacter,
    #[error("account name '{0}' is not a valid folder name")]
    InvalidAccount(String),
    #[error("character id '{0}' is not a valid folder name")]
    InvalidCharacter(String),
    #[error("expected ACCOUNT/CHARACTER_ID, got '{0}'")]
    Malformed(String),
}

/// One character on one account.
///
/// Two identities are equal when the account matches exactly and the
/// character ids normalize to the same folder name, so `123` and `Char123`
/// name the same character.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterIdentity {
    #[serde(default)]
    pub account_name: String,
    #[serde(default, deserialize_with = "deserialize_character_id")]
    pub character_id: String,
}

impl CharacterIdentity {
    pub fn new(account_name: impl Into<String>, character_id: impl Into<String>) -> Self {
        Self {
            account_name: account_name.into(),
            character_id: character_id.into(),
        }
    }

    /// On-disk folder name: the id as given when it already carries the
    /// `Char` prefix (any case), otherwise the id with the prefix prepended.
    pub fn folder_name(&self) -> String {
        let id = self.character_id.trim();
        let has_prefix = id
            .get(..CHARACTER_DIR_PREFIX.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(CHARACTER_DIR_PREFIX));
        if has_prefix {
            id.to_string()
        } else {
            format!("{CHARACTER_DIR_PREFIX}{id}")
        }
    }

    pub fn validate(&self) -> Result<(), IdentityError> {
        if self.account_name.trim().is_empty() {
            return Err(IdentityError::EmptyAccount);
        }
        if self.character_id.trim().is_empty() {
            return Err(IdentityError::EmptyCharacter);
        }
        if !PrefPath::is_single_component(&self.account_name) {
            return Err(IdentityError::InvalidAccount(self.account_name.clone()));
        }
        if !PrefPath::is_single_component(&self.folder_name()) {
            return Err(IdentityError::InvalidCharacter(self.character_id.clone()));
        }
        Ok(())
    }

    /// `root/<account>/<folder>`. Existence is not checked.
    pub fn resolve(&self, root: &Utf8Path) -> Result<Utf8PathBuf, IdentityError> {
        self.validate()?;
        Ok(root.join(&self.account_name).join(self.folder_name()))
    }
}

/// Character profile directory for `account_name`/`character_id` under `root`.
pub fn resolve_character_dir(
    root: &Utf8Path,
    account_name: &str,
    character_id: &str,
) -> Result<Utf8PathBuf, IdentityError> {
    CharacterIdentity::new(account_name, character_id).resolve(root)
}

impl PartialEq for CharacterIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.account_name == other.account_name && self.folder_name() == other.folder_name()
    }
}

impl Eq for CharacterIdentity {}

impl Hash for CharacterIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.account_name.hash(state);
        self.folder_name().hash(state);
    }
}

impl fmt::Display for CharacterIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.account_name, self.folder_name())
    }
}

impl FromStr for CharacterIdentity {
    type Err = IdentityError;

    /// Parses `ACCOUNT/ID`; the id may or may not carry the `Char` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (account, id) = s
            .rsplit_once('/')
            .ok_or_else(|| IdentityError::Malformed(s.to_string()))?;
        let identity = Self::new(account.trim(), id.trim());
        identity.validate()?;
        Ok(identity)
    }
}

/// The browser sends character ids as JSON numbers or strings. `null`
/// reads as an empty id, which fails validation for that identity alone.
pub fn deserialize_character_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s),
        Some(Value::Number(n)) if n.is_u64() => Ok(n.to_string()),
        Some(other) => Err(D::Error::custom(format!(
            "character id must be a non-negative integer or a string, got {other}"
        ))),
    }
}
