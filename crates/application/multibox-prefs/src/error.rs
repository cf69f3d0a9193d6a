use camino::Utf8PathBuf;
use multibox_core::IdentityError;

#[derive(Debug, thiserror::Error)]
pub enum PrefsError {
    #[error("{0}")]
    Validation(String),
    #[error("invalid character identity: {0}")]
    InvalidIdentity(#[from] IdentityError),
    #[error("unknown preference item '{0}'")]
    UnknownItem(String),
    #[error("backup of {path} failed: {source}")]
    Backup {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("copy to {path} failed: {source}")]
    Copy {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefsErrorKind {
    /// The request was rejected before touching the filesystem.
    Validation,
    InvalidIdentity,
    UnknownItem,
    /// Per-path failure; recorded in the report and processing continues.
    Backup,
    Copy,
    Pattern,
}

impl PrefsError {
    pub fn kind(&self) -> PrefsErrorKind {
        match self {
            PrefsError::Validation(_) => PrefsErrorKind::Validation,
            PrefsError::InvalidIdentity(_) => PrefsErrorKind::InvalidIdentity,
            PrefsError::UnknownItem(_) => PrefsErrorKind::UnknownItem,
            PrefsError::Backup { .. } => PrefsErrorKind::Backup,
            PrefsError::Copy { .. } => PrefsErrorKind::Copy,
            PrefsError::Pattern { .. } => PrefsErrorKind::Pattern,
        }
    }

    /// True for errors that abort a whole request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            PrefsErrorKind::Validation | PrefsErrorKind::InvalidIdentity
        )
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        PrefsError::Validation(msg.into())
    }
}
