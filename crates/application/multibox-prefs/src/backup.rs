use std::collections::BTreeSet;
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::error::PrefsError;
use crate::fs_ops;

/// Snapshot `destination` into `backup_root/rel` if it exists.
///
/// Returns the relative path that was captured, or `None` when there was
/// nothing to back up. A directory replaces any same-named stale backup in
/// full; a file is copied with its timestamps.
pub fn backup_if_present(
    destination: &Utf8Path,
    backup_root: &Utf8Path,
    rel: &str,
) -> Result<Option<String>, PrefsError> {
    if !destination.exists() {
        return Ok(None);
    }
    let backup_path = backup_root.join(rel);
    let fail = |source: std::io::Error| PrefsError::Backup {
        path: backup_path.clone(),
        source,
    };

    std::fs::create_dir_all(backup_root).map_err(fail)?;
    if destination.is_dir() {
        fs_ops::replace_dir(destination, &backup_path).map_err(fail)?;
    } else {
        if backup_path.is_dir() {
            fs_ops::remove_path(&backup_path).map_err(fail)?;
        }
        fs_ops::copy_file_preserving(destination, &backup_path).map_err(fail)?;
    }
    debug!("Backed up {} to {}", destination, backup_path);
    Ok(Some(rel.to_string()))
}

/// Backup set for one target character within one request.
///
/// The folder is created on first use. Every relative path is captured at
/// most once, so a path overwritten earlier in the same request keeps its
/// original content in the backup.
#[derive(Debug)]
pub struct BackupSet {
    root: Utf8PathBuf,
    captured: BTreeSet<String>,
    created: bool,
}

impl BackupSet {
    pub fn new(target_dir: &Utf8Path, folder_name: &str) -> Self {
        Self {
            root: target_dir.join(folder_name),
            captured: BTreeSet::new(),
            created: false,
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Whether anything has been written into this set yet.
    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn captured(&self) -> impl Iterator<Item = &str> {
        self.captured.iter().map(String::as_str)
    }

    /// Covered when `rel` or one of its ancestors was captured already.
    fn is_covered(&self, rel: &str) -> bool {
        let mut current = rel;
        loop {
            if self.captured.contains(current) {
                return true;
            }
            match current.rsplit_once('/') {
                Some((parent, _)) => current = parent,
                None => return false,
            }
        }
    }

    pub fn backup_if_present(
        &mut self,
        destination: &Utf8Path,
        rel: &str,
    ) -> Result<Option<String>, PrefsError> {
        if !destination.exists() || self.is_covered(rel) {
            return Ok(None);
        }

        let prefix = format!("{rel}/");
        let has_captured_children = self.captured.iter().any(|c| c.starts_with(&prefix));

        let captured = if destination.is_dir() && has_captured_children {
            // Earlier captures below this directory hold pre-request content;
            // merge around them instead of replacing the whole subtree.
            let backup_path = self.root.join(rel);
            let captured = &self.captured;
            fs_ops::copy_dir_filtered(destination, &backup_path, |sub: &Path| {
                let sub = sub.to_string_lossy().replace('\\', "/");
                captured.contains(&format!("{prefix}{sub}"))
            })
            .map_err(|source| PrefsError::Backup {
                path: backup_path.clone(),
                source,
            })?;
            Some(rel.to_string())
        } else {
            backup_if_present(destination, &self.root, rel)?
        };

        if let Some(path) = &captured {
            self.created = true;
            self.captured.insert(path.clone());
        }
        Ok(captured)
    }
}
