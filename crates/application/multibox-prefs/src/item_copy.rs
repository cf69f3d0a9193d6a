use camino::{Utf8Path, Utf8PathBuf};
use glob::MatchOptions;
use multibox_config::is_backup_dir_name;
use multibox_core::path_utils::PrefPath;
use multibox_core::{ItemKind, PreferenceItem};
use tracing::{debug, warn};

use crate::backup::BackupSet;
use crate::error::PrefsError;
use crate::fs_ops;

/// Result of one concrete path of an item.
#[derive(Debug)]
pub enum PathOutcome {
    Copied(String),
    /// The item had no matching source content; holds the item's path pattern.
    Missing(String),
    Failed { path: String, error: PrefsError },
}

#[derive(Debug, Default)]
pub struct ItemOutcome {
    pub paths: Vec<PathOutcome>,
    pub backed_up: Vec<String>,
}

impl ItemOutcome {
    pub fn copied(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().filter_map(|p| match p {
            PathOutcome::Copied(rel) => Some(rel.as_str()),
            _ => None,
        })
    }

    pub fn missing(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().filter_map(|p| match p {
            PathOutcome::Missing(rel) => Some(rel.as_str()),
            _ => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &PrefsError)> {
        self.paths.iter().filter_map(|p| match p {
            PathOutcome::Failed { path, error } => Some((path.as_str(), error)),
            _ => None,
        })
    }
}

/// Concrete source paths an item resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedSources {
    Missing,
    /// Relative paths under the source character directory, sorted.
    Paths(Vec<String>),
}

pub fn resolve_sources(
    item: &PreferenceItem,
    source_dir: &Utf8Path,
) -> Result<ResolvedSources, PrefsError> {
    let direct = source_dir.join(&item.path_pattern);
    let found = match item.kind {
        ItemKind::File => direct.is_file(),
        ItemKind::Directory => direct.is_dir(),
        ItemKind::GlobSet => {
            let matches = expand_glob(source_dir, &item.path_pattern)?;
            return Ok(if matches.is_empty() {
                ResolvedSources::Missing
            } else {
                ResolvedSources::Paths(matches)
            });
        }
    };
    Ok(if found {
        ResolvedSources::Paths(vec![item.path_pattern.clone()])
    } else {
        ResolvedSources::Missing
    })
}

/// Regular files under `root` matching `pattern`, as sorted relative paths.
/// Anything inside a backup set folder is ignored.
fn expand_glob(root: &Utf8Path, pattern: &str) -> Result<Vec<String>, PrefsError> {
    let full = format!("{}/{}", glob::Pattern::escape(root.as_str()), pattern);
    let options = MatchOptions {
        case_sensitive: !cfg!(windows),
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };
    let paths = glob::glob_with(&full, options).map_err(|e| PrefsError::Pattern {
        pattern: pattern.to_string(),
        message: e.msg.to_string(),
    })?;

    let mut matches = Vec::new();
    for entry in paths {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!("Skipping unreadable path while expanding {}: {}", pattern, e);
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        let Ok(rel) = path.strip_prefix(root.as_std_path()) else {
            continue;
        };
        let rel = PrefPath::normalize(&rel.to_string_lossy());
        let in_backup = rel.split('/').next().is_some_and(is_backup_dir_name);
        if !in_backup {
            matches.push(rel);
        }
    }
    matches.sort();
    matches.dedup();
    Ok(matches)
}

fn copy_path(kind: ItemKind, src: &Utf8Path, dst: &Utf8Path) -> Result<(), PrefsError> {
    let res = match kind {
        ItemKind::Directory => fs_ops::replace_dir(src, dst),
        ItemKind::File | ItemKind::GlobSet => fs_ops::copy_file_preserving(src, dst),
    };
    res.map_err(|source| PrefsError::Copy {
        path: dst.to_path_buf(),
        source,
    })
}

/// Copy one catalog item from `source_dir` to `target_dir`.
///
/// With a backup set, each destination path that already exists is
/// captured right before it is overwritten; if that capture fails the path
/// is not copied. Failures are recorded per path and never stop the
/// remaining paths.
pub fn copy_item(
    item: &PreferenceItem,
    source_dir: &Utf8Path,
    target_dir: &Utf8Path,
    mut backup: Option<&mut BackupSet>,
) -> ItemOutcome {
    let mut outcome = ItemOutcome::default();

    let rels = match resolve_sources(item, source_dir) {
        Ok(ResolvedSources::Paths(rels)) => rels,
        Ok(ResolvedSources::Missing) => {
            debug!("{}: nothing at {} in {}", item.id, item.path_pattern, source_dir);
            outcome
                .paths
                .push(PathOutcome::Missing(item.path_pattern.clone()));
            return outcome;
        }
        Err(error) => {
            outcome.paths.push(PathOutcome::Failed {
                path: item.path_pattern.clone(),
                error,
            });
            return outcome;
        }
    };

    for rel in rels {
        let src: Utf8PathBuf = source_dir.join(&rel);
        let dst: Utf8PathBuf = target_dir.join(&rel);

        if let Some(set) = backup.as_deref_mut() {
            match set.backup_if_present(&dst, &rel) {
                Ok(Some(captured)) => outcome.backed_up.push(captured),
                Ok(None) => {}
                Err(error) => {
                    outcome.paths.push(PathOutcome::Failed { path: rel, error });
                    continue;
                }
            }
        }

        match copy_path(item.kind, &src, &dst) {
            Ok(()) => {
                debug!("Copied {} -> {}", src, dst);
                outcome.paths.push(PathOutcome::Copied(rel));
            }
            Err(error) => outcome.paths.push(PathOutcome::Failed { path: rel, error }),
        }
    }
    outcome
}
