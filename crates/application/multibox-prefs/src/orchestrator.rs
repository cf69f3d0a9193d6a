use std::collections::HashMap;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{Local, NaiveDateTime};
use multibox_config::{backup_dir_name, BACKUP_TIMESTAMP_FORMAT};
use multibox_core::{Catalog, CharacterIdentity, PreferenceItem};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::backup::BackupSet;
use crate::error::PrefsError;
use crate::fs_ops;
use crate::item_copy::copy_item;
use crate::report::{classify, CopyReport, TargetReport};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyRequest {
    pub preferences_root: Utf8PathBuf,
    pub source: CharacterIdentity,
    /// Processed in order; duplicates are processed again.
    pub targets: Vec<CharacterIdentity>,
    pub selected_item_ids: Vec<String>,
    pub make_backup: bool,
}

struct Validated<'a> {
    source_dir: Utf8PathBuf,
    items: Vec<&'a PreferenceItem>,
    invalid_items: Vec<String>,
}

/// Drives a preference copy from one source character to many targets.
#[derive(Debug, Clone)]
pub struct CopyOrchestrator {
    catalog: Arc<Catalog>,
}

impl CopyOrchestrator {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Run a request stamped with the current local time.
    ///
    /// `Err` means the request was rejected before anything on disk was
    /// touched. Every other failure is recorded inside the report.
    pub fn execute(&self, request: &CopyRequest) -> Result<CopyReport, PrefsError> {
        self.execute_at(request, Local::now().naive_local())
    }

    /// Like [`execute`](Self::execute) with a fixed start time, which names the backup folder.
    pub fn execute_at(
        &self,
        request: &CopyRequest,
        started: NaiveDateTime,
    ) -> Result<CopyReport, PrefsError> {
        let validated = self.validate(request)?;
        let root = request.preferences_root.as_path();

        info!(
            "Copying {} item(s) from {} to {} target(s) (backup: {})",
            validated.items.len(),
            request.source,
            request.targets.len(),
            request.make_backup
        );
        for id in &validated.invalid_items {
            warn!("{}", PrefsError::UnknownItem(id.clone()));
        }

        let backup_name = request
            .make_backup
            .then(|| backup_dir_name(&started.format(BACKUP_TIMESTAMP_FORMAT).to_string()));
        let mut backup_sets: HashMap<Utf8PathBuf, BackupSet> = HashMap::new();

        let targets: Vec<TargetReport> = request
            .targets
            .iter()
            .map(|target| {
                self.process_target(
                    request,
                    root,
                    &validated,
                    target,
                    backup_name.as_deref(),
                    &mut backup_sets,
                )
            })
            .collect();

        let (status, message) = classify(&targets, &validated.invalid_items);
        info!("Preference copy finished: {:?} - {}", status, message);

        Ok(CopyReport {
            status,
            message,
            source: request.source.clone(),
            backup_folder_name: backup_name,
            invalid_items: validated.invalid_items,
            targets,
        })
    }

    fn validate<'a>(&'a self, request: &CopyRequest) -> Result<Validated<'a>, PrefsError> {
        let root = &request.preferences_root;
        if root.as_str().trim().is_empty() {
            return Err(PrefsError::validation("Preferences folder is required"));
        }
        if !root.is_dir() {
            return Err(PrefsError::validation(format!(
                "Preferences folder not found: {root}"
            )));
        }
        if request.targets.is_empty() {
            return Err(PrefsError::validation("No target characters selected"));
        }
        if request.selected_item_ids.is_empty() {
            return Err(PrefsError::validation("No preference items selected"));
        }

        let source_dir = request.source.resolve(root)?;
        if !source_dir.is_dir() {
            return Err(PrefsError::validation(format!(
                "Source character folder not found: {source_dir}"
            )));
        }

        let selection = self.catalog.select(&request.selected_item_ids);
        if selection.items.is_empty() {
            return Err(PrefsError::validation(format!(
                "None of the selected items are known: {}",
                selection.unknown.join(", ")
            )));
        }

        Ok(Validated {
            source_dir,
            items: selection.items,
            invalid_items: selection.unknown,
        })
    }

    fn process_target(
        &self,
        request: &CopyRequest,
        root: &Utf8Path,
        validated: &Validated<'_>,
        target: &CharacterIdentity,
        backup_name: Option<&str>,
        backup_sets: &mut HashMap<Utf8PathBuf, BackupSet>,
    ) -> TargetReport {
        let mut report = TargetReport::new(target.clone());

        let dir = match target.resolve(root) {
            Ok(dir) => dir,
            Err(e) => {
                report.fail(format!("Invalid target {target}: {e}"));
                return report;
            }
        };
        report.directory = Some(dir.to_string());

        if !dir.is_dir() {
            report.fail(format!("Target character folder not found: {dir}"));
            return report;
        }

        if *target == request.source || fs_ops::same_location(&dir, &validated.source_dir) {
            info!("Skipping {}: same character as the source", target);
            report.skipped = true;
            report.note = Some("Target is the source character; nothing copied".to_string());
            return report;
        }

        let mut backup = backup_name.map(|name| {
            backup_sets
                .entry(dir.clone())
                .or_insert_with(|| BackupSet::new(&dir, name))
        });

        for item in &validated.items {
            let outcome = copy_item(item, &validated.source_dir, &dir, backup.as_deref_mut());
            report.absorb(item, outcome);
        }

        if let Some(set) = backup {
            if set.is_created() {
                report.backup_folder = Some(set.root().to_string());
            }
        }
        report
    }
}
