use multibox_core::{CharacterIdentity, PreferenceItem};
use serde::Serialize;
use tracing::warn;

use crate::item_copy::ItemOutcome;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CopyStatus {
    Success,
    PartialSuccess,
    Error,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
    pub id: String,
    pub label: String,
    pub copied: Vec<String>,
    pub missing: Vec<String>,
    pub backed_up: Vec<String>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TargetReport {
    pub target: CharacterIdentity,
    pub directory: Option<String>,
    pub skipped: bool,
    pub note: Option<String>,
    pub backup_folder: Option<String>,
    pub copied_paths: Vec<String>,
    pub missing_paths: Vec<String>,
    pub backed_up_paths: Vec<String>,
    pub errors: Vec<String>,
    pub items: Vec<ItemResult>,
}

impl TargetReport {
    pub fn new(target: CharacterIdentity) -> Self {
        Self {
            target,
            directory: None,
            skipped: false,
            note: None,
            backup_folder: None,
            copied_paths: Vec::new(),
            missing_paths: Vec::new(),
            backed_up_paths: Vec::new(),
            errors: Vec::new(),
            items: Vec::new(),
        }
    }

    /// Processed to the end with no errors.
    pub fn succeeded(&self) -> bool {
        !self.skipped && self.errors.is_empty()
    }

    pub(crate) fn fail(&mut self, message: String) {
        warn!("{}: {}", self.target, message);
        self.errors.push(message);
    }

    pub(crate) fn absorb(&mut self, item: &PreferenceItem, outcome: ItemOutcome) {
        let mut result = ItemResult {
            id: item.id.clone(),
            label: item.label.clone(),
            copied: outcome.copied().map(str::to_string).collect(),
            missing: outcome.missing().map(str::to_string).collect(),
            backed_up: outcome.backed_up.clone(),
            errors: Vec::new(),
        };
        for (path, error) in outcome.failures() {
            let message = format!("{} ({}): {}", item.label, path, error);
            warn!("{}: {}", self.target, message);
            result.errors.push(message);
        }

        self.copied_paths.extend(result.copied.iter().cloned());
        self.missing_paths.extend(result.missing.iter().cloned());
        self.backed_up_paths.extend(result.backed_up.iter().cloned());
        self.errors.extend(result.errors.iter().cloned());
        self.items.push(result);
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CopyReport {
    pub status: CopyStatus,
    pub message: String,
    pub source: CharacterIdentity,
    /// Backup folder name shared by every target of the request, when backups were requested.
    pub backup_folder_name: Option<String>,
    /// Requested ids the catalog does not know; excluded from processing.
    pub invalid_items: Vec<String>,
    pub targets: Vec<TargetReport>,
}

/// Overall status of a validated request.
///
/// No errors anywhere is a success unless some requested ids were unknown.
/// With errors, any copied path or any clean target makes it a partial
/// success; otherwise nothing worked and it is an error.
pub fn classify(targets: &[TargetReport], invalid_items: &[String]) -> (CopyStatus, String) {
    let errors: usize = targets.iter().map(|t| t.errors.len()).sum();
    let copied: usize = targets.iter().map(|t| t.copied_paths.len()).sum();
    let processed = targets.iter().filter(|t| !t.skipped).count();
    let clean = targets.iter().filter(|t| t.succeeded()).count();

    let mut message = format!("Copied {copied} path(s) to {clean} of {processed} target(s)");
    if errors > 0 {
        message.push_str(&format!(", {errors} error(s)"));
    }
    if !invalid_items.is_empty() {
        message.push_str(&format!(
            "; unknown items ignored: {}",
            invalid_items.join(", ")
        ));
    }

    let status = if errors == 0 {
        if invalid_items.is_empty() {
            CopyStatus::Success
        } else {
            CopyStatus::PartialSuccess
        }
    } else if copied > 0 || clean > 0 {
        CopyStatus::PartialSuccess
    } else {
        CopyStatus::Error
    };
    (status, message)
}
