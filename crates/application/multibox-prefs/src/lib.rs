//! Copying per-character preference files between character profiles.
//!
//! The entry point is [`CopyOrchestrator::execute`]. Targets and items are
//! processed strictly in sequence; failures are recorded per path and never
//! abort the remaining work. Nothing here locks a target directory: callers
//! that may run two copies into the same character at once must serialize them.

pub mod backup;
pub mod error;
pub mod fs_ops;
pub mod item_copy;
pub mod orchestrator;
pub mod report;

pub use backup::{backup_if_present, BackupSet};
pub use error::{PrefsError, PrefsErrorKind};
pub use item_copy::{copy_item, resolve_sources, ItemOutcome, PathOutcome, ResolvedSources};
pub use orchestrator::{CopyOrchestrator, CopyRequest};
pub use report::{CopyReport, CopyStatus, ItemResult, TargetReport};
