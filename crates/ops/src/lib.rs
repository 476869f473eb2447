//! Bulk operations for wpbm.
//!
//! Each operation type wraps a [`wpbm_client::WpClient`] for one site:
//! - [`ContentOps`]: search/replace with dry run, backups, revisions
//! - [`MediaOps`]: bulk download, metadata edits, unused-media detection
//! - [`PluginOps`]: installs, lifecycle actions, bulk updates, inventory
//!
//! Operations run strictly one request at a time per site. Per-item failures
//! land in a [`wpbm_core::BulkOperationResult`]; only failures that leave
//! the operation without a safe view of the site abort it.

pub mod backup;
pub mod content;
pub mod error;
pub mod media;
pub mod plugins;
pub mod progress;
pub mod replace;
pub mod usage;

pub use backup::{BACKUP_KIND, BackupData, BackupInfo, BackupSelection, list_backups};
pub use content::{ContentOps, DEFAULT_POST_TYPES, SearchReplaceReport, SearchReplaceRequest};
pub use error::OpsError;
pub use media::{MediaMetadataUpdate, MediaOps, MediaSelection, mime_filter};
pub use plugins::{InstallOutcome, InstallSource, InstallSpec, PluginInventory, PluginOps};
pub use progress::{LogProgress, NoProgress, Progress, ProgressSink};
pub use replace::{ChangeRecord, Preview};
pub use usage::ReferencePatterns;
