//! Snapshots of content taken before destructive bulk operations.
//!
//! A backup is a `content_backup` report envelope holding the full payload
//! of every captured item, enough to put title, content and status back.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::json;
use wpbm_client::{ContentItem, ContentUpdate};
use wpbm_core::{BulkOperationResult, ReportWriter};

use crate::OpsError;
use crate::content::{ContentOps, DEFAULT_POST_TYPES};

/// Envelope type and filename prefix of backup files.
pub const BACKUP_KIND: &str = "content_backup";

/// Which items to capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupSelection {
    Items(Vec<u64>),
    All { post_types: Vec<String> },
}

impl BackupSelection {
    /// Every post and page.
    pub fn all() -> Self {
        BackupSelection::All { post_types: DEFAULT_POST_TYPES.iter().map(|t| t.to_string()).collect() }
    }
}

/// `data` section of a backup file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupData {
    pub site: String,
    pub items: Vec<ContentItem>,
}

/// Where a backup went and what it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupInfo {
    pub backup_location: PathBuf,
    pub item_count: usize,
    pub timestamp: String,
    /// Requested ids that could not be fetched and are not in the file.
    pub missing: Vec<u64>,
}

impl ContentOps {
    /// Capture full payloads of the selected items into a new backup file.
    ///
    /// Explicit ids are fetched one by one, bypassing the cache; an id that
    /// cannot be fetched is listed in `missing`. For `All`, a listing failure
    /// aborts without writing a file.
    pub async fn backup_before_bulk_operation(
        &self, selection: &BackupSelection, writer: &ReportWriter,
    ) -> Result<BackupInfo, OpsError> {
        let mut missing = Vec::new();
        let items = match selection {
            BackupSelection::Items(ids) => {
                let mut items = Vec::with_capacity(ids.len());
                for &id in ids {
                    match self.client.get_content(id).await {
                        Ok(item) => items.push(item),
                        Err(e) => {
                            tracing::warn!(site = %self.client.site().name, item_id = id, error = %e, "could not back up item");
                            missing.push(id);
                        }
                    }
                }
                items
            }
            BackupSelection::All { post_types } => self.fetch_all(post_types).await?,
        };

        let data = BackupData { site: self.client.site_url(), items };
        let written = writer.write(BACKUP_KIND, &data)?;

        tracing::info!(
            site = %self.client.site().name,
            path = %written.path.display(),
            items = data.items.len(),
            missing = missing.len(),
            "backup written"
        );

        Ok(BackupInfo {
            backup_location: written.path,
            item_count: data.items.len(),
            timestamp: written.timestamp,
            missing,
        })
    }

    /// Put back title, content and status of every item in a backup file.
    ///
    /// The backup must belong to this client's site.
    pub async fn restore_backup(&self, path: &Path) -> Result<BulkOperationResult, OpsError> {
        let envelope = ReportWriter::read::<BackupData>(path)?;
        if envelope.kind != BACKUP_KIND {
            return Err(OpsError::InvalidInput(format!(
                "{} is a {} file, not a backup",
                path.display(),
                envelope.kind
            )));
        }

        let backup = envelope.data;
        let site = self.client.site_url();
        if backup.site != site {
            return Err(OpsError::InvalidInput(format!("backup was taken from {}, not {site}", backup.site)));
        }

        let mut result = BulkOperationResult::new(backup.items.len());
        for item in &backup.items {
            let update = ContentUpdate {
                title: Some(item.title.clone()),
                content: Some(item.content.clone()),
                status: Some(item.status.clone()).filter(|s| !s.is_empty()),
            };
            match self.client.update_content(item.id, &update).await {
                Ok(_) => result.record_success(item.id, Some(item.title.clone()), Some(json!({ "restored": true }))),
                Err(e) => {
                    tracing::warn!(site = %self.client.site().name, item_id = item.id, error = %e, "restore failed");
                    result.record_failure(item.id, Some(item.title.clone()), e);
                }
            }
        }

        tracing::info!(
            site = %self.client.site().name,
            path = %path.display(),
            succeeded = result.succeeded,
            failed = result.failed,
            "backup restored"
        );
        Ok(result)
    }
}

/// Backup files in `writer`'s directory, oldest first.
pub fn list_backups(writer: &ReportWriter) -> Result<Vec<PathBuf>, OpsError> {
    Ok(writer.list(BACKUP_KIND)?)
}
