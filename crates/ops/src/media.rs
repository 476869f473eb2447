//! Media operations: bulk download, metadata edits and unused-media detection.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::json;
use wpbm_client::{MediaItem, MediaQuery, MediaUpdate, WpClient};
use wpbm_core::BulkOperationResult;

use crate::OpsError;
use crate::content::{ContentOps, DEFAULT_POST_TYPES};
use crate::progress::{Progress, ProgressSink};
use crate::usage::{ReferencePatterns, unused_media};

/// Expand a short media type name into the MIME prefix the API filters on.
///
/// Unknown values pass through unchanged so full MIME types also work.
pub fn mime_filter(kind: &str) -> String {
    match kind.trim().to_ascii_lowercase().as_str() {
        "image" | "images" => "image/".into(),
        "video" | "videos" => "video/".into(),
        "audio" => "audio/".into(),
        "pdf" => "application/pdf".into(),
        "document" | "documents" => "application/".into(),
        other => other.to_string(),
    }
}

/// Which attachments to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSelection {
    Ids(Vec<u64>),
    All,
}

/// Metadata change for one attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMetadataUpdate {
    pub id: u64,
    #[serde(flatten)]
    pub fields: MediaUpdate,
}

/// Local file name for an attachment: the last URL path segment, or
/// `media_<id>` when the URL has none.
pub fn download_file_name(item: &MediaItem) -> String {
    item.source_url
        .as_deref()
        .and_then(|u| url::Url::parse(u).ok())
        .and_then(|u| u.path_segments().and_then(|mut s| s.next_back().map(str::to_string)))
        .filter(|name| !name.is_empty() && name != "." && name != "..")
        .unwrap_or_else(|| format!("media_{}", item.id))
}

/// Pick a path in `dir` no earlier item of the same run has claimed.
///
/// The plain file name wins when free; otherwise the attachment id is
/// prefixed, with a counter after it if even that is taken.
fn unique_download_path(dir: &Path, item: &MediaItem, claimed: &mut HashSet<PathBuf>) -> PathBuf {
    let name = download_file_name(item);
    let mut path = dir.join(&name);
    let mut n = 0u32;
    while claimed.contains(&path) {
        path = match n {
            0 => dir.join(format!("{}_{name}", item.id)),
            _ => dir.join(format!("{}_{n}_{name}", item.id)),
        };
        n += 1;
    }
    claimed.insert(path.clone());
    path
}

/// Media operations against one site.
#[derive(Debug, Clone)]
pub struct MediaOps {
    client: WpClient,
    page_size: u32,
    patterns: ReferencePatterns,
}

impl MediaOps {
    pub fn new(client: WpClient) -> Self {
        Self { client, page_size: wpbm_client::wp::content::DEFAULT_PAGE_SIZE, patterns: ReferencePatterns::default() }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Replace the id-reference heuristics used by [`MediaOps::find_unused_media`].
    pub fn with_patterns(mut self, patterns: ReferencePatterns) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn client(&self) -> &WpClient {
        &self.client
    }

    /// One page of the library, optionally filtered by type (`image`, `pdf`, ...).
    pub async fn list_media(&self, filter: Option<&str>, limit: u32) -> Result<Vec<MediaItem>, OpsError> {
        let query = MediaQuery { mime_type: filter.map(mime_filter), limit, ..Default::default() };
        Ok(self.client.list_media(&query).await?)
    }

    /// Download attachments into `dir`, one at a time.
    ///
    /// A failed lookup or transfer is recorded for that id and the run goes
    /// on. Listing the whole library for [`MediaSelection::All`] must succeed.
    /// A file name already used earlier in the run gets the attachment id
    /// prefixed, so every success points at its own file.
    pub async fn bulk_download(
        &self, selection: &MediaSelection, dir: &Path, progress: &mut dyn ProgressSink,
    ) -> Result<BulkOperationResult, OpsError> {
        tokio::fs::create_dir_all(dir).await?;

        let items: Vec<Result<MediaItem, (u64, OpsError)>> = match selection {
            MediaSelection::All => self.client.list_all_media(self.page_size).await?.into_iter().map(Ok).collect(),
            MediaSelection::Ids(ids) => {
                let mut items = Vec::with_capacity(ids.len());
                for &id in ids {
                    items.push(self.client.get_media(id).await.map_err(|e| (id, e.into())));
                }
                items
            }
        };

        let total = items.len();
        let mut result = BulkOperationResult::new(total);
        let mut claimed = HashSet::new();

        for (i, item) in items.into_iter().enumerate() {
            match item {
                Err((id, e)) => {
                    progress.report(Progress::new(i + 1, total, format!("Skipping media {id}")));
                    tracing::warn!(site = %self.client.site().name, media_id = id, error = %e, "media lookup failed");
                    result.record_failure(id, None, e);
                }
                Ok(item) => {
                    progress.report(Progress::new(i + 1, total, format!("Downloading {}", item.title)));
                    let path = unique_download_path(dir, &item, &mut claimed);
                    match self.download_one(&item, path).await {
                        Ok((path, bytes)) => result.record_success(
                            item.id,
                            Some(item.title.clone()),
                            Some(json!({ "path": path, "bytes": bytes })),
                        ),
                        Err(e) => {
                            tracing::warn!(site = %self.client.site().name, media_id = item.id, error = %e, "download failed");
                            result.record_failure(item.id, Some(item.title.clone()), e);
                        }
                    }
                }
            }
        }

        tracing::info!(
            site = %self.client.site().name,
            dir = %dir.display(),
            succeeded = result.succeeded,
            failed = result.failed,
            "media download finished"
        );
        Ok(result)
    }

    async fn download_one(&self, item: &MediaItem, path: PathBuf) -> Result<(PathBuf, u64), OpsError> {
        let Some(url) = item.source_url.as_deref().filter(|u| !u.trim().is_empty()) else {
            return Err(OpsError::InvalidInput(format!("media {} has no source URL", item.id)));
        };
        let bytes = self.client.download(url, &path).await?;
        Ok((path, bytes))
    }

    /// Apply metadata changes, one request per attachment.
    pub async fn bulk_update_metadata(&self, updates: &[MediaMetadataUpdate]) -> Result<BulkOperationResult, OpsError> {
        let mut result = BulkOperationResult::new(updates.len());
        for update in updates {
            match self.client.update_media(update.id, &update.fields).await {
                Ok(_) => result.record_success(update.id, update.fields.title.clone(), None),
                Err(e) => {
                    tracing::warn!(site = %self.client.site().name, media_id = update.id, error = %e, "metadata update failed");
                    result.record_failure(update.id, update.fields.title.clone(), e);
                }
            }
        }
        Ok(result)
    }

    /// Attachments with no direct evidence of use in content of `post_types`
    /// (posts and pages when empty).
    ///
    /// Everything is read fresh. Any listing failure aborts: a partial view
    /// of the content would report used media as unused.
    pub async fn find_unused_media(&self, post_types: &[String]) -> Result<Vec<MediaItem>, OpsError> {
        let post_types: Vec<String> = if post_types.is_empty() {
            DEFAULT_POST_TYPES.iter().map(|t| t.to_string()).collect()
        } else {
            post_types.to_vec()
        };

        let media = self.client.list_all_media(self.page_size).await?;
        let content = ContentOps::new(self.client.clone()).with_page_size(self.page_size).fetch_all(&post_types).await?;

        let unused = unused_media(&content, &media, &self.patterns);
        tracing::info!(
            site = %self.client.site().name,
            media = media.len(),
            content = content.len(),
            unused = unused.len(),
            "unused media scan finished"
        );
        Ok(unused)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u64, url: Option<&str>) -> MediaItem {
        serde_json::from_value(json!({"id": id, "title": "x", "source_url": url})).unwrap()
    }

    #[test]
    fn test_mime_filter_aliases() {
        assert_eq!(mime_filter("image"), "image/");
        assert_eq!(mime_filter("PDF"), "application/pdf");
        assert_eq!(mime_filter("document"), "application/");
        assert_eq!(mime_filter("image/png"), "image/png");
    }

    #[test]
    fn test_download_file_name() {
        assert_eq!(download_file_name(&item(1, Some("https://a.example/wp-content/uploads/2024/05/hero.jpg"))), "hero.jpg");
        assert_eq!(download_file_name(&item(2, Some("https://a.example/"))), "media_2");
        assert_eq!(download_file_name(&item(3, None)), "media_3");
        assert_eq!(download_file_name(&item(4, Some("not a url"))), "media_4");
    }

    #[test]
    fn test_unique_download_path_never_reuses_a_claim() {
        let dir = Path::new("/tmp/dl");
        let mut claimed = HashSet::new();
        let a = item(1, Some("https://a.example/wp-content/uploads/2023/01/hero.jpg"));
        let b = item(2, Some("https://a.example/wp-content/uploads/2024/05/hero.jpg"));

        assert_eq!(unique_download_path(dir, &a, &mut claimed), dir.join("hero.jpg"));
        assert_eq!(unique_download_path(dir, &b, &mut claimed), dir.join("2_hero.jpg"));
        assert_eq!(unique_download_path(dir, &b, &mut claimed), dir.join("2_1_hero.jpg"));
        assert_eq!(claimed.len(), 3);
    }

    #[test]
    fn test_metadata_update_is_flat() {
        let update: MediaMetadataUpdate =
            serde_json::from_value(json!({"id": 7, "alt_text": "Team photo"})).unwrap();
        assert_eq!(update.id, 7);
        assert_eq!(update.fields.alt_text.as_deref(), Some("Team photo"));
        assert!(update.fields.title.is_none());
    }
}
