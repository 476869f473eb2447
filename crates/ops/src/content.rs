//! Content operations: cross-site search/replace and revisions.

use serde::{Deserialize, Serialize};
use serde_json::json;
use wpbm_client::{ContentItem, ContentQuery, Revision, WpClient};
use wpbm_core::BulkOperationResult;

use crate::OpsError;
use crate::progress::{Progress, ProgressSink};
use crate::replace::{ChangeRecord, plan_change};

/// Post types scanned when a caller names none.
pub const DEFAULT_POST_TYPES: [&str; 2] = ["post", "page"];

/// Parameters of a search/replace run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchReplaceRequest {
    pub search: String,
    pub replace: String,
    #[serde(default)]
    pub post_types: Vec<String>,
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
}

fn default_dry_run() -> bool {
    true
}

impl SearchReplaceRequest {
    /// A dry run over posts and pages.
    pub fn new(search: impl Into<String>, replace: impl Into<String>) -> Self {
        Self { search: search.into(), replace: replace.into(), post_types: Vec::new(), dry_run: true }
    }

    pub fn post_types(mut self, types: &[&str]) -> Self {
        self.post_types = types.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn apply(mut self) -> Self {
        self.dry_run = false;
        self
    }

    /// Reject requests that cannot run, before anything touches the site.
    pub fn validate(&self) -> Result<(), OpsError> {
        if self.search.is_empty() {
            return Err(OpsError::InvalidInput("search string must not be empty".into()));
        }
        Ok(())
    }

    /// Requested post types, or posts and pages when none were named.
    pub fn effective_post_types(&self) -> Vec<String> {
        if self.post_types.is_empty() {
            DEFAULT_POST_TYPES.iter().map(|t| t.to_string()).collect()
        } else {
            self.post_types.clone()
        }
    }
}

/// Outcome of a search/replace run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchReplaceReport {
    pub site: String,
    pub search: String,
    pub replace: String,
    pub post_types: Vec<String>,
    pub dry_run: bool,
    /// Items examined across all post types.
    pub scanned: usize,
    pub total_replacements: usize,
    pub changes: Vec<ChangeRecord>,
    /// One entry per matching item. In a dry run every match counts as succeeded.
    pub result: BulkOperationResult,
}

/// Content operations against one site.
#[derive(Debug, Clone)]
pub struct ContentOps {
    pub(crate) client: WpClient,
    pub(crate) page_size: u32,
}

impl ContentOps {
    pub fn new(client: WpClient) -> Self {
        Self { client, page_size: wpbm_client::wp::content::DEFAULT_PAGE_SIZE }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn client(&self) -> &WpClient {
        &self.client
    }

    /// Every item of the given post types, read fresh, in listing order.
    pub(crate) async fn fetch_all(&self, post_types: &[String]) -> Result<Vec<ContentItem>, OpsError> {
        let mut items = Vec::new();
        for post_type in post_types {
            let query = ContentQuery::new(post_type.as_str()).page_size(self.page_size).fresh();
            items.extend(self.client.get_content_paged(&query).await?);
        }
        Ok(items)
    }

    /// Replace every literal occurrence of `search` in titles and content.
    ///
    /// All listings are fetched before the first update; a listing failure
    /// aborts the run with nothing modified. Update failures are recorded per
    /// item and do not stop the run.
    pub async fn search_replace(
        &self, request: &SearchReplaceRequest, progress: &mut dyn ProgressSink,
    ) -> Result<SearchReplaceReport, OpsError> {
        request.validate()?;

        let post_types = request.effective_post_types();
        let items = self.fetch_all(&post_types).await?;
        let scanned = items.len();

        let mut planned = Vec::new();
        for (i, item) in items.iter().enumerate() {
            progress.report(Progress::new(i + 1, scanned, format!("Scanning {}", item.title)));
            if let Some(plan) = plan_change(item, &request.search, &request.replace) {
                planned.push(plan);
            }
        }

        let total_replacements = planned.iter().map(|p| p.record.replacements()).sum();
        let mut result = BulkOperationResult::new(planned.len());

        for plan in &planned {
            let record = &plan.record;
            let title = Some(record.title.clone());
            if request.dry_run {
                result.record_success(record.item_id, title, Some(json!({ "replacements": record.replacements() })));
                continue;
            }

            match self.client.update_content(record.item_id, &plan.update).await {
                Ok(_) => {
                    result.record_success(record.item_id, title, Some(json!({ "replacements": record.replacements() })))
                }
                Err(e) => {
                    tracing::warn!(site = %self.client.site().name, item_id = record.item_id, error = %e, "update failed");
                    result.record_failure(record.item_id, title, e);
                }
            }
        }

        tracing::info!(
            site = %self.client.site().name,
            scanned,
            matched = planned.len(),
            total_replacements,
            dry_run = request.dry_run,
            failed = result.failed,
            "search/replace finished"
        );

        Ok(SearchReplaceReport {
            site: self.client.site_url(),
            search: request.search.clone(),
            replace: request.replace.clone(),
            post_types,
            dry_run: request.dry_run,
            scanned,
            total_replacements,
            changes: planned.into_iter().map(|p| p.record).collect(),
            result,
        })
    }

    pub async fn get_revision_history(&self, item_id: u64) -> Result<Vec<Revision>, OpsError> {
        Ok(self.client.get_revisions(item_id).await?)
    }

    /// Restore an item to a revision. Returns the server's `success` flag.
    pub async fn restore_from_revision(&self, item_id: u64, revision_id: u64) -> Result<bool, OpsError> {
        let response = self.client.restore_revision(item_id, revision_id).await?;
        let success = response.get("success").and_then(|v| v.as_bool()).unwrap_or(false);
        if !success {
            tracing::warn!(site = %self.client.site().name, item_id, revision_id, "revision restore reported failure");
        }
        Ok(success)
    }
}
