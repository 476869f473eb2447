//! Content endpoints: listing, single items, updates and revisions.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::{ApiError, WpClient, unwrap_list, unwrap_object};

/// Default page size for content listings.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// A post, page or custom post type item as returned by the API.
///
/// Fields the client does not model are kept in `extra` so that backups
/// capture the complete payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: u64,
    #[serde(rename = "type", default)]
    pub content_type: String,
    #[serde(default, deserialize_with = "rendered_or_plain")]
    pub title: String,
    #[serde(default, deserialize_with = "rendered_or_plain")]
    pub content: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured_media: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentItem {
    /// Featured image id, treating WordPress's `0` as none.
    pub fn featured_media_id(&self) -> Option<u64> {
        self.featured_media.filter(|id| *id != 0)
    }
}

/// Accepts `"text"`, `{"rendered": "text"}` or `null`.
pub(crate) fn rendered_or_plain<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Text {
        Plain(String),
        Rendered { rendered: String },
    }

    Ok(match Option::<Text>::deserialize(deserializer)? {
        Some(Text::Plain(s)) | Some(Text::Rendered { rendered: s }) => s,
        None => String::new(),
    })
}

/// Parameters for a paginated content listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentQuery {
    pub content_type: String,
    pub status: String,
    pub page_size: u32,
    pub use_cache: bool,
}

impl Default for ContentQuery {
    fn default() -> Self {
        Self { content_type: "page".into(), status: "any".into(), page_size: DEFAULT_PAGE_SIZE, use_cache: true }
    }
}

impl ContentQuery {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self { content_type: content_type.into(), ..Default::default() }
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Skip the response cache, for callers about to mutate what they read.
    pub fn fresh(mut self) -> Self {
        self.use_cache = false;
        self
    }
}

/// Fields to change on an existing item. `None` fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ContentUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.status.is_none()
    }
}

/// Body of the server-side search/replace endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteSearchReplace {
    pub search: String,
    pub replace: String,
    pub post_types: Vec<String>,
    pub dry_run: bool,
}

/// One stored revision of a content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn parse_items<T: serde::de::DeserializeOwned>(raw: Vec<Value>) -> Result<Vec<T>, ApiError> {
    raw.into_iter()
        .map(|v| serde_json::from_value(v).map_err(ApiError::from))
        .collect()
}

impl WpClient {
    /// Fetch every item matching `query`, one page at a time.
    ///
    /// Stops at the first page holding fewer than `page_size` items (or none).
    /// Items are returned in server order.
    pub async fn get_content_paged(&self, query: &ContentQuery) -> Result<Vec<ContentItem>, ApiError> {
        if query.page_size == 0 {
            return Err(ApiError::InvalidInput("page_size must be greater than 0".into()));
        }

        let mut all = Vec::new();
        let mut page = 1u32;
        loop {
            let params = [
                ("type", query.content_type.clone()),
                ("status", query.status.clone()),
                ("page", page.to_string()),
                ("limit", query.page_size.to_string()),
            ];
            let response = self.get("content", &params, query.use_cache).await?;
            let items: Vec<ContentItem> = parse_items(unwrap_list(response, "posts")?)?;
            let count = items.len();
            tracing::debug!(site = %self.site().name, content_type = %query.content_type, page, count, "fetched content page");

            all.extend(items);
            if count < query.page_size as usize {
                break;
            }
            page += 1;
        }
        Ok(all)
    }

    /// Fetch one item, bypassing the cache.
    pub async fn get_content(&self, id: u64) -> Result<ContentItem, ApiError> {
        let response = self.get(&format!("content/{id}"), &[], false).await?;
        Ok(serde_json::from_value(unwrap_object(response, "post"))?)
    }

    pub async fn create_content(&self, item: &Value) -> Result<Value, ApiError> {
        self.post("content", item).await
    }

    pub async fn update_content(&self, id: u64, update: &ContentUpdate) -> Result<Value, ApiError> {
        if update.is_empty() {
            return Err(ApiError::InvalidInput(format!("empty update for content {id}")));
        }
        self.put(&format!("content/{id}"), update).await
    }

    pub async fn delete_content(&self, id: u64) -> Result<Value, ApiError> {
        self.delete(&format!("content/{id}")).await
    }

    pub async fn get_revisions(&self, id: u64) -> Result<Vec<Revision>, ApiError> {
        let response = self.get(&format!("content/{id}/revisions"), &[], false).await?;
        parse_items(unwrap_list(response, "revisions")?)
    }

    pub async fn restore_revision(&self, id: u64, revision_id: u64) -> Result<Value, ApiError> {
        self.post(&format!("content/{id}/revisions/{revision_id}/restore"), &Map::new())
            .await
    }

    /// Ask the server to run search/replace itself.
    pub async fn search_replace_remote(&self, request: &RemoteSearchReplace) -> Result<Value, ApiError> {
        if request.search.is_empty() {
            return Err(ApiError::InvalidInput("search string must not be empty".into()));
        }
        self.post("search-replace", request).await
    }
}
