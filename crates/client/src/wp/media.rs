//! Media library endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::content::rendered_or_plain;
use super::{ApiError, WpClient, unwrap_list, unwrap_object};

/// An attachment in the media library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawMediaItem")]
pub struct MediaItem {
    pub id: u64,
    pub title: String,
    pub source_url: Option<String>,
    pub mime_type: Option<String>,
    pub file_size_bytes: u64,
}

/// Wire shape. Different plugin versions report the file URL as
/// `source_url`, `url` or `guid.rendered`, and the size either as
/// `media_details.filesize` or `file_size`.
#[derive(Deserialize)]
struct RawMediaItem {
    id: u64,
    #[serde(default, deserialize_with = "rendered_or_plain")]
    title: String,
    #[serde(default)]
    source_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    guid: Option<Value>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    media_details: Option<Value>,
    #[serde(default)]
    file_size: Option<Value>,
    #[serde(default)]
    file_size_bytes: Option<u64>,
}

impl From<RawMediaItem> for MediaItem {
    fn from(raw: RawMediaItem) -> Self {
        let guid = raw
            .guid
            .as_ref()
            .and_then(|g| g.get("rendered").or(Some(g)))
            .and_then(Value::as_str)
            .map(str::to_string);
        let source_url = [raw.source_url, raw.url, guid]
            .into_iter()
            .flatten()
            .find(|u| !u.trim().is_empty());

        let size = raw
            .file_size_bytes
            .or_else(|| raw.media_details.as_ref().and_then(|d| d.get("filesize")).and_then(as_size))
            .or_else(|| raw.file_size.as_ref().and_then(as_size))
            .unwrap_or(0);

        Self {
            id: raw.id,
            title: raw.title,
            source_url,
            mime_type: raw.mime_type.filter(|m| !m.is_empty()),
            file_size_bytes: size,
        }
    }
}

fn as_size(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Filters for one page of the media listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaQuery {
    pub mime_type: Option<String>,
    pub limit: u32,
    pub page: u32,
}

impl Default for MediaQuery {
    fn default() -> Self {
        Self { mime_type: None, limit: 100, page: 1 }
    }
}

/// Metadata fields that can be changed on an attachment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MediaUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.alt_text.is_none() && self.caption.is_none() && self.description.is_none()
    }
}

impl WpClient {
    /// One page of the media library.
    pub async fn list_media(&self, query: &MediaQuery) -> Result<Vec<MediaItem>, ApiError> {
        let mut params = vec![("limit", query.limit.to_string()), ("page", query.page.to_string())];
        if let Some(mime) = &query.mime_type {
            params.push(("mime_type", mime.clone()));
        }
        let response = self.get("media", &params, true).await?;
        unwrap_list(response, "media")?
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(ApiError::from))
            .collect()
    }

    /// Every item in the media library, bypassing the cache.
    pub async fn list_all_media(&self, page_size: u32) -> Result<Vec<MediaItem>, ApiError> {
        if page_size == 0 {
            return Err(ApiError::InvalidInput("page_size must be greater than 0".into()));
        }

        let mut all = Vec::new();
        let mut page = 1u32;
        loop {
            let params = [("limit", page_size.to_string()), ("page", page.to_string())];
            let response = self.get("media", &params, false).await?;
            let raw = unwrap_list(response, "media")?;
            let count = raw.len();
            for value in raw {
                all.push(serde_json::from_value::<MediaItem>(value)?);
            }
            tracing::debug!(site = %self.site().name, page, count, "fetched media page");
            if count < page_size as usize {
                break;
            }
            page += 1;
        }
        Ok(all)
    }

    /// Fetch one attachment, bypassing the cache.
    pub async fn get_media(&self, id: u64) -> Result<MediaItem, ApiError> {
        let response = self.get(&format!("media/{id}"), &[], false).await?;
        Ok(serde_json::from_value(unwrap_object(response, "media"))?)
    }

    pub async fn update_media(&self, id: u64, update: &MediaUpdate) -> Result<Value, ApiError> {
        if update.is_empty() {
            return Err(ApiError::InvalidInput(format!("empty update for media {id}")));
        }
        self.put(&format!("media/{id}"), update).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing;
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_media_item_from_rest_shape() {
        let item: MediaItem = serde_json::from_value(json!({
            "id": 10,
            "title": {"rendered": "Logo"},
            "source_url": "https://acme.example/wp-content/uploads/logo.png",
            "mime_type": "image/png",
            "media_details": {"filesize": 2048}
        }))
        .unwrap();

        assert_eq!(item.title, "Logo");
        assert_eq!(item.source_url.as_deref(), Some("https://acme.example/wp-content/uploads/logo.png"));
        assert_eq!(item.file_size_bytes, 2048);
    }

    #[test]
    fn test_media_item_from_plugin_shape() {
        let item: MediaItem = serde_json::from_value(json!({
            "id": 11,
            "title": "Brochure",
            "filename": "brochure.pdf",
            "url": "https://acme.example/wp-content/uploads/brochure.pdf",
            "mime_type": "application/pdf",
            "file_size": 4096
        }))
        .unwrap();

        assert_eq!(item.source_url.as_deref(), Some("https://acme.example/wp-content/uploads/brochure.pdf"));
        assert_eq!(item.file_size_bytes, 4096);
    }

    #[test]
    fn test_media_item_guid_fallback_and_missing_size() {
        let item: MediaItem = serde_json::from_value(json!({
            "id": 12,
            "title": null,
            "guid": {"rendered": "https://acme.example/?attachment_id=12"}
        }))
        .unwrap();

        assert_eq!(item.title, "");
        assert_eq!(item.source_url.as_deref(), Some("https://acme.example/?attachment_id=12"));
        assert_eq!(item.file_size_bytes, 0);
        assert_eq!(item.mime_type, None);
    }

    #[test]
    fn test_media_item_serializes_normalized() {
        let item: MediaItem = serde_json::from_value(json!({"id": 1, "title": "A", "file_size": "12"})).unwrap();
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["file_size_bytes"], 12);
        let back: MediaItem = serde_json::from_value(value).unwrap();
        assert_eq!(back, item);
    }

    #[tokio::test]
    async fn test_list_media_passes_mime_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wpbm/v1/media"))
            .and(query_param("mime_type", "image/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "media": [{"id": 1, "title": "a", "mime_type": "image/png"}],
                "total": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = testing::client(&server);
        let query = MediaQuery { mime_type: Some("image/".into()), ..Default::default() };
        let items = client.list_media(&query).await.unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_list_all_media_paginates_bare_arrays() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}, {"id": 2}])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 3}])))
            .expect(1)
            .mount(&server)
            .await;

        let client = testing::client(&server);
        let items = client.list_all_media(2).await.unwrap();
        assert_eq!(items.iter().map(|m| m.id).collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}
