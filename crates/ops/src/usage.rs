//! Evidence that a media item is referenced by content.
//!
//! Only direct evidence counts: an explicit id in block markup matched by a
//! [`ReferencePatterns`] entry, the item's literal source URL in a body, or a
//! featured image id. Anything else leaves the item unreferenced.

use std::collections::HashSet;

use regex::Regex;
use wpbm_client::{ContentItem, MediaItem};

/// Block comments such as `<!-- wp:image {"id":42,...} -->`.
pub const BLOCK_ID_PATTERN: &str = r#"wp:(?:image|cover|video|audio|file)\s+\{[^}]*?"id":(\d+)"#;

/// Classic editor image classes such as `wp-image-42`.
pub const IMAGE_CLASS_PATTERN: &str = r"wp-image-(\d+)";

/// Regexes whose first capture group is a media id.
#[derive(Debug, Clone)]
pub struct ReferencePatterns {
    patterns: Vec<Regex>,
}

impl Default for ReferencePatterns {
    fn default() -> Self {
        Self {
            patterns: [BLOCK_ID_PATTERN, IMAGE_CLASS_PATTERN]
                .iter()
                .filter_map(|p| Regex::new(p).ok())
                .collect(),
        }
    }
}

impl ReferencePatterns {
    /// Compile custom patterns. Each must have at least one capture group.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, String> {
        let mut compiled = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let regex = Regex::new(pattern.as_ref()).map_err(|e| e.to_string())?;
            if regex.captures_len() < 2 {
                return Err(format!("pattern {:?} has no capture group for the media id", pattern.as_ref()));
            }
            compiled.push(regex);
        }
        Ok(Self { patterns: compiled })
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Ids referenced in `body` by any pattern.
    pub fn ids_in(&self, body: &str) -> Vec<u64> {
        self.patterns
            .iter()
            .flat_map(|re| re.captures_iter(body))
            .filter_map(|c| c.get(1).and_then(|m| m.as_str().parse::<u64>().ok()))
            .collect()
    }
}

/// Ids of media items with direct evidence of use in `content`.
pub fn collect_used_ids(content: &[ContentItem], media: &[MediaItem], patterns: &ReferencePatterns) -> HashSet<u64> {
    let mut used = HashSet::new();

    for item in content {
        used.extend(patterns.ids_in(&item.content));
        if let Some(id) = item.featured_media_id() {
            used.insert(id);
        }
    }

    for m in media {
        if used.contains(&m.id) {
            continue;
        }
        let Some(url) = m.source_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
            continue;
        };
        if content.iter().any(|item| item.content.contains(url)) {
            used.insert(m.id);
        }
    }

    used
}

/// Media items without any evidence of use, in input order.
pub fn unused_media(content: &[ContentItem], media: &[MediaItem], patterns: &ReferencePatterns) -> Vec<MediaItem> {
    let used = collect_used_ids(content, media, patterns);
    media.iter().filter(|m| !used.contains(&m.id)).cloned().collect()
}
