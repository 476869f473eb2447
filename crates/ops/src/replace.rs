//! Literal search/replace planning.
//!
//! Preview and apply both go through [`plan_change`], so text written to a
//! site is exactly what a dry run showed for the same remote state.

use serde::{Deserialize, Serialize};
use wpbm_client::{ContentItem, ContentUpdate};

/// Characters kept in a preview before truncation.
pub const PREVIEW_CHARS: usize = 200;

/// Before/after excerpt of an item's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    pub before: String,
    pub after: String,
}

/// Matches found in one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub item_id: u64,
    pub title: String,
    pub url: String,
    pub content_matches: usize,
    pub title_matches: usize,
    pub preview: Preview,
}

impl ChangeRecord {
    pub fn replacements(&self) -> usize {
        self.content_matches + self.title_matches
    }
}

/// A change record plus the update that applies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedChange {
    pub record: ChangeRecord,
    pub update: ContentUpdate,
}

/// Non-overlapping, case-sensitive, literal occurrences of `needle`.
pub fn count_matches(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

/// First [`PREVIEW_CHARS`] characters, with `...` appended when cut.
pub fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Plan the replacement of `search` by `replace` in one item.
///
/// Returns `None` when neither title nor content contains `search`. The
/// update only carries the fields that matched.
pub fn plan_change(item: &ContentItem, search: &str, replace: &str) -> Option<PlannedChange> {
    let content_matches = count_matches(&item.content, search);
    let title_matches = count_matches(&item.title, search);
    if content_matches == 0 && title_matches == 0 {
        return None;
    }

    let new_content = (content_matches > 0).then(|| item.content.replace(search, replace));
    let new_title = (title_matches > 0).then(|| item.title.replace(search, replace));

    let record = ChangeRecord {
        item_id: item.id,
        title: item.title.clone(),
        url: item.link.clone(),
        content_matches,
        title_matches,
        preview: Preview {
            before: preview(&item.content),
            after: preview(new_content.as_deref().unwrap_or(&item.content)),
        },
    };

    Some(PlannedChange { record, update: ContentUpdate { title: new_title, content: new_content, status: None } })
}
