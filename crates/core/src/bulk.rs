//! Aggregated results for operations applied across many remote items.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What happened to one item of a bulk operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Succeeded {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<Value>,
    },
    Failed {
        error: String,
    },
}

/// Per-item entry of a [`BulkOperationResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResult {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

impl ItemResult {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, ItemOutcome::Failed { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ItemOutcome::Failed { error } => Some(error),
            ItemOutcome::Succeeded { .. } => None,
        }
    }
}

/// Counts plus per-item detail for one bulk run.
///
/// Counters are updated together with `items`, so a result that stops
/// growing halfway through a run still has `succeeded + failed <= total`
/// and one entry per processed item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkOperationResult {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub items: Vec<ItemResult>,
}

impl BulkOperationResult {
    pub fn new(total: usize) -> Self {
        Self { total, ..Default::default() }
    }

    pub fn record_success(&mut self, id: impl ToString, title: Option<String>, detail: Option<Value>) {
        self.succeeded += 1;
        self.push(ItemResult { id: id.to_string(), title, outcome: ItemOutcome::Succeeded { detail } });
    }

    /// Record a failed item. An empty message is replaced so that every
    /// failure stays explainable.
    pub fn record_failure(&mut self, id: impl ToString, title: Option<String>, error: impl ToString) {
        let mut error = error.to_string();
        if error.trim().is_empty() {
            error = "unknown error".into();
        }
        self.failed += 1;
        self.push(ItemResult { id: id.to_string(), title, outcome: ItemOutcome::Failed { error } });
    }

    fn push(&mut self, item: ItemResult) {
        self.items.push(item);
        self.total = self.total.max(self.succeeded + self.failed);
    }

    /// Ids of failed items, for retrying just that subset.
    pub fn failed_ids(&self) -> Vec<&str> {
        self.items.iter().filter(|i| i.is_failure()).map(|i| i.id.as_str()).collect()
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// True once every announced item has an outcome.
    pub fn is_complete(&self) -> bool {
        self.succeeded + self.failed == self.total
    }
}
