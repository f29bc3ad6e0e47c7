//! Completions from previously executed queries.

use crate::completion::context::CompletionContext;
use crate::completion::source::{CompletionSource, SourceError};
use crate::completion::suggestion::{truncate, CompletionItem, ItemKind};
use async_trait::async_trait;
use parking_lot::RwLock;

pub const DEFAULT_CAPACITY: usize = 100;
const MAX_SUGGESTIONS: usize = 5;
const LABEL_WIDTH: usize = 50;

/// Most-recent-first list of executed queries
#[derive(Debug)]
pub struct HistorySource {
    entries: RwLock<Vec<String>>,
    capacity: usize,
}

impl HistorySource {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            capacity,
        }
    }

    /// Record an executed query; an existing identical entry moves to the front
    pub fn add(&self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        let mut entries = self.entries.write();
        entries.retain(|entry| entry != query);
        entries.insert(0, query.to_string());
        entries.truncate(self.capacity);
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl Default for HistorySource {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl CompletionSource for HistorySource {
    fn name(&self) -> &str {
        "history"
    }

    fn priority(&self) -> i32 {
        70
    }

    async fn complete(&self, ctx: &CompletionContext) -> Result<Vec<CompletionItem>, SourceError> {
        let prefix = &ctx.line_prefix;
        let items = self
            .entries
            .read()
            .iter()
            .filter(|entry| prefix.is_empty() || entry.to_uppercase().starts_with(prefix.as_str()))
            .take(MAX_SUGGESTIONS)
            .enumerate()
            .map(|(rank, entry)| {
                let label = entry.split_whitespace().collect::<Vec<_>>().join(" ");
                CompletionItem::new(entry.as_str(), ItemKind::History, self.name(), 60.0 - rank as f64)
                    .with_label(truncate(&label, LABEL_WIDTH))
                    .with_detail("From history")
            })
            .collect();
        Ok(items)
    }
}
