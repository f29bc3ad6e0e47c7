/*!
 * Completion engine
 *
 * Fans a request out to every registered source concurrently, then merges,
 * filters, de-duplicates and ranks what comes back. Results are cached per
 * `(word, line prefix)` until the cache is cleared, which happens whenever
 * sources are registered or the schema is reloaded.
 */

use super::context::CompletionContext;
use super::source::CompletionSource;
use super::suggestion::{CompletionItem, ItemKind};
use futures::future::join_all;
use parking_lot::RwLock;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub const DEFAULT_MAX_ITEMS: usize = 20;

const STARTS_WITH_BOOST: f64 = 100.0;
const CONTAINS_BOOST: f64 = 50.0;

type CacheKey = (String, String);

pub struct CompletionEngine {
    sources: RwLock<Vec<Arc<dyn CompletionSource>>>,
    cache: RwLock<HashMap<CacheKey, Vec<CompletionItem>>>,
    max_items: usize,
}

impl CompletionEngine {
    pub fn new(max_items: usize) -> Self {
        Self {
            sources: RwLock::new(Vec::new()),
            cache: RwLock::new(HashMap::new()),
            max_items,
        }
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Add a source; sources stay ordered by descending priority, ties in
    /// registration order
    pub fn register(&self, source: Arc<dyn CompletionSource>) {
        tracing::debug!(
            source = source.name(),
            priority = source.priority(),
            "Registering completion source"
        );
        let mut sources = self.sources.write();
        sources.push(source);
        sources.sort_by_key(|s| Reverse(s.priority()));
        drop(sources);
        self.clear_cache();
    }

    /// Registered sources as `(name, priority)`, highest priority first
    pub fn sources(&self) -> Vec<(String, i32)> {
        self.sources
            .read()
            .iter()
            .map(|s| (s.name().to_string(), s.priority()))
            .collect()
    }

    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    /// Complete at byte offset `cursor` of `query`
    pub async fn complete(
        &self,
        query: &str,
        cursor: usize,
        database: Option<&str>,
        tables: &[String],
    ) -> Vec<CompletionItem> {
        let ctx = CompletionContext::new(query, cursor, database, tables);
        self.complete_context(&ctx).await
    }

    pub async fn complete_context(&self, ctx: &CompletionContext) -> Vec<CompletionItem> {
        let key = (ctx.word.clone(), ctx.line_prefix.clone());
        if let Some(items) = self.cache.read().get(&key) {
            return items.clone();
        }

        let sources: Vec<Arc<dyn CompletionSource>> = self.sources.read().clone();
        let results = join_all(sources.iter().map(|source| source.complete(ctx))).await;

        let mut merged = Vec::new();
        for (source, result) in sources.iter().zip(results) {
            match result {
                Ok(items) => merged.extend(items),
                Err(e) => tracing::debug!(source = source.name(), "Completion source failed: {}", e),
            }
        }

        let items = rank(merged, &ctx.word, self.max_items);
        self.cache.write().insert(key, items.clone());
        items
    }
}

impl Default for CompletionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITEMS)
    }
}

/// Filter by `word`, drop duplicates and keep the best `max_items`.
///
/// `items` must arrive in source-priority order: the first of two items with
/// the same insert text and kind wins, and equal scores keep their order.
pub fn rank(items: Vec<CompletionItem>, word: &str, max_items: usize) -> Vec<CompletionItem> {
    let word = word.to_lowercase();
    let mut seen: HashSet<(String, ItemKind)> = HashSet::new();

    let mut ranked: Vec<CompletionItem> = items
        .into_iter()
        .filter_map(|mut item| {
            if !word.is_empty() {
                let text = item.match_text().to_lowercase();
                if text.starts_with(&word) {
                    item.score += STARTS_WITH_BOOST;
                } else if text.contains(&word) {
                    item.score += CONTAINS_BOOST;
                } else {
                    return None;
                }
            }
            Some(item)
        })
        .filter(|item| seen.insert((item.insert_text.clone(), item.kind)))
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(max_items);
    ranked
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
