//! Model-generated completions.
//!
//! Slow and optional: only asked once the word being typed has a few
//! characters, bounded by a hard timeout, and answers are cached per
//! `(line prefix, word)` for a few minutes.

use crate::ai::AiProvider;
use crate::completion::context::CompletionContext;
use crate::completion::source::{CompletionSource, SourceError};
use crate::completion::suggestion::{truncate, CompletionItem, ItemKind};
use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_MIN_WORD_LEN: usize = 3;
const CACHE_TTL: Duration = Duration::from_secs(5 * 60);
const LABEL_WIDTH: usize = 40;

pub struct AiSource {
    provider: Arc<dyn AiProvider>,
    enabled: bool,
    min_word_len: usize,
    timeout: Duration,
    cache: Mutex<HashMap<String, (Instant, Vec<CompletionItem>)>>,
}

impl AiSource {
    pub fn new(provider: Arc<dyn AiProvider>) -> Self {
        Self {
            provider,
            enabled: true,
            min_word_len: DEFAULT_MIN_WORD_LEN,
            timeout: DEFAULT_TIMEOUT,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_min_word_len(mut self, min_word_len: usize) -> Self {
        self.min_word_len = min_word_len;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_active(&self) -> bool {
        self.enabled && self.provider.is_configured()
    }

    fn cached(&self, key: &str) -> Option<Vec<CompletionItem>> {
        let mut cache = self.cache.lock();
        match cache.get(key) {
            Some((stored, items)) if stored.elapsed() <= CACHE_TTL => Some(items.clone()),
            Some(_) => {
                cache.remove(key);
                None
            }
            None => None,
        }
    }

    fn build_prompt(ctx: &CompletionContext) -> String {
        format!(
            "Given this SQL query context, suggest completions.\n\n\
             Current query:\n{}\n\n\
             Cursor is at position {}, current word being typed: \"{}\"\n\
             Context: {}\n\
             Available tables: {}\n\n\
             Provide 3-5 SQL completion suggestions. Each line should be a single completion.\n\
             Only output the completions, one per line.",
            ctx.query,
            ctx.cursor,
            ctx.word,
            ctx.line_prefix,
            ctx.tables.join(", ")
        )
    }

    fn parse_response(&self, response: &str) -> Vec<CompletionItem> {
        static MARKER: OnceLock<Regex> = OnceLock::new();
        let marker = MARKER.get_or_init(|| {
            Regex::new(r"^\s*(?:\d+[.)]|[-*•])\s*").expect("valid list marker regex")
        });

        response
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with("```"))
            .map(|line| marker.replace(line, "").trim().to_string())
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(i, text)| {
                let score = 20.0 + (5.0 - i as f64);
                CompletionItem::new(text.as_str(), ItemKind::Ai, self.name(), score)
                    .with_label(truncate(&text, LABEL_WIDTH))
                    .with_detail("AI Suggestion")
            })
            .collect()
    }
}

#[async_trait]
impl CompletionSource for AiSource {
    fn name(&self) -> &str {
        "ai"
    }

    fn priority(&self) -> i32 {
        30
    }

    async fn complete(&self, ctx: &CompletionContext) -> Result<Vec<CompletionItem>, SourceError> {
        if !self.is_active() || ctx.word.chars().count() < self.min_word_len {
            return Ok(Vec::new());
        }

        let key = format!("{}|{}", ctx.line_prefix, ctx.word);
        if let Some(items) = self.cached(&key) {
            return Ok(items);
        }

        let prompt = Self::build_prompt(ctx);
        let response = tokio::time::timeout(self.timeout, self.provider.nl2sql(&prompt, None))
            .await
            .map_err(|_| SourceError::Timeout {
                source_name: self.name().to_string(),
                elapsed: self.timeout,
            })?
            .map_err(|e| SourceError::Provider {
                source_name: self.name().to_string(),
                message: e.to_string(),
            })?;

        let items = self.parse_response(&response);
        self.cache.lock().insert(key, (Instant::now(), items.clone()));
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AiError, NoopProvider};
    use crate::database::Schema;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers a fixed list and counts calls
    struct CountingProvider {
        calls: AtomicUsize,
        delay: Duration,
    }

    impl CountingProvider {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AiProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        fn model(&self) -> &str {
            "test"
        }

        fn is_configured(&self) -> bool {
            true
        }

        async fn nl2sql(&self, _prompt: &str, _schema: Option<&Schema>) -> Result<String, AiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok("1. users\n2) user_id\n- username\n\n* updated_at".to_string())
        }

        async fn refactor_sql(
            &self,
            sql: &str,
            _instruction: &str,
            _schema: Option<&Schema>,
        ) -> Result<String, AiError> {
            Ok(sql.to_string())
        }
    }

    fn ctx(query: &str) -> CompletionContext {
        CompletionContext::new(query, query.len(), None, &["users".to_string()])
    }

    #[tokio::test]
    async fn test_short_word_never_calls_provider() {
        let provider = CountingProvider::new(Duration::ZERO);
        let source = AiSource::new(provider.clone());
        let items = source.complete(&ctx("SELECT * FROM us")).await.unwrap();
        assert!(items.is_empty());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_parses_list_and_caches() {
        let provider = CountingProvider::new(Duration::ZERO);
        let source = AiSource::new(provider.clone());

        let items = source.complete(&ctx("SELECT * FROM use")).await.unwrap();
        let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["users", "user_id", "username", "updated_at"]);
        assert_eq!(items[0].score, 25.0);
        assert_eq!(items[3].score, 22.0);
        assert_eq!(items[0].kind, ItemKind::Ai);
        assert_eq!(items[0].detail, "AI Suggestion");

        source.complete(&ctx("SELECT * FROM use")).await.unwrap();
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_timeout() {
        let provider = CountingProvider::new(Duration::from_millis(500));
        let source = AiSource::new(provider).with_timeout(Duration::from_millis(20));
        let result = source.complete(&ctx("SELECT * FROM use")).await;
        assert!(matches!(result, Err(SourceError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_disabled_or_unconfigured() {
        let provider = CountingProvider::new(Duration::ZERO);
        let source = AiSource::new(provider.clone()).with_enabled(false);
        assert!(source.complete(&ctx("SELECT * FROM use")).await.unwrap().is_empty());
        assert_eq!(provider.calls(), 0);

        let source = AiSource::new(Arc::new(NoopProvider));
        assert!(!source.is_active());
    }

    #[test]
    fn test_prompt_mentions_context() {
        let prompt = AiSource::build_prompt(&ctx("SELECT * FROM use"));
        assert!(prompt.contains("current word being typed: \"use\""));
        assert!(prompt.contains("Context: SELECT * FROM USE"));
        assert!(prompt.contains("Available tables: users"));
    }

    #[test]
    fn test_long_suggestion_label_is_truncated() {
        let source = AiSource::new(Arc::new(NoopProvider));
        let long = "SELECT id, name, email, created_at FROM users WHERE active = 1";
        let items = source.parse_response(&format!("```sql\n{}\n```", long));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].insert_text, long);
        assert_eq!(items[0].label.chars().count(), 40);
    }
}
