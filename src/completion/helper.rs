/*!
 * Line-editor completion helper
 *
 * Adapts the completion engine to rustyline for the plain REPL:
 * tab completion, an inline hint for the best match, keyword
 * highlighting and bracket validation.
 */

use super::context::CompletionContext;
use super::engine::CompletionEngine;
use super::sources::{all_keywords, SchemaSource};
use super::suggestion::{CompletionItem, ItemKind};
use parking_lot::RwLock;
use regex::Regex;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::{Highlighter, MatchingBracketHighlighter};
use rustyline::hint::{Hinter, HistoryHinter};
use rustyline::validate::{self, MatchingBracketValidator, Validator};
use rustyline::Context;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

/// Hints are computed on every keystroke; slower sources are skipped
const HINT_BUDGET: Duration = Duration::from_millis(150);

pub struct SqlHelper {
    engine: Arc<CompletionEngine>,
    schema: Arc<SchemaSource>,
    runtime: Handle,
    database: RwLock<Option<String>>,
    keywords: Option<Regex>,
    highlighter: MatchingBracketHighlighter,
    validator: MatchingBracketValidator,
    hinter: HistoryHinter,
}

impl SqlHelper {
    /// `runtime` must not be the runtime of the calling thread: the
    /// helper blocks on it from rustyline callbacks
    pub fn new(engine: Arc<CompletionEngine>, schema: Arc<SchemaSource>, runtime: Handle) -> Self {
        let pattern = format!(
            r"\b(?:{})\b",
            all_keywords().map(regex::escape).collect::<Vec<_>>().join("|")
        );
        Self {
            engine,
            schema,
            runtime,
            database: RwLock::new(None),
            keywords: Regex::new(&pattern).ok(),
            highlighter: MatchingBracketHighlighter::new(),
            validator: MatchingBracketValidator::new(),
            hinter: HistoryHinter::new(),
        }
    }

    /// Update current database for table detail in suggestions
    pub fn set_current_database(&self, database: Option<String>) {
        *self.database.write() = database;
    }

    fn context(&self, line: &str, pos: usize) -> CompletionContext {
        let database = self.database.read().clone();
        CompletionContext::new(line, pos, database.as_deref(), &self.schema.table_names())
    }

    fn suggestions(&self, ctx: &CompletionContext) -> Vec<CompletionItem> {
        self.runtime.block_on(self.engine.complete_context(ctx))
    }

    /// Remainder of the best suggestion past what is already typed
    fn completion_hint(&self, line: &str, pos: usize) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        let ctx = self.context(line, pos);
        if ctx.word.is_empty() {
            return None;
        }

        let items = self
            .runtime
            .block_on(async {
                tokio::time::timeout(HINT_BUDGET, self.engine.complete_context(&ctx)).await
            })
            .ok()?;
        items
            .iter()
            .find(|item| item.kind != ItemKind::History)?
            .remainder(&ctx.word)
            .map(str::to_string)
    }
}

impl Completer for SqlHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> Result<(usize, Vec<Pair>), ReadlineError> {
        let ctx = self.context(line, pos);

        // Whole-query history recall is served by rustyline's own history
        let pairs = self
            .suggestions(&ctx)
            .into_iter()
            .filter(|item| item.kind != ItemKind::History)
            .map(|item| Pair {
                display: item.format_display(),
                replacement: item.insert_text,
            })
            .collect();

        Ok((ctx.word_start, pairs))
    }
}

impl Hinter for SqlHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, ctx: &Context<'_>) -> Option<String> {
        if let Some(history_hint) = self.hinter.hint(line, pos, ctx) {
            return Some(history_hint);
        }
        self.completion_hint(line, pos)
    }
}

impl Highlighter for SqlHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        match &self.keywords {
            Some(re) => re.replace_all(line, "\x1b[1m$0\x1b[0m"),
            None => Cow::Borrowed(line),
        }
    }

    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(&'s self, prompt: &'p str, _default: bool) -> Cow<'b, str> {
        Cow::Borrowed(prompt)
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(format!("\x1b[90m{}\x1b[0m", hint))
    }

    fn highlight_char(&self, line: &str, pos: usize, forced: bool) -> bool {
        self.keywords.is_some() || self.highlighter.highlight_char(line, pos, forced)
    }
}

impl Validator for SqlHelper {
    fn validate(
        &self,
        ctx: &mut validate::ValidationContext,
    ) -> Result<validate::ValidationResult, ReadlineError> {
        self.validator.validate(ctx)
    }

    fn validate_while_typing(&self) -> bool {
        self.validator.validate_while_typing()
    }
}

impl rustyline::Helper for SqlHelper {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::sources::KeywordSource;
    use crate::database::{ColumnInfo, Schema};

    fn helper(runtime: &tokio::runtime::Runtime) -> SqlHelper {
        let engine = Arc::new(CompletionEngine::default());
        let schema = Arc::new(SchemaSource::new());
        let mut tables = Schema::new();
        tables.insert("users".to_string(), vec![ColumnInfo::new("id", "INT")]);
        schema.load(None, tables);
        engine.register(Arc::new(KeywordSource::new()));
        engine.register(schema.clone());
        SqlHelper::new(engine, schema, runtime.handle().clone())
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn test_hint_completes_best_match() {
        let rt = runtime();
        let helper = helper(&rt);
        assert_eq!(helper.completion_hint("SELECT * FROM us", 16).as_deref(), Some("ers"));
        assert_eq!(helper.completion_hint("sel", 3).as_deref(), Some("ECT "));
        assert_eq!(helper.completion_hint("SELECT * FROM ", 14), None);
        assert_eq!(helper.completion_hint("SELECT * FROM us", 3), None);
    }

    #[test]
    fn test_highlight_bolds_keywords_only() {
        let rt = runtime();
        let helper = helper(&rt);
        assert_eq!(
            helper.highlight("SELECT name FROM users", 0),
            "\x1b[1mSELECT\x1b[0m name \x1b[1mFROM\x1b[0m users"
        );
        assert_eq!(helper.highlight("selection", 0), "selection");
    }
}
