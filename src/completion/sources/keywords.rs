//! Static SQL keyword, function and type completions.

use crate::completion::context::CompletionContext;
use crate::completion::source::{CompletionSource, SourceError};
use crate::completion::suggestion::{CompletionItem, ItemKind};
use async_trait::async_trait;

const KEYWORD_SCORE: f64 = 40.0;
const PREFIX_BOOST: f64 = 30.0;
const FUNCTION_SCORE: f64 = 35.0;

/// Statements
const START_KEYWORDS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "CREATE", "ALTER", "DROP", "TRUNCATE", "GRANT",
    "REVOKE", "BEGIN", "COMMIT", "ROLLBACK", "EXPLAIN", "ANALYZE", "SHOW", "DESCRIBE", "USE",
    "WITH",
];

/// Clauses and operators inside a statement
const SELECT_KEYWORDS: &[&str] = &[
    "DISTINCT", "ALL", "TOP", "AS", "FROM", "WHERE", "AND", "OR", "NOT", "IN", "BETWEEN", "LIKE",
    "IS", "NULL", "TRUE", "FALSE", "ORDER", "BY", "ASC", "DESC", "LIMIT", "OFFSET", "GROUP",
    "HAVING", "UNION", "INTERSECT", "EXCEPT", "JOIN", "INNER", "LEFT", "RIGHT", "FULL", "OUTER",
    "CROSS", "ON", "CASE", "WHEN", "THEN", "ELSE", "END",
];

const FUNCTIONS: &[&str] = &[
    "COUNT",
    "SUM",
    "AVG",
    "MIN",
    "MAX",
    "COALESCE",
    "NULLIF",
    "CONCAT",
    "SUBSTRING",
    "LENGTH",
    "UPPER",
    "LOWER",
    "TRIM",
    "NOW",
    "CURRENT_DATE",
    "CURRENT_TIME",
    "CURRENT_TIMESTAMP",
    "CAST",
    "CONVERT",
    "IFNULL",
    "NVL",
];

/// Column types, offered in CREATE and ALTER statements
const TYPES: &[&str] = &[
    "INT", "INTEGER", "BIGINT", "SMALLINT", "TINYINT", "VARCHAR", "CHAR", "TEXT", "NVARCHAR",
    "DECIMAL", "NUMERIC", "FLOAT", "DOUBLE", "REAL", "DATE", "TIME", "DATETIME", "TIMESTAMP",
    "BOOLEAN", "BOOL", "BLOB", "JSON",
];

/// Every keyword, function and type name, for highlighting
pub fn all_keywords() -> impl Iterator<Item = &'static str> {
    START_KEYWORDS
        .iter()
        .chain(SELECT_KEYWORDS)
        .chain(FUNCTIONS)
        .chain(TYPES)
        .copied()
}

#[derive(Debug, Default)]
pub struct KeywordSource;

impl KeywordSource {
    pub fn new() -> Self {
        Self
    }

    /// Keyword table relevant to what precedes the word being typed
    fn keywords_for(prefix: &str) -> &'static [&'static str] {
        if prefix.is_empty() {
            START_KEYWORDS
        } else if ["SELECT", "UPDATE", "DELETE"]
            .iter()
            .any(|kw| prefix.starts_with(kw))
        {
            SELECT_KEYWORDS
        } else if prefix.starts_with("CREATE") || prefix.starts_with("ALTER") {
            TYPES
        } else {
            SELECT_KEYWORDS
        }
    }
}

#[async_trait]
impl CompletionSource for KeywordSource {
    fn name(&self) -> &str {
        "keywords"
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn complete(&self, ctx: &CompletionContext) -> Result<Vec<CompletionItem>, SourceError> {
        let word = ctx.word.to_uppercase();
        let keywords = Self::keywords_for(&ctx.prefix_before_word());

        let mut items = Vec::with_capacity(keywords.len() + FUNCTIONS.len());
        for kw in keywords {
            let mut score = KEYWORD_SCORE;
            if !word.is_empty() && kw.starts_with(&word) {
                score += PREFIX_BOOST;
            }
            items.push(
                CompletionItem::new(*kw, ItemKind::Keyword, self.name(), score)
                    .with_insert_text(format!("{} ", kw))
                    .with_detail("SQL Keyword"),
            );
        }

        for func in FUNCTIONS {
            items.push(
                CompletionItem::new(format!("{}()", func), ItemKind::Function, self.name(), FUNCTION_SCORE)
                    .with_detail("SQL Function")
                    .with_filter_text(*func),
            );
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn complete(query: &str) -> Vec<CompletionItem> {
        let ctx = CompletionContext::new(query, query.len(), None, &[]);
        KeywordSource::new().complete(&ctx).await.unwrap()
    }

    fn find<'a>(items: &'a [CompletionItem], label: &str) -> Option<&'a CompletionItem> {
        items.iter().find(|item| item.label == label)
    }

    #[tokio::test]
    async fn test_start_of_statement() {
        let items = complete("SEL").await;
        let select = find(&items, "SELECT").unwrap();
        assert_eq!(select.insert_text, "SELECT ");
        assert_eq!(select.score, 70.0);
        assert_eq!(find(&items, "INSERT").unwrap().score, 40.0);
        assert!(find(&items, "WHERE").is_none());
    }

    #[tokio::test]
    async fn test_clause_keywords_after_select() {
        let items = complete("SELECT * FROM users wh").await;
        assert_eq!(find(&items, "WHERE").unwrap().score, 70.0);
        assert!(find(&items, "SELECT").is_none());
    }

    #[tokio::test]
    async fn test_types_in_create() {
        let items = complete("CREATE TABLE t (id BIG").await;
        assert_eq!(find(&items, "BIGINT").unwrap().score, 70.0);
        assert!(find(&items, "WHERE").is_none());
    }

    #[tokio::test]
    async fn test_functions_always_offered() {
        let items = complete("").await;
        let count = find(&items, "COUNT()").unwrap();
        assert_eq!(count.kind, ItemKind::Function);
        assert_eq!(count.insert_text, "COUNT()");
        assert_eq!(count.match_text(), "COUNT");
        assert_eq!(count.score, 35.0);
    }
}
