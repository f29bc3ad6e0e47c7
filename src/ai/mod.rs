/*!
 * AI providers
 *
 * Natural-language-to-SQL and SQL refactoring behind the `AiProvider`
 * trait. The completion engine's AI source and the editor's AI prompt both
 * go through it.
 */

mod openai;

pub use openai::OpenAiProvider;

use crate::config::AiConfig;
use crate::database::Schema;
use async_trait::async_trait;
use std::fmt::Write;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("{0} API key not configured")]
    NotConfigured(String),
    #[error("AI request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("AI API error: {0}")]
    Api(String),
    #[error("no response from AI API")]
    EmptyResponse,
    #[error("unknown AI provider '{0}'")]
    UnknownProvider(String),
}

#[async_trait]
pub trait AiProvider: Send + Sync {
    fn name(&self) -> &str;
    fn model(&self) -> &str;
    fn is_configured(&self) -> bool;

    /// Turn a natural-language request into SQL
    async fn nl2sql(&self, prompt: &str, schema: Option<&Schema>) -> Result<String, AiError>;

    /// Rewrite `sql` according to `instruction`
    async fn refactor_sql(
        &self,
        sql: &str,
        instruction: &str,
        schema: Option<&Schema>,
    ) -> Result<String, AiError>;
}

/// Provider used when AI is disabled: answers nothing and leaves SQL unchanged
#[derive(Debug, Default)]
pub struct NoopProvider;

#[async_trait]
impl AiProvider for NoopProvider {
    fn name(&self) -> &str {
        "none"
    }

    fn model(&self) -> &str {
        ""
    }

    fn is_configured(&self) -> bool {
        false
    }

    async fn nl2sql(&self, _prompt: &str, _schema: Option<&Schema>) -> Result<String, AiError> {
        Ok(String::new())
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

/// Build the provider named in the configuration
pub fn build_provider(config: &AiConfig) -> Result<Arc<dyn AiProvider>, AiError> {
    match config.provider.as_str() {
        "" | "none" => Ok(Arc::new(NoopProvider)),
        "openai" => Ok(Arc::new(OpenAiProvider::new(config)?)),
        other => Err(AiError::UnknownProvider(other.to_string())),
    }
}

/// Text description of the schema included in prompts
pub fn schema_context(schema: Option<&Schema>) -> String {
    let Some(schema) = schema else {
        return String::new();
    };
    let mut out = String::from("Database Schema:\n");
    for (table, columns) in schema {
        let _ = write!(out, "\nTable: {}\nColumns:\n", table);
        for col in columns {
            let _ = writeln!(
                out,
                "  - {} {}{}{}",
                col.name,
                col.data_type,
                if col.nullable { " NULL" } else { " NOT NULL" },
                if col.primary_key { " (PRIMARY KEY)" } else { "" }
            );
        }
    }
    out
}

/// Remove a surrounding markdown code fence from a model answer
pub fn strip_code_fences(text: &str) -> String {
    let mut text = text.trim();
    for fence in ["```sql", "```SQL", "```"] {
        if let Some(rest) = text.strip_prefix(fence) {
            text = rest;
            break;
        }
    }
    text.strip_suffix("```").unwrap_or(text).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::ColumnInfo;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```sql\nSELECT 1;\n```"), "SELECT 1;");
        assert_eq!(strip_code_fences("```\nSELECT 1\n```\n"), "SELECT 1");
        assert_eq!(strip_code_fences("  SELECT 1  "), "SELECT 1");
    }

    #[test]
    fn test_schema_context() {
        let mut schema = Schema::new();
        schema.insert(
            "users".to_string(),
            vec![
                ColumnInfo::new("id", "INT").primary_key(),
                ColumnInfo::new("email", "VARCHAR(255)"),
            ],
        );
        assert_eq!(
            schema_context(Some(&schema)),
            "Database Schema:\n\nTable: users\nColumns:\n  - id INT NOT NULL (PRIMARY KEY)\n  - email VARCHAR(255) NULL\n"
        );
        assert_eq!(schema_context(None), "");
    }

    #[test]
    fn test_build_provider() {
        let mut config = AiConfig::default();
        assert_eq!(build_provider(&config).unwrap().name(), "none");

        config.provider = "openai".to_string();
        config.api_key = "sk-test".to_string();
        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.name(), "openai");
        assert!(provider.is_configured());

        config.provider = "bogus".to_string();
        assert!(matches!(
            build_provider(&config),
            Err(AiError::UnknownProvider(name)) if name == "bogus"
        ));
    }

    #[tokio::test]
    async fn test_noop_provider() {
        let provider = NoopProvider;
        assert_eq!(provider.nl2sql("anything", None).await.unwrap(), "");
        assert_eq!(
            provider.refactor_sql("SELECT 1", "add a limit", None).await.unwrap(),
            "SELECT 1"
        );
    }
}
