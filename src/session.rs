/*!
 * Client session
 *
 * The state both front ends share: the optional database connection, the
 * completion engine with its sources, and the AI provider. Running a
 * statement goes through here so history and schema metadata stay in step
 * with what was executed.
 */

use crate::ai::AiProvider;
use crate::commands::{changes_schema, strip_terminator, QueryExecutor, QueryOutcome};
use crate::completion::sources::{AiSource, HistorySource, KeywordSource, SchemaSource};
use crate::completion::{CompletionEngine, SchemaLoader};
use crate::config::CompletionSettings;
use crate::database::{Database, Schema};
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use std::time::Instant;

pub struct Session {
    db: Option<Box<dyn Database>>,
    engine: Arc<CompletionEngine>,
    schema: Arc<SchemaSource>,
    history: Arc<HistorySource>,
    ai: Arc<dyn AiProvider>,
    loader: SchemaLoader,
    executor: QueryExecutor,
}

impl Session {
    pub fn new(
        settings: &CompletionSettings,
        db: Option<Box<dyn Database>>,
        ai: Arc<dyn AiProvider>,
    ) -> Self {
        let engine = Arc::new(CompletionEngine::new(settings.max_items));
        let schema = Arc::new(SchemaSource::new());
        let history = Arc::new(HistorySource::new(settings.history_capacity));

        engine.register(Arc::new(KeywordSource::new()));
        engine.register(schema.clone());
        engine.register(history.clone());
        engine.register(Arc::new(
            AiSource::new(ai.clone())
                .with_enabled(settings.ai_enabled)
                .with_min_word_len(settings.ai_min_word_len)
                .with_timeout(settings.ai_timeout()),
        ));

        let mut session = Self {
            db,
            engine,
            schema,
            history,
            ai,
            loader: SchemaLoader::new(),
            executor: QueryExecutor::new(),
        };
        if let Err(e) = session.refresh_schema() {
            tracing::warn!("Could not load schema: {:#}", e);
        }
        session
    }

    pub fn is_connected(&self) -> bool {
        self.db.is_some()
    }

    pub fn database_name(&self) -> Option<String> {
        self.db.as_ref().and_then(|db| db.name()).map(str::to_string)
    }

    pub fn engine(&self) -> &Arc<CompletionEngine> {
        &self.engine
    }

    pub fn schema_source(&self) -> &Arc<SchemaSource> {
        &self.schema
    }

    pub fn history(&self) -> &Arc<HistorySource> {
        &self.history
    }

    pub fn ai(&self) -> &Arc<dyn AiProvider> {
        &self.ai
    }

    pub fn tables(&self) -> Vec<String> {
        self.schema.table_names()
    }

    /// Loaded column metadata, for AI prompts
    pub fn schema(&self) -> Schema {
        self.schema.schema()
    }

    pub fn status(&self) -> String {
        let server = self
            .db
            .as_ref()
            .map_or_else(|| "not connected".to_string(), |db| db.server_info());
        let ai = if self.ai.is_configured() {
            format!("{} ({})", self.ai.name(), self.ai.model())
        } else {
            "disabled".to_string()
        };
        let sources = self
            .engine
            .sources()
            .into_iter()
            .map(|(name, priority)| format!("{}:{}", name, priority))
            .collect::<Vec<_>>()
            .join(" ");

        format!(
            "Server:\t\t\t{}\nCurrent database:\t{}\nTables:\t\t\t{}\nAI provider:\t\t{}\nCompletion sources:\t{}",
            server,
            self.database_name().as_deref().unwrap_or("(none)"),
            self.schema.table_names().len(),
            ai,
            sources
        )
    }

    /// Reload the schema if it is stale
    pub fn refresh_schema(&mut self) -> Result<()> {
        match self.db.as_deref_mut() {
            Some(db) => self.loader.refresh_if_needed(db, &self.schema, &self.engine),
            None => Ok(()),
        }
    }

    pub fn reload_schema(&mut self) -> Result<()> {
        self.loader.invalidate();
        self.refresh_schema()
    }

    pub fn use_database(&mut self, name: &str) -> Result<()> {
        let db = self.db.as_deref_mut().context("not connected to a database")?;
        db.use_database(name)?;
        tracing::info!("Switched to database {}", name);
        self.reload_schema()
    }

    /// Run one statement from the editor.
    ///
    /// Successful statements are recorded in completion history; those that
    /// may change the schema reload it.
    pub fn run(&mut self, sql: &str) -> Result<QueryOutcome> {
        let sql = strip_terminator(sql);
        if sql.is_empty() {
            bail!("nothing to run");
        }
        let db = self.db.as_deref_mut().context("not connected to a database")?;

        let outcome = match use_target(sql) {
            Some(name) => {
                let start_time = Instant::now();
                self.use_database(&name)?;
                QueryOutcome::Affected {
                    rows: 0,
                    elapsed: start_time.elapsed(),
                }
            }
            None => {
                let outcome = self.executor.execute(db, sql)?;
                if changes_schema(sql) {
                    if let Err(e) = self.reload_schema() {
                        tracing::warn!("Could not reload schema: {:#}", e);
                    }
                }
                outcome
            }
        };

        self.history.add(sql);
        Ok(outcome)
    }
}

/// Database named by a `USE db` statement
fn use_target(sql: &str) -> Option<String> {
    let mut words = sql.split_whitespace();
    if !words.next()?.eq_ignore_ascii_case("USE") {
        return None;
    }
    let name = words.next()?.trim_matches('`');
    (!name.is_empty()).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::NoopProvider;
    use crate::database::fake::FakeDatabase;
    use pretty_assertions::assert_eq;

    fn session(db: Option<FakeDatabase>) -> Session {
        Session::new(
            &CompletionSettings::default(),
            db.map(|db| Box::new(db) as Box<dyn Database>),
            Arc::new(NoopProvider),
        )
    }

    #[test]
    fn test_new_loads_schema_and_registers_sources() {
        let session = session(Some(FakeDatabase::with_tables("shop", &["users"])));
        assert_eq!(session.tables(), vec!["users"]);
        assert_eq!(session.database_name().as_deref(), Some("shop"));
        let names: Vec<String> = session.engine().sources().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["schema", "history", "keywords", "ai"]);
    }

    #[test]
    fn test_run_records_history_and_reloads_on_ddl() {
        let mut session = session(Some(FakeDatabase::with_tables("shop", &["users"])));

        session.run("SELECT * FROM users;").unwrap();
        assert_eq!(session.history().entries(), vec!["SELECT * FROM users"]);

        session.run("CREATE TABLE orders (id INT)").unwrap();
        assert_eq!(session.tables(), vec!["orders", "users"]);

        assert!(session.run("SELECT * FROM missing_table").is_err());
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn test_use_statement_switches_database() {
        let mut session = session(Some(FakeDatabase::with_tables("shop", &["users"])));
        let outcome = session.run("use `analytics`").unwrap();
        assert!(matches!(outcome, QueryOutcome::Affected { rows: 0, .. }));
        assert_eq!(session.database_name().as_deref(), Some("analytics"));
    }

    #[test]
    fn test_disconnected_session() {
        let mut session = session(None);
        assert!(!session.is_connected());
        assert!(session.tables().is_empty());
        assert!(session.run("SELECT 1").is_err());
        assert!(session.run("  ;").is_err());
        assert!(session.status().contains("not connected"));
    }

    #[test]
    fn test_use_target() {
        assert_eq!(use_target("USE shop").as_deref(), Some("shop"));
        assert_eq!(use_target("use `shop`").as_deref(), Some("shop"));
        assert_eq!(use_target("USER"), None);
        assert_eq!(use_target("USE"), None);
    }
}
