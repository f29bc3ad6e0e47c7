/*!
 * Schema loading
 *
 * Pulls table and column metadata from the database into the schema
 * completion source. The metadata is refreshed after five minutes or
 * whenever a statement changes the schema; every refresh clears the
 * engine's cache so stale suggestions are not served.
 */

use super::engine::CompletionEngine;
use super::sources::SchemaSource;
use crate::database::Database;
use anyhow::Result;
use std::time::{Duration, Instant};

const REFRESH_AFTER: Duration = Duration::from_secs(300);

#[derive(Debug, Default)]
pub struct SchemaLoader {
    last_update: Option<Instant>,
}

impl SchemaLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nothing loaded yet, or the last load is older than five minutes
    pub fn needs_refresh(&self) -> bool {
        self.last_update
            .map_or(true, |at| at.elapsed() > REFRESH_AFTER)
    }

    /// Mark the metadata stale so the next `refresh_if_needed` reloads it
    pub fn invalidate(&mut self) {
        self.last_update = None;
    }

    pub fn refresh_if_needed(
        &mut self,
        db: &mut dyn Database,
        schema: &SchemaSource,
        engine: &CompletionEngine,
    ) -> Result<()> {
        if self.needs_refresh() {
            self.refresh(db, schema, engine)?;
        }
        Ok(())
    }

    /// Reload all tables and columns of the current database
    pub fn refresh(
        &mut self,
        db: &mut dyn Database,
        schema: &SchemaSource,
        engine: &CompletionEngine,
    ) -> Result<()> {
        let loaded = db.schema()?;
        tracing::info!(
            database = db.name().unwrap_or("-"),
            tables = loaded.len(),
            "Loaded schema"
        );
        schema.load(db.name(), loaded);
        engine.clear_cache();
        self.last_update = Some(Instant::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::suggestion::ItemKind;
    use crate::database::fake::FakeDatabase;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_refresh_loads_schema_and_clears_cache() {
        let mut db = FakeDatabase::with_tables("shop", &["users"]);
        let schema = Arc::new(SchemaSource::new());
        let engine = CompletionEngine::default();
        engine.register(schema.clone());
        let mut loader = SchemaLoader::new();

        loader.refresh_if_needed(&mut db, &schema, &engine).unwrap();
        assert_eq!(schema.table_names(), vec!["users"]);
        let items = engine.complete("SELECT * FROM ", 14, None, &[]).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].detail, "shop.users");

        db.schema.insert("orders".to_string(), Vec::new());
        loader.refresh_if_needed(&mut db, &schema, &engine).unwrap();
        assert_eq!(db.schema_loads, 1);

        loader.invalidate();
        loader.refresh_if_needed(&mut db, &schema, &engine).unwrap();
        assert_eq!(db.schema_loads, 2);
        let items = engine.complete("SELECT * FROM ", 14, None, &[]).await;
        assert!(items.iter().all(|i| i.kind == ItemKind::Table));
        assert_eq!(items.len(), 2);
    }
}
