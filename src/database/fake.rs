//! In-memory `Database` for tests.

use super::{ColumnInfo, Database, QueryResult, Schema};
use anyhow::{bail, Result};

#[derive(Debug, Default)]
pub struct FakeDatabase {
    pub database: Option<String>,
    pub schema: Schema,
    /// Rows returned by every `query`
    pub result: QueryResult,
    /// Every statement run, in order
    pub statements: Vec<String>,
    pub schema_loads: usize,
}

impl FakeDatabase {
    pub fn with_tables(database: &str, tables: &[&str]) -> Self {
        Self {
            database: Some(database.to_string()),
            schema: tables
                .iter()
                .map(|t| (t.to_string(), vec![ColumnInfo::new("id", "INT").primary_key()]))
                .collect(),
            ..Self::default()
        }
    }
}

impl Database for FakeDatabase {
    fn name(&self) -> Option<&str> {
        self.database.as_deref()
    }

    fn server_info(&self) -> String {
        "fake server".to_string()
    }

    fn tables(&mut self) -> Result<Vec<String>> {
        Ok(self.schema.keys().cloned().collect())
    }

    fn schema(&mut self) -> Result<Schema> {
        self.schema_loads += 1;
        Ok(self.schema.clone())
    }

    fn query(&mut self, sql: &str) -> Result<QueryResult> {
        self.statements.push(sql.to_string());
        if sql.contains("missing_table") {
            bail!("Table 'missing_table' doesn't exist");
        }
        Ok(self.result.clone())
    }

    /// `CREATE TABLE name ...` adds `name` to the schema
    fn execute(&mut self, sql: &str) -> Result<u64> {
        self.statements.push(sql.to_string());
        let words: Vec<&str> = sql.split_whitespace().collect();
        if let ["CREATE", "TABLE", name, ..] = words.as_slice() {
            self.schema.insert(name.trim_end_matches('(').to_string(), Vec::new());
            return Ok(0);
        }
        Ok(1)
    }

    fn use_database(&mut self, name: &str) -> Result<()> {
        self.statements.push(format!("USE {}", name));
        self.database = Some(name.to_string());
        Ok(())
    }
}
