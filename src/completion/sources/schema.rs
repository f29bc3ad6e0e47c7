//! Table and column completions from the connected database's schema.

use crate::completion::context::CompletionContext;
use crate::completion::source::{CompletionSource, SourceError};
use crate::completion::suggestion::{CompletionItem, ItemKind};
use crate::database::{ColumnInfo, Schema};
use crate::editor::buffer::is_word_char;
use async_trait::async_trait;
use parking_lot::RwLock;

const TABLE_SCORE: f64 = 90.0;
const COLUMN_SCORE: f64 = 85.0;

const TABLE_TRIGGERS: &[&str] = &["FROM", "JOIN", "INTO", "UPDATE", "TABLE", "TRUNCATE"];
const COLUMN_TRIGGERS: &[&str] = &[
    "SELECT", "WHERE", "AND", "OR", "SET", "ORDER BY", "GROUP BY", "HAVING",
];

#[derive(Debug, Default)]
struct SchemaData {
    database: Option<String>,
    tables: Vec<String>,
    columns: Schema,
}

/// Schema metadata shared between the loader and completion requests
#[derive(Debug, Default)]
pub struct SchemaSource {
    data: RwLock<SchemaData>,
}

impl SchemaSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything with a freshly loaded schema
    pub fn load(&self, database: Option<&str>, schema: Schema) {
        *self.data.write() = SchemaData {
            database: database.map(str::to_string),
            ..SchemaData::default()
        };
        self.set_tables(schema.keys().cloned().collect());
        for (table, columns) in schema {
            self.set_columns(&table, columns);
        }
    }

    /// Set table names without column metadata
    pub fn set_tables(&self, mut tables: Vec<String>) {
        tables.sort();
        tables.dedup();
        self.data.write().tables = tables;
    }

    pub fn set_columns(&self, table: &str, columns: Vec<ColumnInfo>) {
        let mut data = self.data.write();
        if let Err(pos) = data.tables.binary_search_by(|t| t.as_str().cmp(table)) {
            data.tables.insert(pos, table.to_string());
        }
        data.columns.insert(table.to_string(), columns);
    }

    pub fn clear(&self) {
        *self.data.write() = SchemaData::default();
    }

    pub fn table_names(&self) -> Vec<String> {
        self.data.read().tables.clone()
    }

    /// Snapshot of the column metadata, as handed to AI prompts
    pub fn schema(&self) -> Schema {
        self.data.read().columns.clone()
    }

    fn table_items(&self, data: &SchemaData) -> Vec<CompletionItem> {
        data.tables
            .iter()
            .map(|table| {
                let detail = match &data.database {
                    Some(db) => format!("{}.{}", db, table),
                    None => "Table".to_string(),
                };
                CompletionItem::new(table.as_str(), ItemKind::Table, self.name(), TABLE_SCORE)
                    .with_detail(detail)
            })
            .collect()
    }

    fn column_items(&self, data: &SchemaData, only_table: Option<&str>) -> Vec<CompletionItem> {
        data.columns
            .iter()
            .filter(|(table, _)| only_table.map_or(true, |only| only == table.as_str()))
            .flat_map(|(table, columns)| columns.iter().map(move |col| (table, col)))
            .map(|(table, col)| {
                let mut attrs = col.data_type.clone();
                if col.primary_key {
                    attrs.push_str(" PRIMARY KEY");
                }
                if !col.nullable {
                    attrs.push_str(" NOT NULL");
                }
                CompletionItem::new(col.name.as_str(), ItemKind::Column, self.name(), COLUMN_SCORE)
                    .with_detail(format!("{}.{} ({})", table, col.name, attrs))
            })
            .collect()
    }
}

/// `text` ends with `word` and `word` is not the tail of a longer word
fn ends_with_word(text: &str, word: &str) -> bool {
    match text.strip_suffix(word) {
        Some(rest) => !rest.chars().next_back().is_some_and(is_word_char),
        None => false,
    }
}

fn contains_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !is_word_char(c)).any(|w| w == word)
}

fn wants_tables(prefix: &str) -> bool {
    TABLE_TRIGGERS.iter().any(|t| ends_with_word(prefix, t)) || contains_word(prefix, "FROM")
}

fn wants_columns(prefix: &str) -> bool {
    COLUMN_TRIGGERS.iter().any(|t| ends_with_word(prefix, t)) || prefix.ends_with('.')
}

/// Identifier written before a trailing `.`
fn qualifier(prefix: &str) -> Option<&str> {
    let head = prefix.strip_suffix('.')?;
    let start = head
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_word_char(*c))
        .last()
        .map(|(i, _)| i)?;
    Some(&head[start..])
}

#[async_trait]
impl CompletionSource for SchemaSource {
    fn name(&self) -> &str {
        "schema"
    }

    fn priority(&self) -> i32 {
        100
    }

    async fn complete(&self, ctx: &CompletionContext) -> Result<Vec<CompletionItem>, SourceError> {
        let before_word = ctx.prefix_before_word();
        let prefixes = [ctx.line_prefix.as_str(), before_word.as_str()];
        let data = self.data.read();

        let mut items = Vec::new();
        if prefixes.iter().any(|p| wants_tables(p)) {
            items.extend(self.table_items(&data));
        }
        if prefixes.iter().any(|p| wants_columns(p)) {
            let only_table = qualifier(&before_word).and_then(|q| {
                data.tables
                    .iter()
                    .find(|t| t.eq_ignore_ascii_case(q))
                    .map(String::as_str)
            });
            items.extend(self.column_items(&data, only_table));
        }
        Ok(items)
    }
}
