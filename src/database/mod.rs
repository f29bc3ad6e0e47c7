/*!
 * Database access
 *
 * The `Database` trait is the narrow interface the rest of the client
 * needs from a server: table and column metadata for completion, and
 * running statements. `connection` implements it for MySQL.
 */

mod connection;
#[cfg(test)]
pub mod fake;

pub use connection::{ConnectOptions, MySqlDatabase};

use anyhow::Result;
use std::collections::BTreeMap;

/// Column metadata used by schema completion
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub primary_key: bool,
}

impl ColumnInfo {
    pub fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable: true,
            primary_key: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }
}

/// Table name to its columns, in table-name order
pub type Schema = BTreeMap<String, Vec<ColumnInfo>>;

/// Rows of a result set, every value already rendered as text
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub trait Database: Send {
    /// Name of the current database, if one is selected
    fn name(&self) -> Option<&str>;

    /// Human-readable server description for status output
    fn server_info(&self) -> String;

    fn tables(&mut self) -> Result<Vec<String>>;

    fn schema(&mut self) -> Result<Schema>;

    /// Run a statement that returns rows
    fn query(&mut self, sql: &str) -> Result<QueryResult>;

    /// Run a statement that does not return rows; returns the affected row count
    fn execute(&mut self, sql: &str) -> Result<u64>;

    /// Switch the current database
    fn use_database(&mut self, name: &str) -> Result<()>;
}
