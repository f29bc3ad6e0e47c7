use crate::database::{Database, QueryResult};
use anyhow::Result;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use std::fmt;
use std::time::{Duration, Instant};

const ROW_STATEMENTS: &[&str] = &["SELECT", "SHOW", "DESCRIBE", "DESC", "EXPLAIN", "WITH"];
const SCHEMA_STATEMENTS: &[&str] = &["CREATE", "DROP", "ALTER", "USE", "TRUNCATE", "RENAME"];

/// What running one statement produced
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Rows { result: QueryResult, elapsed: Duration },
    Affected { rows: u64, elapsed: Duration },
}

impl QueryOutcome {
    /// Result table (if any) followed by the mysql-style summary line
    pub fn render(&self, width: Option<u16>) -> String {
        match self {
            QueryOutcome::Rows { result, elapsed } => {
                let summary = match result.rows.len() {
                    0 => format!("Empty set ({:.3} sec)", elapsed.as_secs_f64()),
                    1 => format!("1 row in set ({:.3} sec)", elapsed.as_secs_f64()),
                    n => format!("{} rows in set ({:.3} sec)", n, elapsed.as_secs_f64()),
                };
                if result.columns.is_empty() {
                    summary
                } else {
                    format!("{}\n{}", render_table(result, width), summary)
                }
            }
            QueryOutcome::Affected { rows, elapsed } => format!(
                "Query OK, {} {} affected ({:.3} sec)",
                rows,
                if *rows == 1 { "row" } else { "rows" },
                elapsed.as_secs_f64()
            ),
        }
    }
}

impl fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(None))
    }
}

fn first_keyword(sql: &str) -> String {
    sql.split(|c: char| c.is_whitespace() || c == '(')
        .find(|w| !w.is_empty())
        .unwrap_or("")
        .to_uppercase()
}

/// Statement produces a result set
pub fn returns_rows(sql: &str) -> bool {
    ROW_STATEMENTS.contains(&first_keyword(sql).as_str())
}

/// Statement may change which tables or columns exist
pub fn changes_schema(sql: &str) -> bool {
    SCHEMA_STATEMENTS.contains(&first_keyword(sql).as_str())
}

/// Strip the statement terminator (`;` or `\g`) and surrounding blanks
pub fn strip_terminator(sql: &str) -> &str {
    let sql = sql.trim();
    sql.strip_suffix(';')
        .or_else(|| sql.strip_suffix("\\g"))
        .unwrap_or(sql)
        .trim_end()
}

pub fn render_table(result: &QueryResult, width: Option<u16>) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    if let Some(width) = width {
        table.set_width(width);
    }

    table.set_header(
        result
            .columns
            .iter()
            .map(|column| Cell::new(column).add_attribute(Attribute::Bold)),
    );
    for row in &result.rows {
        table.add_row(row.iter().map(Cell::new));
    }
    table
}

#[derive(Debug, Default)]
pub struct QueryExecutor;

impl QueryExecutor {
    pub fn new() -> Self {
        QueryExecutor
    }

    /// Run one statement, routed by its leading keyword
    pub fn execute(&self, db: &mut dyn Database, sql: &str) -> Result<QueryOutcome> {
        let sql = strip_terminator(sql);
        let start_time = Instant::now();

        let outcome = if returns_rows(sql) {
            let result = db.query(sql)?;
            QueryOutcome::Rows {
                result,
                elapsed: start_time.elapsed(),
            }
        } else {
            let rows = db.execute(sql)?;
            QueryOutcome::Affected {
                rows,
                elapsed: start_time.elapsed(),
            }
        };

        tracing::debug!(elapsed = ?start_time.elapsed(), "Executed statement");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::fake::FakeDatabase;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_routing() {
        assert!(returns_rows("select 1"));
        assert!(returns_rows("  WITH t AS (SELECT 1) SELECT * FROM t"));
        assert!(returns_rows("desc users"));
        assert!(returns_rows("(SELECT 1)"));
        assert!(!returns_rows("UPDATE users SET name = 'x'"));
        assert!(!returns_rows(""));

        assert!(changes_schema("create table t (id int)"));
        assert!(changes_schema("RENAME TABLE a TO b"));
        assert!(!changes_schema("SELECT * FROM created"));
    }

    #[test]
    fn test_strip_terminator() {
        assert_eq!(strip_terminator("SELECT 1;  "), "SELECT 1");
        assert_eq!(strip_terminator("SELECT 1 \\g"), "SELECT 1");
        assert_eq!(strip_terminator("SELECT 1"), "SELECT 1");
    }

    #[test]
    fn test_execute_routes_to_database() {
        let mut db = FakeDatabase::default();
        db.result = QueryResult {
            columns: vec!["id".to_string()],
            rows: vec![vec!["1".to_string()]],
        };
        let executor = QueryExecutor::new();

        let outcome = executor.execute(&mut db, "SELECT id FROM users;").unwrap();
        assert!(matches!(outcome, QueryOutcome::Rows { ref result, .. } if result.rows.len() == 1));

        let outcome = executor.execute(&mut db, "DELETE FROM users").unwrap();
        assert!(matches!(outcome, QueryOutcome::Affected { rows: 1, .. }));
        assert_eq!(db.statements, vec!["SELECT id FROM users", "DELETE FROM users"]);

        assert!(executor.execute(&mut db, "SELECT * FROM missing_table").is_err());
    }

    #[test]
    fn test_render() {
        let outcome = QueryOutcome::Rows {
            result: QueryResult {
                columns: vec!["id".to_string(), "name".to_string()],
                rows: vec![
                    vec!["1".to_string(), "alice".to_string()],
                    vec!["2".to_string(), "bob".to_string()],
                ],
            },
            elapsed: Duration::from_millis(12),
        };
        let text = outcome.render(None);
        assert!(text.contains("alice"));
        assert!(text.ends_with("2 rows in set (0.012 sec)"));

        let empty = QueryOutcome::Rows {
            result: QueryResult::default(),
            elapsed: Duration::ZERO,
        };
        assert_eq!(empty.render(None), "Empty set (0.000 sec)");

        let affected = QueryOutcome::Affected {
            rows: 1,
            elapsed: Duration::from_millis(3),
        };
        assert_eq!(affected.to_string(), "Query OK, 1 row affected (0.003 sec)");
    }
}
