use super::{ColumnInfo, Database, QueryResult, Schema};
use anyhow::{Context, Result};
use mysql::prelude::*;
use mysql::{Conn, OptsBuilder, Row, Value};

/// Connection parameters as given on the command line or in the config file
#[derive(Clone, Debug, Default)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: Option<String>,
}

pub struct MySqlDatabase {
    conn: Conn,
    connection_id: u32,
    server_version: String,
    database: Option<String>,
}

impl MySqlDatabase {
    pub fn connect(options: &ConnectOptions) -> Result<Self> {
        let mut opts_builder = OptsBuilder::new()
            .ip_or_hostname(Some(options.host.as_str()))
            .tcp_port(options.port)
            .user(Some(options.user.as_str()))
            .pass(Some(options.password.as_str()));

        if let Some(db) = &options.database {
            opts_builder = opts_builder.db_name(Some(db.as_str()));
        }

        let mut conn = Conn::new(opts_builder).with_context(|| {
            format!(
                "failed to connect to {}@{}:{}",
                options.user, options.host, options.port
            )
        })?;

        let connection_id: u32 = conn.query_first("SELECT CONNECTION_ID()")?.unwrap_or(0);
        let server_version: String = conn.query_first("SELECT VERSION()")?.unwrap_or_default();
        tracing::info!(
            host = %options.host,
            port = options.port,
            connection_id,
            "Connected to MySQL {}",
            server_version
        );

        Ok(Self {
            conn,
            connection_id,
            server_version,
            database: options.database.clone(),
        })
    }

    pub fn connection_id(&self) -> u32 {
        self.connection_id
    }

    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    fn columns_of(&mut self, table: &str) -> Result<Vec<ColumnInfo>> {
        let rows: Vec<Row> = self
            .conn
            .query(format!("SHOW COLUMNS FROM `{}`", table.replace('`', "``")))?;

        // Field, Type, Null, Key, Default, Extra
        let columns = rows
            .into_iter()
            .filter_map(|row| {
                let name: String = row.get(0)?;
                let data_type: String = row.get(1).unwrap_or_default();
                let null: String = row.get(2).unwrap_or_default();
                let key: String = row.get(3).unwrap_or_default();
                let column = ColumnInfo::new(&name, &data_type.to_uppercase());
                Some(if key == "PRI" {
                    column.primary_key()
                } else if null.eq_ignore_ascii_case("YES") {
                    column
                } else {
                    column.not_null()
                })
            })
            .collect();
        Ok(columns)
    }
}

impl Database for MySqlDatabase {
    fn name(&self) -> Option<&str> {
        self.database.as_deref()
    }

    fn server_info(&self) -> String {
        format!(
            "MySQL {} (connection id {})",
            self.server_version, self.connection_id
        )
    }

    fn tables(&mut self) -> Result<Vec<String>> {
        if self.database.is_none() {
            return Ok(Vec::new());
        }
        let tables: Vec<String> = self.conn.query("SHOW TABLES")?;
        Ok(tables)
    }

    fn schema(&mut self) -> Result<Schema> {
        let mut schema = Schema::new();
        for table in self.tables()? {
            match self.columns_of(&table) {
                Ok(columns) => {
                    schema.insert(table, columns);
                }
                Err(e) => tracing::warn!("Skipping columns of {}: {}", table, e),
            }
        }
        Ok(schema)
    }

    fn query(&mut self, sql: &str) -> Result<QueryResult> {
        let result = self.conn.query_iter(sql)?;

        let columns: Vec<String> = result
            .columns()
            .as_ref()
            .iter()
            .map(|col| col.name_str().to_string())
            .collect();

        let mut rows = Vec::new();
        for row in result {
            let row = row?;
            let values = (0..row.len())
                .map(|i| match row.get_opt::<Value, usize>(i) {
                    Some(Ok(value)) => format_value(&value),
                    Some(Err(_)) => "ERROR".to_string(),
                    None => "NULL".to_string(),
                })
                .collect();
            rows.push(values);
        }

        Ok(QueryResult { columns, rows })
    }

    fn execute(&mut self, sql: &str) -> Result<u64> {
        self.conn.query_drop(sql)?;
        Ok(self.conn.affected_rows())
    }

    fn use_database(&mut self, name: &str) -> Result<()> {
        self.conn
            .query_drop(format!("USE `{}`", name.replace('`', "``")))
            .with_context(|| format!("unknown database '{}'", name))?;
        self.database = Some(name.to_string());
        Ok(())
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::NULL => "NULL".to_string(),
        Value::Bytes(bytes) => String::from_utf8_lossy(bytes).to_string(),
        Value::Int(i) => i.to_string(),
        Value::UInt(u) => u.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Double(d) => d.to_string(),
        Value::Date(year, month, day, 0, 0, 0, 0) => format!("{:04}-{:02}-{:02}", year, month, day),
        Value::Date(year, month, day, hour, minute, second, _) => format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            year, month, day, hour, minute, second
        ),
        Value::Time(neg, days, hours, minutes, seconds, _) => {
            let sign = if *neg { "-" } else { "" };
            let hours = u32::from(*hours) + days * 24;
            format!("{}{:02}:{:02}:{:02}", sign, hours, minutes, seconds)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&Value::NULL), "NULL");
        assert_eq!(format_value(&Value::Bytes(b"alice".to_vec())), "alice");
        assert_eq!(format_value(&Value::Date(2024, 3, 9, 0, 0, 0, 0)), "2024-03-09");
        assert_eq!(
            format_value(&Value::Date(2024, 3, 9, 14, 5, 0, 0)),
            "2024-03-09 14:05:00"
        );
        assert_eq!(format_value(&Value::Time(true, 1, 2, 3, 4, 0)), "-26:03:04");
    }
}
