mod query;

pub use query::{
    changes_schema, render_table, returns_rows, strip_terminator, QueryExecutor, QueryOutcome,
};
