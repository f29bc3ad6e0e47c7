//! The completion sources registered with the engine.

mod ai;
mod history;
mod keywords;
mod schema;

pub use ai::AiSource;
pub use history::HistorySource;
pub use keywords::{all_keywords, KeywordSource};
pub use schema::SchemaSource;
