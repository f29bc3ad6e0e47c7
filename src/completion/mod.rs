/*!
 * SQL completion
 *
 * Independent sources (keywords, schema, history, AI) are queried
 * concurrently by the `CompletionEngine`, which ranks their items into one
 * list. Both front ends consume it: the full-screen editor directly, the
 * line REPL through `SqlHelper`.
 */

pub mod context;
pub mod engine;
pub mod helper;
pub mod metadata;
pub mod source;
pub mod sources;
pub mod suggestion;

pub use context::CompletionContext;
pub use engine::CompletionEngine;
pub use helper::SqlHelper;
pub use metadata::SchemaLoader;
pub use source::{CompletionSource, SourceError};
pub use suggestion::{CompletionItem, ItemKind};
