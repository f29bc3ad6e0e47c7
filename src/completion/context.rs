//! The view of the editor a completion request is made from.

use crate::editor::buffer::is_word_char;

/// Everything a source may look at to produce suggestions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompletionContext {
    /// Full buffer text
    pub query: String,
    /// Byte offset of the cursor
    pub cursor: usize,
    /// Letters, digits and `_` immediately before the cursor
    pub word: String,
    /// Byte offset where `word` starts
    pub word_start: usize,
    pub database: Option<String>,
    pub tables: Vec<String>,
    /// Upper-cased, trimmed text from the start of the cursor's line to the cursor
    pub line_prefix: String,
}

impl CompletionContext {
    pub fn new(query: &str, cursor: usize, database: Option<&str>, tables: &[String]) -> Self {
        let mut cursor = cursor.min(query.len());
        while !query.is_char_boundary(cursor) {
            cursor -= 1;
        }
        let before = &query[..cursor];

        let word_start = before
            .char_indices()
            .rev()
            .take_while(|(_, c)| is_word_char(*c))
            .last()
            .map(|(i, _)| i)
            .unwrap_or(cursor);

        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);

        Self {
            query: query.to_string(),
            cursor,
            word: before[word_start..].to_string(),
            word_start,
            database: database.map(str::to_string),
            tables: tables.to_vec(),
            line_prefix: before[line_start..].trim().to_uppercase(),
        }
    }

    /// Upper-cased line text before the word being typed, trimmed.
    ///
    /// Grammar triggers such as `FROM` are checked against this so that
    /// they still apply while a word is half typed.
    pub fn prefix_before_word(&self) -> String {
        let line_start = self.query[..self.word_start]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        self.query[line_start..self.word_start].trim().to_uppercase()
    }
}
