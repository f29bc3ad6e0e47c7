/*!
 * Completion items
 *
 * The data every source produces and the engine ranks: what to show, what
 * to insert, where it came from and how relevant it is.
 */

use std::fmt;

/// What a completion item refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Keyword,
    Table,
    Column,
    Function,
    Ai,
    History,
}

impl ItemKind {
    /// Icon shown next to the item in completion lists
    pub fn icon(&self) -> &'static str {
        match self {
            ItemKind::Keyword => "🔵",
            ItemKind::Table => "📊",
            ItemKind::Column => "📋",
            ItemKind::Function => "⚡",
            ItemKind::Ai => "✨",
            ItemKind::History => "🕘",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ItemKind::Keyword => "keyword",
            ItemKind::Table => "table",
            ItemKind::Column => "column",
            ItemKind::Function => "function",
            ItemKind::Ai => "ai",
            ItemKind::History => "history",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single completion candidate
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionItem {
    /// Text shown in the list
    pub label: String,
    /// Text inserted when the item is accepted
    pub insert_text: String,
    pub kind: ItemKind,
    /// Secondary description (column type, "From history", ...)
    pub detail: String,
    /// Name of the source that produced the item
    pub source: String,
    pub score: f64,
    /// Text matched against the word being typed; the label when empty
    pub filter_text: String,
}

impl CompletionItem {
    /// Create an item whose label, insert text and filter text are all `text`
    pub fn new(text: impl Into<String>, kind: ItemKind, source: &str, score: f64) -> Self {
        let text = text.into();
        Self {
            label: text.clone(),
            insert_text: text.clone(),
            kind,
            detail: String::new(),
            source: source.to_string(),
            score,
            filter_text: text,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_insert_text(mut self, insert_text: impl Into<String>) -> Self {
        self.insert_text = insert_text.into();
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn with_filter_text(mut self, filter_text: impl Into<String>) -> Self {
        self.filter_text = filter_text.into();
        self
    }

    /// The text matched against the current word
    pub fn match_text(&self) -> &str {
        if self.filter_text.is_empty() {
            &self.label
        } else {
            &self.filter_text
        }
    }

    /// Part of the insert text still to be typed after `word`, if the
    /// insert text extends it
    pub fn remainder(&self, word: &str) -> Option<&str> {
        let head = self.insert_text.get(..word.len())?;
        if word.is_empty() || !head.eq_ignore_ascii_case(word) {
            return None;
        }
        Some(&self.insert_text[word.len()..]).filter(|rest| !rest.is_empty())
    }

    /// One-line rendering with icon and detail, as used in list pickers
    pub fn format_display(&self) -> String {
        if self.detail.is_empty() {
            format!("{} {}", self.kind.icon(), self.label)
        } else {
            format!("{} {} - {}", self.kind.icon(), self.label, self.detail)
        }
    }
}

/// Shorten `text` to at most `max` characters, ending in "..." when cut
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_display() {
        let item = CompletionItem::new("users", ItemKind::Table, "schema", 90.0)
            .with_detail("Table");
        assert_eq!(item.insert_text, "users");
        assert_eq!(item.format_display(), "📊 users - Table");
    }

    #[test]
    fn test_match_text_falls_back_to_label() {
        let item = CompletionItem::new("COUNT()", ItemKind::Function, "keywords", 35.0)
            .with_filter_text("");
        assert_eq!(item.match_text(), "COUNT()");
    }

    #[test]
    fn test_remainder() {
        let item = CompletionItem::new("SELECT", ItemKind::Keyword, "keywords", 40.0)
            .with_insert_text("SELECT ");
        assert_eq!(item.remainder("sel"), Some("ECT "));
        assert_eq!(item.remainder("SELECT "), None);
        assert_eq!(item.remainder(""), None);
        assert_eq!(item.remainder("from"), None);
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("SELECT * FROM users", 10), "SELECT ...");
        assert_eq!(truncate("ééééééé", 6), "ééé...");
    }
}
