//! Find/replace and goto-line overlay state.
//!
//! Both overlays are pure data: the editor owns them while they are open,
//! feeds them keystrokes, and applies the resulting cursor moves or edits to
//! its buffer.

/// Which input field of the search bar receives typed characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Query,
    Replacement,
}

/// State of an open search (and optionally replace) session.
#[derive(Debug, Clone)]
pub struct SearchState {
    pub query: String,
    pub replacement: String,
    /// Byte offsets of every occurrence of `query`, in buffer order
    pub matches: Vec<usize>,
    /// Index into `matches` of the current match
    pub current: usize,
    /// Whether the replacement field is shown
    pub replacing: bool,
    pub focus: SearchField,
}

impl SearchState {
    pub fn new(replacing: bool) -> Self {
        Self {
            query: String::new(),
            replacement: String::new(),
            matches: Vec::new(),
            current: 0,
            replacing,
            focus: SearchField::Query,
        }
    }

    /// Recompute all match offsets of the query in `text`.
    ///
    /// Overlapping occurrences are all reported. The current index resets to
    /// the first match when it falls out of range.
    pub fn recompute(&mut self, text: &str) {
        self.matches.clear();
        if self.query.is_empty() {
            self.current = 0;
            return;
        }

        let mut from = 0;
        while let Some(found) = text[from..].find(&self.query) {
            let start = from + found;
            self.matches.push(start);
            let step = text[start..].chars().next().map_or(1, char::len_utf8);
            from = start + step;
            if from > text.len() {
                break;
            }
        }

        if self.current >= self.matches.len() {
            self.current = 0;
        }
    }

    pub fn current_match(&self) -> Option<usize> {
        self.matches.get(self.current).copied()
    }

    /// Advance to the next match, wrapping to the first
    pub fn next(&mut self) -> Option<usize> {
        if self.matches.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.matches.len();
        self.current_match()
    }

    /// Step back to the previous match, wrapping to the last
    pub fn prev(&mut self) -> Option<usize> {
        if self.matches.is_empty() {
            return None;
        }
        self.current = self
            .current
            .checked_sub(1)
            .unwrap_or(self.matches.len() - 1);
        self.current_match()
    }

    /// `(1-based current, total)` for the status bar
    pub fn match_info(&self) -> Option<(usize, usize)> {
        if self.matches.is_empty() {
            None
        } else {
            Some((self.current + 1, self.matches.len()))
        }
    }

    /// Append to the focused field; returns true when the query changed
    pub fn push_char(&mut self, c: char) -> bool {
        match self.focus {
            SearchField::Query => {
                self.query.push(c);
                true
            }
            SearchField::Replacement => {
                self.replacement.push(c);
                false
            }
        }
    }

    /// Remove the last character of the focused field; returns true when the query changed
    pub fn pop_char(&mut self) -> bool {
        match self.focus {
            SearchField::Query => self.query.pop().is_some(),
            SearchField::Replacement => {
                self.replacement.pop();
                false
            }
        }
    }

    pub fn toggle_focus(&mut self) {
        if !self.replacing {
            return;
        }
        self.focus = match self.focus {
            SearchField::Query => SearchField::Replacement,
            SearchField::Replacement => SearchField::Query,
        };
    }
}

/// Digit-only input of the goto-line prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GotoLine {
    pub input: String,
}

impl GotoLine {
    pub fn push_char(&mut self, c: char) {
        if c.is_ascii_digit() {
            self.input.push(c);
        }
    }

    pub fn pop_char(&mut self) {
        self.input.pop();
    }

    /// Zero-based target line, clamped to the last line.
    ///
    /// Returns `None` for empty, non-numeric or zero input.
    pub fn target(&self, line_count: usize) -> Option<usize> {
        let line: usize = self.input.parse().ok()?;
        if line == 0 {
            return None;
        }
        Some(line.min(line_count.max(1)) - 1)
    }
}
