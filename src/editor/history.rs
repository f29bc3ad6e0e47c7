//! Snapshot-based undo/redo history.

/// A saved `(text, cursor)` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub text: String,
    pub cursor: usize,
}

/// Maximum snapshots kept before the oldest are dropped
const HISTORY_LIMIT: usize = 1000;

/// Ordered snapshots plus the index of the one matching the buffer.
#[derive(Debug, Default)]
pub struct History {
    entries: Vec<Snapshot>,
    index: usize,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a snapshot.
    ///
    /// Any redo tail past the current index is discarded. A snapshot whose
    /// text equals the current entry is not stored again; only the cursor of
    /// the current entry is refreshed. Returns whether an entry was added.
    pub fn push(&mut self, snapshot: Snapshot) -> bool {
        if let Some(current) = self.entries.get_mut(self.index) {
            if current.text == snapshot.text {
                current.cursor = snapshot.cursor;
                return false;
            }
            self.entries.truncate(self.index + 1);
        }

        self.entries.push(snapshot);
        if self.entries.len() > HISTORY_LIMIT {
            self.entries.remove(0);
        }
        self.index = self.entries.len() - 1;
        true
    }

    /// Step back one snapshot
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        self.entries.get(self.index)
    }

    /// Step forward one snapshot
    pub fn redo(&mut self) -> Option<&Snapshot> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        self.entries.get(self.index)
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.entries.get(self.index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(text: &str, cursor: usize) -> Snapshot {
        Snapshot {
            text: text.to_string(),
            cursor,
        }
    }

    #[test]
    fn test_duplicate_text_is_suppressed() {
        let mut history = History::new();
        assert!(history.push(snap("a", 1)));
        assert!(!history.push(snap("a", 0)));
        assert_eq!(history.len(), 1);
        assert_eq!(history.current().map(|s| s.cursor), Some(0));
    }

    #[test]
    fn test_push_discards_redo_tail() {
        let mut history = History::new();
        history.push(snap("", 0));
        history.push(snap("a", 1));
        history.push(snap("ab", 2));
        assert_eq!(history.undo().map(|s| s.text.as_str()), Some("a"));
        assert!(history.can_redo());

        history.push(snap("ax", 2));
        assert!(!history.can_redo());
        assert_eq!(history.len(), 3);
        assert_eq!(history.undo().map(|s| s.text.as_str()), Some("a"));
    }

    #[test]
    fn test_undo_redo_at_bounds() {
        let mut history = History::new();
        assert!(history.undo().is_none());
        history.push(snap("", 0));
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());
    }
}
