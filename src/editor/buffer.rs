/*!
 * Editor text buffer
 *
 * Owns the query text and translates between linear offsets and
 * (line, column) positions. Offsets are UTF-8 byte offsets; every offset
 * handed in from outside is clamped to the buffer and snapped down to a
 * character boundary, so no operation here can panic on a bad index.
 * Columns are counted in characters.
 */

use std::ops::Range;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buffer {
    text: String,
}

impl Buffer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Replace the whole content
    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Clamp an offset into `[0, len]` and snap it to a char boundary
    pub fn clamp(&self, offset: usize) -> usize {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }

    /// Clamp both ends of a range and order them
    pub fn clamp_range(&self, range: Range<usize>) -> Range<usize> {
        let start = self.clamp(range.start);
        let end = self.clamp(range.end);
        start.min(end)..start.max(end)
    }

    /// Offset of the character after the one at `offset`
    pub fn next_boundary(&self, offset: usize) -> usize {
        let offset = self.clamp(offset);
        self.text[offset..]
            .chars()
            .next()
            .map(|c| offset + c.len_utf8())
            .unwrap_or(offset)
    }

    /// Offset of the character before `offset`
    pub fn prev_boundary(&self, offset: usize) -> usize {
        let offset = self.clamp(offset);
        self.text[..offset]
            .chars()
            .next_back()
            .map(|c| offset - c.len_utf8())
            .unwrap_or(0)
    }

    pub fn slice(&self, range: Range<usize>) -> &str {
        let range = self.clamp_range(range);
        &self.text[range]
    }

    /// Insert `text` at `offset` and return the offset just past it
    pub fn insert(&mut self, offset: usize, text: &str) -> usize {
        let offset = self.clamp(offset);
        self.text.insert_str(offset, text);
        offset + text.len()
    }

    /// Remove a range and return the removed text
    pub fn delete(&mut self, range: Range<usize>) -> String {
        let range = self.clamp_range(range);
        self.text.drain(range).collect()
    }

    pub fn replace(&mut self, range: Range<usize>, text: &str) {
        let range = self.clamp_range(range);
        self.text.replace_range(range, text);
    }

    /// Number of lines; an empty buffer has one (empty) line
    pub fn line_count(&self) -> usize {
        self.text.matches('\n').count() + 1
    }

    /// Zero-based line containing `offset`
    pub fn line_of(&self, offset: usize) -> usize {
        let offset = self.clamp(offset);
        self.text[..offset].matches('\n').count()
    }

    /// Offset of the first character of `line`; lines past the end clamp to the last line
    pub fn line_start(&self, line: usize) -> usize {
        let line = line.min(self.line_count() - 1);
        if line == 0 {
            return 0;
        }
        self.text
            .match_indices('\n')
            .nth(line - 1)
            .map(|(i, _)| i + 1)
            .unwrap_or(0)
    }

    /// Offset of the line break ending `line`, or the buffer length for the last line
    pub fn line_end(&self, line: usize) -> usize {
        let start = self.line_start(line);
        self.text[start..]
            .find('\n')
            .map(|i| start + i)
            .unwrap_or(self.text.len())
    }

    pub fn line(&self, line: usize) -> &str {
        &self.text[self.line_start(line)..self.line_end(line)]
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }

    /// `(line, column)` of an offset, column in characters
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let offset = self.clamp(offset);
        let line = self.line_of(offset);
        let column = self.text[self.line_start(line)..offset].chars().count();
        (line, column)
    }

    /// Offset of `(line, column)`; the column clamps to the line's length
    pub fn offset_at(&self, line: usize, column: usize) -> usize {
        let start = self.line_start(line);
        let end = self.line_end(line);
        self.text[start..end]
            .char_indices()
            .nth(column)
            .map(|(i, _)| start + i)
            .unwrap_or(end)
    }

    /// Start of the run of word characters (letters, digits, `_`) ending at `offset`
    pub fn word_start(&self, offset: usize) -> usize {
        let offset = self.clamp(offset);
        let mut start = offset;
        for (i, c) in self.text[..offset].char_indices().rev() {
            if !is_word_char(c) {
                break;
            }
            start = i;
        }
        start
    }
}

pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl std::fmt::Display for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_snaps_to_char_boundary() {
        let buffer = Buffer::new("héllo");
        assert_eq!(buffer.clamp(2), 1);
        assert_eq!(buffer.clamp(100), buffer.len());
        assert_eq!(buffer.next_boundary(1), 3);
        assert_eq!(buffer.prev_boundary(3), 1);
    }

    #[test]
    fn test_line_translation() {
        let buffer = Buffer::new("SELECT *\nFROM users\nWHERE id = 1");
        assert_eq!(buffer.line_count(), 3);
        assert_eq!(buffer.line_start(1), 9);
        assert_eq!(buffer.line_end(1), 19);
        assert_eq!(buffer.line(2), "WHERE id = 1");
        assert_eq!(buffer.position(14), (1, 5));
        assert_eq!(buffer.offset_at(1, 5), 14);
        // Column past the end of the line clamps to the line end
        assert_eq!(buffer.offset_at(0, 40), 8);
        // Line past the end clamps to the last line
        assert_eq!(buffer.line_start(10), 20);
    }

    #[test]
    fn test_empty_buffer_has_one_line() {
        let buffer = Buffer::default();
        assert_eq!(buffer.line_count(), 1);
        assert_eq!(buffer.line(0), "");
        assert_eq!(buffer.position(5), (0, 0));
    }

    #[test]
    fn test_out_of_range_edits_clamp() {
        let mut buffer = Buffer::new("abc");
        assert_eq!(buffer.delete(2..99), "c");
        assert_eq!(buffer.insert(50, "d"), 3);
        assert_eq!(buffer.as_str(), "abd");
        buffer.replace(5..0, "x");
        assert_eq!(buffer.as_str(), "x");
    }

    #[test]
    fn test_word_start() {
        let buffer = Buffer::new("SELECT * FROM user_ta");
        assert_eq!(buffer.word_start(buffer.len()), 14);
        assert_eq!(buffer.word_start(9), 9);
    }
}
