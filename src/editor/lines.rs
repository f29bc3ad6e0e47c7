//! Whole-line transformations: move, duplicate, delete, comment, indent.
//!
//! Each function takes the full text and zero-based line numbers and
//! returns the rewritten text. Line numbers past the end clamp to the last
//! line.

/// Leading whitespace unit added by indent and removed by outdent
pub const INDENT_UNIT: &str = "  ";
const COMMENT_PREFIX: &str = "-- ";
const COMMENT_MARKER: &str = "--";

fn split(text: &str) -> Vec<&str> {
    text.split('\n').collect()
}

fn clamp_span(len: usize, first: usize, last: usize) -> (usize, usize) {
    let last = last.min(len.saturating_sub(1));
    (first.min(last), last)
}

/// Leading spaces and tabs of a line
pub fn leading_whitespace(line: &str) -> &str {
    let end = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..end]
}

/// Swap `line` with its neighbour above (`up`) or below.
///
/// Returns `None` when there is no neighbour in that direction.
pub fn swap_lines(text: &str, line: usize, up: bool) -> Option<String> {
    let mut lines = split(text);
    if line >= lines.len() {
        return None;
    }
    let other = if up {
        line.checked_sub(1)?
    } else {
        let below = line + 1;
        if below >= lines.len() {
            return None;
        }
        below
    };
    lines.swap(line, other);
    Some(lines.join("\n"))
}

pub fn duplicate_line(text: &str, line: usize) -> String {
    let mut lines = split(text);
    let line = line.min(lines.len() - 1);
    let copy = lines[line];
    lines.insert(line + 1, copy);
    lines.join("\n")
}

/// Remove `line`; removing the only line leaves an empty buffer
pub fn delete_line(text: &str, line: usize) -> String {
    let mut lines = split(text);
    let line = line.min(lines.len() - 1);
    lines.remove(line);
    lines.join("\n")
}

/// Comment out lines `first..=last` with `-- `, or uncomment them when every
/// line in the span is already commented.
pub fn toggle_comment(text: &str, first: usize, last: usize) -> String {
    let lines = split(text);
    let (first, last) = clamp_span(lines.len(), first, last);

    let all_commented = lines[first..=last]
        .iter()
        .all(|line| line.trim_start_matches([' ', '\t']).starts_with(COMMENT_MARKER));

    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if i < first || i > last {
                return line.to_string();
            }
            if !all_commented {
                return format!("{}{}", COMMENT_PREFIX, line);
            }
            if let Some(idx) = line.find(COMMENT_PREFIX) {
                format!("{}{}", &line[..idx], &line[idx + COMMENT_PREFIX.len()..])
            } else if let Some(idx) = line.find(COMMENT_MARKER) {
                format!("{}{}", &line[..idx], &line[idx + COMMENT_MARKER.len()..])
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prefix lines `first..=last` with one indentation unit.
///
/// Returns the new text and the number of characters added.
pub fn indent(text: &str, first: usize, last: usize) -> (String, usize) {
    let mut lines: Vec<String> = split(text).into_iter().map(String::from).collect();
    let (first, last) = clamp_span(lines.len(), first, last);

    for line in &mut lines[first..=last] {
        line.insert_str(0, INDENT_UNIT);
    }
    let added = (last - first + 1) * INDENT_UNIT.len();
    (lines.join("\n"), added)
}

/// Remove up to one indentation unit of leading spaces from lines `first..=last`.
///
/// Returns the new text and the number of characters removed.
pub fn outdent(text: &str, first: usize, last: usize) -> (String, usize) {
    let mut lines: Vec<String> = split(text).into_iter().map(String::from).collect();
    let (first, last) = clamp_span(lines.len(), first, last);

    let mut removed = 0;
    for line in &mut lines[first..=last] {
        let width = line
            .chars()
            .take(INDENT_UNIT.len())
            .take_while(|c| *c == ' ')
            .count();
        line.drain(..width);
        removed += width;
    }
    (lines.join("\n"), removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const QUERY: &str = "SELECT id\nFROM users\nWHERE id = 1";

    #[test]
    fn test_swap_lines() {
        assert_eq!(
            swap_lines(QUERY, 1, true).as_deref(),
            Some("FROM users\nSELECT id\nWHERE id = 1")
        );
        assert_eq!(
            swap_lines(QUERY, 1, false).as_deref(),
            Some("SELECT id\nWHERE id = 1\nFROM users")
        );
        assert_eq!(swap_lines(QUERY, 0, true), None);
        assert_eq!(swap_lines(QUERY, 2, false), None);
    }

    #[test]
    fn test_duplicate_and_delete() {
        assert_eq!(
            duplicate_line(QUERY, 0),
            "SELECT id\nSELECT id\nFROM users\nWHERE id = 1"
        );
        assert_eq!(delete_line(QUERY, 1), "SELECT id\nWHERE id = 1");
        assert_eq!(delete_line("only", 0), "");
        assert_eq!(delete_line(QUERY, 99), "SELECT id\nFROM users");
    }

    #[test]
    fn test_toggle_comment_is_involution() {
        let once = toggle_comment(QUERY, 0, 1);
        assert_eq!(once, "-- SELECT id\n-- FROM users\nWHERE id = 1");
        assert_eq!(toggle_comment(&once, 0, 1), QUERY);
    }

    #[test]
    fn test_toggle_comment_mixed_span_comments_all() {
        let text = "-- a\nb";
        assert_eq!(toggle_comment(text, 0, 1), "-- -- a\n-- b");
        assert_eq!(toggle_comment("--a", 0, 0), "a");
    }

    #[test]
    fn test_indent_then_outdent_restores() {
        let (indented, added) = indent(QUERY, 1, 2);
        assert_eq!(added, 4);
        assert_eq!(indented, "SELECT id\n  FROM users\n  WHERE id = 1");
        let (restored, removed) = outdent(&indented, 1, 2);
        assert_eq!(removed, 4);
        assert_eq!(restored, QUERY);
    }

    #[test]
    fn test_outdent_without_indentation_is_noop() {
        let (text, removed) = outdent(QUERY, 0, 2);
        assert_eq!(removed, 0);
        assert_eq!(text, QUERY);
    }

    #[test]
    fn test_outdent_partial_indent() {
        let (text, removed) = outdent(" a\n\tb", 0, 1);
        assert_eq!(text, "a\n\tb");
        assert_eq!(removed, 1);
    }

    #[test]
    fn test_leading_whitespace() {
        assert_eq!(leading_whitespace("  \tSELECT"), "  \t");
        assert_eq!(leading_whitespace("SELECT"), "");
        assert_eq!(leading_whitespace("   "), "   ");
    }
}
