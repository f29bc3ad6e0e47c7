//! Visible window over the buffer and screen-to-text mapping.

/// Width of the line-number gutter when it is shown
pub const GUTTER_WIDTH: u16 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewport {
    /// Screen column of the editor's left edge
    pub x: u16,
    /// Screen row of the editor's top edge
    pub y: u16,
    pub width: u16,
    pub height: u16,
    /// First buffer line shown
    pub offset_y: usize,
    pub show_line_numbers: bool,
    pub soft_wrap: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: 80,
            height: 24,
            offset_y: 0,
            show_line_numbers: true,
            soft_wrap: false,
        }
    }
}

impl Viewport {
    pub fn gutter(&self) -> u16 {
        if self.show_line_numbers {
            GUTTER_WIDTH
        } else {
            0
        }
    }

    /// Rows available to text once `header_rows` are taken
    pub fn text_rows(&self, header_rows: u16) -> usize {
        self.height.saturating_sub(header_rows).max(1) as usize
    }

    /// Scroll the minimum amount needed for `line` to be visible
    pub fn scroll_to_line(&mut self, line: usize, header_rows: u16) {
        let rows = self.text_rows(header_rows);
        if line < self.offset_y {
            self.offset_y = line;
        } else if line >= self.offset_y + rows {
            self.offset_y = line + 1 - rows;
        }
    }

    /// Columns available to text once the gutter is taken
    pub fn text_width(&self) -> usize {
        self.width.saturating_sub(self.gutter()).max(1) as usize
    }

    /// Map a screen cell to a `(line, column)` in the buffer.
    ///
    /// `line_len` gives the character count of a buffer line, or `None`
    /// past the last line. With soft wrap on, a long line takes several
    /// rows. Returns `None` when the cell is outside the text area or below
    /// the last line; clicks in the gutter map to column 0.
    pub fn point_to_line_col(
        &self,
        column: u16,
        row: u16,
        header_rows: u16,
        line_len: impl Fn(usize) -> Option<usize>,
    ) -> Option<(usize, usize)> {
        let top = self.y + header_rows;
        if row < top || row >= self.y + self.height || column < self.x {
            return None;
        }
        let col = (column - self.x).saturating_sub(self.gutter()) as usize;
        let width = self.text_width();

        let mut remaining = (row - top) as usize;
        let mut line = self.offset_y;
        loop {
            let len = line_len(line)?;
            let rows = if self.soft_wrap {
                len.div_ceil(width).max(1)
            } else {
                1
            };
            if remaining < rows {
                let wrapped = if self.soft_wrap { remaining * width } else { 0 };
                return Some((line, wrapped + col));
            }
            remaining -= rows;
            line += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(lens: &[usize]) -> impl Fn(usize) -> Option<usize> + '_ {
        move |line| lens.get(line).copied()
    }

    #[test]
    fn test_point_mapping_accounts_for_header_and_gutter() {
        let viewport = Viewport::default();
        let lens = [10, 10, 10];
        assert_eq!(viewport.point_to_line_col(8, 2, 1, lines(&lens)), Some((1, 3)));
        assert_eq!(viewport.point_to_line_col(2, 1, 1, lines(&lens)), Some((0, 0)));
        // Header row and rows past the last line do not map
        assert_eq!(viewport.point_to_line_col(8, 0, 1, lines(&lens)), None);
        assert_eq!(viewport.point_to_line_col(8, 9, 1, lines(&lens)), None);
    }

    #[test]
    fn test_point_mapping_without_gutter_and_scrolled() {
        let viewport = Viewport {
            show_line_numbers: false,
            offset_y: 10,
            ..Viewport::default()
        };
        let lens = [5; 40];
        assert_eq!(viewport.point_to_line_col(4, 3, 1, lines(&lens)), Some((12, 4)));
    }

    #[test]
    fn test_point_mapping_with_soft_wrap() {
        let viewport = Viewport {
            width: 15,
            soft_wrap: true,
            ..Viewport::default()
        };
        // Text width is 10: the first line wraps onto three rows
        let lens = [25, 3];
        assert_eq!(viewport.point_to_line_col(7, 2, 1, lines(&lens)), Some((0, 12)));
        assert_eq!(viewport.point_to_line_col(6, 4, 1, lines(&lens)), Some((1, 1)));
    }

    #[test]
    fn test_scroll_to_line() {
        let mut viewport = Viewport {
            height: 6,
            ..Viewport::default()
        };
        viewport.scroll_to_line(10, 1);
        assert_eq!(viewport.offset_y, 6);
        viewport.scroll_to_line(7, 1);
        assert_eq!(viewport.offset_y, 6);
        viewport.scroll_to_line(2, 1);
        assert_eq!(viewport.offset_y, 2);
    }
}
