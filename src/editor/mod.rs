/*!
 * Modal SQL editor
 *
 * `Editor` owns the buffer, cursor, selection, undo history and the
 * search/goto overlays, and moves between Normal, Insert and Visual mode.
 * Key presses are resolved through `KeyBindings` into `Action`s; actions the
 * editor cannot perform itself (running the query, quitting, ...) are
 * returned to the host as `HostCommand`s.
 *
 * History is recorded on semantic boundaries: before space and enter,
 * around every destructive edit, and before each undo so unsaved typing
 * is never lost.
 */

pub mod buffer;
pub mod clipboard;
pub mod dispatch;
pub mod history;
pub mod keymap;
pub mod lines;
pub mod search;
pub mod viewport;


use std::ops::Range;
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use thiserror::Error;

use buffer::Buffer;
use clipboard::{Clipboard, ClipboardError};
use dispatch::{Action, KeyBindings, Motion};
use history::{History, Snapshot};
use keymap::Keystroke;
use search::{GotoLine, SearchState};
use viewport::Viewport;

pub use dispatch::{EditorMode, HostCommand};

#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
}

/// Anchor and moving end of a selection; either may come first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    fn at(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// The selection as an ordered range
    pub fn range(&self) -> Range<usize> {
        self.start.min(self.end)..self.start.max(self.end)
    }
}

pub struct Editor {
    buffer: Buffer,
    cursor: usize,
    mode: EditorMode,
    selection: Option<Selection>,
    history: History,
    search: Option<SearchState>,
    goto_line: Option<GotoLine>,
    bindings: Arc<KeyBindings>,
    clipboard: Box<dyn Clipboard>,
    viewport: Viewport,
    ghost: Option<String>,
    drag_anchor: Option<usize>,
}

impl Editor {
    pub fn new(bindings: Arc<KeyBindings>, clipboard: Box<dyn Clipboard>) -> Self {
        let mut editor = Self {
            buffer: Buffer::default(),
            cursor: 0,
            mode: EditorMode::Normal,
            selection: None,
            history: History::new(),
            search: None,
            goto_line: None,
            bindings,
            clipboard,
            viewport: Viewport::default(),
            ghost: None,
            drag_anchor: None,
        };
        editor.snapshot();
        editor
    }

    // ---- accessors ----

    pub fn value(&self) -> &str {
        self.buffer.as_str()
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// `(line, column)` of the cursor
    pub fn position(&self) -> (usize, usize) {
        self.buffer.position(self.cursor)
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    /// Ordered selection range, if any
    pub fn selection(&self) -> Option<Range<usize>> {
        self.selection
            .map(|s| self.buffer.clamp_range(s.range()))
    }

    fn non_empty_selection(&self) -> Option<Range<usize>> {
        self.selection().filter(|r| !r.is_empty())
    }

    /// The selected text, or the whole buffer when nothing is selected
    pub fn selected_text(&self) -> &str {
        match self.non_empty_selection() {
            Some(range) => self.buffer.slice(range),
            None => self.buffer.as_str(),
        }
    }

    pub fn has_selection(&self) -> bool {
        self.non_empty_selection().is_some()
    }

    pub fn search(&self) -> Option<&SearchState> {
        self.search.as_ref()
    }

    pub fn goto_input(&self) -> Option<&str> {
        self.goto_line.as_ref().map(|g| g.input.as_str())
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn ghost(&self) -> Option<&str> {
        self.ghost.as_deref()
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    /// Rows above the text: the mode line, the search bar (two rows when
    /// replacing) and the goto-line prompt
    pub fn header_rows(&self) -> u16 {
        let search = match &self.search {
            Some(s) if s.replacing => 2,
            Some(_) => 1,
            None => 0,
        };
        let goto = u16::from(self.goto_line.is_some());
        1 + search + goto
    }

    // ---- host-facing mutation ----

    /// Place the editor on screen
    pub fn resize(&mut self, x: u16, y: u16, width: u16, height: u16) {
        self.viewport.x = x;
        self.viewport.y = y;
        self.viewport.width = width;
        self.viewport.height = height;
        self.keep_cursor_visible();
    }

    pub fn set_view_flags(&mut self, show_line_numbers: bool, soft_wrap: bool) {
        self.viewport.show_line_numbers = show_line_numbers;
        self.viewport.soft_wrap = soft_wrap;
    }

    /// Replace the whole buffer as one undoable step
    pub fn set_value(&mut self, text: &str) {
        self.snapshot();
        self.buffer.set(text);
        self.cursor = self.buffer.len();
        self.clear_selection();
        self.snapshot();
        self.after_edit();
    }

    pub fn set_cursor(&mut self, offset: usize) {
        self.cursor = self.buffer.clamp(offset);
        self.keep_cursor_visible();
    }

    /// Inline preview shown past the cursor and accepted with tab
    pub fn set_ghost_suggestion(&mut self, suggestion: Option<String>) {
        self.ghost = suggestion.filter(|s| !s.is_empty());
    }

    /// Insert text at the cursor, replacing the selection if there is one
    pub fn insert_text(&mut self, text: &str) {
        self.snapshot();
        if let Some(range) = self.non_empty_selection() {
            self.buffer.delete(range.clone());
            self.cursor = range.start;
        }
        self.cursor = self.buffer.insert(self.cursor, text);
        self.clear_selection();
        self.snapshot();
        self.after_edit();
    }

    /// Replace the word before the cursor with an accepted completion
    pub fn accept_completion(&mut self, insert_text: &str) {
        self.snapshot();
        let start = self.buffer.word_start(self.cursor);
        self.buffer.replace(start..self.cursor, insert_text);
        self.cursor = self.buffer.clamp(start + insert_text.len());
        self.snapshot();
        self.after_edit();
    }

    /// Replace everything from the start of the cursor's line up to the
    /// cursor, as when recalling a whole query from history
    pub fn replace_line_prefix(&mut self, text: &str) {
        self.snapshot();
        let start = self.buffer.line_start(self.buffer.line_of(self.cursor));
        self.buffer.replace(start..self.cursor, text);
        self.cursor = self.buffer.clamp(start + text.len());
        self.snapshot();
        self.after_edit();
    }

    // ---- event entry points ----

    /// Handle one key press.
    ///
    /// Overlays (goto-line, then search) see the key first. Clipboard
    /// failures are returned; the editor state stays consistent.
    pub fn handle_key(&mut self, event: KeyEvent) -> Result<Option<HostCommand>, EditorError> {
        if event.kind == KeyEventKind::Release {
            return Ok(None);
        }
        let keystroke = Keystroke::from(event);

        if self.goto_line.is_some() && self.handle_goto_key(&keystroke) {
            return Ok(None);
        }
        if self.search.is_some() && self.handle_search_key(&keystroke)? {
            return Ok(None);
        }

        match self.bindings.resolve(self.mode, &keystroke) {
            Some(Action::Host(command)) => Ok(Some(command)),
            Some(action) => {
                self.apply(action)?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub fn handle_mouse(&mut self, event: MouseEvent) {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(offset) = self.offset_at_point(event.column, event.row) {
                    self.cursor = offset;
                    self.drag_anchor = Some(offset);
                    self.selection = None;
                    if self.mode == EditorMode::Visual {
                        self.mode = EditorMode::Normal;
                    }
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                let (Some(anchor), Some(offset)) =
                    (self.drag_anchor, self.offset_at_point(event.column, event.row))
                else {
                    return;
                };
                if offset != anchor {
                    self.mode = EditorMode::Visual;
                    self.selection = Some(Selection {
                        start: anchor,
                        end: offset,
                    });
                    self.cursor = offset;
                }
            }
            MouseEventKind::Up(MouseButton::Left) => self.drag_anchor = None,
            MouseEventKind::ScrollUp => self.move_cursor(Motion::Up),
            MouseEventKind::ScrollDown => self.move_cursor(Motion::Down),
            _ => {}
        }
        self.keep_cursor_visible();
    }

    fn offset_at_point(&self, column: u16, row: u16) -> Option<usize> {
        let (line, col) = self
            .viewport
            .point_to_line_col(column, row, self.header_rows(), |line| {
                (line < self.buffer.line_count()).then(|| self.buffer.line(line).chars().count())
            })?;
        Some(self.buffer.offset_at(line, col))
    }

    /// Carry out one action
    pub fn apply(&mut self, action: Action) -> Result<(), EditorError> {
        match action {
            Action::EnterInsert => {
                self.mode = EditorMode::Insert;
                self.selection = None;
            }
            Action::EnterVisual => {
                self.mode = EditorMode::Visual;
                self.selection = Some(Selection::at(self.cursor));
            }
            Action::ExitToNormal => {
                self.mode = EditorMode::Normal;
                self.selection = None;
                self.ghost = None;
            }
            Action::SelectAll => {
                self.mode = EditorMode::Visual;
                self.selection = Some(Selection {
                    start: 0,
                    end: self.buffer.len(),
                });
                self.cursor = self.buffer.len();
            }
            Action::Move(motion) => {
                if self.mode == EditorMode::Insert {
                    self.selection = None;
                }
                self.move_cursor(motion);
            }
            Action::Select(motion) => {
                if self.selection.is_none() {
                    self.selection = Some(Selection::at(self.cursor));
                }
                self.cursor = self.motion_target(motion);
                if let Some(selection) = &mut self.selection {
                    selection.end = self.cursor;
                }
            }
            Action::DeleteChar => self.delete_char_under_cursor(),
            Action::Undo => self.undo(),
            Action::Redo => self.redo(),
            Action::Paste => self.paste()?,
            Action::Copy => self.copy()?,
            Action::Yank => {
                self.copy()?;
                self.exit_visual();
            }
            Action::Cut => self.cut()?,
            Action::DeleteWord => self.delete_word(),
            Action::MoveLineUp => self.move_line(true),
            Action::MoveLineDown => self.move_line(false),
            Action::DuplicateLine => self.duplicate_line(),
            Action::DeleteLine => self.delete_line(),
            Action::ToggleComment => self.toggle_comment(),
            Action::ToggleSoftWrap => self.viewport.soft_wrap = !self.viewport.soft_wrap,
            Action::ToggleLineNumbers => {
                self.viewport.show_line_numbers = !self.viewport.show_line_numbers
            }
            Action::Indent => self.indent_selection(),
            Action::Outdent => self.outdent_selection(),
            Action::InsertChar(c) => self.type_char(c),
            Action::Newline => self.newline(),
            Action::Backspace => self.backspace(),
            Action::DeleteForward => self.delete_forward(),
            Action::AcceptSuggestion => {
                if !self.accept_ghost() {
                    self.type_str(lines::INDENT_UNIT);
                }
            }
            Action::StartSearch => self.open_search(false),
            Action::StartReplace => self.open_search(true),
            Action::FindNext => self.find(true),
            Action::FindPrev => self.find(false),
            Action::StartGotoLine => {
                self.search = None;
                self.goto_line = Some(GotoLine::default());
            }
            // Host commands are returned from handle_key, never applied
            Action::Host(_) => {}
        }
        self.keep_cursor_visible();
        Ok(())
    }

    // ---- history ----

    fn snapshot(&mut self) {
        self.history.push(Snapshot {
            text: self.buffer.as_str().to_owned(),
            cursor: self.cursor,
        });
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.buffer.set(snapshot.text);
        self.cursor = self.buffer.clamp(snapshot.cursor);
        self.clear_selection();
        self.after_edit();
    }

    pub fn undo(&mut self) {
        self.snapshot();
        if let Some(snapshot) = self.history.undo().cloned() {
            self.restore(snapshot);
        }
    }

    pub fn redo(&mut self) {
        self.snapshot();
        if let Some(snapshot) = self.history.redo().cloned() {
            self.restore(snapshot);
        }
    }

    // ---- cursor ----

    fn motion_target(&self, motion: Motion) -> usize {
        let (line, column) = self.buffer.position(self.cursor);
        match motion {
            Motion::Left => self.buffer.prev_boundary(self.cursor),
            Motion::Right => self.buffer.next_boundary(self.cursor),
            Motion::Up if line > 0 => self.buffer.offset_at(line - 1, column),
            Motion::Down if line + 1 < self.buffer.line_count() => {
                self.buffer.offset_at(line + 1, column)
            }
            Motion::Up | Motion::Down => self.cursor,
            Motion::LineStart => self.buffer.line_start(line),
            Motion::LineEnd => self.buffer.line_end(line),
        }
    }

    fn move_cursor(&mut self, motion: Motion) {
        self.cursor = self.motion_target(motion);
        if self.mode == EditorMode::Visual {
            if let Some(selection) = &mut self.selection {
                selection.end = self.cursor;
            }
        }
    }

    fn keep_cursor_visible(&mut self) {
        let line = self.buffer.line_of(self.cursor);
        let header = self.header_rows();
        self.viewport.scroll_to_line(line, header);
    }

    fn clear_selection(&mut self) {
        self.selection = None;
        self.drag_anchor = None;
        self.exit_visual();
    }

    fn exit_visual(&mut self) {
        if self.mode == EditorMode::Visual {
            self.mode = EditorMode::Normal;
            self.selection = None;
        }
    }

    /// Bookkeeping shared by every buffer mutation
    fn after_edit(&mut self) {
        self.ghost = None;
        if let Some(search) = &mut self.search {
            search.recompute(self.buffer.as_str());
        }
    }

    // ---- editing ----

    fn delete_selection(&mut self) -> bool {
        let Some(range) = self.non_empty_selection() else {
            return false;
        };
        self.snapshot();
        self.buffer.delete(range.clone());
        self.cursor = range.start;
        self.clear_selection();
        self.snapshot();
        true
    }

    fn type_str(&mut self, text: &str) {
        self.delete_selection();
        self.cursor = self.buffer.insert(self.cursor, text);
        self.selection = None;
        self.after_edit();
    }

    fn type_char(&mut self, c: char) {
        if c == ' ' {
            self.snapshot();
        }
        let mut utf8 = [0u8; 4];
        self.type_str(c.encode_utf8(&mut utf8));
    }

    fn newline(&mut self) {
        self.snapshot();
        let line = self.buffer.line_of(self.cursor);
        let indent = lines::leading_whitespace(self.buffer.line(line)).to_owned();
        self.type_str(&format!("\n{}", indent));
    }

    fn backspace(&mut self) {
        if self.delete_selection() {
            self.after_edit();
            return;
        }
        if self.cursor == 0 {
            return;
        }
        let start = self.buffer.prev_boundary(self.cursor);
        self.buffer.delete(start..self.cursor);
        self.cursor = start;
        self.after_edit();
    }

    fn delete_forward(&mut self) {
        if self.delete_selection() {
            self.after_edit();
            return;
        }
        let end = self.buffer.next_boundary(self.cursor);
        if end > self.cursor {
            self.buffer.delete(self.cursor..end);
            self.after_edit();
        }
    }

    fn delete_char_under_cursor(&mut self) {
        let end = self.buffer.next_boundary(self.cursor);
        if end == self.cursor {
            return;
        }
        self.snapshot();
        self.buffer.delete(self.cursor..end);
        self.cursor = self.buffer.clamp(self.cursor);
        self.snapshot();
        self.after_edit();
    }

    /// Delete back to the start of the whitespace-delimited word before the cursor
    fn delete_word(&mut self) {
        let before = &self.buffer.as_str()[..self.cursor];
        let trimmed = before.trim_end();
        let start = trimmed
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        if start == self.cursor {
            return;
        }
        self.snapshot();
        self.buffer.delete(start..self.cursor);
        self.cursor = start;
        self.snapshot();
        self.after_edit();
    }

    /// Complete the word before the cursor from the ghost suggestion.
    ///
    /// The suggestion must start with the typed word (ignoring case); a word
    /// typed all in lower case gets a lower-cased remainder.
    fn accept_ghost(&mut self) -> bool {
        let Some(ghost) = self.ghost.clone() else {
            return false;
        };
        let word_start = self.buffer.word_start(self.cursor);
        let word = &self.buffer.as_str()[word_start..self.cursor];
        if word.is_empty() || !ghost.to_uppercase().starts_with(&word.to_uppercase()) {
            return false;
        }

        let mut remainder: String = ghost.chars().skip(word.chars().count()).collect();
        if remainder.is_empty() {
            return false;
        }
        if word.to_lowercase() == word {
            remainder = remainder.to_lowercase();
        }

        self.cursor = self.buffer.insert(self.cursor, &remainder);
        self.ghost = None;
        self.snapshot();
        self.after_edit();
        true
    }

    // ---- clipboard ----

    fn copy(&mut self) -> Result<(), EditorError> {
        if let Some(range) = self.non_empty_selection() {
            self.clipboard.set_text(self.buffer.slice(range))?;
        }
        Ok(())
    }

    fn cut(&mut self) -> Result<(), EditorError> {
        if self.non_empty_selection().is_none() {
            self.exit_visual();
            return Ok(());
        }
        self.copy()?;
        self.delete_selection();
        self.after_edit();
        Ok(())
    }

    fn paste(&mut self) -> Result<(), EditorError> {
        let text = self.clipboard.get_text()?;
        if text.is_empty() {
            return Ok(());
        }
        self.delete_selection();
        self.snapshot();
        self.cursor = self.buffer.insert(self.cursor, &text);
        self.snapshot();
        self.after_edit();
        Ok(())
    }

    // ---- line operations ----

    /// Replace the buffer with a whole-text rewrite and put the cursor at `(line, column)`
    fn rewrite(&mut self, text: String, line: usize, column: usize) {
        self.snapshot();
        self.buffer.set(text);
        self.cursor = self.buffer.offset_at(line, column);
        self.snapshot();
        self.after_edit();
    }

    fn move_line(&mut self, up: bool) {
        let (line, column) = self.position();
        if let Some(text) = lines::swap_lines(self.buffer.as_str(), line, up) {
            let target = if up { line - 1 } else { line + 1 };
            self.rewrite(text, target, column);
        }
    }

    fn duplicate_line(&mut self) {
        let (line, column) = self.position();
        let text = lines::duplicate_line(self.buffer.as_str(), line);
        self.rewrite(text, line + 1, column);
    }

    fn delete_line(&mut self) {
        let (line, column) = self.position();
        let text = lines::delete_line(self.buffer.as_str(), line);
        self.rewrite(text, line, column);
    }

    /// Lines touched by the selection, or the cursor line
    fn touched_lines(&self) -> (usize, usize) {
        match self.selection() {
            Some(range) => (self.buffer.line_of(range.start), self.buffer.line_of(range.end)),
            None => {
                let line = self.buffer.line_of(self.cursor);
                (line, line)
            }
        }
    }

    fn toggle_comment(&mut self) {
        let (first, last) = self.touched_lines();
        let (line, column) = self.position();
        let text = lines::toggle_comment(self.buffer.as_str(), first, last);
        self.rewrite(text, line, column);
    }

    fn indent_selection(&mut self) {
        let Some(selection) = self.selection else {
            return;
        };
        let (first, last) = self.touched_lines();
        let (text, added) = lines::indent(self.buffer.as_str(), first, last);
        self.snapshot();
        self.buffer.set(text);
        let end = self.buffer.clamp(selection.end + added);
        self.selection = Some(Selection { end, ..selection });
        self.cursor = end;
        self.snapshot();
        self.after_edit();
    }

    fn outdent_selection(&mut self) {
        let Some(selection) = self.selection else {
            return;
        };
        let (first, last) = self.touched_lines();
        let (text, removed) = lines::outdent(self.buffer.as_str(), first, last);
        if removed == 0 {
            return;
        }
        self.snapshot();
        self.buffer.set(text);
        let start = self.buffer.clamp(selection.start);
        let end = self.buffer.clamp(selection.end.saturating_sub(removed));
        self.selection = Some(Selection { start, end });
        self.cursor = end;
        self.snapshot();
        self.after_edit();
    }

    // ---- search / replace / goto ----

    fn open_search(&mut self, replacing: bool) {
        self.goto_line = None;
        match &mut self.search {
            Some(search) => search.replacing |= replacing,
            None => self.search = Some(SearchState::new(replacing)),
        }
    }

    /// Jump to the next (or previous) match.
    ///
    /// When the cursor is not on the current match the first press jumps to
    /// it instead of skipping past it.
    fn find(&mut self, forward: bool) {
        let Some(search) = &mut self.search else {
            return;
        };
        let target = if search.current_match() == Some(self.cursor) {
            if forward {
                search.next()
            } else {
                search.prev()
            }
        } else {
            search.current_match()
        };
        if let Some(offset) = target {
            self.cursor = offset;
        }
    }

    fn replace_current(&mut self) {
        let Some(search) = &self.search else {
            return;
        };
        if search.replacement.is_empty() {
            return;
        }
        let Some(offset) = search.current_match() else {
            return;
        };
        let range = offset..offset + search.query.len();
        let replacement = search.replacement.clone();

        self.snapshot();
        self.buffer.replace(range, &replacement);
        self.cursor = self.buffer.clamp(offset + replacement.len());
        self.snapshot();
        self.after_edit();
    }

    fn replace_all(&mut self) {
        let Some(search) = &self.search else {
            return;
        };
        if search.replacement.is_empty() || search.matches.is_empty() {
            return;
        }
        let text = self.buffer.as_str().replace(&search.query, &search.replacement);

        self.snapshot();
        self.buffer.set(text);
        self.cursor = self.buffer.clamp(self.cursor);
        self.snapshot();
        self.after_edit();
    }

    /// Returns whether the search bar consumed the key
    fn handle_search_key(&mut self, keystroke: &Keystroke) -> Result<bool, EditorError> {
        let Some(search) = &mut self.search else {
            return Ok(false);
        };

        if keystroke.is(KeyCode::Esc) {
            self.search = None;
        } else if keystroke.code == KeyCode::Enter && keystroke.modifiers == KeyModifiers::ALT {
            if search.replacing {
                self.replace_all();
            }
        } else if keystroke.is(KeyCode::Enter) {
            if search.replacing {
                self.replace_current();
            } else {
                self.find(true);
            }
        } else if keystroke.is(KeyCode::Backspace) {
            if search.pop_char() {
                search.recompute(self.buffer.as_str());
            }
        } else if keystroke.is(KeyCode::Tab) {
            search.toggle_focus();
        } else if let Some(c) = keystroke.typed_char() {
            if search.push_char(c) {
                search.recompute(self.buffer.as_str());
            }
        } else {
            return Ok(false);
        }
        Ok(true)
    }

    /// Returns whether the goto prompt consumed the key
    fn handle_goto_key(&mut self, keystroke: &Keystroke) -> bool {
        let Some(goto) = &mut self.goto_line else {
            return false;
        };

        if keystroke.is(KeyCode::Esc) {
            self.goto_line = None;
        } else if keystroke.is(KeyCode::Enter) {
            if let Some(line) = goto.target(self.buffer.line_count()) {
                self.cursor = self.buffer.line_start(line);
            }
            self.goto_line = None;
            self.keep_cursor_visible();
        } else if keystroke.is(KeyCode::Backspace) {
            goto.pop_char();
        } else if let Some(c) = keystroke.typed_char() {
            goto.push_char(c);
        } else {
            return false;
        }
        true
    }
}
