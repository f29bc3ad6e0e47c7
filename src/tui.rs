/*!
 * Full-screen editor
 *
 * Raw-mode terminal front end around `Editor`. Keys and mouse events are
 * handled synchronously; completion requests and AI calls run on the tokio
 * runtime and report back over a channel. Every completion request carries
 * a sequence number and only the answer to the latest one is shown.
 */

use crate::completion::{CompletionContext, CompletionItem, ItemKind};
use crate::config::Config;
use crate::editor::dispatch::{Action, EditorMode, HostCommand, KeyBindings};
use crate::editor::search::SearchField;
use crate::editor::{clipboard, Editor};
use crate::session::Session;
use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute, queue};
use std::io::{self, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const LIST_ROWS: usize = 8;
const LIST_WIDTH: usize = 56;

enum Message {
    Completions {
        seq: u64,
        word: String,
        show: bool,
        items: Vec<CompletionItem>,
    },
    AiAnswer {
        answer: Result<String, String>,
    },
}

struct AiPrompt {
    input: String,
    /// Rewrite the selection instead of inserting new SQL
    refactor: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Restores the terminal even when the loop fails or panics
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(
            io::stdout(),
            DisableMouseCapture,
            LeaveAlternateScreen,
            cursor::Show
        );
        let _ = terminal::disable_raw_mode();
    }
}

/// Run the full-screen editor until the user quits
pub fn run(session: &mut Session, config: &Config, runtime: Handle) -> Result<()> {
    let bindings = Arc::new(KeyBindings::new(&config.keymap));
    let mut editor = Editor::new(bindings, clipboard::detect());
    editor.set_view_flags(config.editor.show_line_numbers, config.editor.soft_wrap);

    let mut tui = Tui::new(session, editor, runtime);
    let _guard = TerminalGuard::enter()?;
    let mut stdout = io::stdout();
    tui.event_loop(&mut stdout)
}

struct Tui<'a> {
    session: &'a mut Session,
    editor: Editor,
    runtime: Handle,
    tx: Sender<Message>,
    rx: Receiver<Message>,
    /// Sequence number of the latest completion request
    seq: u64,
    /// Buffer and cursor the latest request was made for
    requested: Option<(String, usize)>,
    items: Vec<CompletionItem>,
    show_list: bool,
    selected: usize,
    /// Untyped rest of the top suggestion, drawn after the cursor
    ghost_tail: Option<String>,
    output: Vec<String>,
    status: Option<String>,
    prompt: Option<AiPrompt>,
    width: u16,
    height: u16,
    dirty: bool,
}

impl<'a> Tui<'a> {
    fn new(session: &'a mut Session, editor: Editor, runtime: Handle) -> Self {
        let (tx, rx) = mpsc::channel();
        let status = (!session.is_connected())
            .then(|| "Not connected: editing and completion only".to_string());
        Self {
            session,
            editor,
            runtime,
            tx,
            rx,
            seq: 0,
            requested: None,
            items: Vec::new(),
            show_list: false,
            selected: 0,
            ghost_tail: None,
            output: Vec::new(),
            status,
            prompt: None,
            width: 80,
            height: 24,
            dirty: true,
        }
    }

    fn event_loop(&mut self, out: &mut impl Write) -> Result<()> {
        loop {
            while let Ok(message) = self.rx.try_recv() {
                self.handle_message(message);
            }

            let (width, height) = terminal::size()?;
            if (width, height) != (self.width, self.height) {
                self.width = width;
                self.height = height;
                self.dirty = true;
            }
            if self.dirty {
                self.layout();
                self.draw(out)?;
                self.dirty = false;
            }

            if !event::poll(POLL_INTERVAL)? {
                continue;
            }
            match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    if self.handle_key(key) == Flow::Quit {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => self.editor.handle_mouse(mouse),
                Event::Paste(text) => self.editor.insert_text(&text),
                _ => {}
            }
            self.dirty = true;
            self.request_completions();
        }
    }

    fn results_rows(&self) -> u16 {
        if self.output.is_empty() {
            0
        } else {
            (self.output.len() as u16 + 1).min(self.height / 3)
        }
    }

    fn layout(&mut self) {
        let editor_rows = self
            .height
            .saturating_sub(self.results_rows())
            .saturating_sub(1)
            .max(2);
        self.editor.resize(0, 0, self.width, editor_rows);
    }

    // ---- input ----

    fn handle_key(&mut self, key: KeyEvent) -> Flow {
        if self.prompt.is_some() {
            self.handle_prompt_key(key);
            return Flow::Continue;
        }
        self.status = None;

        if self.list_visible() && key.modifiers == KeyModifiers::CONTROL {
            match key.code {
                KeyCode::Char('n') => {
                    self.selected = (self.selected + 1) % self.items.len();
                    return Flow::Continue;
                }
                KeyCode::Char('p') => {
                    self.selected = (self.selected + self.items.len() - 1) % self.items.len();
                    return Flow::Continue;
                }
                _ => {}
            }
        }

        match self.editor.handle_key(key) {
            Ok(Some(command)) => self.handle_command(command),
            Ok(None) => Flow::Continue,
            Err(e) => {
                tracing::warn!("{}", e);
                self.status = Some(e.to_string());
                Flow::Continue
            }
        }
    }

    fn handle_command(&mut self, command: HostCommand) -> Flow {
        match command {
            HostCommand::Execute => self.execute(),
            HostCommand::AiPrompt => self.open_prompt(),
            HostCommand::AcceptCompletion => self.accept_selected(),
            HostCommand::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        let Some(prompt) = self.prompt.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.prompt = None,
            KeyCode::Enter => {
                if let Some(prompt) = self.prompt.take() {
                    self.ask_ai(prompt);
                }
            }
            KeyCode::Backspace => {
                prompt.input.pop();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                prompt.input.push(c);
            }
            _ => {}
        }
    }

    // ---- host commands ----

    fn execute(&mut self) {
        let sql = self.editor.selected_text().to_string();
        tracing::debug!("Executing from editor");
        self.output = match self.session.run(&sql) {
            Ok(outcome) => outcome
                .render(Some(self.width))
                .lines()
                .map(str::to_string)
                .collect(),
            Err(e) => vec![format!("ERROR: {:#}", e)],
        };
        // The schema may have changed
        self.requested = None;
    }

    fn open_prompt(&mut self) {
        if !self.session.ai().is_configured() {
            self.status = Some("AI provider not configured".to_string());
            return;
        }
        self.prompt = Some(AiPrompt {
            input: String::new(),
            refactor: self.editor.has_selection(),
        });
    }

    fn ask_ai(&mut self, prompt: AiPrompt) {
        if prompt.input.trim().is_empty() {
            return;
        }
        let provider = self.session.ai().clone();
        let schema = self.session.schema();
        let sql = prompt.refactor.then(|| self.editor.selected_text().to_string());
        let tx = self.tx.clone();

        self.status = Some("Asking AI...".to_string());
        self.runtime.spawn(async move {
            let answer = match sql {
                Some(sql) => provider.refactor_sql(&sql, &prompt.input, Some(&schema)).await,
                None => provider.nl2sql(&prompt.input, Some(&schema)).await,
            };
            let _ = tx.send(Message::AiAnswer {
                answer: answer.map_err(|e| e.to_string()),
            });
        });
    }

    fn accept_selected(&mut self) {
        let Some(item) = self.items.get(self.selected).cloned() else {
            return;
        };
        if item.kind == ItemKind::History {
            self.editor.replace_line_prefix(&item.insert_text);
        } else {
            self.editor.accept_completion(&item.insert_text);
        }
        self.clear_completions();
    }

    // ---- completion ----

    fn list_visible(&self) -> bool {
        self.show_list && !self.items.is_empty() && self.editor.mode() == EditorMode::Insert
    }

    fn clear_completions(&mut self) {
        self.items.clear();
        self.selected = 0;
        self.ghost_tail = None;
        self.editor.set_ghost_suggestion(None);
    }

    /// Ask for completions if the buffer or cursor moved since the last request
    fn request_completions(&mut self) {
        let editing = self.editor.mode() == EditorMode::Insert
            && self.prompt.is_none()
            && self.editor.search().is_none()
            && self.editor.goto_input().is_none();
        if !editing {
            self.requested = None;
            self.clear_completions();
            return;
        }

        let state = (self.editor.value().to_string(), self.editor.cursor());
        if self.requested.as_ref() == Some(&state) {
            return;
        }
        let (query, cursor) = state.clone();
        self.requested = Some(state);

        self.seq += 1;
        let seq = self.seq;
        let database = self.session.database_name();
        let tables = self.session.tables();
        let ctx = CompletionContext::new(&query, cursor, database.as_deref(), &tables);
        let show = !ctx.word.is_empty()
            || ctx.line_prefix.ends_with('.')
            || (!ctx.line_prefix.is_empty() && query[..ctx.cursor].ends_with(' '));

        let engine = self.session.engine().clone();
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let items = engine.complete_context(&ctx).await;
            let _ = tx.send(Message::Completions {
                seq,
                word: ctx.word,
                show,
                items,
            });
        });
    }

    fn handle_message(&mut self, message: Message) {
        match message {
            Message::Completions {
                seq,
                word,
                show,
                items,
            } => {
                if seq != self.seq {
                    tracing::trace!(seq, latest = self.seq, "Dropping stale completions");
                    return;
                }
                let top = items.iter().find(|item| item.kind != ItemKind::History);
                self.ghost_tail = top.and_then(|item| item.remainder(&word)).map(str::to_string);
                self.editor.set_ghost_suggestion(
                    self.ghost_tail
                        .as_ref()
                        .and(top)
                        .map(|item| item.insert_text.trim_end().to_string()),
                );
                self.items = items;
                self.show_list = show;
                self.selected = 0;
            }
            Message::AiAnswer { answer } => match answer {
                Ok(sql) if sql.trim().is_empty() => {
                    self.status = Some("AI returned no SQL".to_string());
                }
                Ok(sql) => {
                    self.editor.insert_text(&sql);
                    self.status = None;
                }
                Err(e) => {
                    tracing::warn!("AI request failed: {}", e);
                    self.status = Some(e);
                }
            },
        }
        self.dirty = true;
    }

    // ---- drawing ----

    fn draw(&self, out: &mut impl Write) -> Result<()> {
        queue!(out, cursor::Hide)?;
        let mut row = self.editor.viewport().y;

        self.draw_header(out, row)?;
        row += 1;
        if let Some(search) = self.editor.search() {
            let info = match search.match_info() {
                Some((i, n)) => format!("[{}/{}]", i, n),
                None if search.query.is_empty() => String::new(),
                None => "[no matches]".to_string(),
            };
            let marker = |field: SearchField| if search.focus == field { ">" } else { " " };
            self.draw_line(
                out,
                row,
                &format!("{}Find: {}  {}", marker(SearchField::Query), search.query, info),
            )?;
            row += 1;
            if search.replacing {
                self.draw_line(
                    out,
                    row,
                    &format!("{}Replace: {}", marker(SearchField::Replacement), search.replacement),
                )?;
                row += 1;
            }
        }
        if let Some(input) = self.editor.goto_input() {
            self.draw_line(out, row, &format!(" Go to line: {}", input))?;
            row += 1;
        }

        let cursor_cell = self.draw_text(out, row)?;
        self.draw_results(out)?;
        self.draw_footer(out)?;

        if let Some((x, y)) = cursor_cell {
            let rest = &self.editor.value()[self.editor.cursor()..];
            let at_line_end = rest.is_empty() || rest.starts_with('\n');
            if let Some(tail) = self.ghost_tail.as_ref().filter(|_| at_line_end) {
                let room = self.width.saturating_sub(x) as usize;
                let tail: String = tail.chars().take(room).collect();
                queue!(
                    out,
                    cursor::MoveTo(x, y),
                    SetForegroundColor(Color::DarkGrey),
                    Print(tail),
                    ResetColor
                )?;
            }
            if self.list_visible() {
                self.draw_list(out, x, y)?;
            }
        }

        match (&self.prompt, cursor_cell) {
            (Some(prompt), _) => {
                let x = (prompt_label(prompt).chars().count() + prompt.input.chars().count()) as u16;
                queue!(out, cursor::MoveTo(x, self.height.saturating_sub(1)), cursor::Show)?;
            }
            (None, Some((x, y))) => queue!(out, cursor::MoveTo(x, y), cursor::Show)?,
            (None, None) => {}
        }
        out.flush()?;
        Ok(())
    }

    fn draw_line(&self, out: &mut impl Write, row: u16, text: &str) -> Result<()> {
        let text: String = text.chars().take(self.width as usize).collect();
        queue!(
            out,
            cursor::MoveTo(0, row),
            Print(text),
            Clear(ClearType::UntilNewLine)
        )?;
        Ok(())
    }

    fn draw_header(&self, out: &mut impl Write, row: u16) -> Result<()> {
        let (line, col) = self.editor.position();
        let database = self
            .session
            .database_name()
            .unwrap_or_else(|| "not connected".to_string());
        let header = format!(
            " {} │ {} │ Ln {}, Col {}",
            self.editor.mode().label(),
            database,
            line + 1,
            col + 1
        );
        let header = format!("{:<width$}", header, width = self.width as usize);
        queue!(out, SetAttribute(Attribute::Reverse))?;
        self.draw_line(out, row, &header)?;
        queue!(out, SetAttribute(Attribute::Reset))?;
        Ok(())
    }

    /// Draw the visible buffer lines; returns the cursor's screen cell
    fn draw_text(&self, out: &mut impl Write, top: u16) -> Result<Option<(u16, u16)>> {
        let viewport = self.editor.viewport();
        let buffer = self.editor.buffer();
        let bottom = viewport.y + viewport.height;
        let gutter = viewport.gutter();
        let width = viewport.text_width();
        let selection = self.editor.selection().unwrap_or(0..0);
        let cursor = self.editor.cursor();

        let mut row = top;
        let mut cursor_cell = None;
        let mut line = viewport.offset_y;
        while row < bottom && line < buffer.line_count() {
            let start = buffer.line_start(line);
            let chars: Vec<(usize, char)> = buffer
                .line(line)
                .char_indices()
                .map(|(i, c)| (start + i, c))
                .collect();
            let chunks: Vec<&[(usize, char)]> = if viewport.soft_wrap && !chars.is_empty() {
                chars.chunks(width).collect()
            } else {
                vec![&chars[..chars.len().min(width)]]
            };

            for (n, chunk) in chunks.iter().enumerate() {
                if row >= bottom {
                    break;
                }
                queue!(out, cursor::MoveTo(0, row))?;
                if gutter > 0 {
                    let number = if n == 0 {
                        format!("{:>4} ", line + 1)
                    } else {
                        " ".repeat(gutter as usize)
                    };
                    queue!(out, SetForegroundColor(Color::DarkGrey), Print(number), ResetColor)?;
                }

                let mut selected = false;
                for (offset, c) in chunk.iter() {
                    let inside = selection.contains(offset);
                    if inside != selected {
                        let attr = if inside { Attribute::Reverse } else { Attribute::NoReverse };
                        queue!(out, SetAttribute(attr))?;
                        selected = inside;
                    }
                    queue!(out, Print(c))?;
                }
                if selected {
                    queue!(out, SetAttribute(Attribute::NoReverse))?;
                }
                queue!(out, Clear(ClearType::UntilNewLine))?;

                let chunk_start = chunk.first().map_or(start, |(o, _)| *o);
                let last_chunk = n + 1 == chunks.len();
                let in_chunk = cursor >= chunk_start
                    && (chunk.iter().any(|(o, _)| *o == cursor)
                        || (last_chunk && buffer.line_of(cursor) == line));
                if cursor_cell.is_none() && in_chunk {
                    let col = buffer.as_str()[chunk_start..cursor].chars().count();
                    cursor_cell = Some((gutter + col.min(width) as u16, row));
                }
                row += 1;
            }
            line += 1;
        }

        while row < bottom {
            self.draw_line(out, row, "")?;
            row += 1;
        }
        Ok(cursor_cell)
    }

    fn draw_list(&self, out: &mut impl Write, x: u16, y: u16) -> Result<()> {
        let rows = self.items.len().min(LIST_ROWS);
        let first = self.selected.saturating_sub(rows - 1);
        let width = LIST_WIDTH.min(self.width as usize);
        let editor_bottom = self.editor.viewport().y + self.editor.viewport().height;
        let below = y + 1 + rows as u16 <= editor_bottom;
        let top = if below { y + 1 } else { y.saturating_sub(rows as u16) };
        let left = x.min(self.width.saturating_sub(width as u16));

        for (i, item) in self.items.iter().enumerate().skip(first).take(rows) {
            let text = format!(" {} {:<20} {}", item.kind.icon(), item.label, item.detail);
            let text: String = text.chars().take(width.saturating_sub(2)).collect();
            let text = format!("{:<width$}", text, width = width.saturating_sub(2));
            let attr = if i == self.selected {
                Attribute::Reverse
            } else {
                Attribute::Dim
            };
            queue!(
                out,
                cursor::MoveTo(left, top + (i - first) as u16),
                SetAttribute(attr),
                Print(text),
                SetAttribute(Attribute::Reset)
            )?;
        }
        Ok(())
    }

    fn draw_results(&self, out: &mut impl Write) -> Result<()> {
        let rows = self.results_rows();
        if rows == 0 {
            return Ok(());
        }
        let top = self.height.saturating_sub(1).saturating_sub(rows);
        let title = format!("─ Results {}", "─".repeat(self.width as usize));
        self.draw_line(out, top, &title)?;
        for (i, line) in self.output.iter().take(rows as usize - 1).enumerate() {
            self.draw_line(out, top + 1 + i as u16, line)?;
        }
        Ok(())
    }

    fn draw_footer(&self, out: &mut impl Write) -> Result<()> {
        let row = self.height.saturating_sub(1);
        let text = match (&self.prompt, &self.status) {
            (Some(prompt), _) => format!("{}{}", prompt_label(prompt), prompt.input),
            (None, Some(status)) => format!(" {}", status),
            (None, None) => self.key_hints(),
        };
        self.draw_line(out, row, &text)
    }

    fn key_hints(&self) -> String {
        let bindings = self.editor.bindings();
        let mode = self.editor.mode();
        let hints = [
            (Action::Host(HostCommand::Execute), "run"),
            (Action::Host(HostCommand::AcceptCompletion), "accept"),
            (Action::Host(HostCommand::AiPrompt), "AI"),
            (Action::Host(HostCommand::Quit), "quit"),
        ]
        .into_iter()
        .filter_map(|(action, label)| {
            bindings
                .key_for(mode, action)
                .map(|key| format!("{} {}", key, label))
        })
        .collect::<Vec<_>>();
        format!(" {}", hints.join(" · "))
    }
}

fn prompt_label(prompt: &AiPrompt) -> &'static str {
    if prompt.refactor {
        " AI refactor> "
    } else {
        " AI> "
    }
}
