/*!
 * Modal key dispatch
 *
 * Every key press is resolved through a `(mode, keystroke) -> Action`
 * table. Built-in vi-style keys are installed first and the configurable
 * `KeyMap` entries are layered on top, so a user binding wins over a
 * built-in one on the same key.
 */

use super::keymap::{KeyMap, Keystroke};
use crossterm::event::{KeyCode, KeyModifiers};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EditorMode {
    #[default]
    Normal,
    Insert,
    Visual,
}

impl EditorMode {
    pub fn label(&self) -> &'static str {
        match self {
            EditorMode::Normal => "NORMAL",
            EditorMode::Insert => "INSERT",
            EditorMode::Visual => "VISUAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Left,
    Right,
    Up,
    Down,
    LineStart,
    LineEnd,
}

/// Commands the editor cannot carry out itself and hands to its host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    /// Run the selection, or the whole buffer
    Execute,
    AiPrompt,
    /// Accept the top entry of the completion list
    AcceptCompletion,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    EnterInsert,
    EnterVisual,
    ExitToNormal,
    SelectAll,
    Move(Motion),
    /// Start or extend a selection without leaving Insert
    Select(Motion),
    DeleteChar,
    Undo,
    Redo,
    Paste,
    Copy,
    Cut,
    Yank,
    DeleteWord,
    MoveLineUp,
    MoveLineDown,
    DuplicateLine,
    DeleteLine,
    ToggleComment,
    ToggleSoftWrap,
    ToggleLineNumbers,
    Indent,
    Outdent,
    InsertChar(char),
    Newline,
    Backspace,
    DeleteForward,
    AcceptSuggestion,
    StartSearch,
    StartReplace,
    FindNext,
    FindPrev,
    StartGotoLine,
    Host(HostCommand),
}

const ALL_MODES: [EditorMode; 3] = [EditorMode::Normal, EditorMode::Insert, EditorMode::Visual];

fn key(code: KeyCode) -> Keystroke {
    Keystroke::plain(code)
}

fn chord(code: KeyCode, modifiers: KeyModifiers) -> Keystroke {
    Keystroke::new(code, modifiers)
}

fn arrows() -> [(KeyCode, Motion); 4] {
    [
        (KeyCode::Left, Motion::Left),
        (KeyCode::Right, Motion::Right),
        (KeyCode::Up, Motion::Up),
        (KeyCode::Down, Motion::Down),
    ]
}

/// Resolved key table for all three modes.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    table: HashMap<(EditorMode, Keystroke), Action>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::new(&KeyMap::default())
    }
}

impl KeyBindings {
    pub fn new(keymap: &KeyMap) -> Self {
        let mut bindings = Self {
            table: HashMap::new(),
        };
        bindings.install_builtins();
        bindings.install_keymap(keymap);
        bindings
    }

    fn bind(&mut self, mode: EditorMode, keystroke: Keystroke, action: Action) {
        self.table.insert((mode, keystroke), action);
    }

    fn install_builtins(&mut self) {
        use Action::*;
        use EditorMode::*;

        let normal = [
            (key(KeyCode::Char('i')), EnterInsert),
            (key(KeyCode::Char('v')), EnterVisual),
            (key(KeyCode::Char('h')), Move(Motion::Left)),
            (key(KeyCode::Char('j')), Move(Motion::Down)),
            (key(KeyCode::Char('k')), Move(Motion::Up)),
            (key(KeyCode::Char('l')), Move(Motion::Right)),
            (key(KeyCode::Char('x')), DeleteChar),
            (key(KeyCode::Char('u')), Undo),
            (chord(KeyCode::Char('r'), KeyModifiers::CONTROL), Redo),
            (key(KeyCode::Char('p')), Paste),
            (key(KeyCode::Char('0')), Move(Motion::LineStart)),
            (key(KeyCode::Char('$')), Move(Motion::LineEnd)),
            (chord(KeyCode::Up, KeyModifiers::ALT), MoveLineUp),
            (chord(KeyCode::Down, KeyModifiers::ALT), MoveLineDown),
            (chord(KeyCode::Char('d'), KeyModifiers::CONTROL), DuplicateLine),
            (chord(KeyCode::Char('k'), KeyModifiers::CONTROL), DeleteLine),
            (chord(KeyCode::Char('/'), KeyModifiers::CONTROL), ToggleComment),
            (chord(KeyCode::Char('z'), KeyModifiers::ALT), ToggleSoftWrap),
            (chord(KeyCode::Char('l'), KeyModifiers::CONTROL), ToggleLineNumbers),
        ];
        for (keystroke, action) in normal {
            self.bind(Normal, keystroke, action);
        }

        let visual = [
            (key(KeyCode::Esc), ExitToNormal),
            (key(KeyCode::Char('h')), Move(Motion::Left)),
            (key(KeyCode::Char('j')), Move(Motion::Down)),
            (key(KeyCode::Char('k')), Move(Motion::Up)),
            (key(KeyCode::Char('l')), Move(Motion::Right)),
            (key(KeyCode::Char('0')), Move(Motion::LineStart)),
            (key(KeyCode::Char('$')), Move(Motion::LineEnd)),
            (key(KeyCode::Char('y')), Yank),
            (key(KeyCode::Char('d')), Cut),
            (key(KeyCode::Char('x')), Cut),
            (key(KeyCode::Tab), Indent),
            (chord(KeyCode::Tab, KeyModifiers::SHIFT), Outdent),
        ];
        for (keystroke, action) in visual {
            self.bind(Visual, keystroke, action);
        }

        let insert = [
            (key(KeyCode::Esc), ExitToNormal),
            (key(KeyCode::Enter), Newline),
            (key(KeyCode::Backspace), Backspace),
            (key(KeyCode::Delete), DeleteForward),
            (key(KeyCode::Tab), AcceptSuggestion),
        ];
        for (keystroke, action) in insert {
            self.bind(Insert, keystroke, action);
        }

        for (code, motion) in arrows() {
            for mode in ALL_MODES {
                self.bind(mode, key(code), Move(motion));
            }
            self.bind(Insert, chord(code, KeyModifiers::SHIFT), Select(motion));
        }
        for mode in ALL_MODES {
            self.bind(mode, key(KeyCode::Home), Move(Motion::LineStart));
            self.bind(mode, key(KeyCode::End), Move(Motion::LineEnd));
        }
    }

    fn install_keymap(&mut self, keymap: &KeyMap) {
        use Action::*;
        use EditorMode::*;

        let entries: [(&[String], &[EditorMode], Action); 12] = [
            (&keymap.select_all, &ALL_MODES, SelectAll),
            (&keymap.find, &ALL_MODES, StartSearch),
            (&keymap.replace, &ALL_MODES, StartReplace),
            (&keymap.find_next, &ALL_MODES, FindNext),
            (&keymap.find_prev, &ALL_MODES, FindPrev),
            (&keymap.goto_line, &ALL_MODES, StartGotoLine),
            (&keymap.execute_selection, &ALL_MODES, Host(HostCommand::Execute)),
            (&keymap.ai_prompt, &ALL_MODES, Host(HostCommand::AiPrompt)),
            (&keymap.accept_completion, &ALL_MODES, Host(HostCommand::AcceptCompletion)),
            (&keymap.quit, &ALL_MODES, Host(HostCommand::Quit)),
            (&keymap.undo, &[Normal, Insert], Undo),
            (&keymap.redo, &[Normal, Insert], Redo),
        ];
        for (keys, modes, action) in entries {
            self.bind_configured(keys, modes, action);
        }

        self.bind_configured(&keymap.paste, &[Normal, Insert], Paste);
        self.bind_configured(&keymap.copy, &[Insert], Copy);
        self.bind_configured(&keymap.copy, &[Visual], Yank);
        self.bind_configured(&keymap.cut, &[Insert, Visual], Cut);
        self.bind_configured(&keymap.word, &[Insert], DeleteWord);
    }

    fn bind_configured(&mut self, keys: &[String], modes: &[EditorMode], action: Action) {
        for raw in keys {
            match raw.parse::<Keystroke>() {
                Ok(keystroke) => {
                    for mode in modes {
                        self.bind(*mode, keystroke, action);
                    }
                }
                Err(e) => tracing::warn!("Ignoring key binding '{}' for {:?}: {}", raw, action, e),
            }
        }
    }

    /// Action for a key in a mode; printable keys in Insert mode type themselves
    pub fn resolve(&self, mode: EditorMode, keystroke: &Keystroke) -> Option<Action> {
        if let Some(action) = self.table.get(&(mode, *keystroke)) {
            return Some(*action);
        }
        match (mode, keystroke.typed_char()) {
            (EditorMode::Insert, Some(c)) => Some(Action::InsertChar(c)),
            _ => None,
        }
    }

    /// First key bound to an action in a mode, for help text
    pub fn key_for(&self, mode: EditorMode, action: Action) -> Option<Keystroke> {
        let mut keys: Vec<Keystroke> = self
            .table
            .iter()
            .filter(|((m, _), a)| *m == mode && **a == action)
            .map(|((_, k), _)| *k)
            .collect();
        keys.sort_by_key(|k| k.to_string());
        keys.into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Keystroke {
        s.parse().unwrap()
    }

    #[test]
    fn test_same_key_differs_by_mode() {
        let bindings = KeyBindings::default();
        assert_eq!(
            bindings.resolve(EditorMode::Normal, &parse("x")),
            Some(Action::DeleteChar)
        );
        assert_eq!(bindings.resolve(EditorMode::Visual, &parse("x")), Some(Action::Cut));
        assert_eq!(
            bindings.resolve(EditorMode::Insert, &parse("x")),
            Some(Action::InsertChar('x'))
        );
        assert_eq!(bindings.resolve(EditorMode::Normal, &parse("q")), None);
    }

    #[test]
    fn test_configured_keys_apply_per_mode() {
        let bindings = KeyBindings::default();
        assert_eq!(
            bindings.resolve(EditorMode::Insert, &parse("ctrl+z")),
            Some(Action::Undo)
        );
        assert_eq!(bindings.resolve(EditorMode::Visual, &parse("ctrl+z")), None);
        assert_eq!(
            bindings.resolve(EditorMode::Visual, &parse("alt+c")),
            Some(Action::Yank)
        );
        assert_eq!(
            bindings.resolve(EditorMode::Insert, &parse("alt+c")),
            Some(Action::Copy)
        );
        for mode in ALL_MODES {
            assert_eq!(bindings.resolve(mode, &parse("ctrl+a")), Some(Action::SelectAll));
            assert_eq!(
                bindings.resolve(mode, &parse("f5")),
                Some(Action::Host(HostCommand::Execute))
            );
        }
    }

    #[test]
    fn test_user_binding_overrides_builtin() {
        let keymap = KeyMap {
            undo: vec!["x".to_string()],
            ..KeyMap::default()
        };
        let bindings = KeyBindings::new(&keymap);
        assert_eq!(bindings.resolve(EditorMode::Normal, &parse("x")), Some(Action::Undo));
        assert_eq!(bindings.resolve(EditorMode::Normal, &parse("ctrl+z")), None);
    }

    #[test]
    fn test_invalid_binding_is_skipped() {
        let keymap = KeyMap {
            redo: vec!["ctrl+nope".to_string(), "ctrl+y".to_string()],
            ..KeyMap::default()
        };
        let bindings = KeyBindings::new(&keymap);
        assert_eq!(
            bindings.resolve(EditorMode::Insert, &parse("ctrl+y")),
            Some(Action::Redo)
        );
    }

    #[test]
    fn test_shift_arrows_select_in_insert() {
        let bindings = KeyBindings::default();
        assert_eq!(
            bindings.resolve(EditorMode::Insert, &parse("shift+left")),
            Some(Action::Select(Motion::Left))
        );
        assert_eq!(
            bindings.resolve(EditorMode::Visual, &parse("shift+tab")),
            Some(Action::Outdent)
        );
    }

    #[test]
    fn test_key_for_reports_binding() {
        let bindings = KeyBindings::default();
        assert_eq!(
            bindings.key_for(EditorMode::Normal, Action::Host(HostCommand::Quit)),
            Some(parse("ctrl+q"))
        );
    }
}
