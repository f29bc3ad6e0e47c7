/*!
 * Key bindings
 *
 * `KeyMap` is the user-editable table (stored in the config file) mapping
 * logical actions to key strings such as `ctrl+z` or `shift+f3`.
 * `Keystroke` is the normalized form both those strings and terminal key
 * events are converted to before lookup.
 */

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeymapError {
    #[error("empty key binding")]
    Empty,
    #[error("unknown modifier '{0}' in key binding")]
    UnknownModifier(String),
    #[error("unknown key '{0}' in key binding")]
    UnknownKey(String),
}

/// A single key press with its modifiers, normalized for comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Keystroke {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl Keystroke {
    /// Build a keystroke, normalizing the shapes terminals disagree on.
    ///
    /// `BackTab` becomes `shift+tab`. A plain character carries its shift
    /// state in the character itself, so SHIFT is dropped; with ctrl/alt an
    /// upper-case letter is lowered and SHIFT recorded instead.
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        let mut code = code;
        let mut modifiers = modifiers;

        match code {
            KeyCode::BackTab => {
                code = KeyCode::Tab;
                modifiers |= KeyModifiers::SHIFT;
            }
            KeyCode::Char(c) => {
                if modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
                    if c.is_uppercase() {
                        code = KeyCode::Char(c.to_ascii_lowercase());
                        modifiers |= KeyModifiers::SHIFT;
                    }
                } else {
                    modifiers.remove(KeyModifiers::SHIFT);
                }
            }
            _ => {}
        }

        Self { code, modifiers }
    }

    pub fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    /// The character typed by this keystroke, if it inserts text
    pub fn typed_char(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(c)
                if !self
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                Some(c)
            }
            _ => None,
        }
    }

    pub fn is(&self, code: KeyCode) -> bool {
        self.code == code && self.modifiers.is_empty()
    }
}

impl From<KeyEvent> for Keystroke {
    fn from(event: KeyEvent) -> Self {
        Self::new(event.code, event.modifiers)
    }
}

impl FromStr for Keystroke {
    type Err = KeymapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(KeymapError::Empty);
        }

        // The key itself is everything after the last '+', except a bare "+"
        let (mods, key) = match s.rfind('+') {
            Some(idx) if idx + 1 < s.len() => (&s[..idx], &s[idx + 1..]),
            _ => ("", s),
        };

        let mut modifiers = KeyModifiers::NONE;
        for part in mods.split('+').filter(|p| !p.is_empty()) {
            modifiers |= match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => KeyModifiers::CONTROL,
                "shift" => KeyModifiers::SHIFT,
                "alt" | "option" | "meta" => KeyModifiers::ALT,
                "super" | "cmd" => KeyModifiers::SUPER,
                other => return Err(KeymapError::UnknownModifier(other.to_string())),
            };
        }

        Ok(Self::new(parse_key_code(key)?, modifiers))
    }
}

fn parse_key_code(key: &str) -> Result<KeyCode, KeymapError> {
    let mut chars = key.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Ok(KeyCode::Char(c));
    }

    let lower = key.to_ascii_lowercase();
    let code = match lower.as_str() {
        "esc" | "escape" => KeyCode::Esc,
        "enter" | "return" => KeyCode::Enter,
        "tab" => KeyCode::Tab,
        "backtab" => KeyCode::BackTab,
        "backspace" => KeyCode::Backspace,
        "delete" | "del" => KeyCode::Delete,
        "insert" => KeyCode::Insert,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "space" => KeyCode::Char(' '),
        _ => {
            let number = lower
                .strip_prefix('f')
                .and_then(|n| n.parse::<u8>().ok())
                .filter(|n| (1..=24).contains(n));
            match number {
                Some(n) => KeyCode::F(n),
                None => return Err(KeymapError::UnknownKey(key.to_string())),
            }
        }
    };
    Ok(code)
}

impl fmt::Display for Keystroke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, name) in [
            (KeyModifiers::CONTROL, "ctrl+"),
            (KeyModifiers::SHIFT, "shift+"),
            (KeyModifiers::ALT, "alt+"),
            (KeyModifiers::SUPER, "super+"),
        ] {
            if self.modifiers.contains(flag) {
                f.write_str(name)?;
            }
        }
        match self.code {
            KeyCode::Char(' ') => f.write_str("space"),
            KeyCode::Char(c) => write!(f, "{}", c),
            KeyCode::F(n) => write!(f, "f{}", n),
            KeyCode::Esc => f.write_str("esc"),
            KeyCode::Enter => f.write_str("enter"),
            KeyCode::Tab => f.write_str("tab"),
            KeyCode::Backspace => f.write_str("backspace"),
            KeyCode::Delete => f.write_str("delete"),
            KeyCode::Up => f.write_str("up"),
            KeyCode::Down => f.write_str("down"),
            KeyCode::Left => f.write_str("left"),
            KeyCode::Right => f.write_str("right"),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Configurable bindings for the actions users commonly remap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyMap {
    pub undo: Vec<String>,
    pub redo: Vec<String>,
    pub copy: Vec<String>,
    pub paste: Vec<String>,
    pub cut: Vec<String>,
    /// Delete the word before the cursor
    pub word: Vec<String>,
    pub select_all: Vec<String>,
    pub execute_selection: Vec<String>,
    pub ai_prompt: Vec<String>,
    pub find: Vec<String>,
    pub replace: Vec<String>,
    pub find_next: Vec<String>,
    pub find_prev: Vec<String>,
    pub goto_line: Vec<String>,
    pub accept_completion: Vec<String>,
    pub quit: Vec<String>,
}

fn keys(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for KeyMap {
    fn default() -> Self {
        let mut keymap = Self {
            undo: keys(&["ctrl+z"]),
            redo: keys(&["ctrl+y"]),
            copy: keys(&["alt+c"]),
            paste: keys(&["alt+v"]),
            cut: keys(&["alt+x"]),
            word: keys(&["ctrl+w", "alt+backspace"]),
            select_all: keys(&["ctrl+a"]),
            execute_selection: keys(&["ctrl+shift+e", "f5"]),
            ai_prompt: keys(&["ctrl+shift+k", "f6"]),
            find: keys(&["ctrl+f"]),
            replace: keys(&["ctrl+h"]),
            find_next: keys(&["f3"]),
            find_prev: keys(&["shift+f3"]),
            goto_line: keys(&["ctrl+g"]),
            accept_completion: keys(&["ctrl+space"]),
            quit: keys(&["ctrl+q"]),
        };

        // macOS terminals keep ctrl+c/v/x for the shell; elsewhere offer the usual chords too
        if !cfg!(target_os = "macos") {
            keymap.copy.push("ctrl+c".to_string());
            keymap.paste.push("ctrl+v".to_string());
            keymap.cut.push("ctrl+x".to_string());
        }

        keymap
    }
}
