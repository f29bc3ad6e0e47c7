//! Clipboard access for copy, cut and paste.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(#[from] arboard::Error),
}

/// Read/write access to a whole-text clipboard
pub trait Clipboard: Send {
    fn get_text(&mut self) -> Result<String, ClipboardError>;
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// The operating system clipboard.
///
/// A fresh `arboard` handle is opened per operation so a clipboard that
/// becomes unavailable later is reported on use rather than at startup.
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn get_text(&mut self) -> Result<String, ClipboardError> {
        let mut clipboard = arboard::Clipboard::new()?;
        Ok(clipboard.get_text()?)
    }

    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard = arboard::Clipboard::new()?;
        clipboard.set_text(text.to_owned())?;
        Ok(())
    }
}

/// Process-local clipboard, used when no system clipboard is reachable
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    contents: String,
}

impl MemoryClipboard {
    #[cfg(test)]
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            contents: text.into(),
        }
    }
}

impl Clipboard for MemoryClipboard {
    fn get_text(&mut self) -> Result<String, ClipboardError> {
        Ok(self.contents.clone())
    }

    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.contents = text.to_owned();
        Ok(())
    }
}

/// The system clipboard when one can be opened, otherwise an in-memory one
pub fn detect() -> Box<dyn Clipboard> {
    match arboard::Clipboard::new() {
        Ok(_) => Box::new(SystemClipboard),
        Err(e) => {
            tracing::warn!("System clipboard unavailable, using in-memory clipboard: {}", e);
            Box::new(MemoryClipboard::default())
        }
    }
}
