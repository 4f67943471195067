use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Single text input used by the forms. Editing happens at the end of the
/// value; there is no cursor movement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextField {
    pub value: String,
    /// Render as bullets (passwords).
    pub masked: bool,
    /// Accepts Ctrl+J as a newline.
    pub multiline: bool,
}

impl TextField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn masked() -> Self {
        Self {
            masked: true,
            ..Self::default()
        }
    }

    pub fn multiline() -> Self {
        Self {
            multiline: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    pub fn clear(&mut self) {
        self.value.clear();
    }

    /// Applies an editing key. Returns `true` if the key was consumed.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('j') if ctrl && self.multiline => {
                self.value.push('\n');
                true
            }
            KeyCode::Char('u') if ctrl => {
                self.value.clear();
                true
            }
            KeyCode::Char(c) if !ctrl => {
                self.value.push(c);
                true
            }
            KeyCode::Backspace => {
                self.value.pop();
                true
            }
            _ => false,
        }
    }

    /// Text to draw for this field.
    pub fn display(&self) -> String {
        if self.masked {
            "•".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }

    /// Pastes text, dropping newlines unless the field is multiline.
    pub fn paste(&mut self, text: &str) {
        if self.multiline {
            self.value.push_str(&text.replace("\r\n", "\n"));
        } else {
            self.value
                .extend(text.chars().filter(|c| !matches!(c, '\n' | '\r')));
        }
    }
}
