//! Keyboard policy for dialogs
//!
//! Maps raw key events onto the few keys the dialog stack cares about and
//! evaluates a dialog's keyboard dismissal policy.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use serde::{Deserialize, Serialize};

/// Keys that can close the topmost dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKey {
    /// Cancels the dialog
    Escape,
    /// Confirms the dialog with an empty output
    Enter,
}

impl ActionKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Escape => "Escape",
            Self::Enter => "Enter",
        }
    }
}

/// Keyboard dismissal policy
///
/// Deserializes from `true`/`false`, a single key name or a list of key
/// names, e.g. `"Enter"` or `["Enter", "Escape"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyboardDismiss {
    /// `true` enables Escape only
    Enabled(bool),
    Key(ActionKey),
    Keys(Vec<ActionKey>),
}

impl KeyboardDismiss {
    /// Whether the policy reacts to `key`
    pub fn allows(&self, key: ActionKey) -> bool {
        match self {
            Self::Enabled(enabled) => *enabled && key == ActionKey::Escape,
            Self::Key(allowed) => *allowed == key,
            Self::Keys(allowed) => allowed.contains(&key),
        }
    }
}

impl Default for KeyboardDismiss {
    fn default() -> Self {
        Self::Enabled(false)
    }
}

impl From<bool> for KeyboardDismiss {
    fn from(enabled: bool) -> Self {
        Self::Enabled(enabled)
    }
}

impl From<ActionKey> for KeyboardDismiss {
    fn from(key: ActionKey) -> Self {
        Self::Key(key)
    }
}

impl From<Vec<ActionKey>> for KeyboardDismiss {
    fn from(keys: Vec<ActionKey>) -> Self {
        Self::Keys(keys)
    }
}

/// Key events as seen by the dialog stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKey {
    Tab { shift: bool },
    Escape,
    Enter,
    Other,
}

impl DialogKey {
    pub fn from_event(event: &KeyEvent) -> Self {
        if event.kind == KeyEventKind::Release {
            return Self::Other;
        }

        match event.code {
            KeyCode::Tab => Self::Tab {
                shift: event.modifiers.contains(KeyModifiers::SHIFT),
            },
            KeyCode::BackTab => Self::Tab { shift: true },
            KeyCode::Esc => Self::Escape,
            KeyCode::Enter => Self::Enter,
            _ => Self::Other,
        }
    }
}
