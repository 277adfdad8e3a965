use crate::dialogs::keys::{ActionKey, KeyboardDismiss};
use crate::dialogs::settings::DialogDefaults;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Prefix of every environment variable read by [`DialogConfig::load_from_env`]
pub const ENV_PREFIX: &str = "DIALOG_LITE_";

/// Dialog defaults as read from the environment or a JSON file
///
/// Every key is optional; unset keys keep the built-in default.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogConfig {
    /// Class name of the overlay wrapper
    pub overlay_class_name: Option<String>,

    /// ESC cancels the topmost dialog
    pub esc_dismiss: Option<bool>,

    /// Press-and-release on the overlay cancels the dialog
    pub overlay_dismiss: Option<bool>,

    /// Keyboard dismissal policy
    pub keyboard: Option<KeyboardDismiss>,

    /// Cancelled dialogs reject instead of resolving
    pub reject_on_cancel: Option<bool>,

    /// Overlay dismissal gesture window in milliseconds
    pub overlay_gesture_window_ms: Option<u64>,

    /// Close guard deadline in milliseconds
    pub guard_timeout_ms: Option<u64>,
}

impl DialogConfig {
    /// `$XDG_CONFIG_HOME/dialog-lite/config.json` or the platform equivalent
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("dialog-lite").join("config.json"))
    }

    /// Build configuration from the environment and a JSON file
    ///
    /// `path` falls back to [`DialogConfig::default_path`]. File values win
    /// over environment values. A missing file is not an error; a malformed
    /// one is.
    pub async fn init(path: Option<&Path>) -> Result<Self> {
        debug!("Initializing dialog configuration");

        let mut config = Self::default();
        config.load_from_env();

        if let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) {
            let path = path.as_path();
            if path.exists() {
                let file_config = Self::load_from_file(path).await?;
                config.merge_with(file_config);
            } else {
                debug!("Dialog configuration file {} not found", path.display());
            }
        }

        Ok(config)
    }

    /// Load configuration from `DIALOG_LITE_*` environment variables
    pub fn load_from_env(&mut self) {
        self.apply_vars(|name| std::env::var(format!("{ENV_PREFIX}{name}")).ok());
    }

    /// Apply variables by unprefixed name; unparsable values are ignored
    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(class_name) = var("OVERLAY_CLASS_NAME") {
            self.overlay_class_name = Some(class_name);
        }

        if let Some(value) = var("ESC_DISMISS") {
            self.esc_dismiss = Some(parse_flag(&value));
        }

        if let Some(value) = var("OVERLAY_DISMISS") {
            self.overlay_dismiss = Some(parse_flag(&value));
        }

        if let Some(value) = var("KEYBOARD") {
            match parse_keyboard(&value) {
                Some(keyboard) => self.keyboard = Some(keyboard),
                None => debug!("Ignoring invalid {ENV_PREFIX}KEYBOARD value: {}", value),
            }
        }

        if let Some(value) = var("REJECT_ON_CANCEL") {
            self.reject_on_cancel = Some(parse_flag(&value));
        }

        if let Some(value) = var("OVERLAY_GESTURE_WINDOW_MS") {
            if let Ok(ms) = value.trim().parse() {
                self.overlay_gesture_window_ms = Some(ms);
            }
        }

        if let Some(value) = var("GUARD_TIMEOUT_MS") {
            if let Ok(ms) = value.trim().parse() {
                self.guard_timeout_ms = Some(ms);
            }
        }
    }

    /// Load configuration from a JSON file
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        debug!("Loading dialog configuration from: {}", path.display());
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid dialog configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Merge with another configuration; keys set in `other` win
    pub fn merge_with(&mut self, other: Self) {
        if other.overlay_class_name.is_some() {
            self.overlay_class_name = other.overlay_class_name;
        }
        if other.esc_dismiss.is_some() {
            self.esc_dismiss = other.esc_dismiss;
        }
        if other.overlay_dismiss.is_some() {
            self.overlay_dismiss = other.overlay_dismiss;
        }
        if other.keyboard.is_some() {
            self.keyboard = other.keyboard;
        }
        if other.reject_on_cancel.is_some() {
            self.reject_on_cancel = other.reject_on_cancel;
        }
        if other.overlay_gesture_window_ms.is_some() {
            self.overlay_gesture_window_ms = other.overlay_gesture_window_ms;
        }
        if other.guard_timeout_ms.is_some() {
            self.guard_timeout_ms = other.guard_timeout_ms;
        }
    }

    /// Resolve against the built-in defaults
    pub fn into_defaults(self) -> DialogDefaults {
        let base = DialogDefaults::default();
        DialogDefaults {
            host: None,
            overlay_class_name: self.overlay_class_name.unwrap_or(base.overlay_class_name),
            esc_dismiss: self.esc_dismiss.unwrap_or(base.esc_dismiss),
            overlay_dismiss: self.overlay_dismiss.unwrap_or(base.overlay_dismiss),
            keyboard: self.keyboard.unwrap_or(base.keyboard),
            reject_on_cancel: self.reject_on_cancel.unwrap_or(base.reject_on_cancel),
            overlay_gesture_window: self
                .overlay_gesture_window_ms
                .map(Duration::from_millis)
                .unwrap_or(base.overlay_gesture_window),
            guard_timeout: self.guard_timeout_ms.map(Duration::from_millis),
        }
    }
}

impl From<DialogConfig> for DialogDefaults {
    fn from(config: DialogConfig) -> Self {
        config.into_defaults()
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

/// `true`/`false` or a comma separated list of key names
fn parse_keyboard(value: &str) -> Option<KeyboardDismiss> {
    let value = value.trim().to_lowercase();
    match value.as_str() {
        "true" => return Some(KeyboardDismiss::Enabled(true)),
        "false" | "" => return Some(KeyboardDismiss::Enabled(false)),
        _ => {}
    }

    let keys = value
        .split(',')
        .map(|name| match name.trim() {
            "escape" | "esc" => Some(ActionKey::Escape),
            "enter" => Some(ActionKey::Enter),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;

    Some(match keys.as_slice() {
        [key] => KeyboardDismiss::Key(*key),
        _ => KeyboardDismiss::Keys(keys),
    })
}
