//! Dialog settings
//!
//! Three shapes of the same configuration:
//! - [`DialogDefaults`]: process-wide defaults a host sets once at startup
//! - [`DialogContextSettings`]: what a caller passes to `create`/`open`,
//!   every key optional, plus the view/view-model/model triple
//! - [`DialogSettings`]: the resolved, immutable settings of one dialog

use super::keys::KeyboardDismiss;
use super::pointer::DEFAULT_GESTURE_WINDOW;
use super::renderer::ViewModel;
use crate::dom::ElementId;
use serde_json::Value;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Overlay class used when none is configured
pub const DEFAULT_OVERLAY_CLASS_NAME: &str = "dialog-lite-overlay";

/// Process-wide dialog defaults
#[derive(Debug, Clone, PartialEq)]
pub struct DialogDefaults {
    /// Element dialogs attach to; `None` means the document body
    pub host: Option<ElementId>,
    pub overlay_class_name: String,
    pub esc_dismiss: bool,
    pub overlay_dismiss: bool,
    pub keyboard: KeyboardDismiss,
    pub reject_on_cancel: bool,
    pub overlay_gesture_window: Duration,
    pub guard_timeout: Option<Duration>,
}

impl Default for DialogDefaults {
    fn default() -> Self {
        Self {
            host: None,
            overlay_class_name: DEFAULT_OVERLAY_CLASS_NAME.to_string(),
            esc_dismiss: false,
            overlay_dismiss: false,
            keyboard: KeyboardDismiss::default(),
            reject_on_cancel: true,
            overlay_gesture_window: DEFAULT_GESTURE_WINDOW,
            guard_timeout: None,
        }
    }
}

/// Resolved settings of one dialog
#[derive(Debug, Clone, PartialEq)]
pub struct DialogSettings {
    /// Element the overlay is attached to
    pub host: ElementId,
    /// Class name of the overlay wrapper
    pub overlay_class_name: String,
    /// ESC cancels the topmost dialog
    pub esc_dismiss: bool,
    /// A press-and-release on the overlay cancels the dialog
    pub overlay_dismiss: bool,
    /// Finer-grained keyboard policy (Escape cancels, Enter confirms)
    pub keyboard: KeyboardDismiss,
    /// Cancelled outcomes are errors instead of flagged outputs
    pub reject_on_cancel: bool,
    /// Maximum time between press and release of a dismiss gesture
    pub overlay_gesture_window: Duration,
    /// Deadline for the `can_deactivate` guard
    pub guard_timeout: Option<Duration>,
}

impl DialogSettings {
    /// Merge per-call overrides over the defaults, key by key
    pub fn resolve(
        overrides: &DialogContextSettings,
        defaults: &DialogDefaults,
        body: ElementId,
    ) -> Self {
        Self {
            host: overrides.host.or(defaults.host).unwrap_or(body),
            overlay_class_name: overrides
                .overlay_class_name
                .clone()
                .unwrap_or_else(|| defaults.overlay_class_name.clone()),
            esc_dismiss: overrides.esc_dismiss.unwrap_or(defaults.esc_dismiss),
            overlay_dismiss: overrides.overlay_dismiss.unwrap_or(defaults.overlay_dismiss),
            keyboard: overrides
                .keyboard
                .clone()
                .unwrap_or_else(|| defaults.keyboard.clone()),
            reject_on_cancel: overrides.reject_on_cancel.unwrap_or(defaults.reject_on_cancel),
            overlay_gesture_window: overrides
                .overlay_gesture_window
                .unwrap_or(defaults.overlay_gesture_window),
            guard_timeout: overrides.guard_timeout.or(defaults.guard_timeout),
        }
    }
}

/// Per-call dialog settings
#[derive(Clone, Default)]
pub struct DialogContextSettings {
    /// View-model hosted by the dialog
    pub view_model: Option<Rc<dyn ViewModel>>,
    /// View reference handed to the renderer
    pub view: Option<String>,
    /// Data passed to the view-model's `activate` hook
    pub model: Option<Value>,

    pub host: Option<ElementId>,
    pub overlay_class_name: Option<String>,
    pub esc_dismiss: Option<bool>,
    pub overlay_dismiss: Option<bool>,
    pub keyboard: Option<KeyboardDismiss>,
    pub reject_on_cancel: Option<bool>,
    pub overlay_gesture_window: Option<Duration>,
    pub guard_timeout: Option<Duration>,
}

impl DialogContextSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_view_model(mut self, view_model: Rc<dyn ViewModel>) -> Self {
        self.view_model = Some(view_model);
        self
    }

    pub fn with_view(mut self, view: impl Into<String>) -> Self {
        self.view = Some(view.into());
        self
    }

    pub fn with_model(mut self, model: Value) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_host(mut self, host: ElementId) -> Self {
        self.host = Some(host);
        self
    }

    pub fn with_overlay_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.overlay_class_name = Some(class_name.into());
        self
    }

    pub fn esc_dismiss(mut self, enabled: bool) -> Self {
        self.esc_dismiss = Some(enabled);
        self
    }

    pub fn overlay_dismiss(mut self, enabled: bool) -> Self {
        self.overlay_dismiss = Some(enabled);
        self
    }

    pub fn with_keyboard(mut self, keyboard: impl Into<KeyboardDismiss>) -> Self {
        self.keyboard = Some(keyboard.into());
        self
    }

    pub fn reject_on_cancel(mut self, reject: bool) -> Self {
        self.reject_on_cancel = Some(reject);
        self
    }

    pub fn with_overlay_gesture_window(mut self, window: Duration) -> Self {
        self.overlay_gesture_window = Some(window);
        self
    }

    pub fn with_guard_timeout(mut self, timeout: Duration) -> Self {
        self.guard_timeout = Some(timeout);
        self
    }

    /// A dialog needs something to render
    pub fn has_content(&self) -> bool {
        self.view_model.is_some() || self.view.is_some()
    }
}

impl fmt::Debug for DialogContextSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogContextSettings")
            .field("view_model", &self.view_model.as_ref().map(|_| "<view-model>"))
            .field("view", &self.view)
            .field("model", &self.model)
            .field("host", &self.host)
            .field("overlay_class_name", &self.overlay_class_name)
            .field("esc_dismiss", &self.esc_dismiss)
            .field("overlay_dismiss", &self.overlay_dismiss)
            .field("keyboard", &self.keyboard)
            .field("reject_on_cancel", &self.reject_on_cancel)
            .field("overlay_gesture_window", &self.overlay_gesture_window)
            .field("guard_timeout", &self.guard_timeout)
            .finish()
    }
}
