//! Core dialog types
//!
//! Identifiers, close results, lifecycle states and the error taxonomy shared
//! by the controller and the dialog service.

use crate::dom::DomError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Cancellation reason used when none is given
pub const DEFAULT_CANCEL_REASON: &str = "cancelled";

/// Unique identifier for dialog instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DialogId(pub Uuid);

impl DialogId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DialogId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DialogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dialog-{}", self.0.simple())
    }
}

/// Value a dialog's outcome resolves to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogOutput {
    /// Set when the dialog was cancelled with `reject_on_cancel` disabled
    pub was_cancelled: bool,
    /// Value passed to `ok`, or the cancel reason for cancelled dialogs
    pub output: Option<Value>,
}

impl DialogOutput {
    pub fn ok(output: Option<Value>) -> Self {
        Self {
            was_cancelled: false,
            output,
        }
    }

    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self {
            was_cancelled: true,
            output: Some(Value::String(reason.into())),
        }
    }
}

/// What the guard and deactivation hooks are told about a pending close
#[derive(Debug, Clone, PartialEq)]
pub struct CloseResult {
    pub was_cancelled: bool,
    pub output: Option<Value>,
}

/// Result of one close negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAttempt {
    /// The dialog closed and its outcome settled
    Closed,
    /// The guard hook declined; the dialog stays open
    Vetoed,
}

/// Dialog lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    /// Constructed, waiting for the renderer
    PendingMount,
    /// Mounted and on the stack
    Open,
    /// A close negotiation is in flight
    Closing,
    /// Released and settled
    Closed,
}

impl Default for DialogState {
    fn default() -> Self {
        Self::PendingMount
    }
}

/// Result type for dialog operations
pub type DialogResult<T> = std::result::Result<T, DialogError>;

/// Dialog-specific error types
///
/// Wrapped causes sit behind an `Arc` so a single failure can be observed by
/// every waiter of a shared close negotiation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DialogError {
    #[error("Invalid dialog context settings: {0}")]
    InvalidSettings(String),

    #[error("Dialog failed to mount: {0}")]
    Mount(Arc<anyhow::Error>),

    #[error("Dialog '{0}' is not open yet")]
    NotOpen(DialogId),

    /// The dialog was dismissed; the message is the cancel reason
    #[error("{0}")]
    Cancelled(String),

    #[error("Dialog close guard failed: {0}")]
    GuardFailed(Arc<anyhow::Error>),

    #[error("Dialog close guard did not answer within {0:?}")]
    GuardTimeout(Duration),

    #[error("Dialog failed to release its resources: {0}")]
    Release(Arc<anyhow::Error>),

    #[error("{0}")]
    Failed(String),

    #[error("Dialog element tree error: {0}")]
    Dom(#[from] DomError),
}

impl DialogError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dialog_id_serializes_as_uuid() {
        let id = DialogId::new();
        let encoded = serde_json::to_value(id).unwrap();
        assert_eq!(encoded, json!(id.0.to_string()));

        let decoded: DialogId = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, id);
    }

    #[test]
    fn test_cancelled_message_is_reason() {
        let err = DialogError::Cancelled("closed by user".to_string());
        assert_eq!(err.to_string(), "closed by user");
        assert!(err.is_cancellation());
        assert!(!DialogError::Failed("boom".into()).is_cancellation());
    }

    #[test]
    fn test_release_error_wraps_cause() {
        let err = DialogError::Release(Arc::new(anyhow::anyhow!("unmount exploded")));
        assert_eq!(
            err.to_string(),
            "Dialog failed to release its resources: unmount exploded"
        );
    }

    #[test]
    fn test_output_constructors() {
        assert_eq!(
            DialogOutput::ok(Some(json!({"a": 1}))),
            DialogOutput { was_cancelled: false, output: Some(json!({"a": 1})) }
        );
        assert_eq!(
            DialogOutput::cancelled("nope"),
            DialogOutput { was_cancelled: true, output: Some(json!("nope")) }
        );
    }

    #[test]
    fn test_dom_errors_convert() {
        use crate::dom::ElementId;

        let err: DialogError = DomError::UnknownElement(ElementId(3)).into();
        assert!(matches!(err, DialogError::Dom(DomError::UnknownElement(ElementId(3)))));
        assert_eq!(err.to_string(), "Dialog element tree error: Element #3 does not exist");
    }

    #[test]
    fn test_dialog_ids_are_unique() {
        let a = DialogId::new();
        let b = DialogId::new();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("dialog-"));
    }
}
