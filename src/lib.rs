//! Lightweight modal dialogs over a host element tree
//!
//! ```no_run
//! use dialog_lite::{DialogContextSettings, DialogService, DomRenderer, MemoryDom};
//! use std::rc::Rc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let dom = Rc::new(MemoryDom::new());
//! let service = DialogService::new(dom.clone(), Rc::new(DomRenderer::new(dom)));
//!
//! let dialog = service
//!     .create(DialogContextSettings::new().with_view("confirm").esc_dismiss(true))
//!     .await?;
//! dialog.ok(None).await?;
//! let output = dialog.closed().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dialogs;
pub mod dom;

pub use config::DialogConfig;
pub use dialogs::{
    ActionKey, CloseAttempt, DialogContextSettings, DialogController, DialogDefaults,
    DialogError, DialogOutput, DialogResult, DialogService, DomRenderer, KeyboardDismiss,
    PointerEvent, Renderer, ViewModel,
};
pub use dom::{Dom, ElementId, MemoryDom};

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a stderr `tracing` subscriber filtered by `RUST_LOG`
///
/// Defaults to `dialog_lite=info`. Fails if a global subscriber is already
/// set.
pub fn init_logging() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dialog_lite=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    Ok(())
}
