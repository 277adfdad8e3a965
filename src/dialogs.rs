//! Modal dialog stack
//!
//! Dialogs are opened through [`DialogService`], which mounts each one via a
//! [`Renderer`], keeps the stack of open dialogs and routes keyboard and
//! pointer events to the topmost one. Each open dialog is driven through its
//! [`DialogController`].

pub mod controller;
pub mod focus;
pub mod keys;
pub mod outcome;
pub mod pointer;
pub mod renderer;
pub mod service;
pub mod settings;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::DialogController;
pub use keys::{ActionKey, DialogKey, KeyboardDismiss};
pub use outcome::Outcome;
pub use pointer::{PointerEvent, PointerKind};
pub use renderer::{Deactivatable, DomRenderer, Renderer, ViewModel};
pub use service::DialogService;
pub use settings::{DialogContextSettings, DialogDefaults, DialogSettings};
pub use types::*;
