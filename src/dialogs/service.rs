//! Dialog service
//!
//! The dialog service is responsible for:
//! - Creating dialogs and mounting them through the renderer
//! - Keeping the stack of open dialogs (last = topmost)
//! - Routing keyboard and pointer events to the topmost dialog
//! - Restoring focus when a dialog closes
//! - Installing the keyboard listener while any dialog is open
//!
//! Keyboard and pointer routing returns as soon as the close request is
//! made. Close guards that suspend keep running as local tasks, so hosts
//! drive the service from inside a `tokio::task::LocalSet`.

use super::controller::DialogController;
use super::keys::{ActionKey, DialogKey};
use super::pointer::PointerEvent;
use super::renderer::Renderer;
use super::settings::{DialogContextSettings, DialogDefaults, DialogSettings};
use super::types::*;
use crate::dom::{Dom, ElementId, KeyHandler, ListenerId};
use crossterm::event::KeyEvent;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::Arc;
use tracing::{debug, warn};

struct StackEntry {
    controller: DialogController,
    /// Element focused right before the dialog opened
    last_active: Option<ElementId>,
}

/// What is left to do after a dialog left the stack
#[derive(Debug)]
pub(crate) struct RemovedEntry {
    restore_focus_to: Option<ElementId>,
}

/// Ordered stack of open dialogs plus its keyboard listener
///
/// Every mutation is synchronous, so no event is ever routed to a
/// half-updated stack.
pub(crate) struct DialogStack {
    this: Weak<DialogStack>,
    dom: Rc<dyn Dom>,
    entries: RefCell<Vec<StackEntry>>,
    listener: Cell<Option<ListenerId>>,
}

impl DialogStack {
    fn new(dom: Rc<dyn Dom>) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            dom,
            entries: RefCell::new(Vec::new()),
            listener: Cell::new(None),
        })
    }

    fn push(&self, controller: DialogController, last_active: Option<ElementId>) {
        debug!("Pushing {} onto the dialog stack", controller);
        self.entries.borrow_mut().push(StackEntry {
            controller,
            last_active,
        });

        if self.listener.get().is_none() {
            let listener = self.dom.add_key_listener(self.key_handler());
            debug!("Installed dialog keyboard listener {:?}", listener);
            self.listener.set(Some(listener));
        }
    }

    /// Listener callback routing key events back into this stack
    fn key_handler(&self) -> KeyHandler {
        let stack = self.this.clone();
        Rc::new(move |event: KeyEvent| {
            let Some(stack) = stack.upgrade() else {
                return;
            };
            if let Err(err) = stack.dispatch_key(&event) {
                warn!("Dialog key handling failed: {}", err);
            }
        })
    }

    /// Take `controller` off the stack; `None` if it is not there
    pub(crate) fn remove(&self, controller: &DialogController) -> Option<RemovedEntry> {
        let (entry, was_top, now_empty) = {
            let mut entries = self.entries.borrow_mut();
            let index = entries.iter().position(|entry| entry.controller == *controller)?;
            let entry = entries.remove(index);
            (entry, index == entries.len(), entries.is_empty())
        };
        debug!("Removed {} from the dialog stack", controller);

        if now_empty {
            if let Some(listener) = self.listener.take() {
                self.dom.remove_key_listener(listener);
                debug!("Removed dialog keyboard listener {:?}", listener);
            }
        }

        // Only the topmost dialog hands focus back
        Some(RemovedEntry {
            restore_focus_to: if was_top { entry.last_active } else { None },
        })
    }

    pub(crate) fn restore_focus(&self, removed: RemovedEntry) {
        let Some(element) = removed.restore_focus_to else {
            return;
        };
        if self.dom.is_connected(element) {
            self.dom.focus(element);
            debug!("Restored focus to {}", element);
        } else {
            debug!("Not restoring focus to detached element {}", element);
        }
    }

    /// Tab keeps focus in the topmost dialog, Escape and Enter close it
    fn dispatch_key(&self, event: &KeyEvent) -> DialogResult<bool> {
        if self.listener.get().is_none() {
            return Ok(false);
        }
        let Some(top) = self.top() else {
            return Ok(false);
        };

        match DialogKey::from_event(event) {
            DialogKey::Tab { shift } => {
                top.retain_focus(shift);
                Ok(true)
            }
            DialogKey::Escape => top.handle_action_key(ActionKey::Escape),
            DialogKey::Enter => top.confirm_on_enter(),
            DialogKey::Other => Ok(false),
        }
    }

    fn top(&self) -> Option<DialogController> {
        self.entries.borrow().last().map(|entry| entry.controller.clone())
    }

    fn controllers(&self) -> Vec<DialogController> {
        self.entries
            .borrow()
            .iter()
            .map(|entry| entry.controller.clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

/// Creates dialogs and manages the stack of open ones
#[derive(Clone)]
pub struct DialogService {
    dom: Rc<dyn Dom>,
    renderer: Rc<dyn Renderer>,
    defaults: DialogDefaults,
    stack: Rc<DialogStack>,
}

impl DialogService {
    /// Create a dialog service with the built-in defaults
    pub fn new(dom: Rc<dyn Dom>, renderer: Rc<dyn Renderer>) -> Self {
        Self::with_defaults(dom, renderer, DialogDefaults::default())
    }

    /// Create a dialog service with host-provided defaults
    pub fn with_defaults(
        dom: Rc<dyn Dom>,
        renderer: Rc<dyn Renderer>,
        defaults: DialogDefaults,
    ) -> Self {
        let stack = DialogStack::new(dom.clone());
        Self {
            dom,
            renderer,
            defaults,
            stack,
        }
    }

    pub fn defaults(&self) -> &DialogDefaults {
        &self.defaults
    }

    /// Open a dialog and return its controller once mounted
    pub async fn create(&self, context: DialogContextSettings) -> DialogResult<DialogController> {
        if !context.has_content() {
            return Err(DialogError::InvalidSettings(
                "You must provide a view model, a view or both".to_string(),
            ));
        }

        let settings = DialogSettings::resolve(&context, &self.defaults, self.dom.body());
        let controller = DialogController::new(
            settings,
            context,
            self.dom.clone(),
            self.renderer.clone(),
            Rc::downgrade(&self.stack),
        );
        debug!("Created {} with overlay {}", controller, controller.overlay());

        if let Err(err) = self.renderer.mount(&controller).await {
            warn!("Failed to mount {}: {}", controller, err);
            let err = DialogError::Mount(Arc::new(err));
            controller.abandon(err.clone());
            return Err(err);
        }

        // Read after mounting: another dialog may have opened meanwhile
        let last_active = self
            .dom
            .active_element()
            .filter(|active| !self.dom.contains(controller.overlay(), *active));
        if let Some(element) = last_active {
            self.dom.blur(element);
        }

        self.stack.push(controller.clone(), last_active);
        controller.mark_open();
        Ok(controller)
    }

    /// Open a dialog and wait for its result
    pub async fn open(&self, context: DialogContextSettings) -> DialogResult<DialogOutput> {
        let controller = self.create(context).await?;
        controller.closed().await
    }

    /// Cancel every open dialog, topmost first
    ///
    /// Each dialog is fully settled before the next one is cancelled. A
    /// dialog whose guard keeps it open is skipped.
    pub async fn cancel_all(&self) {
        for controller in self.stack.controllers().into_iter().rev() {
            match controller.cancel(None).await {
                Ok(CloseAttempt::Vetoed) => {
                    debug!("{} refused to close, leaving it open", controller);
                    continue;
                }
                Err(err) if !controller.outcome().is_settled() => {
                    debug!("{} could not be cancelled: {}", controller, err);
                    continue;
                }
                _ => {}
            }

            let _ = controller.closed().await;
        }
    }

    /// Route a keyboard event to the topmost dialog
    ///
    /// Performs the same routing as the keyboard listener installed on the
    /// element tree, for hosts that deliver events themselves. Returns
    /// whether the event was consumed.
    pub fn handle_key_event(&self, event: KeyEvent) -> DialogResult<bool> {
        self.stack.dispatch_key(&event)
    }

    /// Route a pointer event to the topmost dialog's overlay
    pub fn handle_pointer_event(&self, event: PointerEvent) -> DialogResult<bool> {
        match self.stack.top() {
            Some(top) => top.cancel_on_overlay(&event),
            None => Ok(false),
        }
    }

    /// Open dialogs, bottom to top
    pub fn controllers(&self) -> Vec<DialogController> {
        self.stack.controllers()
    }

    pub fn top(&self) -> Option<DialogController> {
        self.stack.top()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the keyboard listener is installed
    pub fn has_active_dialog(&self) -> bool {
        self.stack.listener.get().is_some()
    }
}
