//! Dialog controller
//!
//! One controller per open dialog. It owns the dialog's overlay element and
//! its outcome, and runs the close negotiation:
//!
//! 1. consult the view-model's `can_deactivate` guard (may veto)
//! 2. take the dialog off the stack
//! 3. run `deactivate`, unmount the view, restore focus
//! 4. settle the outcome
//!
//! A negotiation is shared: every `ok`/`cancel`/`close` issued while one is
//! in flight, or after it finished, observes the same result without
//! repeating any side effect. The controller only keeps a weak handle to an
//! in-flight negotiation; if every caller drops it before it finishes, the
//! next close request starts over.
//!
//! Keyboard and pointer dismissals never wait for the negotiation. A guard
//! may itself open a dialog and wait for the user to answer it, so the event
//! that answers it must not be stuck behind the event that asked.

use super::focus;
use super::keys::ActionKey;
use super::outcome::{Outcome, SettleOnce};
use super::pointer::{OverlayGesture, PointerEvent};
use super::renderer::{Deactivatable, Renderer, ViewModel};
use super::service::DialogStack;
use super::settings::{DialogContextSettings, DialogSettings};
use super::types::*;
use crate::dom::{Dom, ElementId};
use futures::future::{self, FutureExt, LocalBoxFuture, Shared, WeakShared};
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use tracing::{debug, info, warn};

type Negotiation = Shared<LocalBoxFuture<'static, DialogResult<CloseAttempt>>>;

enum Lifecycle {
    PendingMount,
    Open,
    Closing(WeakShared<LocalBoxFuture<'static, DialogResult<CloseAttempt>>>),
    Closed(DialogResult<CloseAttempt>),
}

/// How a close was requested
#[derive(Debug, Clone)]
enum CloseRequest {
    Ok(Option<Value>),
    Cancel(Option<Value>),
    Error(String),
}

impl CloseRequest {
    fn cancel(reason: Option<&str>) -> Self {
        let reason = reason.unwrap_or(DEFAULT_CANCEL_REASON);
        Self::Cancel(Some(Value::String(reason.to_string())))
    }

    fn result(&self) -> CloseResult {
        match self {
            Self::Ok(output) => CloseResult {
                was_cancelled: false,
                output: output.clone(),
            },
            Self::Cancel(output) => CloseResult {
                was_cancelled: true,
                output: output.clone(),
            },
            Self::Error(reason) => CloseResult {
                was_cancelled: true,
                output: Some(Value::String(reason.clone())),
            },
        }
    }
}

fn cancel_reason(output: &Option<Value>) -> String {
    match output {
        Some(Value::String(reason)) => reason.clone(),
        Some(other) => other.to_string(),
        None => DEFAULT_CANCEL_REASON.to_string(),
    }
}

struct ControllerInner {
    id: DialogId,
    settings: DialogSettings,
    overlay: ElementId,
    view_model: Option<Rc<dyn ViewModel>>,
    view: Option<String>,
    model: Option<Value>,
    dom: Rc<dyn Dom>,
    renderer: Rc<dyn Renderer>,
    stack: Weak<DialogStack>,
    lifecycle: RefCell<Lifecycle>,
    outcome: SettleOnce<DialogResult<DialogOutput>>,
    gesture: OverlayGesture,
}

/// Handle to one dialog
///
/// Cloning is cheap; clones refer to the same dialog and compare equal.
#[derive(Clone)]
pub struct DialogController {
    inner: Rc<ControllerInner>,
}

impl DialogController {
    /// Create a controller and its detached overlay element
    pub(crate) fn new(
        settings: DialogSettings,
        context: DialogContextSettings,
        dom: Rc<dyn Dom>,
        renderer: Rc<dyn Renderer>,
        stack: Weak<DialogStack>,
    ) -> Self {
        let overlay = dom.create_element("div");
        dom.set_class_name(overlay, &settings.overlay_class_name);

        Self {
            inner: Rc::new(ControllerInner {
                id: DialogId::new(),
                settings,
                overlay,
                view_model: context.view_model,
                view: context.view,
                model: context.model,
                dom,
                renderer,
                stack,
                lifecycle: RefCell::new(Lifecycle::PendingMount),
                outcome: SettleOnce::new(),
                gesture: OverlayGesture::new(),
            }),
        }
    }

    pub fn id(&self) -> DialogId {
        self.inner.id
    }

    pub fn settings(&self) -> &DialogSettings {
        &self.inner.settings
    }

    /// Element the dialog view is mounted into
    pub fn overlay(&self) -> ElementId {
        self.inner.overlay
    }

    pub fn view_model(&self) -> Option<&Rc<dyn ViewModel>> {
        self.inner.view_model.as_ref()
    }

    pub fn view(&self) -> Option<&str> {
        self.inner.view.as_deref()
    }

    pub fn model(&self) -> Option<&Value> {
        self.inner.model.as_ref()
    }

    pub fn state(&self) -> DialogState {
        match &*self.inner.lifecycle.borrow() {
            Lifecycle::PendingMount => DialogState::PendingMount,
            Lifecycle::Open => DialogState::Open,
            Lifecycle::Closing(_) => DialogState::Closing,
            Lifecycle::Closed(_) => DialogState::Closed,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state() == DialogState::Closed
    }

    /// Awaitable view of the dialog's final result
    pub fn outcome(&self) -> Outcome<DialogResult<DialogOutput>> {
        self.inner.outcome.outcome()
    }

    /// Wait for the dialog's final result
    pub async fn closed(&self) -> DialogResult<DialogOutput> {
        self.outcome().wait().await.unwrap_or_else(|| {
            Err(DialogError::Failed(format!(
                "{} was dropped before it settled",
                self.inner.id
            )))
        })
    }

    /// Close the dialog successfully with an optional output
    pub async fn ok(&self, output: Option<Value>) -> DialogResult<CloseAttempt> {
        self.close(true, output).await
    }

    /// Cancel the dialog; the reason defaults to `"cancelled"`
    pub async fn cancel(&self, reason: Option<&str>) -> DialogResult<CloseAttempt> {
        self.begin(CloseRequest::cancel(reason))?.await
    }

    /// Negotiate a close
    ///
    /// Returns `CloseAttempt::Vetoed` if the view-model's guard declined, in
    /// which case the dialog stays open and its outcome is untouched. Guard
    /// failures are returned here and never reach the outcome.
    pub async fn close(&self, ok: bool, output: Option<Value>) -> DialogResult<CloseAttempt> {
        let request = if ok {
            CloseRequest::Ok(output)
        } else {
            CloseRequest::Cancel(output)
        };
        self.begin(request)?.await
    }

    /// Close without consulting the guard; the outcome always rejects
    pub async fn error(&self, reason: impl Into<String>) -> DialogResult<CloseAttempt> {
        self.begin(CloseRequest::Error(reason.into()))?.await
    }

    /// Feed a pointer event to the overlay dismissal gesture
    ///
    /// Starts a cancel when overlay dismissal is enabled and both press and
    /// release hit the overlay element itself. Returns whether a cancel was
    /// requested; await [`DialogController::closed`] for the result.
    pub fn cancel_on_overlay(&self, event: &PointerEvent) -> DialogResult<bool> {
        if !self.inner.settings.overlay_dismiss {
            return Ok(false);
        }

        let dismissed = self.inner.gesture.observe(
            event,
            self.inner.overlay,
            self.inner.settings.overlay_gesture_window,
        );
        if !dismissed {
            return Ok(false);
        }

        debug!("Overlay dismissal gesture on {}", self.inner.id);
        self.close_detached(CloseRequest::cancel(None))?;
        Ok(true)
    }

    /// Keep Tab navigation inside the dialog
    pub fn retain_focus(&self, shift: bool) -> Option<ElementId> {
        focus::cycle_focus(self.inner.dom.as_ref(), self.inner.overlay, shift)
    }

    /// Whether ESC or the keyboard policy lets `key` close this dialog
    pub fn accepts_key(&self, key: ActionKey) -> bool {
        let settings = &self.inner.settings;
        match key {
            ActionKey::Escape => settings.esc_dismiss || settings.keyboard.allows(key),
            ActionKey::Enter => settings.keyboard.allows(key),
        }
    }

    /// Escape cancels, Enter confirms, if the settings allow it
    ///
    /// Returns once the close is requested; a close guard may still be
    /// deciding when this returns.
    pub fn handle_action_key(&self, key: ActionKey) -> DialogResult<bool> {
        if !self.accepts_key(key) {
            return Ok(false);
        }

        debug!("{} key closes {}", key.as_str(), self.inner.id);
        let request = match key {
            ActionKey::Escape => CloseRequest::cancel(None),
            ActionKey::Enter => CloseRequest::Ok(None),
        };
        self.close_detached(request)?;
        Ok(true)
    }

    /// Enter confirms the dialog when its keyboard policy includes Enter
    pub fn confirm_on_enter(&self) -> DialogResult<bool> {
        self.handle_action_key(ActionKey::Enter)
    }

    pub(crate) fn mark_open(&self) {
        let mut lifecycle = self.inner.lifecycle.borrow_mut();
        if matches!(*lifecycle, Lifecycle::PendingMount) {
            *lifecycle = Lifecycle::Open;
        }
    }

    /// Settle a controller that never made it onto the stack
    pub(crate) fn abandon(&self, error: DialogError) {
        self.inner.dom.release_element(self.inner.overlay);
        self.inner.outcome.complete(Err(error));
    }

    /// Start a close without waiting for it
    ///
    /// The negotiation is polled once. If it suspends, it keeps running as a
    /// local task, so the caller must be inside a `tokio::task::LocalSet`.
    /// Errors the first poll produces are returned; later ones are logged.
    fn close_detached(&self, request: CloseRequest) -> DialogResult<()> {
        let mut negotiation = self.begin(request)?;
        if let Some(attempt) = (&mut negotiation).now_or_never() {
            return attempt.map(|_| ());
        }

        let id = self.inner.id;
        debug!("Close of {} is waiting on its guard", id);
        tokio::task::spawn_local(async move {
            if let Err(err) = negotiation.await {
                warn!("Close of {} failed: {}", id, err);
            }
        });
        Ok(())
    }

    /// Start a negotiation, or join the one already started
    fn begin(&self, request: CloseRequest) -> DialogResult<Negotiation> {
        let mut lifecycle = self.inner.lifecycle.borrow_mut();
        match &*lifecycle {
            Lifecycle::PendingMount => return Err(DialogError::NotOpen(self.inner.id)),
            Lifecycle::Closed(attempt) => {
                return Ok(future::ready(attempt.clone()).boxed_local().shared());
            }
            Lifecycle::Closing(pending) => match pending.upgrade() {
                Some(negotiation) => {
                    debug!("{} is already closing, joining the pending close", self.inner.id);
                    return Ok(negotiation);
                }
                None => debug!("Pending close of {} was dropped, starting over", self.inner.id),
            },
            Lifecycle::Open => {}
        }

        let negotiation = self.clone().negotiate(request).boxed_local().shared();
        if let Some(pending) = negotiation.downgrade() {
            *lifecycle = Lifecycle::Closing(pending);
        }
        Ok(negotiation)
    }

    async fn negotiate(self, request: CloseRequest) -> DialogResult<CloseAttempt> {
        let result = request.result();

        if !matches!(request, CloseRequest::Error(_)) {
            if let Some(guard) = self.guard() {
                match self.ask_guard(guard, &result).await {
                    Ok(true) => {}
                    Ok(false) => {
                        info!("Close of {} vetoed by its view-model", self.inner.id);
                        self.reopen();
                        return Ok(CloseAttempt::Vetoed);
                    }
                    Err(err) => {
                        warn!("Close guard of {} failed: {}", self.inner.id, err);
                        self.reopen();
                        return Err(err);
                    }
                }
            }
        }

        let failure = self.release(&result).await;
        let settled = match (&request, &failure) {
            (_, Some(err)) => Err(err.clone()),
            (CloseRequest::Ok(output), None) => Ok(DialogOutput::ok(output.clone())),
            (CloseRequest::Cancel(output), None) if self.inner.settings.reject_on_cancel => {
                Err(DialogError::Cancelled(cancel_reason(output)))
            }
            (CloseRequest::Cancel(output), None) => {
                Ok(DialogOutput::cancelled(cancel_reason(output)))
            }
            (CloseRequest::Error(reason), None) => Err(DialogError::Failed(reason.clone())),
        };

        match &settled {
            Ok(output) if output.was_cancelled => info!("{} cancelled", self.inner.id),
            Ok(_) => info!("{} closed", self.inner.id),
            Err(err) => info!("{} closed with error: {}", self.inner.id, err),
        }
        self.inner.outcome.complete(settled);

        let attempt = match failure {
            Some(err) => Err(err),
            None => Ok(CloseAttempt::Closed),
        };
        *self.inner.lifecycle.borrow_mut() = Lifecycle::Closed(attempt.clone());
        attempt
    }

    fn guard(&self) -> Option<&dyn Deactivatable> {
        self.inner.view_model.as_ref().and_then(|vm| vm.deactivatable())
    }

    async fn ask_guard(&self, guard: &dyn Deactivatable, result: &CloseResult) -> DialogResult<bool> {
        let verdict = match self.inner.settings.guard_timeout {
            Some(limit) => tokio::time::timeout(limit, guard.can_deactivate(result))
                .await
                .map_err(|_| DialogError::GuardTimeout(limit))?,
            None => guard.can_deactivate(result).await,
        };
        verdict.map_err(|err| DialogError::GuardFailed(Arc::new(err)))
    }

    /// Take the dialog off the stack and release its view
    ///
    /// Every step runs even if an earlier one failed; the first failure is
    /// returned.
    async fn release(&self, result: &CloseResult) -> Option<DialogError> {
        let removed = self.inner.stack.upgrade().and_then(|stack| {
            stack.remove(self).map(|removed| (stack, removed))
        });

        let mut failure = None;
        if let Some(guard) = self.guard() {
            if let Err(err) = guard.deactivate(result).await {
                warn!("Deactivation of {} failed: {}", self.inner.id, err);
                failure = Some(err);
            }
        }

        if let Err(err) = self.inner.renderer.unmount(self).await {
            warn!("Unmounting {} failed: {}", self.inner.id, err);
            failure.get_or_insert(err);
        }
        self.inner.gesture.reset();
        self.inner.dom.release_element(self.inner.overlay);

        if let Some((stack, removed)) = removed {
            stack.restore_focus(removed);
        }

        failure.map(|err| DialogError::Release(Arc::new(err)))
    }

    fn reopen(&self) {
        *self.inner.lifecycle.borrow_mut() = Lifecycle::Open;
    }
}

impl PartialEq for DialogController {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for DialogController {}

impl fmt::Debug for DialogController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogController")
            .field("id", &self.inner.id)
            .field("overlay", &self.inner.overlay)
            .field("state", &self.state())
            .field("settings", &self.inner.settings)
            .finish()
    }
}

impl fmt::Display for DialogController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.id)
    }
}
