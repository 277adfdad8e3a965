//! Test doubles for the dialog service

use super::controller::DialogController;
use super::keys::ActionKey;
use super::renderer::{Deactivatable, DomRenderer, Renderer, ViewModel};
use super::service::DialogService;
use super::settings::DialogContextSettings;
use super::types::{CloseAttempt, CloseResult, DialogResult};
use crate::dom::{Dom, ElementId, MemoryDom};
use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// Element tree, recording renderer and a service wired to both
pub fn setup() -> (Rc<MemoryDom>, Rc<RecordingRenderer>, DialogService) {
    let dom = Rc::new(MemoryDom::new());
    let renderer = Rc::new(RecordingRenderer::new(dom.clone()));
    let service = DialogService::new(dom.clone(), renderer.clone());
    (dom, renderer, service)
}

pub fn context(view_model: &TestViewModel) -> DialogContextSettings {
    DialogContextSettings::new().with_view_model(Rc::new(view_model.clone()))
}

pub fn view_only(view: impl Into<String>) -> DialogContextSettings {
    DialogContextSettings::new().with_view(view)
}

/// Renderer counting mounts and unmounts, with failure injection
pub struct RecordingRenderer {
    inner: DomRenderer,
    mounts: Cell<usize>,
    unmounts: Cell<usize>,
    fail_mount: Cell<bool>,
    fail_unmount: Cell<bool>,
    close_during_mount: Cell<bool>,
    early_close: RefCell<Option<DialogResult<CloseAttempt>>>,
    last: RefCell<Option<DialogController>>,
}

impl RecordingRenderer {
    pub fn new(dom: Rc<dyn Dom>) -> Self {
        Self {
            inner: DomRenderer::new(dom),
            mounts: Cell::new(0),
            unmounts: Cell::new(0),
            fail_mount: Cell::new(false),
            fail_unmount: Cell::new(false),
            close_during_mount: Cell::new(false),
            early_close: RefCell::new(None),
            last: RefCell::new(None),
        }
    }

    pub fn mounts(&self) -> usize {
        self.mounts.get()
    }

    pub fn unmounts(&self) -> usize {
        self.unmounts.get()
    }

    pub fn fail_mount(&self, fail: bool) {
        self.fail_mount.set(fail);
    }

    pub fn fail_unmount(&self, fail: bool) {
        self.fail_unmount.set(fail);
    }

    /// Call `ok` on the controller from inside `mount`
    pub fn close_during_mount(&self, close: bool) {
        self.close_during_mount.set(close);
    }

    /// Result of the close issued from inside `mount`
    pub fn early_close(&self) -> Option<DialogResult<CloseAttempt>> {
        self.early_close.borrow().clone()
    }

    /// Controller most recently handed to `mount`
    pub fn last_controller(&self) -> Option<DialogController> {
        self.last.borrow().clone()
    }
}

#[async_trait(?Send)]
impl Renderer for RecordingRenderer {
    async fn mount(&self, controller: &DialogController) -> Result<()> {
        self.mounts.set(self.mounts.get() + 1);
        *self.last.borrow_mut() = Some(controller.clone());
        if self.close_during_mount.get() {
            let attempt = controller.ok(None).await;
            *self.early_close.borrow_mut() = Some(attempt);
        }
        if self.fail_mount.get() {
            bail!("mount exploded");
        }
        self.inner.mount(controller).await
    }

    async fn unmount(&self, controller: &DialogController) -> Result<()> {
        self.unmounts.set(self.unmounts.get() + 1);
        self.inner.unmount(controller).await?;
        if self.fail_unmount.get() {
            bail!("unmount exploded");
        }
        Ok(())
    }
}

/// How a [`TestViewModel`] answers `can_deactivate`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// No close negotiation capability
    Absent,
    /// Pops queued verdicts, allowing once the queue is empty
    Verdicts,
    /// Yields to the scheduler once, then allows
    Slow,
    /// Never answers
    Hang,
    /// Returns an error
    Fail,
    /// Opens a confirmation dialog and allows if it is confirmed
    Confirm,
}

struct State {
    guard: Cell<Guard>,
    verdicts: RefCell<VecDeque<bool>>,
    fail_deactivate: Cell<bool>,
    slow_activate: Cell<bool>,
    confirm_with: RefCell<Option<DialogService>>,
    control_count: Cell<usize>,
    controls: RefCell<Vec<ElementId>>,
    title: RefCell<Option<String>>,
    guard_calls: Cell<usize>,
    deactivate_calls: Cell<usize>,
    order: RefCell<Option<(&'static str, Rc<RefCell<Vec<&'static str>>>)>>,
}

/// Scriptable view-model; clones share state
#[derive(Clone)]
pub struct TestViewModel(Rc<State>);

impl TestViewModel {
    pub fn new() -> Self {
        Self(Rc::new(State {
            guard: Cell::new(Guard::Absent),
            verdicts: RefCell::new(VecDeque::new()),
            fail_deactivate: Cell::new(false),
            slow_activate: Cell::new(false),
            confirm_with: RefCell::new(None),
            control_count: Cell::new(0),
            controls: RefCell::new(Vec::new()),
            title: RefCell::new(None),
            guard_calls: Cell::new(0),
            deactivate_calls: Cell::new(0),
            order: RefCell::new(None),
        }))
    }

    pub fn with_guard(self, guard: Guard) -> Self {
        self.0.guard.set(guard);
        self
    }

    /// Compose `count` buttons into the dialog
    pub fn with_controls(self, count: usize) -> Self {
        self.0.control_count.set(count);
        self
    }

    pub fn failing_deactivate(self) -> Self {
        self.0.fail_deactivate.set(true);
        self
    }

    /// Yield to the scheduler once inside `activate`
    pub fn slow_activate(self) -> Self {
        self.0.slow_activate.set(true);
        self
    }

    /// Guard asks for confirmation through a dialog opened on `service`
    pub fn confirming_with(self, service: DialogService) -> Self {
        self.0.guard.set(Guard::Confirm);
        *self.0.confirm_with.borrow_mut() = Some(service);
        self
    }

    pub fn set_guard(&self, guard: Guard) {
        self.0.guard.set(guard);
    }

    /// Append `label` to `order` whenever the guard is consulted
    pub fn recording_into(self, label: &'static str, order: Rc<RefCell<Vec<&'static str>>>) -> Self {
        *self.0.order.borrow_mut() = Some((label, order));
        self
    }

    pub fn push_verdict(&self, verdict: bool) {
        self.0.verdicts.borrow_mut().push_back(verdict);
    }

    pub fn controls(&self) -> Vec<ElementId> {
        self.0.controls.borrow().clone()
    }

    pub fn title(&self) -> Option<String> {
        self.0.title.borrow().clone()
    }

    pub fn guard_calls(&self) -> usize {
        self.0.guard_calls.get()
    }

    pub fn deactivate_calls(&self) -> usize {
        self.0.deactivate_calls.get()
    }
}

#[async_trait(?Send)]
impl ViewModel for TestViewModel {
    async fn activate(&self, model: Option<&Value>) -> Result<()> {
        if self.0.slow_activate.get() {
            tokio::task::yield_now().await;
        }
        let title = model
            .and_then(|model| model.get("title"))
            .and_then(Value::as_str)
            .map(str::to_string);
        *self.0.title.borrow_mut() = title;
        Ok(())
    }

    fn compose(&self, dom: &dyn Dom, root: ElementId) -> Result<()> {
        let mut controls = self.0.controls.borrow_mut();
        for _ in 0..self.0.control_count.get() {
            let button = dom.create_element("button");
            dom.append_child(root, button)?;
            controls.push(button);
        }
        Ok(())
    }

    fn deactivatable(&self) -> Option<&dyn Deactivatable> {
        match self.0.guard.get() {
            Guard::Absent => None,
            _ => Some(self),
        }
    }
}

#[async_trait(?Send)]
impl Deactivatable for TestViewModel {
    async fn can_deactivate(&self, _result: &CloseResult) -> Result<bool> {
        self.0.guard_calls.set(self.0.guard_calls.get() + 1);
        if let Some((label, order)) = &*self.0.order.borrow() {
            order.borrow_mut().push(*label);
        }

        match self.0.guard.get() {
            Guard::Absent | Guard::Verdicts => {
                Ok(self.0.verdicts.borrow_mut().pop_front().unwrap_or(true))
            }
            Guard::Slow => {
                tokio::task::yield_now().await;
                Ok(true)
            }
            Guard::Hang => {
                std::future::pending::<()>().await;
                Ok(true)
            }
            Guard::Fail => bail!("guard exploded"),
            Guard::Confirm => {
                let service = self.0.confirm_with.borrow().clone();
                let Some(service) = service else {
                    bail!("no service to confirm with");
                };
                let confirm = service
                    .create(view_only("discard changes?").with_keyboard(ActionKey::Enter))
                    .await?;
                Ok(confirm.closed().await.is_ok())
            }
        }
    }

    async fn deactivate(&self, _result: &CloseResult) -> Result<()> {
        self.0.deactivate_calls.set(self.0.deactivate_calls.get() + 1);
        if self.0.fail_deactivate.get() {
            bail!("deactivate exploded");
        }
        Ok(())
    }
}
