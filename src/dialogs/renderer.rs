//! Renderer and view-model contracts
//!
//! The renderer turns a controller's view/view-model into content under the
//! controller's overlay and attaches the overlay to the host element. View
//! models may opt into close negotiation through [`Deactivatable`].

use super::controller::DialogController;
use super::types::CloseResult;
use crate::dom::{Dom, ElementId};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::rc::Rc;
use tracing::debug;

/// View-model hosted by a dialog
#[async_trait(?Send)]
pub trait ViewModel {
    /// Called before the view is attached, with the caller's model
    async fn activate(&self, model: Option<&Value>) -> Result<()> {
        let _ = model;
        Ok(())
    }

    /// Build the dialog content under `root`
    fn compose(&self, dom: &dyn Dom, root: ElementId) -> Result<()> {
        let _ = (dom, root);
        Ok(())
    }

    /// Close negotiation capability, if the view-model has one
    fn deactivatable(&self) -> Option<&dyn Deactivatable> {
        None
    }
}

/// Optional close negotiation hooks
#[async_trait(?Send)]
pub trait Deactivatable {
    /// Return `false` to keep the dialog open
    async fn can_deactivate(&self, result: &CloseResult) -> Result<bool> {
        let _ = result;
        Ok(true)
    }

    /// Called once the close is accepted, before the view is removed
    async fn deactivate(&self, result: &CloseResult) -> Result<()> {
        let _ = result;
        Ok(())
    }
}

/// Mounts and unmounts dialog views
///
/// The dialog service calls `mount` once per dialog and `unmount` at most
/// once, when the close negotiation is accepted.
#[async_trait(?Send)]
pub trait Renderer {
    async fn mount(&self, controller: &DialogController) -> Result<()>;

    async fn unmount(&self, controller: &DialogController) -> Result<()>;
}

/// Renderer composing view-models straight into the element tree
pub struct DomRenderer {
    dom: Rc<dyn Dom>,
}

impl DomRenderer {
    pub fn new(dom: Rc<dyn Dom>) -> Self {
        Self { dom }
    }
}

#[async_trait(?Send)]
impl Renderer for DomRenderer {
    async fn mount(&self, controller: &DialogController) -> Result<()> {
        let overlay = controller.overlay();

        if let Some(view_model) = controller.view_model() {
            view_model.activate(controller.model()).await?;
            view_model.compose(self.dom.as_ref(), overlay)?;
        }

        self.dom.append_child(controller.settings().host, overlay)?;
        debug!("Attached {} overlay {} to host {}", controller.id(), overlay, controller.settings().host);
        Ok(())
    }

    async fn unmount(&self, controller: &DialogController) -> Result<()> {
        let overlay = controller.overlay();
        match self.dom.parent(overlay) {
            Some(parent) => {
                self.dom.remove_child(parent, overlay)?;
                debug!("Detached {} overlay {}", controller.id(), overlay);
            }
            None => debug!("Overlay of {} already detached", controller.id()),
        }
        Ok(())
    }
}
