//! Element tree abstraction
//!
//! Dialogs live on top of a host element tree. This module defines the small
//! surface the dialog system needs from that tree: node creation, parenting,
//! focus and a keyboard listener registry. Browsers, webviews and headless
//! hosts implement [`Dom`]; [`memory::MemoryDom`] is the in-memory variant.

pub mod memory;

pub use memory::MemoryDom;

use crossterm::event::KeyEvent;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Callback invoked for every key event a listener receives
pub type KeyHandler = Rc<dyn Fn(KeyEvent)>;

/// Handle to an element in the host tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to a registered keyboard listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Snapshot of the element properties the focus trap inspects
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementData {
    /// Lower-case tag name
    pub tag: String,
    /// Element attributes
    pub attributes: BTreeMap<String, String>,
    /// Whether the element is not rendered (no layout box)
    pub hidden: bool,
}

impl ElementData {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            hidden: false,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }
}

/// Element tree errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("Element {0} does not exist")]
    UnknownElement(ElementId),

    #[error("Element {child} is not a child of {parent}")]
    NotAChild { parent: ElementId, child: ElementId },

    #[error("Cannot append {child} to {parent}: it would create a cycle")]
    Cycle { parent: ElementId, child: ElementId },
}

/// Operations the dialog system performs on the host element tree
///
/// All methods take `&self`; implementations use interior mutability since
/// the tree is shared by every dialog and the host application.
pub trait Dom {
    /// The element dialogs attach to when no host is configured
    fn body(&self) -> ElementId;

    /// Create a detached element
    fn create_element(&self, tag: &str) -> ElementId;

    /// Drop `element` and its subtree, detaching it first if attached
    ///
    /// The ids become unknown afterwards. Unknown ids are ignored.
    fn release_element(&self, element: ElementId);

    fn set_class_name(&self, element: ElementId, class_name: &str);

    fn class_name(&self, element: ElementId) -> Option<String>;

    /// Append `child` as the last child of `parent`, detaching it first
    fn append_child(&self, parent: ElementId, child: ElementId) -> Result<(), DomError>;

    fn remove_child(&self, parent: ElementId, child: ElementId) -> Result<(), DomError>;

    fn parent(&self, element: ElementId) -> Option<ElementId>;

    /// All descendants of `root` in document order, `root` excluded
    fn descendants(&self, root: ElementId) -> Vec<ElementId>;

    fn element(&self, element: ElementId) -> Option<ElementData>;

    /// Whether `node` is `ancestor` or one of its descendants
    fn contains(&self, ancestor: ElementId, node: ElementId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Whether the element is attached to the document
    fn is_connected(&self, element: ElementId) -> bool;

    fn active_element(&self) -> Option<ElementId>;

    /// Request focus; the element may refuse it
    fn focus(&self, element: ElementId);

    fn blur(&self, element: ElementId);

    /// Register a document-level keyboard listener
    fn add_key_listener(&self, handler: KeyHandler) -> ListenerId;

    fn remove_key_listener(&self, listener: ListenerId);
}
