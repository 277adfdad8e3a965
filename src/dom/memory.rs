//! In-memory element tree
//!
//! A small arena-backed document used by headless hosts and by the test
//! suite. It models exactly what the dialog system observes: parenting,
//! attributes, rendering visibility, focus and listener registrations.

use super::{Dom, DomError, ElementData, ElementId, KeyHandler, ListenerId};
use crossterm::event::KeyEvent;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[derive(Debug)]
struct Node {
    data: ElementData,
    class_name: String,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            data: ElementData::new(tag),
            class_name: String::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
struct Tree {
    nodes: HashMap<ElementId, Node>,
    next_id: u64,
}

impl Tree {
    fn insert(&mut self, tag: &str) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, Node::new(tag));
        id
    }

    fn detach(&mut self, child: ElementId) {
        let parent = self.nodes.get(&child).and_then(|node| node.parent);
        if let Some(parent) = parent {
            if let Some(node) = self.nodes.get_mut(&parent) {
                node.children.retain(|id| *id != child);
            }
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = None;
        }
    }

    /// Detach `root` and drop it with its subtree
    fn remove_subtree(&mut self, root: ElementId) -> usize {
        self.detach(root);
        let mut pending = vec![root];
        let mut removed = 0;
        while let Some(id) = pending.pop() {
            if let Some(node) = self.nodes.remove(&id) {
                pending.extend(node.children);
                removed += 1;
            }
        }
        removed
    }

    fn is_ancestor(&self, ancestor: ElementId, node: ElementId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }
}

/// Headless [`Dom`] implementation
pub struct MemoryDom {
    tree: RefCell<Tree>,
    document: ElementId,
    body: ElementId,
    active: Cell<Option<ElementId>>,
    listeners: RefCell<BTreeMap<ListenerId, KeyHandler>>,
    next_listener: Cell<u64>,
}

impl MemoryDom {
    /// Create a document with an `html` root and an empty `body`
    pub fn new() -> Self {
        let mut tree = Tree::default();
        let document = tree.insert("html");
        let body = tree.insert("body");
        if let Some(node) = tree.nodes.get_mut(&body) {
            node.parent = Some(document);
        }
        if let Some(node) = tree.nodes.get_mut(&document) {
            node.children.push(body);
        }

        Self {
            tree: RefCell::new(tree),
            document,
            body,
            active: Cell::new(None),
            listeners: RefCell::new(BTreeMap::new()),
            next_listener: Cell::new(1),
        }
    }

    pub fn document(&self) -> ElementId {
        self.document
    }

    /// Create an element and append it to `parent` in one step
    pub fn append_new(&self, parent: ElementId, tag: &str) -> Result<ElementId, DomError> {
        let element = self.create_element(tag);
        self.append_child(parent, element)?;
        Ok(element)
    }

    pub fn set_attribute(&self, element: ElementId, name: &str, value: &str) {
        if let Some(node) = self.tree.borrow_mut().nodes.get_mut(&element) {
            node.data.attributes.insert(name.to_string(), value.to_string());
        }
    }

    pub fn remove_attribute(&self, element: ElementId, name: &str) {
        if let Some(node) = self.tree.borrow_mut().nodes.get_mut(&element) {
            node.data.attributes.remove(name);
        }
    }

    pub fn set_hidden(&self, element: ElementId, hidden: bool) {
        if let Some(node) = self.tree.borrow_mut().nodes.get_mut(&element) {
            node.data.hidden = hidden;
        }
    }

    pub fn children(&self, element: ElementId) -> Vec<ElementId> {
        self.tree
            .borrow()
            .nodes
            .get(&element)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    /// Elements carrying `class_name`, in document order
    pub fn query_class(&self, class_name: &str) -> Vec<ElementId> {
        let tree = self.tree.borrow();
        self.descendants(self.document)
            .into_iter()
            .filter(|id| {
                tree.nodes
                    .get(id)
                    .map(|node| node.class_name.split_whitespace().any(|c| c == class_name))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Number of registered keyboard listeners
    pub fn key_listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Number of live elements, document root and body included
    pub fn node_count(&self) -> usize {
        self.tree.borrow().nodes.len()
    }

    /// Deliver a key event to the registered listeners, oldest first
    ///
    /// Handlers may add or remove listeners. Listeners added during delivery
    /// miss this event; listeners removed during delivery are skipped.
    pub fn dispatch_key(&self, event: KeyEvent) {
        let listeners: Vec<(ListenerId, KeyHandler)> = self
            .listeners
            .borrow()
            .iter()
            .map(|(id, handler)| (*id, handler.clone()))
            .collect();

        for (id, handler) in listeners {
            if self.listeners.borrow().contains_key(&id) {
                handler(event);
            }
        }
    }

    fn refuses_focus(&self, element: ElementId) -> bool {
        let tree = self.tree.borrow();
        let mut current = Some(element);
        while let Some(id) = current {
            match tree.nodes.get(&id) {
                Some(node) => {
                    if node.data.has_attribute("inert") || node.data.hidden {
                        return true;
                    }
                    current = node.parent;
                }
                None => return true,
            }
        }
        false
    }
}

impl fmt::Debug for MemoryDom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDom")
            .field("nodes", &self.node_count())
            .field("active", &self.active.get())
            .field("key_listeners", &self.key_listener_count())
            .finish()
    }
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom for MemoryDom {
    fn body(&self) -> ElementId {
        self.body
    }

    fn create_element(&self, tag: &str) -> ElementId {
        self.tree.borrow_mut().insert(tag)
    }

    fn set_class_name(&self, element: ElementId, class_name: &str) {
        if let Some(node) = self.tree.borrow_mut().nodes.get_mut(&element) {
            node.class_name = class_name.to_string();
        }
    }

    fn release_element(&self, element: ElementId) {
        if element == self.document || element == self.body {
            return;
        }
        if let Some(active) = self.active.get() {
            if self.contains(element, active) {
                self.active.set(None);
            }
        }
        self.tree.borrow_mut().remove_subtree(element);
    }

    fn class_name(&self, element: ElementId) -> Option<String> {
        self.tree
            .borrow()
            .nodes
            .get(&element)
            .map(|node| node.class_name.clone())
    }

    fn append_child(&self, parent: ElementId, child: ElementId) -> Result<(), DomError> {
        let mut tree = self.tree.borrow_mut();
        if !tree.nodes.contains_key(&parent) {
            return Err(DomError::UnknownElement(parent));
        }
        if !tree.nodes.contains_key(&child) {
            return Err(DomError::UnknownElement(child));
        }
        if tree.is_ancestor(child, parent) {
            return Err(DomError::Cycle { parent, child });
        }

        tree.detach(child);
        if let Some(node) = tree.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        if let Some(node) = tree.nodes.get_mut(&parent) {
            node.children.push(child);
        }
        Ok(())
    }

    fn remove_child(&self, parent: ElementId, child: ElementId) -> Result<(), DomError> {
        {
            let mut tree = self.tree.borrow_mut();
            let is_child = tree
                .nodes
                .get(&child)
                .map(|node| node.parent == Some(parent))
                .ok_or(DomError::UnknownElement(child))?;
            if !is_child {
                return Err(DomError::NotAChild { parent, child });
            }
            tree.detach(child);
        }

        // Focus does not survive removal from the document
        if let Some(active) = self.active.get() {
            if self.contains(child, active) {
                self.active.set(None);
            }
        }
        Ok(())
    }

    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.tree.borrow().nodes.get(&element).and_then(|node| node.parent)
    }

    fn descendants(&self, root: ElementId) -> Vec<ElementId> {
        let tree = self.tree.borrow();
        let mut out = Vec::new();
        let mut stack: Vec<ElementId> = tree
            .nodes
            .get(&root)
            .map(|node| node.children.iter().rev().copied().collect())
            .unwrap_or_default();

        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(node) = tree.nodes.get(&id) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    fn element(&self, element: ElementId) -> Option<ElementData> {
        self.tree.borrow().nodes.get(&element).map(|node| node.data.clone())
    }

    fn is_connected(&self, element: ElementId) -> bool {
        self.tree.borrow().is_ancestor(self.document, element)
    }

    fn active_element(&self) -> Option<ElementId> {
        self.active.get()
    }

    fn focus(&self, element: ElementId) {
        if !self.is_connected(element) || self.refuses_focus(element) {
            return;
        }
        let disabled = self
            .element(element)
            .map(|data| data.has_attribute("disabled"))
            .unwrap_or(true);
        if !disabled {
            self.active.set(Some(element));
        }
    }

    fn blur(&self, element: ElementId) {
        if self.active.get() == Some(element) {
            self.active.set(None);
        }
    }

    fn add_key_listener(&self, handler: KeyHandler) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners.borrow_mut().insert(id, handler);
        id
    }

    fn remove_key_listener(&self, listener: ListenerId) {
        self.listeners.borrow_mut().remove(&listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};
    use std::rc::Rc;

    #[test]
    fn test_descendants_in_document_order() {
        let dom = MemoryDom::new();
        let a = dom.append_new(dom.body(), "div").unwrap();
        let a1 = dom.append_new(a, "span").unwrap();
        let a2 = dom.append_new(a, "span").unwrap();
        let b = dom.append_new(dom.body(), "div").unwrap();
        let a1x = dom.append_new(a1, "em").unwrap();

        assert_eq!(dom.descendants(dom.body()), vec![a, a1, a1x, a2, b]);
    }

    #[test]
    fn test_connected_and_removal() {
        let dom = MemoryDom::new();
        let div = dom.create_element("div");
        assert!(!dom.is_connected(div));

        dom.append_child(dom.body(), div).unwrap();
        assert!(dom.is_connected(div));
        assert!(dom.contains(dom.body(), div));

        dom.remove_child(dom.body(), div).unwrap();
        assert!(!dom.is_connected(div));
        assert_eq!(
            dom.remove_child(dom.body(), div),
            Err(DomError::NotAChild { parent: dom.body(), child: div })
        );
    }

    #[test]
    fn test_append_rejects_cycles() {
        let dom = MemoryDom::new();
        let outer = dom.append_new(dom.body(), "div").unwrap();
        let inner = dom.append_new(outer, "div").unwrap();

        assert!(matches!(dom.append_child(inner, outer), Err(DomError::Cycle { .. })));
    }

    #[test]
    fn test_focus_rules() {
        let dom = MemoryDom::new();
        let button = dom.append_new(dom.body(), "button").unwrap();
        let disabled = dom.append_new(dom.body(), "button").unwrap();
        dom.set_attribute(disabled, "disabled", "");
        let inert = dom.append_new(dom.body(), "input").unwrap();
        dom.set_attribute(inert, "inert", "");
        let detached = dom.create_element("button");

        dom.focus(button);
        assert_eq!(dom.active_element(), Some(button));

        dom.focus(disabled);
        dom.focus(inert);
        dom.focus(detached);
        assert_eq!(dom.active_element(), Some(button));

        dom.blur(button);
        assert_eq!(dom.active_element(), None);
    }

    #[test]
    fn test_removing_subtree_drops_focus() {
        let dom = MemoryDom::new();
        let overlay = dom.append_new(dom.body(), "div").unwrap();
        let input = dom.append_new(overlay, "input").unwrap();

        dom.focus(input);
        dom.remove_child(dom.body(), overlay).unwrap();
        assert_eq!(dom.active_element(), None);
    }

    fn recorder(log: &Rc<RefCell<Vec<(u8, KeyCode)>>>, tag: u8) -> KeyHandler {
        let log = log.clone();
        Rc::new(move |event: KeyEvent| log.borrow_mut().push((tag, event.code)))
    }

    #[test]
    fn test_listener_bookkeeping() {
        let dom = MemoryDom::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let first = dom.add_key_listener(recorder(&log, 1));
        let second = dom.add_key_listener(recorder(&log, 2));
        assert_ne!(first, second);
        assert_eq!(dom.key_listener_count(), 2);

        dom.dispatch_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        assert_eq!(*log.borrow(), vec![(1, KeyCode::Esc), (2, KeyCode::Esc)]);

        dom.remove_key_listener(first);
        dom.remove_key_listener(first);
        assert_eq!(dom.key_listener_count(), 1);

        dom.dispatch_key(KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE));
        assert_eq!(log.borrow().last(), Some(&(2, KeyCode::Tab)));
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn test_listener_removed_during_dispatch_is_skipped() {
        let dom = Rc::new(MemoryDom::new());
        let log = Rc::new(RefCell::new(Vec::new()));
        let victim = Rc::new(Cell::new(None));

        let remover = {
            let dom = Rc::downgrade(&dom);
            let victim = victim.clone();
            Rc::new(move |_event: KeyEvent| {
                if let (Some(dom), Some(id)) = (dom.upgrade(), victim.get()) {
                    dom.remove_key_listener(id);
                }
            })
        };
        dom.add_key_listener(remover);
        victim.set(Some(dom.add_key_listener(recorder(&log, 2))));

        dom.dispatch_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        assert!(log.borrow().is_empty());
        assert_eq!(dom.key_listener_count(), 1);
    }

    #[test]
    fn test_release_element_frees_subtree() {
        let dom = MemoryDom::new();
        let baseline = dom.node_count();
        let overlay = dom.append_new(dom.body(), "div").unwrap();
        let content = dom.append_new(overlay, "section").unwrap();
        let input = dom.append_new(content, "input").unwrap();
        dom.focus(input);
        assert_eq!(dom.node_count(), baseline + 3);

        dom.release_element(overlay);

        assert_eq!(dom.node_count(), baseline);
        assert_eq!(dom.active_element(), None);
        assert!(dom.children(dom.body()).is_empty());
        assert_eq!(dom.element(input), None);
        assert!(matches!(
            dom.append_child(dom.body(), overlay),
            Err(DomError::UnknownElement(_))
        ));

        // Releasing twice, or releasing the body, is a no-op
        dom.release_element(overlay);
        dom.release_element(dom.body());
        assert_eq!(dom.node_count(), baseline);
    }

    #[test]
    fn test_query_class() {
        let dom = MemoryDom::new();
        let overlay = dom.append_new(dom.body(), "div").unwrap();
        dom.set_class_name(overlay, "dialog-lite-overlay wide");

        assert_eq!(dom.query_class("dialog-lite-overlay"), vec![overlay]);
        assert!(dom.query_class("missing").is_empty());
    }
}
