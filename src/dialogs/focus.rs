//! Focus trap for the topmost dialog
//!
//! Tab and Shift+Tab cycle through the focusable elements of a dialog's
//! overlay in document order, wrapping at both ends.

use crate::dom::{Dom, ElementData, ElementId};
use tracing::trace;

/// Whether an element can take keyboard focus by tabbing
pub fn is_focusable(element: &ElementData) -> bool {
    let aria_hidden = element.has_attribute("aria-hidden");
    let disabled = element.has_attribute("disabled");

    let by_tag = match element.tag.as_str() {
        "a" | "area" => element.has_attribute("href"),
        "input" => !disabled && !aria_hidden && element.attribute("type") != Some("hidden"),
        "select" | "textarea" | "button" => !disabled && !aria_hidden,
        "iframe" | "object" | "embed" => true,
        _ => false,
    };
    if by_tag || element.has_attribute("contenteditable") {
        return true;
    }

    element
        .attribute("tabindex")
        .map(|index| !index.trim_start().starts_with('-'))
        .unwrap_or(false)
}

/// Focusable, rendered descendants of `root` in document order
pub fn focusable_nodes(dom: &dyn Dom, root: ElementId) -> Vec<ElementId> {
    dom.descendants(root)
        .into_iter()
        .filter(|id| {
            dom.element(*id)
                .map(|data| is_focusable(&data))
                .unwrap_or(false)
        })
        .filter(|id| is_rendered(dom, *id, root))
        .collect()
}

/// An element is rendered when neither it nor an ancestor below `root` is hidden
fn is_rendered(dom: &dyn Dom, element: ElementId, root: ElementId) -> bool {
    let mut current = Some(element);
    while let Some(id) = current {
        if id == root {
            return true;
        }
        if dom.element(id).map(|data| data.hidden).unwrap_or(true) {
            return false;
        }
        current = dom.parent(id);
    }
    true
}

fn wrap_index(next: isize, len: isize) -> isize {
    if next >= len {
        0
    } else if next < 0 {
        len - 1
    } else {
        next
    }
}

/// Move focus to the next (or previous) focusable element inside `root`
///
/// Focus outside `root` moves to the first focusable element. Candidates that
/// refuse focus are skipped, trying each focusable element at most once.
/// Returns the element that ended up focused.
pub fn cycle_focus(dom: &dyn Dom, root: ElementId, shift: bool) -> Option<ElementId> {
    let nodes = focusable_nodes(dom, root);
    if nodes.is_empty() {
        return None;
    }

    let len = nodes.len() as isize;
    let active = dom.active_element().filter(|active| dom.contains(root, *active));
    let (mut index, step) = match active {
        None => (0, 1),
        Some(active) => {
            let step = if shift { -1 } else { 1 };
            let current = nodes
                .iter()
                .position(|node| *node == active)
                .map(|i| i as isize)
                .unwrap_or(-1);
            (wrap_index(current + step, len), step)
        }
    };

    for _ in 0..nodes.len() {
        let candidate = nodes[index as usize];
        dom.focus(candidate);
        if dom.active_element() == Some(candidate) {
            return Some(candidate);
        }
        trace!("Element {} refused focus, trying the next one", candidate);
        index = wrap_index(index + step, len);
    }

    None
}
