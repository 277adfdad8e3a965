//! Overlay dismissal gesture
//!
//! A dismissal needs a full press-and-release on the overlay element itself.
//! Presses that start on the dialog content and end on the backdrop (or the
//! reverse, e.g. while selecting text) never count.

use crate::dom::ElementId;
use std::cell::Cell;
use std::time::{Duration, Instant};

/// Default maximum time between press and release
pub const DEFAULT_GESTURE_WINDOW: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    /// Mouse down or touch start
    Down,
    /// Mouse up or touch end
    Up,
}

/// Pointer event delivered to the dialog stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    /// Innermost element under the pointer
    pub target: ElementId,
    pub timestamp: Instant,
}

impl PointerEvent {
    pub fn down(target: ElementId) -> Self {
        Self::down_at(target, Instant::now())
    }

    pub fn up(target: ElementId) -> Self {
        Self::up_at(target, Instant::now())
    }

    pub fn down_at(target: ElementId, timestamp: Instant) -> Self {
        Self {
            kind: PointerKind::Down,
            target,
            timestamp,
        }
    }

    pub fn up_at(target: ElementId, timestamp: Instant) -> Self {
        Self {
            kind: PointerKind::Up,
            target,
            timestamp,
        }
    }
}

/// Tracks one press/release cycle on an overlay
#[derive(Debug, Default)]
pub struct OverlayGesture {
    pressed_at: Cell<Option<Instant>>,
}

impl OverlayGesture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed an event; returns true when it completes a dismiss gesture
    pub fn observe(&self, event: &PointerEvent, overlay: ElementId, window: Duration) -> bool {
        match event.kind {
            PointerKind::Down => {
                let on_overlay = event.target == overlay;
                self.pressed_at.set(on_overlay.then_some(event.timestamp));
                false
            }
            PointerKind::Up => {
                let Some(pressed_at) = self.pressed_at.take() else {
                    return false;
                };
                event.target == overlay
                    && event.timestamp.saturating_duration_since(pressed_at) <= window
            }
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed_at.get().is_some()
    }

    pub fn reset(&self) {
        self.pressed_at.set(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OVERLAY: ElementId = ElementId(10);
    const CONTENT: ElementId = ElementId(11);

    #[test]
    fn test_press_and_release_on_overlay() {
        let gesture = OverlayGesture::new();
        let t0 = Instant::now();

        assert!(!gesture.observe(&PointerEvent::down_at(OVERLAY, t0), OVERLAY, DEFAULT_GESTURE_WINDOW));
        assert!(gesture.is_pressed());
        assert!(gesture.observe(
            &PointerEvent::up_at(OVERLAY, t0 + Duration::from_millis(80)),
            OVERLAY,
            DEFAULT_GESTURE_WINDOW
        ));
        assert!(!gesture.is_pressed());
    }

    #[test]
    fn test_drag_between_overlay_and_content() {
        let gesture = OverlayGesture::new();
        let t0 = Instant::now();

        // Press on backdrop, release on content
        gesture.observe(&PointerEvent::down_at(OVERLAY, t0), OVERLAY, DEFAULT_GESTURE_WINDOW);
        assert!(!gesture.observe(&PointerEvent::up_at(CONTENT, t0), OVERLAY, DEFAULT_GESTURE_WINDOW));

        // Press on content, release on backdrop
        gesture.observe(&PointerEvent::down_at(CONTENT, t0), OVERLAY, DEFAULT_GESTURE_WINDOW);
        assert!(!gesture.observe(&PointerEvent::up_at(OVERLAY, t0), OVERLAY, DEFAULT_GESTURE_WINDOW));
    }

    #[test]
    fn test_release_without_press() {
        let gesture = OverlayGesture::new();
        assert!(!gesture.observe(&PointerEvent::up(OVERLAY), OVERLAY, DEFAULT_GESTURE_WINDOW));
    }

    #[test]
    fn test_slow_release_is_not_a_dismissal() {
        let gesture = OverlayGesture::new();
        let t0 = Instant::now();
        let window = Duration::from_millis(200);

        gesture.observe(&PointerEvent::down_at(OVERLAY, t0), OVERLAY, window);
        assert!(!gesture.observe(
            &PointerEvent::up_at(OVERLAY, t0 + Duration::from_millis(201)),
            OVERLAY,
            window
        ));
    }
}
