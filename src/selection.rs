//! Pointer gesture interpretation.
//!
//! A selector follows one press/drag/release gesture and, on a valid release,
//! hands the two endpoints to the session. Positions are `None` when the
//! pointer is outside the image canvas.

use crate::model::{Point, ShapeKind};

/// Transient shape drawn while a gesture is in progress. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Preview {
    /// Rubber-band rectangle spanning the press point and the pointer.
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    /// Arrow from the press point to the pointer.
    Arrow { tail: Point, head: Point },
}

/// Turns pointer gestures into point pairs.
pub trait SelectionAdapter {
    /// The shape kind this adapter produces.
    fn kind(&self) -> ShapeKind;

    /// Pointer pressed. An off-canvas press cancels any pending gesture.
    fn on_press(&mut self, at: Option<Point>);

    /// Pointer moved while pressed. Returns the preview to draw, if it
    /// changed.
    fn on_drag(&mut self, at: Option<Point>) -> Option<Preview>;

    /// Pointer released. Returns the gesture endpoints, or `None` when the
    /// gesture is discarded.
    fn on_release(&mut self, at: Option<Point>) -> Option<(Point, Point)>;

    /// Whether a press is pending.
    fn is_active(&self) -> bool;
}

/// Create the adapter for a session's shape kind.
pub fn selector_for(kind: ShapeKind) -> Box<dyn SelectionAdapter> {
    match kind {
        ShapeKind::Box => Box::new(BoxSelector::default()),
        ShapeKind::Arrow => Box::new(ArrowSelector::default()),
    }
}

// ============================================================================
// Gesture State
// ============================================================================

/// State of the gesture currently being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum GestureState {
    /// No press pending.
    #[default]
    Idle,
    /// Pressed on the canvas at `start`; `current` is the last on-canvas
    /// pointer position.
    Pressed { start: Point, current: Point },
}

impl GestureState {
    fn press(&mut self, at: Option<Point>) {
        *self = match at {
            Some(start) => GestureState::Pressed {
                start,
                current: start,
            },
            None => {
                log::trace!("Press outside canvas ignored");
                GestureState::Idle
            }
        };
    }

    /// Track the pointer, returning the gesture span when it moved on-canvas.
    fn drag(&mut self, at: Option<Point>) -> Option<(Point, Point)> {
        let GestureState::Pressed { start, current } = self else {
            return None;
        };
        let at = at?;
        *current = at;
        Some((*start, at))
    }

    fn release(&mut self, at: Option<Point>) -> Option<(Point, Point)> {
        let state = std::mem::take(self);
        match (state, at) {
            (GestureState::Pressed { start, .. }, Some(end)) => Some((start, end)),
            (GestureState::Pressed { .. }, None) => {
                log::trace!("Release outside canvas, selection discarded");
                None
            }
            (GestureState::Idle, _) => None,
        }
    }
}

// ============================================================================
// Selectors
// ============================================================================

/// Click-and-drag rectangle selection with a rubber-band preview.
#[derive(Debug, Default)]
pub struct BoxSelector {
    state: GestureState,
}

impl SelectionAdapter for BoxSelector {
    fn kind(&self) -> ShapeKind {
        ShapeKind::Box
    }

    fn on_press(&mut self, at: Option<Point>) {
        self.state.press(at);
    }

    fn on_drag(&mut self, at: Option<Point>) -> Option<Preview> {
        let (a, b) = self.state.drag(at)?;
        Some(Preview::Rect {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        })
    }

    fn on_release(&mut self, at: Option<Point>) -> Option<(Point, Point)> {
        self.state.release(at)
    }

    fn is_active(&self) -> bool {
        self.state != GestureState::Idle
    }
}

/// Press-drag-release arrow selection. The press point is the tail.
#[derive(Debug, Default)]
pub struct ArrowSelector {
    state: GestureState,
}

impl SelectionAdapter for ArrowSelector {
    fn kind(&self) -> ShapeKind {
        ShapeKind::Arrow
    }

    fn on_press(&mut self, at: Option<Point>) {
        self.state.press(at);
    }

    fn on_drag(&mut self, at: Option<Point>) -> Option<Preview> {
        let (tail, head) = self.state.drag(at)?;
        Some(Preview::Arrow { tail, head })
    }

    fn on_release(&mut self, at: Option<Point>) -> Option<(Point, Point)> {
        self.state.release(at)
    }

    fn is_active(&self) -> bool {
        self.state != GestureState::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Option<Point> {
        Some(Point::new(x, y))
    }

    #[test]
    fn test_box_gesture_yields_endpoints() {
        let mut selector = BoxSelector::default();
        selector.on_press(p(50.0, 40.0));
        assert!(selector.is_active());

        let preview = selector.on_drag(p(10.0, 10.0));
        assert_eq!(
            preview,
            Some(Preview::Rect {
                x: 10.0,
                y: 10.0,
                width: 40.0,
                height: 30.0
            })
        );

        let pair = selector.on_release(p(10.0, 10.0));
        assert_eq!(pair, Some((Point::new(50.0, 40.0), Point::new(10.0, 10.0))));
        assert!(!selector.is_active());
    }

    #[test]
    fn test_arrow_preview_keeps_direction() {
        let mut selector = ArrowSelector::default();
        selector.on_press(p(5.0, 5.0));

        let preview = selector.on_drag(p(1.0, 2.0));
        assert_eq!(
            preview,
            Some(Preview::Arrow {
                tail: Point::new(5.0, 5.0),
                head: Point::new(1.0, 2.0)
            })
        );
    }

    #[test]
    fn test_release_without_press_is_discarded() {
        let mut selector = ArrowSelector::default();
        assert_eq!(selector.on_release(p(1.0, 1.0)), None);
    }

    #[test]
    fn test_press_off_canvas_is_discarded() {
        let mut selector = BoxSelector::default();
        selector.on_press(None);
        assert!(!selector.is_active());
        assert_eq!(selector.on_drag(p(3.0, 3.0)), None);
        assert_eq!(selector.on_release(p(3.0, 3.0)), None);
    }

    #[test]
    fn test_release_off_canvas_is_discarded() {
        let mut selector = BoxSelector::default();
        selector.on_press(p(1.0, 1.0));
        assert_eq!(selector.on_release(None), None);

        // The gesture is over; a later release does nothing either
        assert_eq!(selector.on_release(p(4.0, 4.0)), None);
    }

    #[test]
    fn test_drag_off_canvas_keeps_last_preview() {
        let mut selector = ArrowSelector::default();
        selector.on_press(p(0.0, 0.0));
        assert!(selector.on_drag(p(2.0, 2.0)).is_some());
        assert_eq!(selector.on_drag(None), None);
        assert!(selector.is_active());
    }

    #[test]
    fn test_selector_for_kind() {
        assert_eq!(selector_for(ShapeKind::Box).kind(), ShapeKind::Box);
        assert_eq!(selector_for(ShapeKind::Arrow).kind(), ShapeKind::Arrow);
    }
}
