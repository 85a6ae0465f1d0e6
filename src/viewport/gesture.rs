use crate::foundation::core::Point;
use crate::render::canvas::Canvas;

/// Where a frame's viewport is in its gesture lifecycle.
///
/// `Idle -> Panning` on a scroll that moves, `Panning -> Idle` on scroll end,
/// `Idle | Panning -> Scaling` on the first scale step, `Scaling -> Idle` on commit,
/// `Idle -> Flinging` on a non-zero fling, and back to `Idle` when the fling settles or a new
/// gesture interrupts it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GestureState {
    #[default]
    Idle,
    Panning,
    Scaling,
    Flinging,
}

/// Input delivered by the host's gesture surface, in viewport-local pixels.
///
/// `Down` marks where a pointer landed. Scrolls and flings that follow go to the deepest
/// sub-frame under that point and bubble up to its parents once it can no longer move.
/// Without a `Down` they go to the root frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GestureEvent {
    Down { x: f64, y: f64 },
    ScrollBy { dx: f64, dy: f64 },
    ScrollEnd,
    ScaleBy { factor: f64, focal: Point },
    ScaleFinished { factor: f64, focal: Point },
    Fling { vx: f64, vy: f64 },
    Click { x: f64, y: f64 },
}

/// Host-facing surface of a frame: the host lays it out, paints it into its own canvas, and
/// forwards gestures. Returns from `on_gesture` tell the host whether the event was consumed.
pub trait FrameView {
    fn layout(&mut self, width: f64, height: f64);
    fn paint(&self, canvas: &mut dyn Canvas);
    fn on_gesture(&mut self, event: GestureEvent) -> bool;
}
