use crate::config::PlayerOpts;
use crate::foundation::core::{Point, Rect, Vec2};

/// Ballistic integrator driving a fling.
///
/// Positions are viewport origins in scaled content space; `bounds` is the allowed origin range.
pub trait Scroller: Send {
    fn fling(&mut self, start: Point, velocity: Vec2, bounds: Rect);
    /// Advance one step. Returns `false` when no fling is running.
    fn compute_scroll_offset(&mut self) -> bool;
    fn curr_x(&self) -> f64;
    fn curr_y(&self) -> f64;
    fn is_finished(&self) -> bool;
    fn force_finished(&mut self);
}

/// Optional edge effect offered vertical scroll deltas at the top edge.
pub trait OverscrollHandler: Send {
    /// Begin an overscroll. Returning `false` declines it and the delta scrolls normally.
    fn start(&mut self) -> bool;
    fn pull(&mut self, dy: f64);
    fn release(&mut self);
    fn reset(&mut self);
}

/// Exponentially decelerating fling.
///
/// `pos(t) = start + v0 * (1 - e^(-k t)) / k`, clamped to bounds, with `t` advanced by a fixed
/// frame interval on every poll so playback is deterministic.
#[derive(Clone, Debug)]
pub struct DecelerationScroller {
    friction: f64,
    min_velocity: f64,
    frame_secs: f64,
    start: Point,
    velocity: Vec2,
    bounds: Rect,
    elapsed: f64,
    curr: Point,
    finished: bool,
}

impl DecelerationScroller {
    pub fn new(friction: f64, min_velocity: f64, frame_secs: f64) -> Self {
        Self {
            friction,
            min_velocity,
            frame_secs,
            start: Point::ZERO,
            velocity: Vec2::ZERO,
            bounds: Rect::ZERO,
            elapsed: 0.0,
            curr: Point::ZERO,
            finished: true,
        }
    }

    pub fn from_opts(opts: &PlayerOpts) -> Self {
        Self::new(
            opts.fling_friction,
            opts.fling_min_velocity,
            opts.fling_frame_ms as f64 / 1000.0,
        )
    }
}

impl Scroller for DecelerationScroller {
    fn fling(&mut self, start: Point, velocity: Vec2, bounds: Rect) {
        self.start = start;
        self.curr = start;
        self.velocity = velocity;
        self.bounds = bounds;
        self.elapsed = 0.0;
        self.finished = !(velocity.hypot() > self.min_velocity);
    }

    fn compute_scroll_offset(&mut self) -> bool {
        if self.finished {
            return false;
        }
        self.elapsed += self.frame_secs;
        let decay = (-self.friction * self.elapsed).exp();
        let travel = self.velocity * ((1.0 - decay) / self.friction);
        let next = Point::new(
            (self.start.x + travel.x).clamp(self.bounds.x0, self.bounds.x1),
            (self.start.y + travel.y).clamp(self.bounds.y0, self.bounds.y1),
        );
        let speed = self.velocity.hypot() * decay;
        if speed < self.min_velocity || next == self.curr {
            self.finished = true;
        }
        self.curr = next;
        true
    }

    fn curr_x(&self) -> f64 {
        self.curr.x
    }

    fn curr_y(&self) -> f64 {
        self.curr.y
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn force_finished(&mut self) {
        self.finished = true;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/viewport/scroller.rs"]
mod tests;
