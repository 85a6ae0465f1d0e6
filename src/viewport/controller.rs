use crate::compositor::fetch::TileFetcher;
use crate::config::PlayerOpts;
use crate::foundation::core::{FrameId, Point, Rect, Size, TileIndex, Vec2, rect_has_area};
use crate::foundation::error::FetchError;
use crate::foundation::math::clamp_or_low;
use crate::frame::subframes::{SubFrameRegistry, VisibleSubFrame};
use crate::render::canvas::{Canvas, LayerCanvas};
use crate::render::painter::TilePainter;
use crate::tiles::bitmap::Bitmap;
use crate::tiles::cache_state::{BitmapCacheState, TileFetchOutcome};
use crate::tiles::scale_cache::ScaleStateCache;
use crate::viewport::gesture::GestureState;
use crate::viewport::scroller::{DecelerationScroller, OverscrollHandler, Scroller};
use crate::viewport::transform::GestureTransforms;

/// Update a frame owes its visible children after a turn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SubFramePush {
    /// Children re-layout at the committed scale factor and fetch tiles.
    Commit { scale_factor: f64 },
    /// Children stretch their current bitmaps by `scale_delta` without fetching.
    BitmapScale { scale_delta: f64 },
}

/// Mediator for one frame's viewport.
///
/// Owns the committed viewport (scaled content space), the per-scale tile cache states, the
/// gesture transform pair and the sub-frame registry. Each mutating turn runs in a fixed order:
/// apply the delta, recompute required tiles, dispatch fetches, evict, then recompute visible
/// children and queue a [`SubFramePush`] for them.
///
/// With a degenerate layout (empty viewport or empty content) every operation is a no-op.
pub struct ViewportController {
    frame: FrameId,
    content: Size,
    viewport: Rect,
    scale_factor: f64,
    initial_scale_factor: f64,
    max_scale_factor: f64,
    uncommitted_scale_factor: Option<f64>,
    transforms: GestureTransforms,
    gesture: GestureState,
    states: ScaleStateCache,
    subframes: SubFrameRegistry,
    visible: Vec<VisibleSubFrame>,
    child_push: Option<SubFramePush>,
    fetcher: TileFetcher,
    scroller: Box<dyn Scroller>,
    overscroll: Option<Box<dyn OverscrollHandler>>,
    overscrolling: bool,
    /// Distance pulled past the top edge during the current overscroll.
    overscroll_pulled: f64,
    redraw_requested: bool,
}

impl ViewportController {
    pub fn new(frame: FrameId, content: Size, fetcher: TileFetcher, opts: &PlayerOpts) -> Self {
        Self {
            frame,
            content,
            viewport: Rect::ZERO,
            scale_factor: 0.0,
            initial_scale_factor: 0.0,
            max_scale_factor: opts.max_scale_factor,
            uncommitted_scale_factor: None,
            transforms: GestureTransforms::default(),
            gesture: GestureState::Idle,
            states: ScaleStateCache::new(opts.max_scale_states, opts.prefetch_margin),
            subframes: SubFrameRegistry::new(),
            visible: Vec::new(),
            child_push: None,
            fetcher,
            scroller: Box::new(DecelerationScroller::from_opts(opts)),
            overscroll: None,
            overscrolling: false,
            overscroll_pulled: 0.0,
            redraw_requested: false,
        }
    }

    pub fn set_scroller(&mut self, scroller: Box<dyn Scroller>) {
        self.scroller = scroller;
    }

    pub fn set_overscroll_handler(&mut self, handler: Box<dyn OverscrollHandler>) {
        self.overscroll = Some(handler);
    }

    /// Register a child frame at `clip` (unscaled content space). Returns its slot.
    pub fn register_subframe(&mut self, child: FrameId, clip: Rect) -> usize {
        self.subframes.register(child, clip)
    }

    pub fn frame(&self) -> FrameId {
        self.frame
    }

    pub fn content_size(&self) -> Size {
        self.content
    }

    /// Committed viewport in scaled content space.
    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    /// Committed scale factor; `0.0` until the first layout.
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn initial_scale_factor(&self) -> f64 {
        self.initial_scale_factor
    }

    pub fn uncommitted_scale_factor(&self) -> Option<f64> {
        self.uncommitted_scale_factor
    }

    pub fn gesture_state(&self) -> GestureState {
        self.gesture
    }

    pub fn transforms(&self) -> GestureTransforms {
        self.transforms
    }

    pub fn visible_subframes(&self) -> &[VisibleSubFrame] {
        &self.visible
    }

    pub fn active_state(&self) -> Option<&BitmapCacheState> {
        self.states.active()
    }

    pub fn live_scale_states(&self) -> usize {
        self.states.live_states()
    }

    /// Return `true` when the frame has a non-empty viewport and content.
    pub fn has_layout(&self) -> bool {
        rect_has_area(self.viewport)
            && self.content.width > 0.0
            && self.content.height > 0.0
            && self.scale_factor > 0.0
    }

    /// Return `true` when every tile the active state requires is present.
    pub fn is_fully_loaded(&self) -> bool {
        self.states.active().is_some_and(|s| s.is_fully_loaded())
    }

    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }

    pub fn take_child_push(&mut self) -> Option<SubFramePush> {
        self.child_push.take()
    }

    /// Host layout pass with the frame's pixel size.
    #[tracing::instrument(level = "debug", skip(self), fields(frame = %self.frame))]
    pub fn set_layout_dimensions(&mut self, width: f64, height: f64) {
        if self.gesture == GestureState::Scaling {
            self.viewport = Rect::from_origin_size(self.viewport.origin(), sanitize(width, height));
            return;
        }
        if !(self.content.width > 0.0) {
            self.viewport = Rect::from_origin_size(self.viewport.origin(), sanitize(width, height));
            return;
        }
        self.initial_scale_factor = width / self.content.width;
        let scale = if self.scale_factor > 0.0 {
            self.scale_factor
        } else {
            self.initial_scale_factor
        };
        let scale = clamp_or_low(scale, self.initial_scale_factor, self.max_scale_factor);
        self.update_viewport_size(width, height, scale);
    }

    /// Resize the viewport and commit it at `scale_factor`, keeping the origin proportional.
    pub fn update_viewport_size(&mut self, width: f64, height: f64, scale_factor: f64) {
        let size = sanitize(width, height);
        let degenerate = !(size.width > 0.0 && size.height > 0.0)
            || !(scale_factor > 0.0 && scale_factor.is_finite())
            || !(self.content.width > 0.0 && self.content.height > 0.0);
        if degenerate {
            tracing::trace!(frame = %self.frame, width, height, "degenerate layout");
            self.viewport = Rect::from_origin_size(self.viewport.origin(), size);
            return;
        }

        let mut origin = self.viewport.origin();
        if self.scale_factor > 0.0 && self.scale_factor != scale_factor {
            origin = (origin.to_vec2() * (scale_factor / self.scale_factor)).to_point();
        }
        self.viewport = Rect::from_origin_size(origin, size);
        self.commit_viewport(origin, scale_factor);
    }

    /// Scroll by a viewport-pixel delta. Returns whether the viewport moved (or an overscroll
    /// effect consumed the delta).
    pub fn scroll_by(&mut self, dx: f64, dy: f64) -> bool {
        if self.gesture == GestureState::Flinging {
            self.scroller.force_finished();
            self.gesture = GestureState::Idle;
        }
        if !self.has_layout() || self.gesture == GestureState::Scaling {
            return false;
        }
        let dy = match self.absorb_overscroll(dy) {
            Some(rest) if rest == 0.0 => return true,
            Some(rest) => {
                self.scroll_internal(dx, rest);
                self.gesture = GestureState::Panning;
                return true;
            }
            None => dy,
        };
        if !self.scroll_internal(dx, dy) {
            return false;
        }
        self.gesture = GestureState::Panning;
        true
    }

    /// End of a pan: release any overscroll effect.
    pub fn scroll_end(&mut self) {
        if self.overscrolling {
            self.overscrolling = false;
            self.overscroll_pulled = 0.0;
            if let Some(handler) = self.overscroll.as_mut() {
                handler.release();
            }
        }
        if self.gesture == GestureState::Panning {
            self.gesture = GestureState::Idle;
        }
    }

    /// Mid-pinch scale step about a viewport-local focal point.
    ///
    /// Accumulates the uncommitted scale factor even when it falls outside
    /// `[initial, max]`; such steps are consumed without visual change. No tiles are fetched.
    pub fn scale_by(&mut self, factor: f64, focal: Point) -> bool {
        if !self.has_layout() || !(factor > 0.0 && factor.is_finite()) {
            return false;
        }
        if self.gesture == GestureState::Flinging {
            self.scroller.force_finished();
        }
        let uncommitted = self.uncommitted_scale_factor.unwrap_or(self.scale_factor) * factor;
        self.uncommitted_scale_factor = Some(uncommitted);
        self.gesture = GestureState::Scaling;

        if uncommitted < self.initial_scale_factor || uncommitted > self.max_scale_factor {
            return true;
        }

        let step = uncommitted / self.transforms.committed_scale();
        self.transforms = self.corrected(self.transforms.scaled_about(step, focal));

        let shadow = Rect::from_origin_size(
            (-self.transforms.committed_translation()).to_point(),
            self.viewport.size(),
        );
        self.visible = self.subframes.compute_visible(shadow, uncommitted);
        self.child_push = Some(SubFramePush::BitmapScale {
            scale_delta: uncommitted / self.scale_factor,
        });
        self.redraw_requested = true;
        true
    }

    /// Commit a pinch: clamp the accumulated scale factor, reset the bitmap matrix, and fetch
    /// tiles at the final scale.
    ///
    /// `factor` is the detector's last step, already delivered through [`Self::scale_by`]; it is
    /// logged but not applied again. `focal` anchors the clamp when the pinch overshot.
    pub fn scale_finished(&mut self, factor: f64, focal: Point) -> bool {
        if !self.has_layout() {
            return false;
        }
        let uncommitted = self
            .uncommitted_scale_factor
            .take()
            .unwrap_or(self.scale_factor);
        let final_scale =
            clamp_or_low(uncommitted, self.initial_scale_factor, self.max_scale_factor);

        let step = final_scale / self.transforms.committed_scale();
        let transforms = self.corrected(self.transforms.scaled_about(step, focal));
        let origin = (-transforms.committed_translation()).to_point();

        tracing::debug!(
            frame = %self.frame,
            from = self.scale_factor,
            to = final_scale,
            last_step = factor,
            "commit scale gesture"
        );
        self.gesture = GestureState::Idle;
        self.commit_viewport(origin, final_scale);
        true
    }

    /// Start a fling with the finger velocity `(vx, vy)` in px/s.
    pub fn on_fling(&mut self, vx: f64, vy: f64) -> bool {
        if !self.has_layout() || self.gesture == GestureState::Scaling {
            return false;
        }
        if vx == 0.0 && vy == 0.0 {
            return false;
        }
        let max = self.max_origin();
        self.scroller.fling(
            self.viewport.origin(),
            Vec2::new(-vx, -vy),
            Rect::new(0.0, 0.0, max.x, max.y),
        );
        if self.scroller.is_finished() {
            return false;
        }
        self.gesture = GestureState::Flinging;
        true
    }

    /// Poll the fling integrator once. Returns `true` while the fling is still running.
    pub fn advance_fling(&mut self) -> bool {
        if self.gesture != GestureState::Flinging {
            return false;
        }
        if !self.scroller.compute_scroll_offset() {
            self.gesture = GestureState::Idle;
            return false;
        }
        let dx = self.scroller.curr_x() - self.viewport.x0;
        let dy = self.scroller.curr_y() - self.viewport.y0;
        self.scroll_internal(dx, dy);
        if self.scroller.is_finished() {
            self.gesture = GestureState::Idle;
            return false;
        }
        true
    }

    /// Recompute the fit-to-width factor and recommit at the current (or initial) scale.
    ///
    /// During a pinch only the fit-to-width factor is refreshed.
    pub fn force_redraw(&mut self) {
        if !(self.content.width > 0.0) || !rect_has_area(self.viewport) {
            return;
        }
        self.initial_scale_factor = self.viewport.width() / self.content.width;
        if self.gesture == GestureState::Scaling {
            self.redraw_requested = true;
            return;
        }
        let scale = if self.scale_factor > 0.0 {
            self.scale_factor
        } else {
            self.initial_scale_factor
        };
        self.commit_viewport(self.viewport.origin(), scale);
    }

    /// Stretch the painted bitmaps by a parent's in-progress pinch.
    pub fn apply_parent_bitmap_scale(&mut self, scale_delta: f64) {
        if !self.has_layout() || !(scale_delta > 0.0 && scale_delta.is_finite()) {
            return;
        }
        self.transforms = GestureTransforms::committed_for(self.viewport.origin(), self.scale_factor)
            .scaled_about(scale_delta, Point::ZERO);
        self.visible = self.subframes.compute_visible(
            self.viewport.scale_from_origin(scale_delta),
            self.scale_factor * scale_delta,
        );
        self.child_push = Some(SubFramePush::BitmapScale { scale_delta });
        self.redraw_requested = true;
    }

    /// Route a completed fetch to the cache state that issued it.
    pub fn on_tile_response(
        &mut self,
        generation: u64,
        index: TileIndex,
        result: Result<Bitmap, FetchError>,
    ) -> Option<TileFetchOutcome> {
        let outcome = self.states.route(generation, index, result);
        match outcome {
            Some(TileFetchOutcome::Stored) => {
                self.redraw_requested = true;
                self.states.drop_retained_if_loaded();
            }
            Some(_) => {}
            None => {
                tracing::trace!(frame = %self.frame, generation, ?index, "response for dropped scale state");
            }
        }
        outcome
    }

    /// Drop retained scale states and unrequired tiles.
    pub fn on_low_memory(&mut self) {
        self.states.trim();
    }

    /// Release every bitmap, e.g. when the frame scrolls out of its parent's viewport.
    pub fn release_tiles(&mut self) {
        if self.states.live_states() > 0 {
            tracing::debug!(frame = %self.frame, "releasing tiles");
        }
        self.states.clear();
    }

    /// Convert a viewport-local point into unscaled content coordinates.
    pub fn content_point(&self, x: f64, y: f64) -> Point {
        if !self.has_layout() {
            return Point::new(x, y);
        }
        self.transforms.committed().inverse() * Point::new(x, y)
    }

    /// Paint the frame's own tiles in viewport-local coordinates.
    ///
    /// A retained state from the previous scale factor is painted first, stretched to the
    /// current one, so missing active tiles show stale content instead of holes.
    pub fn paint(&self, canvas: &mut dyn Canvas) {
        if !self.has_layout() {
            return;
        }
        let mut layer = LayerCanvas::new(canvas).with_transform(self.transforms.bitmap());
        let mut painter = TilePainter::new();
        if let Some(underlay) = self.states.underlay() {
            let ratio = underlay.scale_factor() / self.scale_factor;
            painter.paint_scaled(
                &mut layer,
                self.viewport.scale_from_origin(ratio),
                underlay.grid(),
                ratio.recip(),
            );
        }
        if let Some(active) = self.states.active() {
            painter.paint(&mut layer, self.viewport, active.grid());
        }
    }

    /// Offer a vertical delta to the overscroll handler.
    ///
    /// Returns `None` when the handler is not involved, otherwise the part of `dy` left for the
    /// content once the pull is eased back to zero.
    fn absorb_overscroll(&mut self, dy: f64) -> Option<f64> {
        let handler = self.overscroll.as_mut()?;
        if !self.overscrolling {
            if !(self.viewport.y0 <= 0.0 && dy < 0.0) || !handler.start() {
                return None;
            }
            self.overscrolling = true;
            self.overscroll_pulled = 0.0;
        }
        let pulled = self.overscroll_pulled - dy;
        if pulled > 0.0 {
            self.overscroll_pulled = pulled;
            handler.pull(-dy);
            return Some(0.0);
        }
        tracing::trace!(frame = %self.frame, "overscroll eased off");
        self.overscrolling = false;
        self.overscroll_pulled = 0.0;
        handler.reset();
        Some(-pulled)
    }

    fn scroll_internal(&mut self, dx: f64, dy: f64) -> bool {
        let max = self.max_origin();
        let x = clamp_or_low(self.viewport.x0 + dx, 0.0, max.x);
        let y = clamp_or_low(self.viewport.y0 + dy, 0.0, max.y);
        if x == self.viewport.x0 && y == self.viewport.y0 {
            return false;
        }
        self.commit_viewport(Point::new(x, y), self.scale_factor);
        true
    }

    fn max_origin(&self) -> Point {
        Point::new(
            (self.content.width * self.scale_factor - self.viewport.width()).max(0.0),
            (self.content.height * self.scale_factor - self.viewport.height()).max(0.0),
        )
    }

    fn corrected(&self, transforms: GestureTransforms) -> GestureTransforms {
        let delta = transforms.bounds_correction(self.content, self.viewport.size());
        transforms.translated(delta)
    }

    /// Shared move-viewport path.
    fn commit_viewport(&mut self, origin: Point, scale_factor: f64) {
        self.scale_factor = scale_factor;
        let max = self.max_origin();
        let origin = Point::new(
            clamp_or_low(origin.x, 0.0, max.x),
            clamp_or_low(origin.y, 0.0, max.y),
        );
        self.viewport = Rect::from_origin_size(origin, self.viewport.size());
        self.transforms = GestureTransforms::committed_for(origin, scale_factor);

        let state = self
            .states
            .select(scale_factor, self.viewport.size(), self.content);
        let fetches = state.request_coverage(self.viewport);
        for fetch in &fetches {
            self.fetcher.dispatch(self.frame, fetch);
        }
        state.evict_unrequired();
        self.states.drop_retained_if_loaded();

        self.visible = self.subframes.compute_visible(self.viewport, scale_factor);
        self.child_push = Some(SubFramePush::Commit { scale_factor });
        self.redraw_requested = true;
    }
}

fn sanitize(width: f64, height: f64) -> Size {
    let clean = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
    Size::new(clean(width), clean(height))
}

#[cfg(test)]
#[path = "../../tests/unit/viewport/controller.rs"]
mod tests;
