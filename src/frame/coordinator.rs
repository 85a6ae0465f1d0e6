use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use smallvec::SmallVec;

use crate::compositor::fetch::{TileCompositor, TileFetcher, TileResponse};
use crate::config::PlayerOpts;
use crate::foundation::core::{Affine, FrameId, Point, Rect, rect_has_area};
use crate::foundation::error::{PreviewError, PreviewResult};
use crate::frame::subframes::VisibleSubFrame;
use crate::frame::tree::FrameTree;
use crate::render::canvas::{Canvas, LayerCanvas};
use crate::viewport::controller::{SubFramePush, ViewportController};
use crate::viewport::gesture::{FrameView, GestureEvent};
use crate::viewport::scroller::{OverscrollHandler, Scroller};

/// Receives clicks resolved to a frame and a point in its unscaled content space.
pub trait HitTester: Send + Sync {
    fn on_click(&self, frame: FrameId, content_point: Point);
}

struct ChildFrame {
    coordinator: FrameCoordinator,
    /// Last viewport-relative rect while visible.
    rect: Option<Rect>,
}

/// Composition root of one frame and, recursively, its sub-frames.
///
/// The root coordinator owns the channel that tile completions arrive on; the host drains it
/// with [`FrameCoordinator::pump_tile_responses`] on the owner thread. Gestures are handled by
/// the root frame, except scrolls and flings that start over a sub-frame, which that sub-frame
/// gets first. Children follow scale changes through the [`SubFramePush`] their parent queues.
pub struct FrameCoordinator {
    id: FrameId,
    controller: ViewportController,
    children: Vec<ChildFrame>,
    hit_tester: Option<Arc<dyn HitTester>>,
    responses: Option<mpsc::Receiver<TileResponse>>,
    created_at: Instant,
    first_paint_timeout: Duration,
    first_paint_forced: bool,
    redraw_requested: bool,
    /// Slot of the visible child under the last `Down`.
    touched: Option<usize>,
    /// Whether the touched child consumed the latest scroll delta.
    child_scrolled: bool,
}

impl FrameCoordinator {
    /// Build the coordinator tree for `tree`, fetching tiles from `compositor`.
    #[tracing::instrument(level = "debug", skip_all, fields(root = %tree.root, frames = tree.frames.len()))]
    pub fn build(
        tree: &FrameTree,
        compositor: Arc<dyn TileCompositor>,
        opts: PlayerOpts,
    ) -> PreviewResult<Self> {
        tree.validate()?;
        opts.validate()?;
        let (tx, rx) = mpsc::channel();
        let fetcher = TileFetcher::new(compositor, tx);
        let mut root = Self::build_node(tree, tree.root, &fetcher, &opts)?;
        root.responses = Some(rx);
        Ok(root)
    }

    fn build_node(
        tree: &FrameTree,
        id: FrameId,
        fetcher: &TileFetcher,
        opts: &PlayerOpts,
    ) -> PreviewResult<Self> {
        let spec = tree
            .get(id)
            .ok_or_else(|| PreviewError::validation(format!("unknown frame {id}")))?;
        let mut controller =
            ViewportController::new(id, spec.content_size(), fetcher.clone(), opts);
        let mut children = Vec::with_capacity(spec.subframes.len());
        for sub in &spec.subframes {
            controller.register_subframe(sub.frame, sub.clip);
            children.push(ChildFrame {
                coordinator: Self::build_node(tree, sub.frame, fetcher, opts)?,
                rect: None,
            });
        }
        Ok(Self {
            id,
            controller,
            children,
            hit_tester: None,
            responses: None,
            created_at: Instant::now(),
            first_paint_timeout: opts.first_paint_timeout(),
            first_paint_forced: false,
            redraw_requested: false,
            touched: None,
            child_scrolled: false,
        })
    }

    /// Forward resolved clicks to `hit_tester` for this frame and all sub-frames.
    pub fn with_hit_tester(mut self, hit_tester: Arc<dyn HitTester>) -> Self {
        self.set_hit_tester(hit_tester);
        self
    }

    pub fn with_overscroll(mut self, handler: Box<dyn OverscrollHandler>) -> Self {
        self.controller.set_overscroll_handler(handler);
        self
    }

    pub fn with_scroller(mut self, scroller: Box<dyn Scroller>) -> Self {
        self.controller.set_scroller(scroller);
        self
    }

    fn set_hit_tester(&mut self, hit_tester: Arc<dyn HitTester>) {
        for child in &mut self.children {
            child.coordinator.set_hit_tester(hit_tester.clone());
        }
        self.hit_tester = Some(hit_tester);
    }

    pub fn id(&self) -> FrameId {
        self.id
    }

    pub fn controller(&self) -> &ViewportController {
        &self.controller
    }

    /// Look up a coordinator anywhere in this subtree.
    pub fn find(&self, id: FrameId) -> Option<&FrameCoordinator> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.coordinator.find(id))
    }

    fn find_mut(&mut self, id: FrameId) -> Option<&mut FrameCoordinator> {
        if self.id == id {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|c| c.coordinator.find_mut(id))
    }

    /// Apply the pending sub-frame update to visible children and recurse.
    ///
    /// Children that left the viewport release their bitmaps.
    fn propagate(&mut self) {
        let Some(push) = self.controller.take_child_push() else {
            return;
        };
        let visible: SmallVec<[VisibleSubFrame; 4]> =
            self.controller.visible_subframes().iter().copied().collect();

        let mut shown: SmallVec<[bool; 8]> = SmallVec::from_elem(false, self.children.len());
        for v in &visible {
            let Some(child) = self.children.get_mut(v.slot) else {
                continue;
            };
            shown[v.slot] = true;
            child.rect = Some(v.rect);
            let ctl = &mut child.coordinator.controller;
            match push {
                SubFramePush::Commit { scale_factor } => {
                    ctl.update_viewport_size(v.rect.width().round(), v.rect.height().round(), scale_factor)
                }
                SubFramePush::BitmapScale { scale_delta } => ctl.apply_parent_bitmap_scale(scale_delta),
            }
            child.coordinator.propagate();
        }

        for (child, shown) in self.children.iter_mut().zip(shown) {
            if !shown && child.rect.take().is_some() {
                tracing::debug!(parent = %self.id, child = %child.coordinator.id, "subframe left viewport");
                child.coordinator.release_tiles();
            }
        }
    }

    fn release_tiles(&mut self) {
        self.controller.release_tiles();
        for child in &mut self.children {
            child.rect = None;
            child.coordinator.release_tiles();
        }
    }

    /// Deliver every completed tile fetch queued so far. Returns how many were handled.
    pub fn pump_tile_responses(&mut self) -> usize {
        let Some(rx) = self.responses.as_ref() else {
            return 0;
        };
        let drained: Vec<TileResponse> = rx.try_iter().collect();
        let n = drained.len();
        for response in drained {
            self.route_response(response);
        }
        n
    }

    /// Block until the visible tree is fully loaded or `timeout` elapses, delivering responses
    /// as they arrive. Returns how many responses were handled.
    pub fn wait_for_tiles(&mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut handled = self.pump_tile_responses();
        while !self.subtree_loaded(true) {
            let Some(rx) = self.responses.as_ref() else {
                break;
            };
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match rx.recv_timeout(deadline - now) {
                Ok(response) => {
                    self.route_response(response);
                    handled += 1 + self.pump_tile_responses();
                }
                Err(_) => break,
            }
        }
        handled
    }

    fn route_response(&mut self, response: TileResponse) {
        let TileResponse { ticket, result } = response;
        match self.find_mut(ticket.frame) {
            Some(target) => {
                target
                    .controller
                    .on_tile_response(ticket.generation, ticket.index, result);
            }
            None => {
                tracing::trace!(frame = %ticket.frame, "tile response for unknown frame");
            }
        }
    }

    fn touched_child_mut(&mut self) -> Option<&mut ChildFrame> {
        let child = self.children.get_mut(self.touched?)?;
        if child.rect.is_some() {
            Some(child)
        } else {
            None
        }
    }

    /// Remember the visible sub-frame under a pointer, recursively.
    fn on_down(&mut self, x: f64, y: f64) -> bool {
        self.touched = None;
        self.child_scrolled = false;
        let bounds = Rect::from_origin_size(Point::ZERO, self.controller.viewport().size());
        let p = Point::new(x, y);
        let hit = self
            .controller
            .visible_subframes()
            .iter()
            .rev()
            .find(|v| v.rect.intersect(bounds).contains(p))
            .copied();
        if let Some(v) = hit
            && let Some(child) = self.children.get_mut(v.slot)
        {
            self.touched = Some(v.slot);
            child.coordinator.on_down(x - v.rect.x0, y - v.rect.y0);
        }
        self.controller.has_layout()
    }

    /// Offer a scroll to the touched child first. Returns `true` when some descendant moved.
    fn scroll_touched_child(&mut self, dx: f64, dy: f64) -> bool {
        let Some(child) = self.touched_child_mut() else {
            return false;
        };
        let moved = child
            .coordinator
            .on_gesture(GestureEvent::ScrollBy { dx, dy });
        self.child_scrolled = moved;
        moved
    }

    fn fling_touched_child(&mut self, vx: f64, vy: f64) -> bool {
        if !self.child_scrolled {
            return false;
        }
        let Some(child) = self.touched_child_mut() else {
            return false;
        };
        child.coordinator.on_gesture(GestureEvent::Fling { vx, vy })
    }

    /// Resolve a viewport-local click to the topmost visible sub-frame under it, or this frame.
    pub fn on_click(&self, x: f64, y: f64) -> bool {
        let bounds = Rect::from_origin_size(Point::ZERO, self.controller.viewport().size());
        let p = Point::new(x, y);
        for v in self.controller.visible_subframes().iter().rev() {
            if !v.rect.intersect(bounds).contains(p) {
                continue;
            }
            if let Some(child) = self.children.get(v.slot) {
                return child.coordinator.on_click(x - v.rect.x0, y - v.rect.y0);
            }
        }
        let Some(hit_tester) = self.hit_tester.as_ref() else {
            return false;
        };
        hit_tester.on_click(self.id, self.controller.content_point(x, y));
        true
    }

    /// Return `true` once the frame may be shown: all visible tiles are loaded, the first-paint
    /// timeout has elapsed, or the wait was skipped.
    pub fn is_ready_to_show(&self) -> bool {
        self.first_paint_forced
            || self.created_at.elapsed() >= self.first_paint_timeout
            || self.subtree_loaded(true)
    }

    pub fn skip_first_paint_wait(&mut self) {
        self.first_paint_forced = true;
        self.redraw_requested = true;
    }

    fn subtree_loaded(&self, is_root: bool) -> bool {
        let own = if self.controller.has_layout() {
            self.controller.is_fully_loaded()
        } else {
            !is_root
        };
        own && self
            .children
            .iter()
            .filter(|c| c.rect.is_some())
            .all(|c| c.coordinator.subtree_loaded(false))
    }

    /// Drop retained scale states and unrequired tiles across the whole tree.
    pub fn on_low_memory(&mut self) {
        self.controller.on_low_memory();
        for child in &mut self.children {
            child.coordinator.on_low_memory();
        }
    }

    /// Return and clear whether any frame in the tree asked to be redrawn.
    pub fn take_redraw_request(&mut self) -> bool {
        let mut redraw = std::mem::take(&mut self.redraw_requested);
        redraw |= self.controller.take_redraw_request();
        for child in &mut self.children {
            redraw |= child.coordinator.take_redraw_request();
        }
        redraw
    }

    /// Poll every running fling in the visible tree once. Returns `true` while any continues.
    pub fn advance_fling(&mut self) -> bool {
        let mut running = self.controller.advance_fling();
        self.propagate();
        for child in &mut self.children {
            if child.rect.is_some() {
                running |= child.coordinator.advance_fling();
            }
        }
        running
    }

    pub fn force_redraw(&mut self) {
        self.controller.force_redraw();
        self.propagate();
    }
}

impl FrameView for FrameCoordinator {
    fn layout(&mut self, width: f64, height: f64) {
        self.controller.set_layout_dimensions(width, height);
        self.propagate();
    }

    fn paint(&self, canvas: &mut dyn Canvas) {
        self.controller.paint(canvas);
        let bounds = Rect::from_origin_size(Point::ZERO, self.controller.viewport().size());
        for v in self.controller.visible_subframes() {
            let Some(child) = self.children.get(v.slot) else {
                continue;
            };
            let clip = v.rect.intersect(bounds);
            if !rect_has_area(clip) {
                continue;
            }
            let mut layer = LayerCanvas::new(&mut *canvas)
                .with_transform(Affine::translate(v.rect.origin().to_vec2()))
                .with_clip(clip);
            child.coordinator.paint(&mut layer);
        }
    }

    fn on_gesture(&mut self, event: GestureEvent) -> bool {
        let consumed = match event {
            GestureEvent::Down { x, y } => return self.on_down(x, y),
            GestureEvent::ScrollBy { dx, dy } => {
                if self.scroll_touched_child(dx, dy) {
                    return true;
                }
                self.controller.scroll_by(dx, dy)
            }
            GestureEvent::ScrollEnd => {
                if let Some(child) = self.touched_child_mut() {
                    child.coordinator.on_gesture(GestureEvent::ScrollEnd);
                }
                self.controller.scroll_end();
                true
            }
            GestureEvent::ScaleBy { factor, focal } => self.controller.scale_by(factor, focal),
            GestureEvent::ScaleFinished { factor, focal } => {
                self.controller.scale_finished(factor, focal)
            }
            GestureEvent::Fling { vx, vy } => {
                if self.fling_touched_child(vx, vy) {
                    return true;
                }
                self.controller.on_fling(vx, vy)
            }
            GestureEvent::Click { x, y } => return self.on_click(x, y),
        };
        self.propagate();
        consumed
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frame/coordinator.rs"]
mod tests;
