use std::sync::Mutex;

use super::*;
use crate::compositor::fetch::{TileReply, TileRequest};
use crate::foundation::core::{Rgba8Premul, Size, TileIndex};
use crate::frame::tree::{FrameSpec, SubFrameSpec};
use crate::render::canvas::RasterCanvas;
use crate::tiles::bitmap::Bitmap;
use crate::viewport::gesture::GestureState;

#[derive(Default)]
struct Recording {
    requests: Mutex<Vec<(TileRequest, TileReply)>>,
}

impl TileCompositor for Recording {
    fn request_tile(&self, request: TileRequest, reply: TileReply) {
        self.requests.lock().unwrap().push((request, reply));
    }
}

impl Recording {
    fn frames_requested(&self) -> Vec<FrameId> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(r, _)| r.frame)
            .collect()
    }

    /// Complete everything: frame 1 red, everything else blue.
    fn fulfil_all(&self) {
        let pending = std::mem::take(&mut *self.requests.lock().unwrap());
        for (req, reply) in pending {
            let color = if req.frame == FrameId(1) {
                Rgba8Premul::from_straight_rgba(255, 0, 0, 255)
            } else {
                Rgba8Premul::from_straight_rgba(0, 0, 255, 255)
            };
            reply.complete(Ok(Bitmap::solid(
                req.rect.width().round() as u32,
                req.rect.height().round() as u32,
                color,
            )));
        }
    }
}

#[derive(Default)]
struct Clicks(Mutex<Vec<(FrameId, Point)>>);

impl HitTester for Clicks {
    fn on_click(&self, frame: FrameId, content_point: Point) {
        self.0.lock().unwrap().push((frame, content_point));
    }
}

fn spec(id: u64, w: f64, h: f64, subs: &[(u64, Rect)]) -> FrameSpec {
    FrameSpec {
        id: FrameId(id),
        content_width: w,
        content_height: h,
        subframes: subs
            .iter()
            .map(|&(frame, clip)| SubFrameSpec {
                frame: FrameId(frame),
                clip,
            })
            .collect(),
    }
}

/// Page 1000x2000 with an iframe near the top (2) and one near the bottom (3).
fn page_tree() -> FrameTree {
    FrameTree {
        root: FrameId(1),
        frames: vec![
            spec(
                1,
                1000.0,
                2000.0,
                &[
                    (2, Rect::new(0.0, 100.0, 400.0, 400.0)),
                    (3, Rect::new(0.0, 1500.0, 400.0, 1700.0)),
                ],
            ),
            spec(2, 400.0, 900.0, &[]),
            spec(3, 400.0, 200.0, &[]),
        ],
    }
}

fn opts() -> PlayerOpts {
    PlayerOpts {
        prefetch_margin: 0,
        first_paint_timeout_ms: 60_000,
        ..PlayerOpts::default()
    }
}

fn player() -> (FrameCoordinator, Arc<Recording>) {
    let compositor = Arc::new(Recording::default());
    let coordinator = FrameCoordinator::build(&page_tree(), compositor.clone(), opts()).unwrap();
    (coordinator, compositor)
}

#[test]
fn build_rejects_invalid_tree() {
    let tree = FrameTree {
        root: FrameId(1),
        frames: vec![spec(1, 10.0, 10.0, &[(5, Rect::new(0.0, 0.0, 1.0, 1.0))])],
    };
    let result = FrameCoordinator::build(&tree, Arc::new(Recording::default()), opts());
    assert!(matches!(result, Err(PreviewError::Validation(_))));
}

#[test]
fn layout_commits_visible_children_only() {
    let (mut p, compositor) = player();
    p.layout(500.0, 500.0);

    let frames = compositor.frames_requested();
    assert!(frames.contains(&FrameId(1)));
    assert!(frames.contains(&FrameId(2)));
    assert!(!frames.contains(&FrameId(3)));

    let child = p.find(FrameId(2)).unwrap().controller();
    assert_eq!(child.scale_factor(), 0.5);
    assert_eq!(child.viewport(), Rect::new(0.0, 0.0, 200.0, 150.0));
    let hidden = p.find(FrameId(3)).unwrap().controller();
    assert!(!hidden.has_layout());
}

#[test]
fn children_scrolled_out_release_tiles() {
    let (mut p, compositor) = player();
    p.layout(500.0, 500.0);
    compositor.fulfil_all();
    p.pump_tile_responses();
    assert_eq!(p.find(FrameId(2)).unwrap().controller().live_scale_states(), 1);

    assert!(p.on_gesture(GestureEvent::ScrollBy { dx: 0.0, dy: 500.0 }));
    assert!(compositor.frames_requested().contains(&FrameId(3)));
    assert_eq!(p.find(FrameId(2)).unwrap().controller().live_scale_states(), 0);
    assert!(p.find(FrameId(3)).unwrap().controller().has_layout());
}

#[test]
fn responses_are_routed_and_children_paint_on_top() {
    let (mut p, compositor) = player();
    p.layout(500.0, 500.0);
    assert!(!p.is_ready_to_show());
    compositor.fulfil_all();
    assert!(p.pump_tile_responses() > 0);
    assert!(p.is_ready_to_show());
    assert!(p.take_redraw_request());

    let child = p.find(FrameId(2)).unwrap().controller();
    assert!(child.active_state().unwrap().is_present(TileIndex::new(0, 0)));

    let mut canvas = RasterCanvas::new(500, 500);
    p.paint(&mut canvas);
    // Child occupies (0,50)-(200,200) in the root viewport.
    assert_eq!(canvas.pixel(10, 60), [0, 0, 255, 255]);
    assert_eq!(canvas.pixel(199, 199), [0, 0, 255, 255]);
    assert_eq!(canvas.pixel(10, 10), [255, 0, 0, 255]);
    assert_eq!(canvas.pixel(300, 300), [255, 0, 0, 255]);
    assert_eq!(canvas.pixel(10, 200), [255, 0, 0, 255]);
}

#[test]
fn clicks_resolve_to_deepest_frame() {
    let clicks = Arc::new(Clicks::default());
    let compositor = Arc::new(Recording::default());
    let mut p = FrameCoordinator::build(&page_tree(), compositor, opts())
        .unwrap()
        .with_hit_tester(clicks.clone());
    p.layout(500.0, 500.0);

    assert!(p.on_gesture(GestureEvent::Click { x: 10.0, y: 60.0 }));
    assert!(p.on_gesture(GestureEvent::Click { x: 300.0, y: 300.0 }));
    let got = clicks.0.lock().unwrap().clone();
    assert_eq!(got[0].0, FrameId(2));
    assert!((got[0].1.x - 20.0).abs() < 1e-9 && (got[0].1.y - 20.0).abs() < 1e-9);
    assert_eq!(got[1].0, FrameId(1));
    assert!((got[1].1.x - 600.0).abs() < 1e-9 && (got[1].1.y - 600.0).abs() < 1e-9);
}

#[test]
fn click_without_hit_tester_is_not_consumed() {
    let (mut p, _compositor) = player();
    p.layout(500.0, 500.0);
    assert!(!p.on_gesture(GestureEvent::Click { x: 1.0, y: 1.0 }));
}

#[test]
fn pinch_stretches_children_then_commits_them() {
    let (mut p, compositor) = player();
    p.layout(500.0, 500.0);
    compositor.fulfil_all();
    p.pump_tile_responses();

    assert!(p.on_gesture(GestureEvent::ScaleBy {
        factor: 2.0,
        focal: Point::ZERO
    }));
    assert!(compositor.frames_requested().is_empty());
    let child = p.find(FrameId(2)).unwrap().controller();
    assert_eq!(child.transforms().bitmap(), Affine::scale(2.0));

    assert!(p.on_gesture(GestureEvent::ScaleFinished {
        factor: 1.0,
        focal: Point::ZERO
    }));
    let child = p.find(FrameId(2)).unwrap().controller();
    assert_eq!(child.scale_factor(), 1.0);
    assert_eq!(child.transforms().bitmap(), Affine::IDENTITY);
    assert_eq!(child.viewport().size(), Size::new(400.0, 300.0));
    assert!(compositor.frames_requested().contains(&FrameId(2)));
}

#[test]
fn first_paint_wait_can_be_skipped_or_time_out() {
    let (mut p, _compositor) = player();
    p.layout(500.0, 500.0);
    assert!(!p.is_ready_to_show());
    p.skip_first_paint_wait();
    assert!(p.is_ready_to_show());

    let immediate = PlayerOpts {
        first_paint_timeout_ms: 0,
        ..opts()
    };
    let p = FrameCoordinator::build(&page_tree(), Arc::new(Recording::default()), immediate)
        .unwrap();
    assert!(p.is_ready_to_show());
}

#[test]
fn low_memory_trims_every_frame() {
    let (mut p, compositor) = player();
    p.layout(500.0, 500.0);
    compositor.fulfil_all();
    p.pump_tile_responses();
    p.on_gesture(GestureEvent::ScaleBy {
        factor: 2.0,
        focal: Point::ZERO,
    });
    p.on_gesture(GestureEvent::ScaleFinished {
        factor: 2.0,
        focal: Point::ZERO,
    });
    assert_eq!(p.controller().live_scale_states(), 2);
    assert_eq!(p.find(FrameId(2)).unwrap().controller().live_scale_states(), 2);

    p.on_low_memory();
    assert_eq!(p.controller().live_scale_states(), 1);
    assert_eq!(p.find(FrameId(2)).unwrap().controller().live_scale_states(), 1);
}

#[test]
fn wait_for_tiles_returns_once_loaded() {
    let (mut p, compositor) = player();
    p.layout(500.0, 500.0);
    compositor.fulfil_all();
    let handled = p.wait_for_tiles(Duration::from_secs(5));
    assert!(handled >= 2);
    assert!(p.is_ready_to_show());

    // Nothing outstanding: returns at the deadline without handling anything.
    p.on_gesture(GestureEvent::ScrollBy { dx: 0.0, dy: 400.0 });
    assert_eq!(p.wait_for_tiles(Duration::from_millis(10)), 0);
}

/// Page 1000x2000 holding a scrollable iframe: content 1000x3000 shown through a 200px clip.
fn scrollable_child_player() -> FrameCoordinator {
    let tree = FrameTree {
        root: FrameId(1),
        frames: vec![
            spec(1, 1000.0, 2000.0, &[(2, Rect::new(0.0, 100.0, 1000.0, 300.0))]),
            spec(2, 1000.0, 3000.0, &[]),
        ],
    };
    let mut p = FrameCoordinator::build(&tree, Arc::new(Recording::default()), opts()).unwrap();
    p.layout(500.0, 500.0);
    p
}

#[test]
fn scroll_over_subframe_moves_the_subframe() {
    let mut p = scrollable_child_player();
    // Child occupies (0,50)-(500,150) of the root viewport.
    assert!(p.on_gesture(GestureEvent::Down { x: 10.0, y: 60.0 }));
    assert!(p.on_gesture(GestureEvent::ScrollBy { dx: 0.0, dy: 50.0 }));
    assert_eq!(p.find(FrameId(2)).unwrap().controller().viewport().y0, 50.0);
    assert_eq!(p.controller().viewport().y0, 0.0);
    assert!(p.take_redraw_request());

    // A pointer outside the child scrolls the page.
    assert!(p.on_gesture(GestureEvent::Down { x: 10.0, y: 300.0 }));
    assert!(p.on_gesture(GestureEvent::ScrollBy { dx: 0.0, dy: 50.0 }));
    assert_eq!(p.controller().viewport().y0, 50.0);
    assert_eq!(p.find(FrameId(2)).unwrap().controller().viewport().y0, 50.0);
}

#[test]
fn subframe_at_its_edge_hands_scroll_to_parent() {
    let mut p = scrollable_child_player();
    p.on_gesture(GestureEvent::Down { x: 10.0, y: 60.0 });

    // Child content is 1500 scaled pixels tall in a 100px viewport.
    assert!(p.on_gesture(GestureEvent::ScrollBy {
        dx: 0.0,
        dy: 10_000.0
    }));
    assert_eq!(p.find(FrameId(2)).unwrap().controller().viewport().y0, 1400.0);
    assert_eq!(p.controller().viewport().y0, 0.0);

    assert!(p.on_gesture(GestureEvent::ScrollBy { dx: 0.0, dy: 30.0 }));
    assert_eq!(p.controller().viewport().y0, 30.0);
    assert_eq!(p.find(FrameId(2)).unwrap().controller().viewport().y0, 1400.0);
}

#[test]
fn fling_follows_the_frame_that_scrolled() {
    let mut p = scrollable_child_player();
    p.on_gesture(GestureEvent::Down { x: 10.0, y: 60.0 });
    p.on_gesture(GestureEvent::ScrollBy { dx: 0.0, dy: 10.0 });
    p.on_gesture(GestureEvent::ScrollEnd);

    assert!(p.on_gesture(GestureEvent::Fling {
        vx: 0.0,
        vy: -2000.0
    }));
    let child = p.find(FrameId(2)).unwrap().controller();
    assert_eq!(child.gesture_state(), GestureState::Flinging);
    assert_eq!(p.controller().gesture_state(), GestureState::Idle);

    let mut polls = 0;
    while p.advance_fling() && polls < 10_000 {
        polls += 1;
    }
    assert!(polls > 0);
    assert!(p.find(FrameId(2)).unwrap().controller().viewport().y0 > 10.0);
    assert_eq!(p.controller().viewport().y0, 0.0);
}

#[test]
fn gestures_without_down_stay_on_root() {
    let mut p = scrollable_child_player();
    assert!(p.on_gesture(GestureEvent::ScrollBy { dx: 0.0, dy: 50.0 }));
    assert_eq!(p.controller().viewport().y0, 50.0);
    assert_eq!(p.find(FrameId(2)).unwrap().controller().viewport().y0, 0.0);
}
