use super::*;
use crate::foundation::core::{Rgba8Premul, Size};
use crate::tiles::bitmap::Bitmap;
use crate::tiles::cache_state::BitmapCacheState;

#[derive(Default)]
struct RecordingCanvas {
    calls: Vec<(Rect, Rect)>,
}

impl Canvas for RecordingCanvas {
    fn draw_bitmap(&mut self, _bitmap: &Bitmap, src: Rect, dst: Rect) {
        self.calls.push((src, dst));
    }
}

fn loaded_state(present: &[(usize, usize)]) -> BitmapCacheState {
    // 400x400 content at scale 1.0, 100x100 tiles.
    let mut s = BitmapCacheState::new(1, 1.0, Size::new(100.0, 100.0), Size::new(400.0, 400.0), 0);
    s.request_coverage(Rect::new(0.0, 0.0, 400.0, 400.0));
    for &(row, col) in present {
        s.on_tile_fetched(
            TileIndex::new(row, col),
            Ok(Bitmap::solid(100, 100, Rgba8Premul::from_straight_rgba(0, 0, 0, 255))),
        );
    }
    s
}

#[test]
fn draws_visible_part_of_each_present_tile() {
    let s = loaded_state(&[(0, 0), (0, 1), (1, 0), (1, 1)]);
    let draws = tile_draws(Rect::new(50.0, 50.0, 150.0, 150.0), s.grid(), 1.0);
    assert_eq!(draws.len(), 4);
    assert_eq!(draws[0].index, TileIndex::new(0, 0));
    assert_eq!(draws[0].src, Rect::new(50.0, 50.0, 100.0, 100.0));
    assert_eq!(draws[0].dst, Rect::new(0.0, 0.0, 50.0, 50.0));
    assert_eq!(draws[3].index, TileIndex::new(1, 1));
    assert_eq!(draws[3].src, Rect::new(0.0, 0.0, 50.0, 50.0));
    assert_eq!(draws[3].dst, Rect::new(50.0, 50.0, 100.0, 100.0));
}

#[test]
fn absent_tiles_are_skipped() {
    let s = loaded_state(&[(0, 0)]);
    let mut canvas = RecordingCanvas::default();
    TilePainter::new().paint(&mut canvas, Rect::new(0.0, 0.0, 200.0, 200.0), s.grid());
    assert_eq!(canvas.calls.len(), 1);
}

#[test]
fn degenerate_viewport_is_noop() {
    let s = loaded_state(&[(0, 0)]);
    let mut canvas = RecordingCanvas::default();
    let mut painter = TilePainter::new();
    painter.paint(&mut canvas, Rect::new(10.0, 10.0, 10.0, 200.0), s.grid());
    painter.paint(&mut canvas, Rect::ZERO, s.grid());
    assert!(canvas.calls.is_empty());
}

#[test]
fn empty_grid_is_noop() {
    let grid = TileGrid::new(0, 0, Size::new(100.0, 100.0));
    let mut canvas = RecordingCanvas::default();
    TilePainter::new().paint(&mut canvas, Rect::new(0.0, 0.0, 100.0, 100.0), &grid);
    assert!(canvas.calls.is_empty());
}

#[test]
fn scaled_paint_stretches_destination() {
    let s = loaded_state(&[(0, 0)]);
    let draws = tile_draws(Rect::new(0.0, 0.0, 50.0, 50.0), s.grid(), 2.0);
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].src, Rect::new(0.0, 0.0, 50.0, 50.0));
    assert_eq!(draws[0].dst, Rect::new(0.0, 0.0, 100.0, 100.0));
}
