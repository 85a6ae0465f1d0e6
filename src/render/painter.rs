use crate::foundation::core::{Rect, TileIndex, rect_has_area};
use crate::render::canvas::Canvas;
use crate::tiles::cache_state::TileGrid;
use crate::tiles::coords::{tile_rect, tiles_covering};

/// One tile draw: the visible part of a tile and where it lands on the canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileDraw {
    pub index: TileIndex,
    /// Tile-local source rect.
    pub src: Rect,
    /// Viewport-local destination rect.
    pub dst: Rect,
}

/// Composites the present tiles of a [`TileGrid`] that intersect a viewport.
///
/// Absent and pending tiles are skipped; whatever the canvas already holds shows through.
#[derive(Debug, Default)]
pub struct TilePainter {
    scratch: Vec<TileDraw>,
}

impl TilePainter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw `grid` for `viewport` (same scaled space as the grid).
    pub fn paint(&mut self, canvas: &mut dyn Canvas, viewport: Rect, grid: &TileGrid) {
        self.paint_scaled(canvas, viewport, grid, 1.0);
    }

    /// Draw `grid` with destination rects multiplied by `dst_scale`.
    ///
    /// Lets a grid rasterized at another scale factor stand in for the active one.
    pub fn paint_scaled(
        &mut self,
        canvas: &mut dyn Canvas,
        viewport: Rect,
        grid: &TileGrid,
        dst_scale: f64,
    ) {
        let mut draws = std::mem::take(&mut self.scratch);
        draws.clear();
        collect_tile_draws(viewport, grid, dst_scale, &mut draws);
        for d in &draws {
            if let Some(bitmap) = grid.get(d.index) {
                canvas.draw_bitmap(bitmap, d.src, d.dst);
            }
        }
        self.scratch = draws;
    }
}

/// Compute draws for every present tile of `grid` visible through `viewport`.
pub fn tile_draws(viewport: Rect, grid: &TileGrid, dst_scale: f64) -> Vec<TileDraw> {
    let mut out = Vec::new();
    collect_tile_draws(viewport, grid, dst_scale, &mut out);
    out
}

fn collect_tile_draws(viewport: Rect, grid: &TileGrid, dst_scale: f64, out: &mut Vec<TileDraw>) {
    if !rect_has_area(viewport) || !(dst_scale > 0.0) {
        return;
    }
    let tile = grid.tile_size();
    let range = tiles_covering(viewport, tile, grid.rows(), grid.cols());
    let origin = viewport.origin().to_vec2();

    for index in range.iter() {
        if grid.get(index).is_none() {
            continue;
        }
        let tile_px = tile_rect(index, tile);
        let visible = tile_px.intersect(viewport);
        if !rect_has_area(visible) {
            continue;
        }
        out.push(TileDraw {
            index,
            src: visible - tile_px.origin().to_vec2(),
            dst: (visible - origin).scale_from_origin(dst_scale),
        });
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/painter.rs"]
mod tests;
