//! Tile grid arithmetic shared by the cache and the painter.
//!
//! Every function here is pure. Callers guarantee finite, non-negative inputs; degenerate tile
//! sizes or empty matrices produce an empty range instead of panicking.

use crate::foundation::core::{Point, Rect, Size, TileIndex, TileRange};

/// Tile index range covering `rect`, clamped into a `rows x cols` matrix.
///
/// `row_start = max(0, floor(top / tile_h))`, `row_end = min(rows, ceil(bottom / tile_h))`, and
/// symmetric for columns.
pub fn tiles_covering(rect: Rect, tile: Size, rows: usize, cols: usize) -> TileRange {
    if !(tile.width > 0.0 && tile.height > 0.0) || rows == 0 || cols == 0 {
        return TileRange::EMPTY;
    }
    let rect = rect.abs();
    let row_start = floor_index(rect.y0 / tile.height);
    let row_end = ceil_index(rect.y1 / tile.height).min(rows);
    let col_start = floor_index(rect.x0 / tile.width);
    let col_end = ceil_index(rect.x1 / tile.width).min(cols);
    TileRange {
        row_start: row_start.min(row_end),
        row_end,
        col_start: col_start.min(col_end),
        col_end,
    }
}

/// Pixel origin of a tile in scaled content space: `(col * tile_w, row * tile_h)`.
pub fn tile_origin(row: usize, col: usize, tile: Size) -> Point {
    Point::new(col as f64 * tile.width, row as f64 * tile.height)
}

/// Full pixel rectangle of the tile at `idx`.
pub fn tile_rect(idx: TileIndex, tile: Size) -> Rect {
    Rect::from_origin_size(tile_origin(idx.row, idx.col, tile), tile)
}

/// Matrix dimensions `(rows, cols)` needed to cover `content` rendered at `scale`.
pub fn grid_dims(content: Size, scale: f64, tile: Size) -> (usize, usize) {
    if !(tile.width > 0.0 && tile.height > 0.0) || !(scale > 0.0) {
        return (0, 0);
    }
    let rows = ceil_index(content.height * scale / tile.height);
    let cols = ceil_index(content.width * scale / tile.width);
    (rows, cols)
}

fn floor_index(v: f64) -> usize {
    if v.is_finite() { v.floor().max(0.0) as usize } else { 0 }
}

fn ceil_index(v: f64) -> usize {
    if v.is_finite() { v.ceil().max(0.0) as usize } else { 0 }
}

#[cfg(test)]
#[path = "../../tests/unit/tiles/coords.rs"]
mod tests;
