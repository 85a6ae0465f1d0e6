use smallvec::SmallVec;

use crate::foundation::core::{Rect, Size, TileIndex};
use crate::foundation::error::FetchError;
use crate::tiles::bitmap::Bitmap;
use crate::tiles::coords::{grid_dims, tile_rect, tiles_covering};

/// Row-major matrix of tile bitmaps for one scale factor.
#[derive(Debug, Clone)]
pub struct TileGrid {
    rows: usize,
    cols: usize,
    tile_size: Size,
    cells: Vec<Option<Bitmap>>,
}

impl TileGrid {
    pub fn new(rows: usize, cols: usize, tile_size: Size) -> Self {
        Self {
            rows,
            cols,
            tile_size,
            cells: vec![None; rows.saturating_mul(cols)],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn tile_size(&self) -> Size {
        self.tile_size
    }

    /// Bitmap at `idx`, or `None` when absent or outside the matrix.
    pub fn get(&self, idx: TileIndex) -> Option<&Bitmap> {
        if idx.row >= self.rows || idx.col >= self.cols {
            return None;
        }
        self.cells[idx.row * self.cols + idx.col].as_ref()
    }

    /// Number of tiles currently holding a bitmap.
    pub fn present_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Total bytes held by present tiles.
    pub fn retained_bytes(&self) -> usize {
        self.cells.iter().flatten().map(Bitmap::byte_len).sum()
    }

    fn slot(&self, idx: TileIndex) -> usize {
        assert!(
            idx.row < self.rows && idx.col < self.cols,
            "tile index ({}, {}) is out of bounds for {}x{} tile matrix",
            idx.row,
            idx.col,
            self.rows,
            self.cols
        );
        idx.row * self.cols + idx.col
    }
}

/// A tile fetch the owner must hand to the compositor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileFetch {
    /// Generation of the cache state that issued the fetch.
    pub generation: u64,
    /// Tile position in the issuing state's matrix.
    pub index: TileIndex,
    /// Pixel rectangle in scaled content space.
    pub rect: Rect,
    /// Scale factor the tile is rasterized at.
    pub scale_factor: f64,
}

/// What happened to a completed fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileFetchOutcome {
    /// Bitmap stored; the frame should redraw.
    Stored,
    /// Result dropped because the tile was no longer pending or no longer required.
    Discarded,
    /// Compositor reported an error; the tile stays absent.
    Failed,
}

/// Tile bookkeeping for one frame at one scale factor.
///
/// Each tile is absent, pending or present, plus an orthogonal `required` flag. Present tiles
/// are never pending, and after [`BitmapCacheState::evict_unrequired`] no present tile is
/// unrequired.
#[derive(Debug)]
pub struct BitmapCacheState {
    generation: u64,
    scale_factor: f64,
    grid: TileGrid,
    pending: Vec<bool>,
    required: Vec<bool>,
    prefetch_margin: usize,
}

impl BitmapCacheState {
    /// Create an empty state for `content` rendered at `scale_factor` with `tile_size` tiles.
    pub fn new(
        generation: u64,
        scale_factor: f64,
        tile_size: Size,
        content: Size,
        prefetch_margin: usize,
    ) -> Self {
        let (rows, cols) = grid_dims(content, scale_factor, tile_size);
        let n = rows.saturating_mul(cols);
        tracing::debug!(generation, scale_factor, rows, cols, "created bitmap cache state");
        Self {
            generation,
            scale_factor,
            grid: TileGrid::new(rows, cols, tile_size),
            pending: vec![false; n],
            required: vec![false; n],
            prefetch_margin,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn tile_size(&self) -> Size {
        self.grid.tile_size
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    /// Return `true` when this state serves `scale_factor` with tiles of `tile_size`.
    pub fn matches(&self, scale_factor: f64, tile_size: Size) -> bool {
        self.scale_factor == scale_factor && self.grid.tile_size == tile_size
    }

    pub fn is_present(&self, idx: TileIndex) -> bool {
        self.grid.cells[self.grid.slot(idx)].is_some()
    }

    pub fn is_pending(&self, idx: TileIndex) -> bool {
        self.pending[self.grid.slot(idx)]
    }

    pub fn is_required(&self, idx: TileIndex) -> bool {
        self.required[self.grid.slot(idx)]
    }

    pub fn pending_count(&self) -> usize {
        self.pending.iter().filter(|p| **p).count()
    }

    pub fn required_count(&self) -> usize {
        self.required.iter().filter(|r| **r).count()
    }

    /// Mark the tiles covering `viewport` plus the prefetch margin as required.
    ///
    /// Returns the fetches to dispatch, viewport tiles first, then margin tiles. Tiles that are
    /// already present or pending are never requested again.
    pub fn request_coverage(&mut self, viewport: Rect) -> Vec<TileFetch> {
        self.required.fill(false);
        let range = tiles_covering(
            viewport,
            self.grid.tile_size,
            self.grid.rows,
            self.grid.cols,
        );

        let mut fetches = Vec::new();
        for idx in range.iter() {
            self.require(idx, &mut fetches);
        }
        if self.prefetch_margin > 0 {
            for idx in range.iter() {
                for neighbor in self.neighbors(idx) {
                    self.require(neighbor, &mut fetches);
                }
            }
        }

        tracing::trace!(
            generation = self.generation,
            visible = range.len(),
            fetches = fetches.len(),
            "coverage pass"
        );
        fetches
    }

    /// Apply a completed fetch for `idx`.
    pub fn on_tile_fetched(
        &mut self,
        idx: TileIndex,
        result: Result<Bitmap, FetchError>,
    ) -> TileFetchOutcome {
        let s = self.grid.slot(idx);
        if !self.pending[s] {
            tracing::trace!(generation = self.generation, ?idx, "fetch result for non-pending tile");
            return TileFetchOutcome::Discarded;
        }
        self.pending[s] = false;

        match result {
            Err(err) => {
                tracing::debug!(generation = self.generation, ?idx, %err, "tile fetch failed");
                TileFetchOutcome::Failed
            }
            Ok(_) if !self.required[s] => {
                tracing::trace!(generation = self.generation, ?idx, "discarded unrequired tile");
                TileFetchOutcome::Discarded
            }
            Ok(bitmap) => {
                self.grid.cells[s] = Some(bitmap);
                TileFetchOutcome::Stored
            }
        }
    }

    /// Release every present tile that is not required. Returns how many were released.
    pub fn evict_unrequired(&mut self) -> usize {
        let mut evicted = 0;
        for (cell, required) in self.grid.cells.iter_mut().zip(&self.required) {
            if !*required && cell.take().is_some() {
                evicted += 1;
            }
        }
        if evicted > 0 {
            tracing::trace!(generation = self.generation, evicted, "evicted tiles");
        }
        evicted
    }

    /// Return `true` when every required tile is present.
    pub fn is_fully_loaded(&self) -> bool {
        self.required
            .iter()
            .zip(&self.grid.cells)
            .all(|(required, cell)| !*required || cell.is_some())
    }

    fn require(&mut self, idx: TileIndex, fetches: &mut Vec<TileFetch>) {
        let s = self.grid.slot(idx);
        self.required[s] = true;
        if self.grid.cells[s].is_some() || self.pending[s] {
            return;
        }
        self.pending[s] = true;
        fetches.push(TileFetch {
            generation: self.generation,
            index: idx,
            rect: tile_rect(idx, self.grid.tile_size),
            scale_factor: self.scale_factor,
        });
    }

    fn neighbors(&self, idx: TileIndex) -> SmallVec<[TileIndex; 4]> {
        let mut out = SmallVec::new();
        for k in 1..=self.prefetch_margin {
            if idx.row >= k {
                out.push(TileIndex::new(idx.row - k, idx.col));
            }
            if idx.row + k < self.grid.rows {
                out.push(TileIndex::new(idx.row + k, idx.col));
            }
            if idx.col >= k {
                out.push(TileIndex::new(idx.row, idx.col - k));
            }
            if idx.col + k < self.grid.cols {
                out.push(TileIndex::new(idx.row, idx.col + k));
            }
        }
        out
    }
}

impl Drop for BitmapCacheState {
    fn drop(&mut self) {
        let present = self.grid.present_count();
        if present > 0 || self.pending_count() > 0 {
            tracing::debug!(
                generation = self.generation,
                scale_factor = self.scale_factor,
                present,
                pending = self.pending_count(),
                "dropped bitmap cache state"
            );
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/tiles/cache_state.rs"]
mod tests;
