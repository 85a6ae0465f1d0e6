use std::collections::VecDeque;

use crate::foundation::core::{Size, TileIndex};
use crate::foundation::error::FetchError;
use crate::tiles::bitmap::Bitmap;
use crate::tiles::cache_state::{BitmapCacheState, TileFetchOutcome};

/// Bounded set of per-scale-factor cache states for one frame.
///
/// The active state serves the committed scale factor. Recently active states are retained
/// (most recent first) so their bitmaps can underlay the active one while it loads, and so a
/// quick zoom back finds its tiles. At most `max_states` states are alive at once.
#[derive(Debug)]
pub(crate) struct ScaleStateCache {
    active: Option<BitmapCacheState>,
    retained: VecDeque<BitmapCacheState>,
    max_states: usize,
    prefetch_margin: usize,
    next_generation: u64,
}

impl ScaleStateCache {
    pub(crate) fn new(max_states: usize, prefetch_margin: usize) -> Self {
        Self {
            active: None,
            retained: VecDeque::new(),
            max_states: max_states.max(1),
            prefetch_margin,
            next_generation: 1,
        }
    }

    pub(crate) fn active(&self) -> Option<&BitmapCacheState> {
        self.active.as_ref()
    }

    /// Most recently retained state, painted underneath the active one.
    pub(crate) fn underlay(&self) -> Option<&BitmapCacheState> {
        self.retained.front()
    }

    pub(crate) fn live_states(&self) -> usize {
        usize::from(self.active.is_some()) + self.retained.len()
    }

    /// Make the state for `(scale_factor, tile_size)` active, creating it lazily.
    pub(crate) fn select(
        &mut self,
        scale_factor: f64,
        tile_size: Size,
        content: Size,
    ) -> &mut BitmapCacheState {
        let state = match self.active.take() {
            Some(current) if current.matches(scale_factor, tile_size) => current,
            previous => {
                let reused = self
                    .retained
                    .iter()
                    .position(|s| s.matches(scale_factor, tile_size))
                    .and_then(|i| self.retained.remove(i));
                let next = match reused {
                    Some(state) => state,
                    None => {
                        let generation = self.next_generation;
                        self.next_generation = self.next_generation.wrapping_add(1);
                        BitmapCacheState::new(
                            generation,
                            scale_factor,
                            tile_size,
                            content,
                            self.prefetch_margin,
                        )
                    }
                };
                if let Some(previous) = previous {
                    self.retained.push_front(previous);
                }
                self.retained.truncate(self.max_states - 1);
                next
            }
        };
        self.active.insert(state)
    }

    /// Deliver a fetch result to the state with `generation`.
    ///
    /// Returns `None` when that state has been dropped; the result is discarded.
    pub(crate) fn route(
        &mut self,
        generation: u64,
        idx: TileIndex,
        result: Result<Bitmap, FetchError>,
    ) -> Option<TileFetchOutcome> {
        let state = self
            .active
            .iter_mut()
            .chain(self.retained.iter_mut())
            .find(|s| s.generation() == generation)?;
        Some(state.on_tile_fetched(idx, result))
    }

    /// Drop retained states once the active one no longer needs an underlay.
    pub(crate) fn drop_retained_if_loaded(&mut self) -> bool {
        let loaded = self.active.as_ref().is_some_and(|s| s.is_fully_loaded());
        if loaded && !self.retained.is_empty() {
            tracing::debug!(dropped = self.retained.len(), "active scale state loaded");
            self.retained.clear();
            return true;
        }
        false
    }

    /// Release memory under pressure: drop retained states and evict unrequired active tiles.
    pub(crate) fn trim(&mut self) {
        self.retained.clear();
        if let Some(active) = self.active.as_mut() {
            active.evict_unrequired();
        }
    }

    /// Drop every state, releasing all bitmaps. In-flight results are discarded on arrival.
    pub(crate) fn clear(&mut self) {
        self.active = None;
        self.retained.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/tiles/scale_cache.rs"]
mod tests;
