use std::sync::{Arc, mpsc};

use crate::foundation::core::{FrameId, Rect, TileIndex};
use crate::foundation::error::FetchError;
use crate::tiles::bitmap::Bitmap;
use crate::tiles::cache_state::TileFetch;

/// What the compositor is asked to rasterize.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileRequest {
    pub frame: FrameId,
    /// Pixel rect in the frame's content space scaled by `scale_factor`.
    pub rect: Rect,
    pub scale_factor: f64,
}

/// Routing key carried alongside a request and echoed in its response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileTicket {
    pub frame: FrameId,
    pub generation: u64,
    pub index: TileIndex,
}

/// A completed fetch on its way back to the owner thread.
#[derive(Debug)]
pub struct TileResponse {
    pub ticket: TileTicket,
    pub result: Result<Bitmap, FetchError>,
}

/// One-shot completion handle for a tile request.
///
/// Safe to move to any thread. Dropping it without calling [`TileReply::complete`] reports
/// [`FetchError::Dropped`], so the tile never stays pending forever.
#[derive(Debug)]
pub struct TileReply {
    tx: Option<mpsc::Sender<TileResponse>>,
    ticket: TileTicket,
}

impl TileReply {
    pub(crate) fn new(tx: mpsc::Sender<TileResponse>, ticket: TileTicket) -> Self {
        Self {
            tx: Some(tx),
            ticket,
        }
    }

    pub fn ticket(&self) -> TileTicket {
        self.ticket
    }

    pub fn complete(mut self, result: Result<Bitmap, FetchError>) {
        self.send(result);
    }

    fn send(&mut self, result: Result<Bitmap, FetchError>) {
        if let Some(tx) = self.tx.take() {
            // The player may be gone already; late results are simply dropped.
            let _ = tx.send(TileResponse {
                ticket: self.ticket,
                result,
            });
        }
    }
}

impl Drop for TileReply {
    fn drop(&mut self) {
        if self.tx.is_some() {
            tracing::debug!(frame = %self.ticket.frame, index = ?self.ticket.index, "tile reply dropped");
            self.send(Err(FetchError::Dropped));
        }
    }
}

/// The native compositor that rasterizes tiles.
///
/// Requests may be completed on any thread, in any order. Overlapping and duplicate rects across
/// scale factors must be tolerated.
pub trait TileCompositor: Send + Sync {
    fn request_tile(&self, request: TileRequest, reply: TileReply);
}

/// Hands a frame's tile fetches to the compositor with replies wired to the player's channel.
#[derive(Clone)]
pub struct TileFetcher {
    compositor: Arc<dyn TileCompositor>,
    responses: mpsc::Sender<TileResponse>,
}

impl std::fmt::Debug for TileFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileFetcher").finish_non_exhaustive()
    }
}

impl TileFetcher {
    pub fn new(compositor: Arc<dyn TileCompositor>, responses: mpsc::Sender<TileResponse>) -> Self {
        Self {
            compositor,
            responses,
        }
    }

    pub fn dispatch(&self, frame: FrameId, fetch: &TileFetch) {
        tracing::trace!(%frame, generation = fetch.generation, index = ?fetch.index, "dispatch tile fetch");
        let reply = TileReply::new(
            self.responses.clone(),
            TileTicket {
                frame,
                generation: fetch.generation,
                index: fetch.index,
            },
        );
        self.compositor.request_tile(
            TileRequest {
                frame,
                rect: fetch.rect,
                scale_factor: fetch.scale_factor,
            },
            reply,
        );
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compositor/fetch.rs"]
mod tests;
