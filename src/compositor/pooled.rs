use std::sync::Arc;

use crate::compositor::fetch::{TileCompositor, TileReply, TileRequest};
use crate::config::PlayerOpts;
use crate::foundation::error::{FetchError, PreviewError, PreviewResult};
use crate::tiles::bitmap::Bitmap;

/// Synchronous tile rasterization, run off the owner thread by [`PooledCompositor`].
pub trait TileRasterizer: Send + Sync + 'static {
    fn rasterize(&self, request: &TileRequest) -> Result<Bitmap, FetchError>;
}

/// [`TileCompositor`] that rasterizes each request on a rayon pool.
///
/// Completion order follows pool scheduling, not request order.
pub struct PooledCompositor<R> {
    rasterizer: Arc<R>,
    pool: rayon::ThreadPool,
}

impl<R: TileRasterizer> PooledCompositor<R> {
    /// `threads = None` uses the rayon default.
    pub fn new(rasterizer: R, threads: Option<usize>) -> PreviewResult<Self> {
        Ok(Self {
            rasterizer: Arc::new(rasterizer),
            pool: build_thread_pool(threads)?,
        })
    }

    pub fn from_opts(rasterizer: R, opts: &PlayerOpts) -> PreviewResult<Self> {
        Self::new(rasterizer, opts.compositor_threads)
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }
}

impl<R: TileRasterizer> TileCompositor for PooledCompositor<R> {
    fn request_tile(&self, request: TileRequest, reply: TileReply) {
        let rasterizer = Arc::clone(&self.rasterizer);
        self.pool.spawn(move || {
            let result = rasterizer.rasterize(&request);
            if let Err(err) = &result {
                tracing::debug!(frame = %request.frame, %err, "rasterize failed");
            }
            reply.complete(result);
        });
    }
}

fn build_thread_pool(threads: Option<usize>) -> PreviewResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(PreviewError::validation(
            "compositor threads must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new()
        .thread_name(|i| format!("paint-preview-raster-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| PreviewError::validation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/compositor/pooled.rs"]
mod tests;
