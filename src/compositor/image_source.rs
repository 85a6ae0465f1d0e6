use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;

use crate::compositor::fetch::TileRequest;
use crate::compositor::pooled::TileRasterizer;
use crate::foundation::core::{FrameId, Rgba8Premul};
use crate::foundation::error::{FetchError, PreviewResult};
use crate::frame::tree::FrameTree;
use crate::tiles::bitmap::Bitmap;

/// Rasterizes tiles by resampling full-page snapshots, one per frame.
///
/// Each snapshot is expected at 1:1 unscaled content resolution. Tiles are sampled
/// nearest-neighbor; areas outside the snapshot come out transparent.
#[derive(Debug, Default)]
pub struct ImageRasterizer {
    snapshots: HashMap<FrameId, image::RgbaImage>,
}

impl ImageRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, frame: FrameId, snapshot: image::RgbaImage) {
        self.snapshots.insert(frame, snapshot);
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn load_png(&mut self, frame: FrameId, path: &Path) -> PreviewResult<()> {
        let img = image::open(path)
            .with_context(|| format!("decode snapshot {}", path.display()))?
            .to_rgba8();
        tracing::debug!(%frame, width = img.width(), height = img.height(), "loaded snapshot");
        self.insert(frame, img);
        Ok(())
    }

    /// Load `<dir>/<frame id>.png` for every frame of `tree` that has one.
    pub fn load_dir(&mut self, tree: &FrameTree, dir: &Path) -> PreviewResult<usize> {
        let mut loaded = 0;
        for frame in &tree.frames {
            let path = dir.join(format!("{}.png", frame.id.0));
            if !path.is_file() {
                tracing::warn!(frame = %frame.id, path = %path.display(), "missing snapshot");
                continue;
            }
            self.load_png(frame.id, &path)?;
            loaded += 1;
        }
        Ok(loaded)
    }
}

impl TileRasterizer for ImageRasterizer {
    fn rasterize(&self, request: &TileRequest) -> Result<Bitmap, FetchError> {
        let snapshot = self
            .snapshots
            .get(&request.frame)
            .ok_or_else(|| FetchError::compositor(format!("no snapshot for {}", request.frame)))?;

        let width = request.rect.width().round();
        let height = request.rect.height().round();
        let scale = request.scale_factor;
        if !(width >= 1.0 && height >= 1.0 && scale > 0.0 && scale.is_finite()) {
            return Err(FetchError::Empty);
        }
        let (w, h) = (width as u32, height as u32);
        let (sw, sh) = snapshot.dimensions();

        let mut data = Vec::with_capacity((w as usize) * (h as usize) * 4);
        for y in 0..h {
            let sy = ((request.rect.y0 + f64::from(y) + 0.5) / scale).floor();
            for x in 0..w {
                let sx = ((request.rect.x0 + f64::from(x) + 0.5) / scale).floor();
                let px = if sx >= 0.0 && sy >= 0.0 && sx < f64::from(sw) && sy < f64::from(sh) {
                    let [r, g, b, a] = snapshot.get_pixel(sx as u32, sy as u32).0;
                    Rgba8Premul::from_straight_rgba(r, g, b, a)
                } else {
                    Rgba8Premul::transparent()
                };
                data.extend_from_slice(&px.to_array());
            }
        }
        Bitmap::new(w, h, data).map_err(|e| FetchError::compositor(e.to_string()))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compositor/image_source.rs"]
mod tests;
