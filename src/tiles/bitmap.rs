use std::sync::Arc;

use crate::foundation::core::Rgba8Premul;
use crate::foundation::error::{PreviewError, PreviewResult};

/// Rasterized tile content in premultiplied RGBA8 form.
///
/// Pixel storage is shared, so clones are cheap and the bytes are released when the last clone
/// (normally the one held by a tile matrix) is dropped.
#[derive(Clone, Debug)]
pub struct Bitmap {
    width: u32,
    height: u32,
    rgba8_premul: Arc<Vec<u8>>,
}

impl Bitmap {
    /// Wrap tightly packed, row-major premultiplied RGBA8 bytes.
    pub fn new(width: u32, height: u32, rgba8_premul: Vec<u8>) -> PreviewResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| PreviewError::validation("bitmap size overflow"))?;
        if rgba8_premul.len() != expected {
            return Err(PreviewError::validation(format!(
                "bitmap expects {expected} bytes for {width}x{height}, got {}",
                rgba8_premul.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba8_premul),
        })
    }

    /// Bitmap filled with a single color.
    pub fn solid(width: u32, height: u32, color: Rgba8Premul) -> Self {
        let px = (width as usize).saturating_mul(height as usize);
        let mut data = Vec::with_capacity(px.saturating_mul(4));
        for _ in 0..px {
            data.extend_from_slice(&color.to_array());
        }
        Self {
            width,
            height,
            rgba8_premul: Arc::new(data),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.rgba8_premul
    }

    pub fn byte_len(&self) -> usize {
        self.rgba8_premul.len()
    }

    /// Pixel at `(x, y)`, clamped to the bitmap edges.
    pub fn pixel_clamped(&self, x: i64, y: i64) -> [u8; 4] {
        if self.width == 0 || self.height == 0 {
            return [0; 4];
        }
        let x = x.clamp(0, i64::from(self.width) - 1) as usize;
        let y = y.clamp(0, i64::from(self.height) - 1) as usize;
        let i = (y * self.width as usize + x) * 4;
        let d = &self.rgba8_premul;
        [d[i], d[i + 1], d[i + 2], d[i + 3]]
    }
}
