use crate::foundation::core::{Affine, Rect, Rgba8Premul, rect_has_area};
use crate::foundation::error::{PreviewError, PreviewResult};
use crate::foundation::math::over;
use crate::tiles::bitmap::Bitmap;

/// Drawing target injected by the host surface.
pub trait Canvas {
    /// Draw the `src` region of `bitmap` (bitmap pixel space) into `dst` (canvas space).
    fn draw_bitmap(&mut self, bitmap: &Bitmap, src: Rect, dst: Rect);
}

/// Canvas adapter applying an axis-aligned transform and an optional clip before forwarding.
///
/// The clip is expressed in the inner canvas space. Used to position sub-frames inside their
/// parent and to stretch bitmaps during a pinch gesture.
pub struct LayerCanvas<'a> {
    inner: &'a mut dyn Canvas,
    transform: Affine,
    clip: Option<Rect>,
}

impl<'a> LayerCanvas<'a> {
    pub fn new(inner: &'a mut dyn Canvas) -> Self {
        Self {
            inner,
            transform: Affine::IDENTITY,
            clip: None,
        }
    }

    pub fn with_transform(mut self, transform: Affine) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_clip(mut self, clip: Rect) -> Self {
        self.clip = Some(clip);
        self
    }
}

impl Canvas for LayerCanvas<'_> {
    fn draw_bitmap(&mut self, bitmap: &Bitmap, src: Rect, dst: Rect) {
        let dst = self.transform.transform_rect_bbox(dst);
        if !rect_has_area(dst) || !rect_has_area(src) {
            return;
        }
        let Some(clip) = self.clip else {
            self.inner.draw_bitmap(bitmap, src, dst);
            return;
        };

        let visible = dst.intersect(clip);
        if !rect_has_area(visible) {
            return;
        }
        let sx = src.width() / dst.width();
        let sy = src.height() / dst.height();
        let src = Rect::new(
            src.x0 + (visible.x0 - dst.x0) * sx,
            src.y0 + (visible.y0 - dst.y0) * sy,
            src.x0 + (visible.x1 - dst.x0) * sx,
            src.y0 + (visible.y1 - dst.y0) * sy,
        );
        self.inner.draw_bitmap(bitmap, src, visible);
    }
}

/// Software canvas backed by a premultiplied RGBA8 buffer.
///
/// Bitmaps are sampled nearest-neighbor and blended src-over. A pixel is written when its
/// center lies inside the destination rect, so abutting tiles never overlap or leave seams.
#[derive(Clone, Debug)]
pub struct RasterCanvas {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RasterCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; (width as usize) * (height as usize) * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn clear(&mut self, color: Rgba8Premul) {
        let c = color.to_array();
        for px in self.data.chunks_exact_mut(4) {
            px.copy_from_slice(&c);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y as usize) * (self.width as usize) + x as usize) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Convert to straight-alpha RGBA8 for encoders.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        for px in out.chunks_exact_mut(4) {
            let a = px[3];
            if a == 0 || a == 255 {
                continue;
            }
            for c in &mut px[..3] {
                *c = ((u32::from(*c) * 255 + u32::from(a) / 2) / u32::from(a)).min(255) as u8;
            }
        }
        out
    }

    /// Encode as PNG via the `image` crate.
    pub fn save_png(&self, path: &std::path::Path) -> PreviewResult<()> {
        let img = image::RgbaImage::from_raw(self.width, self.height, self.to_straight_rgba8())
            .ok_or_else(|| PreviewError::validation("raster canvas buffer size mismatch"))?;
        img.save(path)
            .map_err(|e| PreviewError::Other(anyhow::Error::new(e)))
    }
}

impl Canvas for RasterCanvas {
    fn draw_bitmap(&mut self, bitmap: &Bitmap, src: Rect, dst: Rect) {
        if !rect_has_area(dst) || !rect_has_area(src) {
            return;
        }
        let x_start = (dst.x0 - 0.5).ceil().max(0.0) as u32;
        let y_start = (dst.y0 - 0.5).ceil().max(0.0) as u32;
        let x_end = ((dst.x1 - 0.5).ceil().max(0.0) as u32).min(self.width);
        let y_end = ((dst.y1 - 0.5).ceil().max(0.0) as u32).min(self.height);
        let sx = src.width() / dst.width();
        let sy = src.height() / dst.height();

        for y in y_start..y_end {
            let v = src.y0 + (f64::from(y) + 0.5 - dst.y0) * sy;
            let row = (y as usize) * (self.width as usize);
            for x in x_start..x_end {
                let u = src.x0 + (f64::from(x) + 0.5 - dst.x0) * sx;
                let s = bitmap.pixel_clamped(u.floor() as i64, v.floor() as i64);
                let i = (row + x as usize) * 4;
                let d = [
                    self.data[i],
                    self.data[i + 1],
                    self.data[i + 2],
                    self.data[i + 3],
                ];
                self.data[i..i + 4].copy_from_slice(&over(d, s));
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/canvas.rs"]
mod tests;
