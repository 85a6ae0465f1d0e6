use crate::foundation::core::{Affine, Point, Size, Vec2};
use crate::foundation::math::clamp_or_low;

/// The two coupled matrices of a frame's viewport.
///
/// `committed` maps unscaled content coordinates to canvas coordinates. `bitmap` maps the
/// currently painted tiles (rasterized at the committed scale factor) to the canvas and is the
/// identity outside a pinch. A pinch post-multiplies both by the same incremental transform, so
/// `bitmap == committed * committed_at_gesture_start.inverse()` holds throughout.
///
/// Values are immutable snapshots: every operation returns a new pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureTransforms {
    committed: Affine,
    bitmap: Affine,
}

impl Default for GestureTransforms {
    fn default() -> Self {
        Self {
            committed: Affine::IDENTITY,
            bitmap: Affine::IDENTITY,
        }
    }
}

impl GestureTransforms {
    /// Pair for a committed viewport at `origin` (scaled space) and `scale_factor`.
    pub fn committed_for(origin: Point, scale_factor: f64) -> Self {
        Self {
            committed: Affine::translate(-origin.to_vec2()) * Affine::scale(scale_factor),
            bitmap: Affine::IDENTITY,
        }
    }

    pub fn committed(&self) -> Affine {
        self.committed
    }

    pub fn bitmap(&self) -> Affine {
        self.bitmap
    }

    /// Scale factor of the committed matrix.
    pub fn committed_scale(&self) -> f64 {
        self.committed.as_coeffs()[0]
    }

    pub fn committed_translation(&self) -> Vec2 {
        self.committed.translation()
    }

    /// Post-scale both matrices by `factor` about the canvas point `focal`.
    pub fn scaled_about(self, factor: f64, focal: Point) -> Self {
        let f = focal.to_vec2();
        let step = Affine::translate(f) * Affine::scale(factor) * Affine::translate(-f);
        Self {
            committed: step * self.committed,
            bitmap: step * self.bitmap,
        }
    }

    /// Post-translate both matrices by `delta` canvas pixels.
    pub fn translated(self, delta: Vec2) -> Self {
        if delta == Vec2::ZERO {
            return self;
        }
        let step = Affine::translate(delta);
        Self {
            committed: step * self.committed,
            bitmap: step * self.bitmap,
        }
    }

    /// Smallest translation that brings the committed content back inside `viewport`.
    ///
    /// Content narrower (or shorter) than the viewport is pinned to the leading edge.
    pub fn bounds_correction(&self, content: Size, viewport: Size) -> Vec2 {
        let s = self.committed_scale();
        let t = self.committed_translation();
        let min_x = (viewport.width - content.width * s).min(0.0);
        let min_y = (viewport.height - content.height * s).min(0.0);
        Vec2::new(
            clamp_or_low(t.x, min_x, 0.0) - t.x,
            clamp_or_low(t.y, min_y, 0.0) - t.y,
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/viewport/transform.rs"]
mod tests;
