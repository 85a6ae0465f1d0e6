use crate::foundation::core::{FrameId, Rect, rect_has_area};

/// A child frame placed inside its parent at an unscaled clip rect.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubFrameRef {
    pub child: FrameId,
    /// Clip rect in the parent's unscaled content space.
    pub clip: Rect,
}

/// A child intersecting the parent's viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisibleSubFrame {
    /// Registration slot of the child.
    pub slot: usize,
    pub child: FrameId,
    /// Scaled clip rect relative to the parent viewport's origin. May extend past the viewport.
    pub rect: Rect,
}

/// Ordered set of a frame's children. Later registrations paint on top.
#[derive(Clone, Debug, Default)]
pub struct SubFrameRegistry {
    refs: Vec<SubFrameRef>,
}

impl SubFrameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a child and return its slot.
    pub fn register(&mut self, child: FrameId, clip: Rect) -> usize {
        self.refs.push(SubFrameRef { child, clip });
        self.refs.len() - 1
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn refs(&self) -> &[SubFrameRef] {
        &self.refs
    }

    /// Children whose scaled clip intersects `viewport`, in registration order.
    pub fn compute_visible(&self, viewport: Rect, scale_factor: f64) -> Vec<VisibleSubFrame> {
        if !rect_has_area(viewport) || !(scale_factor > 0.0) {
            return Vec::new();
        }
        let origin = viewport.origin().to_vec2();
        self.refs
            .iter()
            .enumerate()
            .filter_map(|(slot, r)| {
                let scaled = r.clip.scale_from_origin(scale_factor);
                rect_has_area(scaled.intersect(viewport)).then(|| VisibleSubFrame {
                    slot,
                    child: r.child,
                    rect: scaled - origin,
                })
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frame/subframes.rs"]
mod tests;
