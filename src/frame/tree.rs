use std::collections::{BTreeMap, BTreeSet};

use crate::foundation::core::{FrameId, Rect, Size};
use crate::foundation::error::{PreviewError, PreviewResult};

/// Explicit frame registry of one snapshot, owned by the composition root.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameTree {
    pub root: FrameId,
    pub frames: Vec<FrameSpec>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameSpec {
    pub id: FrameId,
    pub content_width: f64,
    pub content_height: f64,
    #[serde(default)]
    pub subframes: Vec<SubFrameSpec>,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SubFrameSpec {
    pub frame: FrameId,
    /// Placement in the parent's unscaled content space.
    pub clip: Rect,
}

impl FrameSpec {
    pub fn content_size(&self) -> Size {
        Size::new(self.content_width, self.content_height)
    }
}

impl FrameTree {
    pub fn from_json_str(s: &str) -> PreviewResult<Self> {
        let tree: Self = serde_json::from_str(s)
            .map_err(|e| PreviewError::serde(format!("invalid frame tree: {e}")))?;
        tree.validate()?;
        Ok(tree)
    }

    pub fn get(&self, id: FrameId) -> Option<&FrameSpec> {
        self.frames.iter().find(|f| f.id == id)
    }

    /// Check ids, sizes, clip rects and the parent/child structure.
    ///
    /// Every child must exist and have exactly one parent, and embedding must not loop. Frames
    /// detached from the root are allowed but never shown.
    pub fn validate(&self) -> PreviewResult<()> {
        let mut by_id = BTreeMap::new();
        for frame in &self.frames {
            if by_id.insert(frame.id, frame).is_some() {
                return Err(PreviewError::validation(format!(
                    "duplicate frame id {}",
                    frame.id
                )));
            }
            let size_ok = frame.content_width.is_finite()
                && frame.content_height.is_finite()
                && frame.content_width >= 0.0
                && frame.content_height >= 0.0;
            if !size_ok {
                return Err(PreviewError::validation(format!(
                    "{} content size must be finite and >= 0",
                    frame.id
                )));
            }
        }
        if !by_id.contains_key(&self.root) {
            return Err(PreviewError::validation(format!(
                "root {} is not a registered frame",
                self.root
            )));
        }

        let mut parent_of = BTreeMap::new();
        for frame in &self.frames {
            for sub in &frame.subframes {
                if !by_id.contains_key(&sub.frame) {
                    return Err(PreviewError::validation(format!(
                        "{} references unknown subframe {}",
                        frame.id, sub.frame
                    )));
                }
                let clip = sub.clip;
                if ![clip.x0, clip.y0, clip.x1, clip.y1]
                    .iter()
                    .all(|v| v.is_finite())
                {
                    return Err(PreviewError::validation(format!(
                        "{} has a non-finite clip rect for {}",
                        frame.id, sub.frame
                    )));
                }
                if sub.frame == self.root || parent_of.insert(sub.frame, frame.id).is_some() {
                    return Err(PreviewError::validation(format!(
                        "{} is embedded more than once or embeds the root",
                        sub.frame
                    )));
                }
            }
        }

        // One parent per frame: walking up from any frame either ends at a parentless frame or
        // loops.
        for &start in by_id.keys() {
            let mut seen = BTreeSet::from([start]);
            let mut cur = start;
            while let Some(&parent) = parent_of.get(&cur) {
                if !seen.insert(parent) {
                    return Err(PreviewError::validation(format!(
                        "{start} is part of a subframe cycle"
                    )));
                }
                cur = parent;
            }
            if cur != self.root {
                tracing::warn!(frame = %start, "frame is not reachable from the root");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frame/tree.rs"]
mod tests;
