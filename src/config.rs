use crate::foundation::error::{PreviewError, PreviewResult};

/// Upper bound for the committed scale factor unless overridden in [`PlayerOpts`].
pub const MAX_SCALE_FACTOR: f64 = 5.0;

/// Player tunables.
///
/// Every field has a default, so a partial JSON object (or `{}`) is a valid configuration.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PlayerOpts {
    /// Largest committed scale factor. The smallest is always fit-to-width.
    pub max_scale_factor: f64,
    /// Ring of neighbour tiles requested around the visible ones.
    pub prefetch_margin: usize,
    /// Scale-factor cache states alive per frame (active plus retained).
    pub max_scale_states: usize,
    /// Show the frame after this long even when tiles are still missing.
    pub first_paint_timeout_ms: u64,
    /// Exponential decay rate of a fling, per second.
    pub fling_friction: f64,
    /// A fling stops once its speed (px/s) drops below this.
    pub fling_min_velocity: f64,
    /// Simulated time advanced by each fling poll.
    pub fling_frame_ms: u64,
    /// Worker threads for the pooled compositor; `None` uses the rayon default.
    pub compositor_threads: Option<usize>,
}

impl Default for PlayerOpts {
    fn default() -> Self {
        Self {
            max_scale_factor: MAX_SCALE_FACTOR,
            prefetch_margin: 1,
            max_scale_states: 2,
            first_paint_timeout_ms: 2000,
            fling_friction: 4.0,
            fling_min_velocity: 20.0,
            fling_frame_ms: 16,
            compositor_threads: None,
        }
    }
}

impl PlayerOpts {
    /// Parse options from JSON and validate them.
    pub fn from_json_str(s: &str) -> PreviewResult<Self> {
        let opts: Self = serde_json::from_str(s)
            .map_err(|e| PreviewError::serde(format!("invalid player options: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> PreviewResult<()> {
        if !self.max_scale_factor.is_finite() || self.max_scale_factor <= 0.0 {
            return Err(PreviewError::validation(
                "max_scale_factor must be finite and > 0",
            ));
        }
        if self.max_scale_states == 0 {
            return Err(PreviewError::validation("max_scale_states must be >= 1"));
        }
        if !self.fling_friction.is_finite() || self.fling_friction <= 0.0 {
            return Err(PreviewError::validation(
                "fling_friction must be finite and > 0",
            ));
        }
        if !self.fling_min_velocity.is_finite() || self.fling_min_velocity < 0.0 {
            return Err(PreviewError::validation(
                "fling_min_velocity must be finite and >= 0",
            ));
        }
        if self.fling_frame_ms == 0 {
            return Err(PreviewError::validation("fling_frame_ms must be > 0"));
        }
        if let Some(n) = self.compositor_threads
            && n == 0
        {
            return Err(PreviewError::validation(
                "compositor_threads must be >= 1 when set",
            ));
        }
        Ok(())
    }

    pub(crate) fn first_paint_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.first_paint_timeout_ms)
    }
}
