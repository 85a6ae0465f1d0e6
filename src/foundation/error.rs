pub type PreviewResult<T> = Result<T, PreviewError>;

#[derive(thiserror::Error, Debug)]
pub enum PreviewError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("tile fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PreviewError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

/// Failure reported by a tile compositor for a single tile request.
///
/// Fetch failures never escape the player: the tile stays absent and is requested again by the
/// next coverage pass that still needs it.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("compositor failed: {0}")]
    Compositor(String),

    #[error("compositor returned no bitmap")]
    Empty,

    #[error("reply dropped before completion")]
    Dropped,
}

impl FetchError {
    pub fn compositor(msg: impl Into<String>) -> Self {
        Self::Compositor(msg.into())
    }
}
