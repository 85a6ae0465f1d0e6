pub mod fetch;
pub mod image_source;
pub mod pooled;
