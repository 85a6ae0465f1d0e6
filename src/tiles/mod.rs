pub mod bitmap;
pub mod cache_state;
pub mod coords;
pub(crate) mod scale_cache;
