#![forbid(unsafe_code)]

mod foundation;

pub mod compositor;
pub mod config;
pub mod frame;
pub mod render;
pub mod tiles;
pub mod viewport;

pub use compositor::fetch::{
    TileCompositor, TileFetcher, TileReply, TileRequest, TileResponse, TileTicket,
};
pub use compositor::image_source::ImageRasterizer;
pub use compositor::pooled::{PooledCompositor, TileRasterizer};
pub use config::{MAX_SCALE_FACTOR, PlayerOpts};
pub use foundation::core::{
    Affine, FrameId, Point, Rect, Rgba8Premul, Size, TileIndex, TileRange, Vec2,
};
pub use foundation::error::{FetchError, PreviewError, PreviewResult};
pub use frame::coordinator::{FrameCoordinator, HitTester};
pub use frame::subframes::{SubFrameRef, SubFrameRegistry, VisibleSubFrame};
pub use frame::tree::{FrameSpec, FrameTree, SubFrameSpec};
pub use render::canvas::{Canvas, LayerCanvas, RasterCanvas};
pub use render::painter::{TileDraw, TilePainter, tile_draws};
pub use tiles::bitmap::Bitmap;
pub use tiles::cache_state::{BitmapCacheState, TileFetch, TileFetchOutcome, TileGrid};
pub use tiles::coords::{grid_dims, tile_origin, tile_rect, tiles_covering};
pub use viewport::controller::{SubFramePush, ViewportController};
pub use viewport::gesture::{FrameView, GestureEvent, GestureState};
pub use viewport::scroller::{DecelerationScroller, OverscrollHandler, Scroller};
pub use viewport::transform::GestureTransforms;
