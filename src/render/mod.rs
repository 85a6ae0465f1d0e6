pub mod canvas;
pub mod painter;
