pub mod controller;
pub mod gesture;
pub mod scroller;
pub mod transform;
