pub mod coordinator;
pub mod subframes;
pub mod tree;
