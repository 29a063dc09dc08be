pub mod backend;
pub mod geometry;
pub mod snapshot;
