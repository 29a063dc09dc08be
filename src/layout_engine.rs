mod cache;
pub mod locate;
pub mod mover;
pub mod placement;

pub use cache::Caches;
pub use mover::{MoveOutcome, VisitDetails};
pub use placement::{NodeInfo, Placement, PlacementError, ScreenPlacement, StackSlot};
