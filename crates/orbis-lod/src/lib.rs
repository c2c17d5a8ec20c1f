//! Quadtree level of detail over the six cube faces.
//!
//! Each face is the root of a quadtree of [`Patch`]es. Splitting a patch
//! gives four children covering its UV quadrants at the next level. Leaves
//! carry an optional payload (raw [`PatchGeometry`], or whatever the caller
//! builds per patch) and [`LodScheduler`] decides when the tree should be
//! re-evaluated.

mod forest;
mod geometry;
mod node;
mod patch;
mod scheduler;

pub use forest::PatchForest;
pub use geometry::{PatchGeometry, sample_directions, sample_heights};
pub use node::PatchNode;
pub use patch::{MAX_PATCH_RESOLUTION, MIN_PATCH_RESOLUTION, Patch, patch_resolution};
pub use scheduler::{LodScheduler, MAX_FRAME_TIME, SchedulerTick};
