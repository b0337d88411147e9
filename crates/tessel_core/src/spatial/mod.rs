//! Dynamic spatial partitioning and broad-phase pairing.
//!
//! Per tick: entities move, their grid memberships are patched on the main
//! thread, the broad phase scans every map in parallel and yields a
//! duplicate-free candidate pair list for the narrow phase. Gameplay code
//! asks "who is near this point" through a single-slot cache in front of the
//! grids.

mod bounds;
mod broad_phase;
mod collector;
mod context;
mod dedup;
mod entity;
mod error;
mod grid;
mod nearby;
mod pairs;
mod registry;

pub use bounds::{Aabb, CellCoord, CellSpan, CellSpanIter};
pub use broad_phase::{BroadPhase, BroadPhaseStats};
pub use collector::{EntitySet, EntitySink};
pub use context::{EntitySource, Placement, SpatialContext, SyncReport};
pub use dedup::{pair_key, PairDeduplicator};
pub use entity::{CollisionLayers, EntityHandle, MapId};
pub use error::SpatialError;
pub use grid::{Bucket, HashGrid, MoveOutcome, TrackedBounds};
pub use nearby::NearbyQueryCache;
pub use pairs::{PairBuffer, PairCollector, PairInfo};
pub use registry::MapRegistry;
