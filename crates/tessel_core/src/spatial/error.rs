use super::{CellCoord, EntityHandle, MapId};
use thiserror::Error;

/// Errors surfaced by grid mutation and broad-phase setup.
///
/// Query paths never return these: an unknown map simply yields an empty
/// result.
#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("{0} has no spatial grid")]
    InvalidMap(MapId),

    #[error("cell ({}, {}) is full ({capacity} entities)", cell.x, cell.y)]
    CapacityExceeded { cell: CellCoord, capacity: usize },

    #[error("bounds for entity {entity} cover {cells} cells, more than the limit of {limit}")]
    TooManyCells { entity: EntityHandle, cells: u64, limit: u64 },

    #[error("bounds for entity {entity} are not finite or are inverted")]
    InvalidBounds { entity: EntityHandle },

    #[error("entity {0} is already tracked")]
    AlreadyTracked(EntityHandle),

    #[error("entity {0} is not tracked")]
    NotTracked(EntityHandle),

    #[error("recorded cells of entity {entity} do not match the bounds passed as its previous location")]
    InconsistentState { entity: EntityHandle },

    #[error("failed to start broad-phase workers")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
