// error.rs - Errors raised when a region request breaks the grid contract

use thiserror::Error;

/// Axis a bound belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::X => f.write_str("x"),
            Axis::Y => f.write_str("y"),
        }
    }
}

/// Contract violations in partitioning, region computation and merging.
///
/// These are never clamped or skipped: a caller that receives one has
/// sent a malformed request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegionError {
    #[error("empty or inverted {axis} range [{start}, {end})")]
    EmptyRange { axis: Axis, start: usize, end: usize },

    #[error("{axis} range ends at {end}, past the grid limit {limit}")]
    OutOfBounds { axis: Axis, end: usize, limit: usize },

    #[error("world holds {actual_cells} cells, expected {}x{}", expected.0, expected.1)]
    DimensionMismatch {
        expected: (usize, usize),
        actual_cells: usize,
    },

    #[error("request claims a {claimed_width}x{claimed_height} grid but the snapshot is {width}x{height}")]
    SnapshotMismatch {
        claimed_width: usize,
        claimed_height: usize,
        width: usize,
        height: usize,
    },

    #[error("slice of {}x{} at ({}, {}) does not fit a {}x{} world", size.0, size.1, start.0, start.1, world.0, world.1)]
    SliceOutOfBounds {
        start: (usize, usize),
        size: (usize, usize),
        world: (usize, usize),
    },

    #[error("cannot partition a grid across zero workers")]
    NoWorkers,

    #[error("local region task failed: {0}")]
    Task(String),
}
