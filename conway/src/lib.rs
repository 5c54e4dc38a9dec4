// lib.rs - Game of Life core: the toroidal world, Conway's rule, row-band
// partitioning and per-region computation.
//
// Everything here is transport-agnostic. The worker service computes
// `RegionResult`s with `compute_region_parallel`; the broker splits
// each turn with `partition` and folds the results back with `merge`.

mod error;
mod grid;
mod partition;
mod region;

pub mod patterns;
pub mod rule;

pub use error::{Axis, RegionError};
pub use grid::{ALIVE, Cell, DEAD, World};
pub use partition::{Band, merge, partition};
pub use region::{Region, RegionResult, compute_region, compute_region_parallel};
