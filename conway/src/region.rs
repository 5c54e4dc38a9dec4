// region.rs - Next-state computation for one assigned region of the world

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Axis, RegionError};
use crate::grid::{Cell, World};
use crate::partition::{Band, partition};
use crate::rule::{neighbour_count, next_state};

/// Rectangle `[start_x, end_x) × [start_y, end_y)` assigned to a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub start_y: usize,
    pub end_y: usize,
    pub start_x: usize,
    pub end_x: usize,
}

impl Region {
    /// Full-width region for a row band.
    pub fn band(band: Band, width: usize) -> Self {
        Self {
            start_y: band.start_y,
            end_y: band.end_y,
            start_x: 0,
            end_x: width,
        }
    }

    /// Checks the region against the claimed grid size and the snapshot it will read.
    pub fn validate(&self, snapshot: &World, height: usize, width: usize) -> Result<(), RegionError> {
        if snapshot.width() != width || snapshot.height() != height {
            return Err(RegionError::SnapshotMismatch {
                claimed_width: width,
                claimed_height: height,
                width: snapshot.width(),
                height: snapshot.height(),
            });
        }
        check_range(Axis::Y, self.start_y, self.end_y, height)?;
        check_range(Axis::X, self.start_x, self.end_x, width)
    }
}

fn check_range(axis: Axis, start: usize, end: usize, limit: usize) -> Result<(), RegionError> {
    if start >= end {
        return Err(RegionError::EmptyRange { axis, start, end });
    }
    if end > limit {
        return Err(RegionError::OutOfBounds { axis, end, limit });
    }
    Ok(())
}

/// Outcome of computing one region: the new cells plus its alive telemetry.
///
/// `slice` is `(end_x - start_x) × (end_y - start_y)` and holds only the region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionResult {
    pub slice: World,
    pub start_y: usize,
    pub end_y: usize,
    pub start_x: usize,
    pub end_x: usize,
    pub alive_count: usize,
    pub alive_cells: Vec<Cell>,
}

impl RegionResult {
    /// Stacks vertically adjacent results (same columns, ascending rows) into one.
    fn concat(region: Region, parts: Vec<RegionResult>) -> Result<Self, RegionError> {
        let mut slice = World::new(region.end_x - region.start_x, region.end_y - region.start_y);
        let mut alive_count = 0;
        let mut alive_cells = Vec::new();
        for part in parts {
            slice.paste(0, part.start_y - region.start_y, &part.slice)?;
            alive_count += part.alive_count;
            alive_cells.extend(part.alive_cells);
        }
        Ok(Self {
            slice,
            start_y: region.start_y,
            end_y: region.end_y,
            start_x: region.start_x,
            end_x: region.end_x,
            alive_count,
            alive_cells,
        })
    }
}

/// Applies the rule to every cell of `region`, reading neighbours from `snapshot`.
///
/// The snapshot must be the complete grid: edge rows and columns of the region
/// read their neighbours from the opposite side of the torus.
pub fn compute_region(
    snapshot: &World,
    region: Region,
    height: usize,
    width: usize,
) -> Result<RegionResult, RegionError> {
    region.validate(snapshot, height, width)?;

    let mut slice = World::new(region.end_x - region.start_x, region.end_y - region.start_y);
    let mut alive_cells = Vec::new();
    for y in region.start_y..region.end_y {
        for x in region.start_x..region.end_x {
            let alive = next_state(snapshot.get(x, y), neighbour_count(snapshot, x, y));
            if alive {
                slice.set(x - region.start_x, y - region.start_y, true);
                alive_cells.push(Cell { x, y });
            }
        }
    }

    Ok(RegionResult {
        slice,
        start_y: region.start_y,
        end_y: region.end_y,
        start_x: region.start_x,
        end_x: region.end_x,
        alive_count: alive_cells.len(),
        alive_cells,
    })
}

/// Same result as [`compute_region`], with the rows split across `tasks` blocking tasks.
///
/// Each task accumulates its own alive list; the lists are joined in row order
/// once every task has finished, so the output is exact and deterministic.
pub async fn compute_region_parallel(
    snapshot: Arc<World>,
    region: Region,
    height: usize,
    width: usize,
    tasks: usize,
) -> Result<RegionResult, RegionError> {
    region.validate(&snapshot, height, width)?;
    if tasks <= 1 {
        return compute_region(&snapshot, region, height, width);
    }

    let sub_bands = partition(region.end_y - region.start_y, tasks)?;
    debug!(?region, sub_bands = sub_bands.len(), "computing region");

    let mut handles = Vec::with_capacity(sub_bands.len());
    for band in sub_bands {
        let sub = Region {
            start_y: region.start_y + band.start_y,
            end_y: region.start_y + band.end_y,
            ..region
        };
        let snapshot = Arc::clone(&snapshot);
        handles.push(tokio::task::spawn_blocking(move || {
            compute_region(&snapshot, sub, height, width)
        }));
    }

    let mut parts = Vec::with_capacity(handles.len());
    for handle in handles {
        let part = handle.await.map_err(|e| RegionError::Task(e.to_string()))??;
        parts.push(part);
    }
    RegionResult::concat(region, parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns;

    fn full(world: &World) -> Region {
        Region {
            start_y: 0,
            end_y: world.height(),
            start_x: 0,
            end_x: world.width(),
        }
    }

    #[test]
    fn band_slice_only_holds_its_rows() {
        let world = patterns::build("blinker", 5, 5).unwrap();
        let region = Region { start_y: 1, end_y: 4, start_x: 0, end_x: 5 };
        let result = compute_region(&world, region, 5, 5).unwrap();

        assert_eq!(result.slice.height(), 3);
        assert_eq!(result.alive_count, 3);
        assert_eq!(result.alive_cells, vec![Cell::new(2, 1), Cell::new(2, 2), Cell::new(2, 3)]);
    }

    #[test]
    fn sub_rectangle_in_x_is_supported() {
        let world = patterns::build("blinker", 5, 5).unwrap();
        let region = Region { start_y: 0, end_y: 5, start_x: 2, end_x: 3 };
        let result = compute_region(&world, region, 5, 5).unwrap();

        assert_eq!((result.slice.width(), result.slice.height()), (1, 5));
        assert_eq!(result.alive_count, 3);
    }

    #[test]
    fn rejects_out_of_range_and_mismatched_requests() {
        let world = World::new(4, 4);
        let past_end = Region { start_y: 2, end_y: 5, start_x: 0, end_x: 4 };
        assert_eq!(
            compute_region(&world, past_end, 4, 4),
            Err(RegionError::OutOfBounds { axis: Axis::Y, end: 5, limit: 4 })
        );

        let inverted = Region { start_y: 0, end_y: 4, start_x: 3, end_x: 3 };
        assert!(matches!(
            compute_region(&world, inverted, 4, 4),
            Err(RegionError::EmptyRange { axis: Axis::X, .. })
        ));

        assert!(matches!(
            compute_region(&world, full(&world), 5, 4),
            Err(RegionError::SnapshotMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn parallel_matches_serial() {
        let world = patterns::build("r-pentomino", 13, 11).unwrap();
        let world = crate::rule::step(&crate::rule::step(&world));
        let serial = compute_region(&world, full(&world), 11, 13).unwrap();

        let shared = Arc::new(world);
        for tasks in [1, 2, 3, 4, 11, 20] {
            let parallel = compute_region_parallel(Arc::clone(&shared), full(&shared), 11, 13, tasks)
                .await
                .unwrap();
            assert_eq!(parallel, serial, "tasks = {tasks}");
        }
    }

    #[tokio::test]
    async fn parallel_validates_before_spawning() {
        let world = Arc::new(World::new(4, 4));
        let region = Region { start_y: 0, end_y: 9, start_x: 0, end_x: 4 };
        let err = compute_region_parallel(world, region, 4, 4, 4).await.unwrap_err();
        assert!(matches!(err, RegionError::OutOfBounds { .. }));
    }
}
