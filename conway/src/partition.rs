// partition.rs - Row bands and the merge of their results

use serde::{Deserialize, Serialize};

use crate::error::RegionError;
use crate::grid::World;
use crate::region::RegionResult;

/// A contiguous row band `[start_y, end_y)` spanning every column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    pub start_y: usize,
    pub end_y: usize,
}

/// Splits `[0, height)` into `workers` bands of `height / workers` rows.
///
/// The last band absorbs the remainder. More workers than rows is clamped to
/// one row per band so that no band is empty.
pub fn partition(height: usize, workers: usize) -> Result<Vec<Band>, RegionError> {
    if workers == 0 {
        return Err(RegionError::NoWorkers);
    }
    let workers = workers.min(height.max(1));
    let unit = height / workers;

    let bands = (0..workers)
        .map(|i| Band {
            start_y: unit * i,
            end_y: if i + 1 == workers { height } else { unit * (i + 1) },
        })
        .collect();
    Ok(bands)
}

/// Overwrites each result's rectangle in `world` and returns the summed alive count.
///
/// Results must come from disjoint regions of one turn; their order is irrelevant.
pub fn merge<'a>(
    world: &mut World,
    results: impl IntoIterator<Item = &'a RegionResult>,
) -> Result<usize, RegionError> {
    let mut alive = 0;
    for result in results {
        world.paste(result.start_x, result.start_y, &result.slice)?;
        alive += result.alive_count;
    }
    Ok(alive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Cell;
    use crate::region::{Region, compute_region};
    use crate::rule;

    #[test]
    fn bands_cover_every_row_once() {
        for height in 1..=40 {
            for workers in 1..=16 {
                let bands = partition(height, workers).unwrap();
                let mut seen = vec![0u8; height];
                for band in &bands {
                    assert!(band.start_y < band.end_y, "empty band for {height}/{workers}");
                    for y in band.start_y..band.end_y {
                        seen[y] += 1;
                    }
                }
                assert!(seen.iter().all(|&n| n == 1), "coverage broken for {height}/{workers}");
                assert_eq!(bands.first().map(|b| b.start_y), Some(0));
                assert_eq!(bands.last().map(|b| b.end_y), Some(height));
            }
        }
    }

    #[test]
    fn last_band_takes_the_remainder() {
        let bands = partition(10, 3).unwrap();
        assert_eq!(
            bands,
            vec![
                Band { start_y: 0, end_y: 3 },
                Band { start_y: 3, end_y: 6 },
                Band { start_y: 6, end_y: 10 },
            ]
        );
    }

    #[test]
    fn zero_workers_is_rejected() {
        assert_eq!(partition(8, 0), Err(RegionError::NoWorkers));
    }

    fn sample_world() -> World {
        World::with_alive(
            7,
            9,
            &[
                Cell::new(1, 0), Cell::new(2, 1), Cell::new(0, 2), Cell::new(1, 2),
                Cell::new(2, 2), Cell::new(5, 6), Cell::new(6, 6), Cell::new(6, 8),
                Cell::new(3, 4), Cell::new(3, 5), Cell::new(4, 5),
            ],
        )
    }

    fn band_results(world: &World, workers: usize) -> Vec<RegionResult> {
        partition(world.height(), workers)
            .unwrap()
            .into_iter()
            .map(|band| {
                let region = Region::band(band, world.width());
                compute_region(world, region, world.height(), world.width()).unwrap()
            })
            .collect()
    }

    #[test]
    fn merge_order_does_not_matter() {
        let before = sample_world();
        let results = band_results(&before, 4);

        let mut forward = before.clone();
        merge(&mut forward, &results).unwrap();

        let mut backward = before.clone();
        merge(&mut backward, results.iter().rev()).unwrap();

        let mut shuffled = before.clone();
        let order = [2, 0, 3, 1];
        merge(&mut shuffled, order.iter().map(|&i| &results[i])).unwrap();

        assert_eq!(forward, backward);
        assert_eq!(forward, shuffled);
        assert_eq!(forward, rule::step(&before));
    }

    #[test]
    fn summed_band_counts_match_full_recount() {
        let before = sample_world();
        for workers in 1..=9 {
            let results = band_results(&before, workers);
            let mut world = before.clone();
            let alive = merge(&mut world, &results).unwrap();
            assert_eq!(alive, world.alive_count(), "workers = {workers}");
        }
    }
}
