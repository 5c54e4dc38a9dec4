// grid.rs - Toroidal world grid for Conway's Game of Life

use serde::{Deserialize, Serialize};

use crate::error::RegionError;

/// Pixel value of an alive cell at the image boundary.
pub const ALIVE: u8 = 255;
/// Pixel value of a dead cell at the image boundary.
pub const DEAD: u8 = 0;

/// Coordinates of a single cell, `x` is the column and `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
}

impl Cell {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// A `width × height` grid of cells, stored row-major.
///
/// Neighbour lookups through [`World::get_wrapped`] treat the grid as a torus:
/// row `-1` is row `height - 1`, column `width` is column `0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WorldRepr", into = "WorldRepr")]
pub struct World {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl World {
    /// An all-dead world.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width * height],
        }
    }

    /// A world with exactly the given cells alive. Cells outside the grid wrap.
    pub fn with_alive(width: usize, height: usize, alive: &[Cell]) -> Self {
        let mut world = Self::new(width, height);
        for cell in alive {
            if width > 0 && height > 0 {
                world.set(cell.x % width, cell.y % height, true);
            }
        }
        world
    }

    /// Builds a world from grayscale pixels (`ALIVE` = 255, anything else dead).
    pub fn from_pixels(width: usize, height: usize, pixels: &[u8]) -> Result<Self, RegionError> {
        if width.checked_mul(height) != Some(pixels.len()) {
            return Err(RegionError::DimensionMismatch {
                expected: (width, height),
                actual_cells: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            cells: pixels.iter().map(|&p| p == ALIVE).collect(),
        })
    }

    /// Grayscale pixels, row-major.
    pub fn to_pixels(&self) -> Vec<u8> {
        self.cells
            .iter()
            .map(|&alive| if alive { ALIVE } else { DEAD })
            .collect()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        self.cells[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, alive: bool) {
        self.cells[y * self.width + x] = alive;
    }

    /// Toroidal lookup: coordinates may be negative or past the edge by any amount.
    pub fn get_wrapped(&self, x: isize, y: isize) -> bool {
        let w = self.width as isize;
        let h = self.height as isize;
        self.get(x.rem_euclid(w) as usize, y.rem_euclid(h) as usize)
    }

    pub fn row(&self, y: usize) -> &[bool] {
        &self.cells[y * self.width..(y + 1) * self.width]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [bool] {
        &mut self.cells[y * self.width..(y + 1) * self.width]
    }

    pub fn alive_count(&self) -> usize {
        self.cells.iter().filter(|&&alive| alive).count()
    }

    /// All alive cells, ordered by row then column.
    pub fn alive_cells(&self) -> Vec<Cell> {
        let mut cells = Vec::new();
        for y in 0..self.height {
            for (x, &alive) in self.row(y).iter().enumerate() {
                if alive {
                    cells.push(Cell { x, y });
                }
            }
        }
        cells
    }

    /// Overwrites the rectangle whose top-left corner is `(start_x, start_y)` with `slice`.
    pub fn paste(&mut self, start_x: usize, start_y: usize, slice: &World) -> Result<(), RegionError> {
        let end_x = start_x + slice.width;
        let end_y = start_y + slice.height;
        if end_x > self.width || end_y > self.height {
            return Err(RegionError::SliceOutOfBounds {
                start: (start_x, start_y),
                size: (slice.width, slice.height),
                world: (self.width, self.height),
            });
        }
        for y in 0..slice.height {
            self.row_mut(start_y + y)[start_x..end_x].copy_from_slice(slice.row(y));
        }
        Ok(())
    }
}

/// Compact wire form: one string per row, `#` alive and `.` dead.
#[derive(Serialize, Deserialize)]
struct WorldRepr {
    width: usize,
    height: usize,
    rows: Vec<String>,
}

impl From<World> for WorldRepr {
    fn from(world: World) -> Self {
        let rows = (0..world.height)
            .map(|y| {
                world
                    .row(y)
                    .iter()
                    .map(|&alive| if alive { '#' } else { '.' })
                    .collect()
            })
            .collect();
        Self {
            width: world.width,
            height: world.height,
            rows,
        }
    }
}

impl TryFrom<WorldRepr> for World {
    type Error = RegionError;

    fn try_from(repr: WorldRepr) -> Result<Self, Self::Error> {
        let actual_cells = repr.rows.iter().map(String::len).sum();
        let mismatch = RegionError::DimensionMismatch {
            expected: (repr.width, repr.height),
            actual_cells,
        };
        // Dimensions come off the wire; check them against the rows before allocating.
        if repr.rows.len() != repr.height || repr.rows.iter().any(|row| row.len() != repr.width) {
            return Err(mismatch);
        }
        let size = repr.width.checked_mul(repr.height).ok_or(mismatch)?;
        let mut cells = Vec::with_capacity(size);
        for row in &repr.rows {
            cells.extend(row.bytes().map(|b| b == b'#'));
        }
        Ok(Self {
            width: repr.width,
            height: repr.height,
            cells,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_lookup_crosses_every_edge() {
        let world = World::with_alive(4, 3, &[Cell::new(3, 2)]);
        assert!(world.get_wrapped(-1, -1));
        assert!(world.get_wrapped(3, -1));
        assert!(world.get_wrapped(-1, 2));
        assert!(world.get_wrapped(7, 5));
        assert!(!world.get_wrapped(0, 0));
    }

    #[test]
    fn paste_places_slice_at_offset() {
        let slice = World::with_alive(2, 3, &[Cell::new(0, 0), Cell::new(1, 2)]);
        let mut world = World::with_alive(5, 5, &[Cell::new(4, 4)]);
        world.paste(1, 1, &slice).unwrap();
        assert_eq!(
            world.alive_cells(),
            vec![Cell::new(1, 1), Cell::new(2, 3), Cell::new(4, 4)]
        );
    }

    #[test]
    fn paste_rejects_overflowing_slice() {
        let mut world = World::new(3, 3);
        let slice = World::new(2, 2);
        assert!(matches!(
            world.paste(2, 0, &slice),
            Err(RegionError::SliceOutOfBounds { .. })
        ));
    }

    #[test]
    fn pixels_use_image_encoding() {
        let world = World::with_alive(2, 1, &[Cell::new(1, 0)]);
        assert_eq!(world.to_pixels(), vec![DEAD, ALIVE]);
        assert_eq!(World::from_pixels(2, 1, &[DEAD, ALIVE]).unwrap(), world);
        assert!(World::from_pixels(2, 2, &[0, 0, 0]).is_err());
    }

    #[test]
    fn serde_form_is_row_strings() {
        let world = World::with_alive(3, 2, &[Cell::new(0, 0), Cell::new(2, 1)]);
        let json = serde_json::to_value(&world).unwrap();
        assert_eq!(json["rows"], serde_json::json!(["#..", "..#"]));
        let back: World = serde_json::from_value(json).unwrap();
        assert_eq!(back, world);
    }

    #[test]
    fn serde_rejects_ragged_rows() {
        let json = serde_json::json!({ "width": 3, "height": 2, "rows": ["#..", "#"] });
        assert!(serde_json::from_value::<World>(json).is_err());
    }

    #[test]
    fn serde_rejects_oversized_dimensions() {
        let json = serde_json::json!({ "width": usize::MAX, "height": 2, "rows": ["#", "#"] });
        assert!(serde_json::from_value::<World>(json).is_err());

        let json = serde_json::json!({ "width": usize::MAX, "height": usize::MAX, "rows": [] });
        assert!(serde_json::from_value::<World>(json).is_err());
    }
}
