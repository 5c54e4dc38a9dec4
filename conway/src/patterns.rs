// patterns.rs - Named seed patterns, placed at the centre of a world

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::grid::{Cell, World};

/// A pattern as `(row, col)` offsets from its top-left corner.
pub struct Pattern {
    pub name: &'static str,
    pub cells: &'static [(usize, usize)],
}

pub const PATTERNS: &[Pattern] = &[
    Pattern {
        name: "Block",
        cells: &[(0, 0), (0, 1), (1, 0), (1, 1)],
    },
    Pattern {
        name: "Beehive",
        cells: &[(0, 1), (0, 2), (1, 0), (1, 3), (2, 1), (2, 2)],
    },
    Pattern {
        name: "Glider",
        cells: &[(0, 1), (1, 2), (2, 0), (2, 1), (2, 2)],
    },
    Pattern {
        name: "Blinker",
        cells: &[(0, 0), (0, 1), (0, 2)],
    },
    Pattern {
        name: "Toad",
        cells: &[(0, 1), (0, 2), (0, 3), (1, 0), (1, 1), (1, 2)],
    },
    Pattern {
        name: "Beacon",
        cells: &[(0, 0), (0, 1), (1, 0), (1, 1), (2, 2), (2, 3), (3, 2), (3, 3)],
    },
    Pattern {
        name: "R-pentomino",
        cells: &[(0, 1), (0, 2), (1, 0), (1, 1), (2, 1)],
    },
];

pub fn find(name: &str) -> Option<&'static Pattern> {
    PATTERNS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

impl Pattern {
    fn extent(&self) -> (usize, usize) {
        let rows = self.cells.iter().map(|&(r, _)| r + 1).max().unwrap_or(0);
        let cols = self.cells.iter().map(|&(_, c)| c + 1).max().unwrap_or(0);
        (rows, cols)
    }

    /// Places the pattern centred in a fresh `width × height` world; cells wrap if it does not fit.
    pub fn place(&self, width: usize, height: usize) -> World {
        let (rows, cols) = self.extent();
        let top = height.saturating_sub(rows) / 2;
        let left = width.saturating_sub(cols) / 2;
        let cells: Vec<Cell> = self
            .cells
            .iter()
            .map(|&(row, col)| Cell::new(left + col, top + row))
            .collect();
        World::with_alive(width, height, &cells)
    }
}

/// Looks a pattern up by name (case-insensitive) and places it.
pub fn build(name: &str, width: usize, height: usize) -> Option<World> {
    find(name).map(|p| p.place(width, height))
}

/// Pseudo-random soup with roughly a third of the cells alive.
pub fn random(width: usize, height: usize, seed_value: u64) -> World {
    let mut world = World::new(width, height);

    // Simple pseudo-random generator
    let mut hasher = DefaultHasher::new();
    seed_value.hash(&mut hasher);
    let mut seed = hasher.finish();

    for row in 0..height {
        for col in 0..width {
            seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
            world.set(col, row, (seed >> 16) % 3 == 0);
        }
    }
    world
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::step;

    #[test]
    fn lookup_ignores_case() {
        assert!(find("BLINKER").is_some());
        assert!(find("r-pentomino").is_some());
        assert!(find("spaceship").is_none());
    }

    #[test]
    fn still_lifes_are_fixed_points() {
        for name in ["block", "beehive"] {
            let world = build(name, 8, 8).unwrap();
            assert_eq!(step(&world), world, "{name}");
        }
    }

    #[test]
    fn oscillators_return_after_two_steps() {
        for name in ["blinker", "toad", "beacon"] {
            let world = build(name, 10, 10).unwrap();
            assert_ne!(step(&world), world, "{name}");
            assert_eq!(step(&step(&world)), world, "{name}");
        }
    }

    #[test]
    fn glider_travels_across_the_torus() {
        // A glider moves one cell diagonally every 4 generations, so 4 * 6 steps
        // on a 6x6 torus bring it back where it started.
        let world = build("glider", 6, 6).unwrap();
        let mut current = world.clone();
        for _ in 0..24 {
            current = step(&current);
        }
        assert_eq!(current, world);
        assert_eq!(current.alive_count(), 5);
    }

    #[test]
    fn random_soup_is_deterministic_per_seed() {
        assert_eq!(random(16, 16, 7), random(16, 16, 7));
        assert_ne!(random(16, 16, 7), random(16, 16, 8));
    }
}
