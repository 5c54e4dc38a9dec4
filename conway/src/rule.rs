// rule.rs - Conway's transition rule and toroidal neighbour counting

use crate::grid::World;

/// Next state of a cell given its current state and its live neighbour count.
pub fn next_state(alive: bool, neighbours: u8) -> bool {
    match (alive, neighbours) {
        (true, 2) | (true, 3) => true,   // Survival
        (false, 3)            => true,   // Birth
        _                     => false,  // Death or stays dead
    }
}

/// Number of live cells among the 8 toroidal neighbours of `(x, y)`.
pub fn neighbour_count(world: &World, x: usize, y: usize) -> u8 {
    let (x, y) = (x as isize, y as isize);
    let neighbours = [
        (x - 1, y - 1), (x, y - 1), (x + 1, y - 1),
        (x - 1, y),                 (x + 1, y),
        (x - 1, y + 1), (x, y + 1), (x + 1, y + 1),
    ];

    let mut count = 0;
    for &(nx, ny) in &neighbours {
        if world.get_wrapped(nx, ny) { count += 1; }
    }
    count
}

/// Whole-grid single step, used as the reference when checking distributed turns.
pub fn step(world: &World) -> World {
    let mut next = World::new(world.width(), world.height());
    for y in 0..world.height() {
        for x in 0..world.width() {
            let alive = next_state(world.get(x, y), neighbour_count(world, x, y));
            next.set(x, y, alive);
        }
    }
    next
}
