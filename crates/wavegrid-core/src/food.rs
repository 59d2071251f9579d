//! Food placement.
//!
//! Food is drawn uniformly from the explicit set of free cells, so
//! placement never retries and terminates even on a nearly full board.

use std::collections::HashSet;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use wavegrid_types::Cell;

/// Seeded uniform sampler over free grid cells.
#[derive(Debug, Clone)]
pub struct FoodPlacer {
    rng: StdRng,
}

impl FoodPlacer {
    /// Create a placer. A seed of `0` draws from OS entropy.
    pub fn new(seed: u64) -> Self {
        let rng = if seed == 0 {
            StdRng::from_os_rng()
        } else {
            StdRng::seed_from_u64(seed)
        };
        Self { rng }
    }

    /// Pick a cell of the `width` x `height` grid not covered by
    /// `occupied`. Returns `None` when every cell is covered.
    pub fn place<'a>(
        &mut self,
        width: i32,
        height: i32,
        occupied: impl IntoIterator<Item = &'a Cell>,
    ) -> Option<Cell> {
        let taken: HashSet<Cell> = occupied.into_iter().copied().collect();
        let free: Vec<Cell> = (0..height)
            .flat_map(|y| (0..width).map(move |x| Cell::new(x, y)))
            .filter(|cell| !taken.contains(cell))
            .collect();
        free.choose(&mut self.rng).copied()
    }
}
