//! Conway's Game of Life on a toroidal grid.

use crate::{
    error::{SimError, SimResult},
    rng::SimRng,
    simulator::Simulator,
    types::Seconds,
};

/// Read access to a rectangular grid of on/off cells.
/// Row 0 is the bottom row.
pub trait CellGrid {
    fn grid_width(&self) -> usize;
    fn grid_height(&self) -> usize;
    fn is_alive(&self, x: usize, y: usize) -> bool;
}

pub struct GameOfLife {
    width:      usize,
    height:     usize,
    cells:      Vec<bool>,
    initial:    Vec<bool>,
    scratch:    Vec<bool>,
    generation: u64,
    dirty:      bool,
}

impl GameOfLife {
    pub fn new(width: usize, height: usize) -> Self {
        let cells = vec![false; width * height];
        Self {
            width,
            height,
            initial: cells.clone(),
            scratch: cells.clone(),
            cells,
            generation: 0,
            dirty: false,
        }
    }

    fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn population(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    pub fn set(&mut self, x: usize, y: usize, alive: bool) {
        let i = self.index(x % self.width, y % self.height);
        self.cells[i] = alive;
        self.dirty = true;
    }

    /// Fill every cell independently, alive with probability `prob`.
    pub fn random(&mut self, prob: f64, rng: &mut SimRng) {
        for cell in self.cells.iter_mut() {
            *cell = rng.chance(prob);
        }
        self.dirty = true;
    }

    /// Stamp `block` (rows listed top-down, like the pattern reads on
    /// paper) with its top-left cell at (x, y + rows - 1).
    pub fn add_block(&mut self, block: &[&[u8]], x: usize, y: usize) -> SimResult<()> {
        let rows = block.len();
        let cols = block.first().map_or(0, |r| r.len());
        if x + cols > self.width || y + rows > self.height {
            return Err(SimError::Other(anyhow::anyhow!(
                "{cols}x{rows} block at ({x}, {y}) does not fit a {}x{} grid",
                self.width,
                self.height
            )));
        }
        for (r, row) in block.iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                self.set(x + c, y + rows - 1 - r, value != 0);
            }
        }
        Ok(())
    }

    fn live_neighbours(&self, x: usize, y: usize) -> u8 {
        let mut n = 0;
        for dy in [self.height - 1, 0, 1] {
            for dx in [self.width - 1, 0, 1] {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = (x + dx) % self.width;
                let ny = (y + dy) % self.height;
                n += self.cells[self.index(nx, ny)] as u8;
            }
        }
        n
    }
}

impl Simulator for GameOfLife {
    fn name(&self) -> &'static str { "game_of_life" }

    fn step(&mut self, _dt: Seconds) -> SimResult<()> {
        // The pattern in place before the first generation is what reset
        // returns to.
        if self.generation == 0 {
            self.initial.clone_from(&self.cells);
        }
        for y in 0..self.height {
            for x in 0..self.width {
                let n = self.live_neighbours(x, y);
                let alive = self.cells[self.index(x, y)];
                let i = self.index(x, y);
                self.scratch[i] = n == 3 || (alive && n == 2);
            }
        }
        std::mem::swap(&mut self.cells, &mut self.scratch);
        self.generation += 1;
        self.dirty = true;
        Ok(())
    }

    fn reset(&mut self) -> SimResult<()> {
        // Nothing has run yet, so the current cells are the initial pattern.
        if self.generation > 0 {
            self.cells.clone_from(&self.initial);
        }
        self.generation = 0;
        self.dirty = true;
        Ok(())
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

impl CellGrid for GameOfLife {
    fn grid_width(&self) -> usize { self.width }
    fn grid_height(&self) -> usize { self.height }

    fn is_alive(&self, x: usize, y: usize) -> bool {
        self.cells[self.index(x, y)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLINKER: &[&[u8]] = &[&[1, 1, 1]];
    const GLIDER: &[&[u8]] = &[&[0, 1, 0], &[0, 0, 1], &[1, 1, 1]];

    #[test]
    fn blinker_oscillates_with_period_two() {
        let mut life = GameOfLife::new(5, 5);
        life.add_block(BLINKER, 1, 2).unwrap();
        life.step(0.0).unwrap();
        assert!(life.is_alive(2, 1) && life.is_alive(2, 2) && life.is_alive(2, 3));
        assert!(!life.is_alive(1, 2));
        life.step(0.0).unwrap();
        assert!(life.is_alive(1, 2) && life.is_alive(3, 2));
    }

    #[test]
    fn glider_wraps_around_and_keeps_its_population() {
        let mut life = GameOfLife::new(8, 8);
        life.add_block(GLIDER, 0, 0).unwrap();
        for _ in 0..32 {
            life.step(0.0).unwrap();
        }
        assert_eq!(life.population(), 5);
    }

    #[test]
    fn reset_restores_pattern_before_first_generation() {
        let mut life = GameOfLife::new(6, 6);
        life.add_block(GLIDER, 1, 1).unwrap();
        life.step(0.0).unwrap();
        life.step(0.0).unwrap();
        life.reset().unwrap();
        assert_eq!(life.generation(), 0);
        assert!(life.is_alive(2, 3), "glider's top cell is back in place");
    }

    #[test]
    fn reset_before_any_step_keeps_the_pattern() {
        let mut life = GameOfLife::new(5, 5);
        life.add_block(BLINKER, 1, 2).unwrap();
        life.reset().unwrap();
        assert_eq!(life.population(), 3);
        assert!(life.is_alive(1, 2) && life.is_alive(3, 2));

        life.step(0.0).unwrap();
        life.reset().unwrap();
        assert!(life.is_alive(1, 2) && !life.is_alive(2, 1), "still the horizontal phase");
    }

    #[test]
    fn oversized_block_is_rejected() {
        let mut life = GameOfLife::new(2, 2);
        assert!(life.add_block(GLIDER, 0, 0).is_err());
    }
}
