//! Native visual drawing a cell grid as solid quads.

use crate::{
    error::SimResult,
    frame::Painter,
    game_of_life::CellGrid,
    simulator::{Shared, Simulator},
    types::{Rgba, BLACK, WHITE},
    visual::{NativeVisual, Visual},
};
use std::rc::Rc;

pub struct Grid2D<S: CellGrid + Simulator> {
    sim:       Shared<S>,
    cell_size: u32,
    alive:     Rgba,
    dead:      Rgba,
    width:     u32,
    height:    u32,
    /// Colour per cell, refreshed only when the simulator is dirty.
    colors:    Vec<Rgba>,
}

impl<S: CellGrid + Simulator> Grid2D<S> {
    pub fn new(sim: Shared<S>, cell_size: u32) -> Self {
        let (gw, gh) = {
            let s = sim.borrow();
            (s.grid_width(), s.grid_height())
        };
        Self {
            sim,
            cell_size,
            alive: WHITE,
            dead: BLACK,
            width: gw as u32 * cell_size,
            height: gh as u32 * cell_size,
            colors: Vec::new(),
        }
    }

    pub fn with_colors(mut self, alive: Rgba, dead: Rgba) -> Self {
        self.alive = alive;
        self.dead = dead;
        self.colors.clear();
        self
    }

    fn update_graphics(&mut self, sim: &S) {
        let (gw, gh) = (sim.grid_width(), sim.grid_height());
        self.colors.clear();
        for y in 0..gh {
            for x in 0..gw {
                self.colors.push(if sim.is_alive(x, y) { self.alive } else { self.dead });
            }
        }
    }
}

impl<S: CellGrid + Simulator> Visual for Grid2D<S> {
    fn name(&self) -> &'static str { "grid_2d" }
    fn width(&self) -> u32 { self.width }
    fn height(&self) -> u32 { self.height }
}

impl<S: CellGrid + Simulator> NativeVisual for Grid2D<S> {
    fn draw(&mut self, painter: &mut Painter<'_>) -> SimResult<()> {
        let handle = Rc::clone(&self.sim);
        let sim = handle.borrow();
        if sim.is_dirty() || self.colors.is_empty() {
            self.update_graphics(&sim);
        }
        let gw = sim.grid_width();
        let cs = self.cell_size;
        for (i, color) in self.colors.iter().enumerate() {
            let (x, y) = ((i % gw) as i64, (i / gw) as i64);
            painter.fill_rect(x * cs as i64, y * cs as i64, cs, cs, *color);
        }
        Ok(())
    }
}
