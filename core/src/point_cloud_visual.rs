//! Native visual plotting the points of an IFS orbit.

use crate::{
    error::SimResult,
    frame::Painter,
    ifs_simulator::IfsSimulator,
    simulator::Shared,
    types::Rgba,
    visual::{NativeVisual, Visual},
};

pub struct PointCloudVisual {
    sim:    Shared<IfsSimulator>,
    width:  u32,
    height: u32,
    /// World window mapped onto the visual: (min_x, max_x, min_y, max_y).
    bounds: (f64, f64, f64, f64),
    color:  Rgba,
}

impl PointCloudVisual {
    pub fn new(
        sim: Shared<IfsSimulator>,
        width: u32,
        height: u32,
        bounds: (f64, f64, f64, f64),
        color: Rgba,
    ) -> Self {
        Self { sim, width, height, bounds, color }
    }

    fn to_pixel(&self, (x, y): (f64, f64)) -> (i64, i64) {
        let (x0, x1, y0, y1) = self.bounds;
        let px = (x - x0) / (x1 - x0) * (self.width - 1) as f64;
        let py = (y - y0) / (y1 - y0) * (self.height - 1) as f64;
        (px.round() as i64, py.round() as i64)
    }
}

impl Visual for PointCloudVisual {
    fn name(&self) -> &'static str { "point_cloud" }
    fn width(&self) -> u32 { self.width }
    fn height(&self) -> u32 { self.height }
}

impl NativeVisual for PointCloudVisual {
    fn draw(&mut self, painter: &mut Painter<'_>) -> SimResult<()> {
        let sim = self.sim.borrow();
        for &p in sim.points() {
            let (x, y) = self.to_pixel(p);
            if (0..self.width as i64).contains(&x) && (0..self.height as i64).contains(&y) {
                painter.point(x, y, self.color);
            }
        }
        Ok(())
    }
}
