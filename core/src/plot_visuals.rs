//! Raster-backed plot visuals for the bundled simulators.
//!
//! Each visual owns a `RasterBridge`. `draw()` only refreshes plot data;
//! the display rasterizes afterwards through `update_image()`.

use crate::{
    error::{SimError, SimResult},
    final_state_iterator::FinalStateIterator,
    function_iterator::{FunctionIterator, TimeSeries},
    raster::{RasterBridge, SeriesId, BASE_DPI},
    simulator::Shared,
    types::{Rgba, BLACK},
    visual::{RasterVisual, Visual},
};

/// Points sampled when plotting a map's graph.
const GRAPH_SAMPLES: usize = 1000;

/// A single time series against time, inside fixed limits.
pub struct LineVisual<S: TimeSeries> {
    sim:    Shared<S>,
    bridge: RasterBridge,
    line:   SeriesId,
}

impl<S: TimeSeries> LineVisual<S> {
    pub fn new(sim: Shared<S>, width: u32, height: u32) -> SimResult<Self> {
        if sim.borrow().series_count() == 0 {
            return Err(SimError::NoSeries { name: "line" });
        }
        let mut bridge = RasterBridge::create_canvas(width, height, BASE_DPI)?;
        let line = {
            let s = sim.borrow();
            let axes = bridge.axes_mut();
            axes.set_xlim(-10.0, 10.0);
            axes.set_ylim(-10.0, 10.0);
            axes.plot(s.times().to_vec(), s.series(0).to_vec(), None)
        };
        Ok(Self { sim, bridge, line })
    }

    pub fn with_limits(mut self, x: (f64, f64), y: (f64, f64)) -> Self {
        let axes = self.bridge.axes_mut();
        axes.set_xlim(x.0, x.1);
        axes.set_ylim(y.0, y.1);
        self
    }
}

impl<S: TimeSeries> Visual for LineVisual<S> {
    fn name(&self) -> &'static str { "line" }
    fn width(&self) -> u32 { self.bridge.width() }
    fn height(&self) -> u32 { self.bridge.height() }
}

impl<S: TimeSeries> RasterVisual for LineVisual<S> {
    fn draw(&mut self) -> SimResult<()> {
        let sim = self.sim.borrow();
        self.bridge.axes_mut().set_data(self.line, sim.times(), sim.series(0));
        Ok(())
    }

    fn bridge(&self) -> &RasterBridge { &self.bridge }
    fn bridge_mut(&mut self) -> &mut RasterBridge { &mut self.bridge }
}

/// Every series of a simulator against time, rescaled to fit each tick.
pub struct LinesVisual<S: TimeSeries> {
    sim:    Shared<S>,
    bridge: RasterBridge,
    lines:  Vec<SeriesId>,
}

impl<S: TimeSeries> LinesVisual<S> {
    pub fn new(sim: Shared<S>, width: u32, height: u32) -> SimResult<Self> {
        let mut bridge = RasterBridge::create_canvas(width, height, BASE_DPI)?;
        let lines = {
            let s = sim.borrow();
            let axes = bridge.axes_mut();
            let lines = (0..s.series_count())
                .map(|i| axes.plot(s.times().to_vec(), s.series(i).to_vec(), None))
                .collect();
            axes.autoscale();
            lines
        };
        Ok(Self { sim, bridge, lines })
    }
}

impl<S: TimeSeries> Visual for LinesVisual<S> {
    fn name(&self) -> &'static str { "lines" }
    fn width(&self) -> u32 { self.bridge.width() }
    fn height(&self) -> u32 { self.bridge.height() }
}

impl<S: TimeSeries> RasterVisual for LinesVisual<S> {
    fn draw(&mut self) -> SimResult<()> {
        let sim = self.sim.borrow();
        let axes = self.bridge.axes_mut();
        for (i, line) in self.lines.iter().enumerate() {
            axes.set_data(*line, sim.times(), sim.series(i));
        }
        axes.autoscale();
        Ok(())
    }

    fn bridge(&self) -> &RasterBridge { &self.bridge }
    fn bridge_mut(&mut self) -> &mut RasterBridge { &mut self.bridge }
}

/// Cobweb diagram of a 1D map: the graph of f, the diagonal y = x and one
/// staircase per seed.
pub struct CobwebVisual {
    sim:    Shared<FunctionIterator>,
    bridge: RasterBridge,
    webs:   Vec<SeriesId>,
}

impl CobwebVisual {
    pub fn new(
        sim: Shared<FunctionIterator>,
        min_x: f64,
        max_x: f64,
        width: u32,
        height: u32,
    ) -> SimResult<Self> {
        let mut bridge = RasterBridge::create_canvas(width, height, BASE_DPI)?;
        let webs = {
            let s = sim.borrow();
            let f = s.func();
            let xs: Vec<f64> = (0..GRAPH_SAMPLES)
                .map(|i| min_x + (max_x - min_x) * i as f64 / (GRAPH_SAMPLES - 1) as f64)
                .collect();
            let ys: Vec<f64> = xs.iter().map(|&x| f(x)).collect();
            let axes = bridge.axes_mut();
            axes.plot(xs.clone(), ys, None);
            axes.plot_dotted(xs.clone(), xs, Some(BLACK));
            axes.autoscale();
            axes.set_xlim(min_x, max_x);
            (0..s.series_count())
                .map(|i| {
                    let (wx, wy) = cobweb(s.series(i));
                    axes.plot(wx, wy, None)
                })
                .collect()
        };
        Ok(Self { sim, bridge, webs })
    }
}

/// Staircase through an orbit x0, x1, ...:
/// (x0, 0) → (x0, x1) → (x1, x1) → (x1, x2) → ...
fn cobweb(orbit: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let Some(&x0) = orbit.first() else { return (Vec::new(), Vec::new()) };
    let mut xs = vec![x0];
    let mut ys = vec![0.0];
    for pair in orbit.windows(2) {
        xs.extend_from_slice(&[pair[0], pair[1]]);
        ys.extend_from_slice(&[pair[1], pair[1]]);
    }
    (xs, ys)
}

impl Visual for CobwebVisual {
    fn name(&self) -> &'static str { "cobweb" }
    fn width(&self) -> u32 { self.bridge.width() }
    fn height(&self) -> u32 { self.bridge.height() }
}

impl RasterVisual for CobwebVisual {
    fn draw(&mut self) -> SimResult<()> {
        let sim = self.sim.borrow();
        let axes = self.bridge.axes_mut();
        for (i, web) in self.webs.iter().enumerate() {
            let (xs, ys) = cobweb(sim.series(i));
            axes.set_data(*web, &xs, &ys);
        }
        Ok(())
    }

    fn bridge(&self) -> &RasterBridge { &self.bridge }
    fn bridge_mut(&mut self) -> &mut RasterBridge { &mut self.bridge }
}

/// Final value of every seed's orbit, plotted against the seed once the
/// transient has passed.
pub struct FinalStateDiagram {
    sim:             Shared<FunctionIterator>,
    bridge:          RasterBridge,
    points:          SeriesId,
    discard_initial: u64,
}

impl FinalStateDiagram {
    pub fn new(
        sim: Shared<FunctionIterator>,
        discard_initial: u64,
        width: u32,
        height: u32,
    ) -> SimResult<Self> {
        let mut bridge = RasterBridge::create_canvas(width, height, BASE_DPI)?;
        let points = {
            let s = sim.borrow();
            let min = s.seeds().iter().copied().fold(f64::INFINITY, f64::min);
            let max = s.seeds().iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let axes = bridge.axes_mut();
            if min.is_finite() && max.is_finite() {
                axes.set_xlim(min - 0.5, max + 0.5);
            }
            axes.scatter(Vec::new(), Vec::new(), Some(BLACK), 2)
        };
        Ok(Self { sim, bridge, points, discard_initial })
    }

    /// Points plotted so far.
    pub fn point_count(&self) -> usize {
        self.bridge.canvas().axes().series(self.points).map_or(0, |s| s.xs.len())
    }
}

impl Visual for FinalStateDiagram {
    fn name(&self) -> &'static str { "final_state_diagram" }
    fn width(&self) -> u32 { self.bridge.width() }
    fn height(&self) -> u32 { self.bridge.height() }
}

impl RasterVisual for FinalStateDiagram {
    fn draw(&mut self) -> SimResult<()> {
        let sim = self.sim.borrow();
        let axes = self.bridge.axes_mut();
        if sim.time() == 0 {
            axes.set_data(self.points, &[], &[]);
            return Ok(());
        }
        if sim.time() < self.discard_initial {
            return Ok(());
        }
        let xlim = axes.xlim();
        axes.extend_data(self.points, sim.seeds(), sim.state());
        axes.autoscale();
        axes.set_xlim(xlim.0, xlim.1);
        Ok(())
    }

    fn bridge(&self) -> &RasterBridge { &self.bridge }
    fn bridge_mut(&mut self) -> &mut RasterBridge { &mut self.bridge }
}

/// Bifurcation diagram accumulated column by column from a parameter
/// sweep.
pub struct BifurcationVisual {
    sim:    Shared<FinalStateIterator>,
    bridge: RasterBridge,
    points: SeriesId,
}

impl BifurcationVisual {
    pub fn new(
        sim: Shared<FinalStateIterator>,
        y_range: (f64, f64),
        width: u32,
        height: u32,
    ) -> SimResult<Self> {
        Self::with_color(sim, y_range, width, height, BLACK)
    }

    pub fn with_color(
        sim: Shared<FinalStateIterator>,
        y_range: (f64, f64),
        width: u32,
        height: u32,
        color: Rgba,
    ) -> SimResult<Self> {
        let mut bridge = RasterBridge::create_canvas(width, height, BASE_DPI)?;
        let points = {
            let s = sim.borrow();
            let axes = bridge.axes_mut();
            axes.set_xlim(s.start(), s.end());
            axes.set_ylim(y_range.0, y_range.1);
            axes.scatter(Vec::new(), Vec::new(), Some(color), 1)
        };
        Ok(Self { sim, bridge, points })
    }

    /// Points plotted so far.
    pub fn point_count(&self) -> usize {
        self.bridge.canvas().axes().series(self.points).map_or(0, |s| s.xs.len())
    }
}

impl Visual for BifurcationVisual {
    fn name(&self) -> &'static str { "bifurcation" }
    fn width(&self) -> u32 { self.bridge.width() }
    fn height(&self) -> u32 { self.bridge.height() }
}

impl RasterVisual for BifurcationVisual {
    fn draw(&mut self) -> SimResult<()> {
        let sim = self.sim.borrow();
        let axes = self.bridge.axes_mut();
        if sim.xs().is_empty() {
            axes.set_data(self.points, &[], &[]);
        } else if sim.has_new_column() {
            axes.extend_data(self.points, sim.xs(), sim.ys());
        }
        Ok(())
    }

    fn bridge(&self) -> &RasterBridge { &self.bridge }
    fn bridge_mut(&mut self) -> &mut RasterBridge { &mut self.bridge }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::shared;

    #[test]
    fn line_visual_needs_a_series_to_follow() {
        let orbit = shared(FunctionIterator::new(|x| x, &[]));
        let result = LineVisual::new(orbit, 100, 100);
        assert!(matches!(result, Err(SimError::NoSeries { name: "line" })));
    }

    #[test]
    fn cobweb_staircase_alternates_vertical_and_horizontal() {
        let (xs, ys) = cobweb(&[0.2, 0.5, 0.7]);
        assert_eq!(xs, vec![0.2, 0.2, 0.5, 0.5, 0.7]);
        assert_eq!(ys, vec![0.0, 0.5, 0.5, 0.7, 0.7]);
    }

    #[test]
    fn cobweb_of_empty_orbit_is_empty() {
        let (xs, ys) = cobweb(&[]);
        assert!(xs.is_empty() && ys.is_empty());
    }
}
