//! Iterated maps: x ← f(x) for several seeds, and (x, y) ← f(x, y).
//!
//! Both simulators keep their full trajectories as time series so plot
//! visuals can read them without copying.

use crate::{
    error::SimResult,
    simulator::Simulator,
    types::{Seconds, Tick},
};
use std::rc::Rc;

pub type Map1D = Rc<dyn Fn(f64) -> f64>;
pub type Map2D = Rc<dyn Fn(f64, f64) -> (f64, f64)>;

/// Read access to a simulator's recorded time series.
pub trait TimeSeries {
    /// Sample times, shared by every series.
    fn times(&self) -> &[f64];

    fn series_count(&self) -> usize;

    /// Values of series `index`, one per sample time.
    fn series(&self, index: usize) -> &[f64];
}

pub struct FunctionIterator {
    func:    Map1D,
    seeds:   Vec<f64>,
    state:   Vec<f64>,
    time:    Tick,
    times:   Vec<f64>,
    history: Vec<Vec<f64>>,
}

impl FunctionIterator {
    pub fn new(func: impl Fn(f64) -> f64 + 'static, seeds: &[f64]) -> Self {
        Self::from_shared(Rc::new(func), seeds)
    }

    pub fn from_shared(func: Map1D, seeds: &[f64]) -> Self {
        Self {
            func,
            seeds:   seeds.to_vec(),
            state:   seeds.to_vec(),
            time:    0,
            times:   vec![0.0],
            history: seeds.iter().map(|&s| vec![s]).collect(),
        }
    }

    pub fn func(&self) -> Map1D {
        Rc::clone(&self.func)
    }

    pub fn time(&self) -> Tick { self.time }
    pub fn seeds(&self) -> &[f64] { &self.seeds }
    pub fn state(&self) -> &[f64] { &self.state }
}

impl Simulator for FunctionIterator {
    fn name(&self) -> &'static str { "function_iterator" }

    fn step(&mut self, _dt: Seconds) -> SimResult<()> {
        self.time += 1;
        for (x, history) in self.state.iter_mut().zip(&mut self.history) {
            *x = (self.func)(*x);
            history.push(*x);
        }
        self.times.push(self.time as f64);
        Ok(())
    }

    fn reset(&mut self) -> SimResult<()> {
        let seeds = self.seeds.clone();
        *self = Self::from_shared(Rc::clone(&self.func), &seeds);
        Ok(())
    }
}

impl TimeSeries for FunctionIterator {
    fn times(&self) -> &[f64] { &self.times }
    fn series_count(&self) -> usize { self.history.len() }
    fn series(&self, index: usize) -> &[f64] { &self.history[index] }
}

pub struct FunctionIterator2D {
    func:    Map2D,
    initial: (f64, f64),
    state:   (f64, f64),
    time:    Tick,
    times:   Vec<f64>,
    history: [Vec<f64>; 2],
}

impl FunctionIterator2D {
    pub fn new(func: impl Fn(f64, f64) -> (f64, f64) + 'static, initial: (f64, f64)) -> Self {
        Self {
            func: Rc::new(func),
            initial,
            state: initial,
            time: 0,
            times: vec![0.0],
            history: [vec![initial.0], vec![initial.1]],
        }
    }

    pub fn time(&self) -> Tick { self.time }
    pub fn state(&self) -> (f64, f64) { self.state }
}

impl Simulator for FunctionIterator2D {
    fn name(&self) -> &'static str { "function_iterator_2d" }

    fn step(&mut self, _dt: Seconds) -> SimResult<()> {
        self.time += 1;
        self.state = (self.func)(self.state.0, self.state.1);
        self.times.push(self.time as f64);
        self.history[0].push(self.state.0);
        self.history[1].push(self.state.1);
        Ok(())
    }

    fn reset(&mut self) -> SimResult<()> {
        self.state = self.initial;
        self.time = 0;
        self.times = vec![0.0];
        self.history = [vec![self.initial.0], vec![self.initial.1]];
        Ok(())
    }
}

impl TimeSeries for FunctionIterator2D {
    fn times(&self) -> &[f64] { &self.times }
    fn series_count(&self) -> usize { 2 }
    fn series(&self, index: usize) -> &[f64] { &self.history[index] }
}
