//! Parameter sweep of a one-parameter map, keeping only final states.
//!
//! Each tick takes the next parameter value `a`, iterates x ← f(a, x) from
//! the seed, throws away `discard` transient iterations and keeps the next
//! `samples` values. Feeding the samples into a scatter plot tick after tick
//! draws a bifurcation diagram.

use crate::{
    error::SimResult,
    simulator::Simulator,
    types::Seconds,
};

pub struct FinalStateIterator {
    func:    Box<dyn Fn(f64, f64) -> f64>,
    seed:    f64,
    start:   f64,
    end:     f64,
    delta:   f64,
    discard: usize,
    a:       f64,
    /// Parameter value of the latest sweep column (repeated per sample).
    xs:      Vec<f64>,
    /// Final states of the latest sweep column.
    ys:      Vec<f64>,
    fresh:   bool,
}

impl FinalStateIterator {
    pub fn new(
        func: impl Fn(f64, f64) -> f64 + 'static,
        seed: f64,
        start: f64,
        end: f64,
    ) -> Self {
        Self {
            func: Box::new(func),
            seed,
            start,
            end,
            delta: 0.01,
            discard: 1000,
            a: start,
            xs: Vec::new(),
            ys: vec![0.0; 250],
            fresh: false,
        }
    }

    /// Iterations thrown away before sampling. Defaults to 1000.
    pub fn with_discard(mut self, discard: usize) -> Self {
        self.discard = discard;
        self
    }

    /// Samples kept per parameter value. Defaults to 250.
    pub fn with_samples(mut self, samples: usize) -> Self {
        self.ys = vec![0.0; samples];
        self
    }

    /// Parameter increment per tick. Defaults to 0.01.
    pub fn with_delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self
    }

    pub fn start(&self) -> f64 { self.start }
    pub fn end(&self) -> f64 { self.end }

    /// Next parameter value to be swept.
    pub fn parameter(&self) -> f64 { self.a }

    pub fn xs(&self) -> &[f64] { &self.xs }
    pub fn ys(&self) -> &[f64] { &self.ys }

    /// Did the latest step produce a new column?
    pub fn has_new_column(&self) -> bool { self.fresh }

    pub fn is_finished(&self) -> bool {
        self.a > self.end
    }
}

impl Simulator for FinalStateIterator {
    fn name(&self) -> &'static str { "final_state_iterator" }

    fn step(&mut self, _dt: Seconds) -> SimResult<()> {
        self.fresh = false;
        if self.is_finished() {
            return Ok(());
        }
        let mut x = self.seed;
        for _ in 0..self.discard {
            x = (self.func)(self.a, x);
        }
        for sample in self.ys.iter_mut() {
            x = (self.func)(self.a, x);
            *sample = x;
        }
        self.xs.clear();
        self.xs.resize(self.ys.len(), self.a);
        self.a += self.delta;
        self.fresh = true;
        Ok(())
    }

    fn reset(&mut self) -> SimResult<()> {
        self.a = self.start;
        self.xs.clear();
        self.ys.iter_mut().for_each(|y| *y = 0.0);
        self.fresh = false;
        Ok(())
    }

    fn is_dirty(&self) -> bool {
        self.fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logistic(r: f64, x: f64) -> f64 {
        r * x * (1.0 - x)
    }

    #[test]
    fn stable_regime_collapses_to_fixed_point() {
        let mut sim = FinalStateIterator::new(logistic, 0.5, 2.5, 4.0).with_samples(10);
        sim.step(0.0).unwrap();
        // Fixed point of the logistic map is 1 - 1/r.
        for y in sim.ys() {
            assert!((y - 0.6).abs() < 1e-9, "expected 0.6, got {y}");
        }
        assert!(sim.xs().iter().all(|&a| a == 2.5));
    }

    #[test]
    fn sweep_stops_past_the_end() {
        let mut sim = FinalStateIterator::new(logistic, 0.5, 3.0, 3.05)
            .with_delta(0.02)
            .with_discard(10)
            .with_samples(4);
        let mut columns = 0;
        for _ in 0..10 {
            sim.step(0.0).unwrap();
            if sim.has_new_column() {
                columns += 1;
            }
        }
        assert_eq!(columns, 3, "3.00, 3.02, 3.04 then stop");
        sim.reset().unwrap();
        assert_eq!(sim.parameter(), 3.0);
    }
}
