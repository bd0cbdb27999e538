//! Iterated function systems, drawn with the chaos game.
//!
//! Every tick applies `step_size` randomly chosen affine maps to a single
//! moving point and records each image. Map choice is weighted by the
//! given probabilities and driven by a seeded `SimRng`.

use crate::{
    error::{SimError, SimResult},
    rng::SimRng,
    simulator::Simulator,
    types::Seconds,
};

/// Points produced before recording starts, so the orbit has settled on
/// the attractor.
const DISCARD_STEPS: usize = 10;

/// p ↦ A·p + t with A = [[a, b], [c, d]], t = (e, f).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl AffineTransform {
    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn apply(&self, (x, y): (f64, f64)) -> (f64, f64) {
        (self.a * x + self.b * y + self.e, self.c * x + self.d * y + self.f)
    }
}

pub struct IfsSimulator {
    transforms: Vec<AffineTransform>,
    probs:      Vec<f64>,
    step_size:  usize,
    rng:        SimRng,
    point:      (f64, f64),
    points:     Vec<(f64, f64)>,
}

impl IfsSimulator {
    pub fn new(
        transforms: Vec<AffineTransform>,
        probs: Vec<f64>,
        step_size: usize,
        seed: u64,
    ) -> SimResult<Self> {
        if transforms.is_empty() || transforms.len() != probs.len() {
            return Err(SimError::Other(anyhow::anyhow!(
                "IFS needs one probability per transform ({} transforms, {} probabilities)",
                transforms.len(),
                probs.len()
            )));
        }
        let mut sim = Self {
            transforms,
            probs,
            step_size,
            rng: SimRng::new(seed).with_name("ifs"),
            point: (0.0, 0.0),
            points: Vec::new(),
        };
        sim.settle();
        Ok(sim)
    }

    /// The Barnsley fern.
    pub fn barnsley_fern(step_size: usize, seed: u64) -> SimResult<Self> {
        Self::new(
            vec![
                AffineTransform::new(0.0, 0.0, 0.0, 0.16, 0.0, 0.0),
                AffineTransform::new(0.85, 0.04, -0.04, 0.85, 0.0, 1.6),
                AffineTransform::new(0.2, -0.26, 0.23, 0.22, 0.0, 1.6),
                AffineTransform::new(-0.15, 0.28, 0.26, 0.24, 0.0, 0.44),
            ],
            vec![0.01, 0.85, 0.07, 0.07],
            step_size,
            seed,
        )
    }

    fn settle(&mut self) {
        for _ in 0..DISCARD_STEPS * self.step_size.max(1) {
            self.advance_point();
        }
    }

    fn advance_point(&mut self) -> (f64, f64) {
        let i = self.rng.weighted_index(&self.probs);
        self.point = self.transforms[i].apply(self.point);
        self.point
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }
}

impl Simulator for IfsSimulator {
    fn name(&self) -> &'static str { "ifs" }

    fn step(&mut self, _dt: Seconds) -> SimResult<()> {
        self.points.reserve(self.step_size);
        for _ in 0..self.step_size {
            let p = self.advance_point();
            self.points.push(p);
        }
        Ok(())
    }

    fn reset(&mut self) -> SimResult<()> {
        self.rng.reseed();
        self.point = (0.0, 0.0);
        self.points.clear();
        self.settle();
        Ok(())
    }
}
