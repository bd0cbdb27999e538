//! Simulation clock. Owns tick state, the run/pause state machine and the
//! dt policy.
//!
//! The clock does no waiting itself. Whoever owns the timer (the event
//! loop, or a test) calls `fire(elapsed, recording)` and the clock answers
//! with the dt to step by, or `None` when nothing should happen.

use crate::{
    error::{SimError, SimResult},
    types::{Seconds, Tick},
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Paused,
    Running,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimClock {
    pub current_tick: Tick,
    pub run_state:    RunState,
    /// Pass measured wall time as dt instead of the fixed interval.
    pub real_time:    bool,
    interval:         Seconds,
    scheduled:        bool,
}

impl SimClock {
    /// A paused, unscheduled clock.
    pub fn new(interval: Seconds) -> SimResult<Self> {
        validate_interval(interval)?;
        Ok(Self {
            current_tick: 0,
            run_state: RunState::Paused,
            real_time: true,
            interval,
            scheduled: false,
        })
    }

    pub fn interval(&self) -> Seconds { self.interval }
    pub fn is_scheduled(&self) -> bool { self.scheduled }
    pub fn is_paused(&self) -> bool { self.run_state == RunState::Paused }

    /// Fire every `interval` seconds from now on.
    pub fn schedule(&mut self, interval: Seconds) -> SimResult<()> {
        validate_interval(interval)?;
        self.interval = interval;
        self.scheduled = true;
        Ok(())
    }

    pub fn unschedule(&mut self) {
        self.scheduled = false;
    }

    pub fn resume(&mut self) { self.run_state = RunState::Running; }

    /// Flip Paused <-> Running. Returns the new state.
    pub fn toggle(&mut self) -> RunState {
        self.run_state = match self.run_state {
            RunState::Paused  => RunState::Running,
            RunState::Running => RunState::Paused,
        };
        self.run_state
    }

    /// Count one completed step. Returns the new tick number.
    pub fn advance(&mut self) -> Tick {
        self.current_tick += 1;
        self.current_tick
    }

    /// Back to tick zero after a reset.
    pub fn rewind(&mut self) {
        self.current_tick = 0;
    }

    /// dt for a step, given the wall time since the previous fire.
    ///
    /// Fixed interval whenever a recording is active or real-time mode is
    /// off; measured elapsed time otherwise.
    pub fn step_dt(&self, elapsed: Seconds, recording: bool) -> Seconds {
        if recording || !self.real_time {
            self.interval
        } else {
            elapsed
        }
    }

    /// Timer callback. Returns the dt to step by when the clock is
    /// scheduled and running.
    pub fn fire(&self, elapsed: Seconds, recording: bool) -> Option<Seconds> {
        if !self.scheduled || self.is_paused() {
            return None;
        }
        Some(self.step_dt(elapsed, recording))
    }

    /// Nominal frame rate implied by the interval.
    pub fn rate(&self) -> f64 {
        1.0 / self.interval
    }
}

fn validate_interval(interval: Seconds) -> SimResult<()> {
    if !interval.is_finite() || interval <= 0.0 {
        return Err(SimError::InvalidInterval { interval });
    }
    Ok(())
}

/// Rolling average of the presentation rate, shown by the overlay.
#[derive(Debug, Clone)]
pub struct FrameRateMeter {
    samples:  VecDeque<Seconds>,
    capacity: usize,
}

impl Default for FrameRateMeter {
    fn default() -> Self {
        Self::new(60)
    }
}

impl FrameRateMeter {
    pub fn new(capacity: usize) -> Self {
        Self { samples: VecDeque::with_capacity(capacity), capacity: capacity.max(1) }
    }

    pub fn record(&mut self, frame_time: Seconds) {
        if !(frame_time.is_finite() && frame_time > 0.0) {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(frame_time);
    }

    pub fn fps(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let total: Seconds = self.samples.iter().sum();
        self.samples.len() as f64 / total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_clock_is_paused_and_unscheduled() {
        let clock = SimClock::new(0.05).unwrap();
        assert!(clock.is_paused());
        assert!(!clock.is_scheduled());
        assert_eq!(clock.fire(0.05, false), None);
    }

    #[test]
    fn rejects_non_positive_interval() {
        assert!(matches!(SimClock::new(0.0), Err(SimError::InvalidInterval { .. })));
        assert!(matches!(SimClock::new(f64::NAN), Err(SimError::InvalidInterval { .. })));
    }

    #[test]
    fn recording_forces_fixed_step_even_in_real_time() {
        let mut clock = SimClock::new(0.05).unwrap();
        clock.schedule(0.05).unwrap();
        clock.resume();
        assert_eq!(clock.fire(0.2, false), Some(0.2));
        assert_eq!(clock.fire(0.2, true), Some(0.05));
        clock.real_time = false;
        assert_eq!(clock.fire(0.2, false), Some(0.05));
    }

    #[test]
    fn unscheduled_clock_never_fires() {
        let mut clock = SimClock::new(0.1).unwrap();
        clock.schedule(0.1).unwrap();
        clock.resume();
        clock.unschedule();
        assert_eq!(clock.fire(0.1, false), None);
    }

    #[test]
    fn frame_rate_meter_averages() {
        let mut meter = FrameRateMeter::new(4);
        for _ in 0..10 {
            meter.record(0.05);
        }
        assert!((meter.fps() - 20.0).abs() < 1e-9);
    }
}
