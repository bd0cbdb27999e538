//! Tick scheduling: step counts, registration order, pause gating, dt policy.

use simcx_core::{
    command::DisplayCommand,
    config::DisplayConfig,
    display::Display,
    error::{SimError, SimResult},
    simulator::{shared, Shared, SimHandle, Simulator},
    types::Seconds,
};
use std::{cell::RefCell, rc::Rc};

type StepLog = Rc<RefCell<Vec<(&'static str, Seconds)>>>;

struct Probe {
    name:   &'static str,
    log:    StepLog,
    resets: u32,
    fail:   bool,
}

impl Probe {
    fn new(name: &'static str, log: &StepLog) -> Shared<Self> {
        shared(Self { name, log: Rc::clone(log), resets: 0, fail: false })
    }
}

impl Simulator for Probe {
    fn name(&self) -> &'static str { self.name }

    fn step(&mut self, dt: Seconds) -> SimResult<()> {
        if self.fail {
            return Err(SimError::Other(anyhow::anyhow!("{} blew up", self.name)));
        }
        self.log.borrow_mut().push((self.name, dt));
        Ok(())
    }

    fn reset(&mut self) -> SimResult<()> {
        self.resets += 1;
        Ok(())
    }
}

/// Steps without overriding reset.
struct NoReset;

impl Simulator for NoReset {
    fn name(&self) -> &'static str { "no_reset" }
    fn step(&mut self, _dt: Seconds) -> SimResult<()> { Ok(()) }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn display() -> Display {
    init_logging();
    Display::new(DisplayConfig::default().with_size(64, 64)).unwrap()
}

fn register(display: &mut Display, sim: &Shared<Probe>) -> bool {
    let handle: SimHandle = sim.clone();
    display.add_simulator(handle)
}

#[test]
fn n_ticks_step_every_simulator_n_times_in_registration_order() {
    let mut display = display();
    let log = StepLog::default();
    let a = Probe::new("a", &log);
    let b = Probe::new("b", &log);
    register(&mut display, &a);
    register(&mut display, &b);

    display.handle_command(DisplayCommand::TogglePause).unwrap();
    for _ in 0..5 {
        assert!(display.tick(0.05).unwrap());
    }

    let names: Vec<_> = log.borrow().iter().map(|(n, _)| *n).collect();
    assert_eq!(names, ["a", "b", "a", "b", "a", "b", "a", "b", "a", "b"]);
    assert_eq!(display.current_tick(), 5);
}

#[test]
fn paused_display_ignores_timer_fires() {
    let mut display = display();
    let log = StepLog::default();
    register(&mut display, &Probe::new("a", &log));

    assert!(display.is_paused(), "a new display starts paused");
    assert!(!display.tick(0.05).unwrap());
    assert!(log.borrow().is_empty());
    assert_eq!(display.current_tick(), 0);
}

#[test]
fn double_toggle_performs_no_steps() {
    let mut display = display();
    let log = StepLog::default();
    register(&mut display, &Probe::new("a", &log));

    display.handle_command(DisplayCommand::TogglePause).unwrap();
    display.handle_command(DisplayCommand::TogglePause).unwrap();

    assert!(display.is_paused());
    assert!(!display.tick(0.05).unwrap());
    assert!(log.borrow().is_empty());
}

#[test]
fn step_and_reset_are_ignored_while_running() {
    let mut display = display();
    let log = StepLog::default();
    let a = Probe::new("a", &log);
    register(&mut display, &a);
    display.handle_command(DisplayCommand::TogglePause).unwrap();

    assert!(!display.handle_command(DisplayCommand::Step).unwrap());
    assert!(!display.handle_command(DisplayCommand::Reset).unwrap());
    assert!(log.borrow().is_empty());
    assert_eq!(a.borrow().resets, 0);
}

#[test]
fn single_step_while_paused_uses_the_fixed_interval() {
    let mut display = display();
    let log = StepLog::default();
    register(&mut display, &Probe::new("a", &log));

    assert!(display.handle_command(DisplayCommand::Step).unwrap());

    assert_eq!(*log.borrow(), vec![("a", 0.05)]);
    assert_eq!(display.current_tick(), 1);
    assert!(display.is_paused(), "stepping does not resume the clock");
}

#[test]
fn reset_while_paused_resets_every_simulator_and_rewinds() {
    let mut display = display();
    let log = StepLog::default();
    let a = Probe::new("a", &log);
    let b = Probe::new("b", &log);
    register(&mut display, &a);
    register(&mut display, &b);
    for _ in 0..3 {
        display.handle_command(DisplayCommand::Step).unwrap();
    }

    assert!(display.handle_command(DisplayCommand::Reset).unwrap());
    assert_eq!(a.borrow().resets, 1);
    assert_eq!(b.borrow().resets, 1);
    assert_eq!(display.current_tick(), 0);
}

#[test]
fn real_time_mode_passes_measured_elapsed_time() {
    let mut display = display();
    let log = StepLog::default();
    register(&mut display, &Probe::new("a", &log));
    display.handle_command(DisplayCommand::TogglePause).unwrap();

    display.tick(0.123).unwrap();
    display.set_real_time(false);
    display.tick(0.123).unwrap();

    let dts: Vec<_> = log.borrow().iter().map(|(_, dt)| *dt).collect();
    assert_eq!(dts, [0.123, 0.05]);
}

#[test]
fn failing_step_propagates_and_skips_later_simulators() {
    let mut display = display();
    let log = StepLog::default();
    let a = Probe::new("a", &log);
    let broken = Probe::new("broken", &log);
    broken.borrow_mut().fail = true;
    let c = Probe::new("c", &log);
    register(&mut display, &a);
    register(&mut display, &broken);
    register(&mut display, &c);
    display.handle_command(DisplayCommand::TogglePause).unwrap();

    let err = display.tick(0.05).unwrap_err();
    assert!(err.to_string().contains("broken blew up"), "{err}");
    assert_eq!(*log.borrow(), vec![("a", 0.05)]);
}

#[test]
fn reset_of_a_simulator_without_reset_is_an_error() {
    let mut display = display();
    let sim: SimHandle = shared(NoReset);
    display.add_simulator(sim);

    let err = display.handle_command(DisplayCommand::Reset).unwrap_err();
    assert!(matches!(err, SimError::ResetUnsupported { ref name } if name == "no_reset"));
}

#[test]
fn registering_the_same_simulator_twice_is_a_no_op() {
    let mut display = display();
    let log = StepLog::default();
    let a = Probe::new("a", &log);

    assert!(register(&mut display, &a));
    assert!(!register(&mut display, &a));
    assert_eq!(display.simulator_count(), 1);

    display.handle_command(DisplayCommand::Step).unwrap();
    assert_eq!(log.borrow().len(), 1, "a duplicate must not be stepped twice");
}

#[test]
fn closed_display_is_unscheduled() {
    let mut display = display();
    let log = StepLog::default();
    register(&mut display, &Probe::new("a", &log));
    display.handle_command(DisplayCommand::TogglePause).unwrap();

    display.close().unwrap();

    assert!(!display.clock().is_scheduled());
    assert!(!display.tick(0.05).unwrap());
    assert!(log.borrow().is_empty());
}

#[test]
fn caption_reflects_pause_state() {
    let mut display = display();
    assert_eq!(display.caption(), "Complex Systems (paused)");
    display.handle_command(DisplayCommand::TogglePause).unwrap();
    assert_eq!(display.caption(), "Complex Systems");
}

#[test]
fn non_positive_interval_is_rejected() {
    init_logging();
    let result = Display::new(DisplayConfig::default().with_interval(0.0));
    assert!(matches!(result, Err(SimError::InvalidInterval { .. })));
}
