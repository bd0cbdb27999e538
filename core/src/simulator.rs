//! Simulator capability.
//!
//! RULE: Every steppable model implements Simulator.
//! The display steps each registered simulator in registration order,
//! sequentially, once per tick. A failing step is not caught: the error
//! ends the tick and propagates to whoever drives the display.

use crate::{
    error::{SimError, SimResult},
    types::Seconds,
};
use std::{cell::RefCell, rc::Rc};

/// The contract every simulator must fulfill.
pub trait Simulator {
    /// Stable name, used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Advance internal state by one discrete tick of length `dt` seconds.
    fn step(&mut self, dt: Seconds) -> SimResult<()>;

    /// Restore the construction-time state.
    fn reset(&mut self) -> SimResult<()> {
        Err(SimError::ResetUnsupported { name: self.name().to_string() })
    }

    /// Has state changed since the last composed frame?
    fn is_dirty(&self) -> bool {
        true
    }

    /// Called by the display once a frame showing the current state has
    /// been composed.
    fn mark_clean(&mut self) {}
}

/// Shared, single-threaded ownership used for everything the display
/// registers. Identity is pointer identity.
pub type Shared<T> = Rc<RefCell<T>>;

pub type SimHandle = Rc<RefCell<dyn Simulator>>;

/// Same allocation? Compares data addresses only, never vtables.
pub fn same_rc<T: ?Sized, U: ?Sized>(a: &Rc<T>, b: &Rc<U>) -> bool {
    Rc::as_ptr(a).cast::<()>() == Rc::as_ptr(b).cast::<()>()
}

pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}
