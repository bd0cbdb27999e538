//! Shared primitive types used across the entire framework.

/// One discrete invocation of the step-and-redraw cycle.
pub type Tick = u64;

/// Simulated or wall-clock time, in seconds.
pub type Seconds = f64;

/// Identifier of a single recording session.
pub type SessionId = uuid::Uuid;

/// An RGBA colour, 8 bits per channel.
pub type Rgba = [u8; 4];

pub const BLACK: Rgba = [0, 0, 0, 255];
pub const WHITE: Rgba = [255, 255, 255, 255];
