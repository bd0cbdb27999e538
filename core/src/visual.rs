//! Visual capability.
//!
//! A visual renders the state of exactly one simulator into a rectangle
//! of the composed frame. It holds a shared handle to that simulator and
//! only ever borrows it immutably.
//!
//! Two render families exist and are told apart once, at registration:
//!   - native visuals draw through a `Painter` at composition time,
//!   - raster visuals refresh an off-screen plot after every step and the
//!     compositor blits the rasterized pixels.

use crate::{
    error::SimResult,
    frame::Painter,
    raster::RasterBridge,
    simulator::{same_rc, Shared},
};
use std::{cell::RefCell, rc::Rc};

/// Construction-time properties shared by both families.
pub trait Visual {
    fn name(&self) -> &'static str;

    /// Pixel width reserved in the composed layout. Never changes.
    fn width(&self) -> u32;

    /// Pixel height reserved in the composed layout. Never changes.
    fn height(&self) -> u32;
}

pub trait NativeVisual: Visual {
    /// Draw the bound simulator's current state in local coordinates
    /// (origin bottom-left of this visual's rectangle).
    fn draw(&mut self, painter: &mut Painter<'_>) -> SimResult<()>;
}

pub trait RasterVisual: Visual {
    /// Refresh the plot state from the bound simulator. Does not rasterize.
    fn draw(&mut self) -> SimResult<()>;

    fn bridge(&self) -> &RasterBridge;

    fn bridge_mut(&mut self) -> &mut RasterBridge;

    /// Re-rasterize the plot into the bridge's pixel buffer.
    fn update_image(&mut self) -> SimResult<()> {
        self.bridge_mut().update_image()
    }
}

/// A registered visual, tagged with its render family.
#[derive(Clone)]
pub enum VisualHandle {
    Native(Rc<RefCell<dyn NativeVisual>>),
    Raster(Rc<RefCell<dyn RasterVisual>>),
}

impl VisualHandle {
    pub fn native<V: NativeVisual + 'static>(visual: &Shared<V>) -> Self {
        let handle: Rc<RefCell<dyn NativeVisual>> = visual.clone();
        Self::Native(handle)
    }

    pub fn raster<V: RasterVisual + 'static>(visual: &Shared<V>) -> Self {
        let handle: Rc<RefCell<dyn RasterVisual>> = visual.clone();
        Self::Raster(handle)
    }

    pub fn is_raster(&self) -> bool {
        matches!(self, Self::Raster(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Native(v) => v.borrow().name(),
            Self::Raster(v) => v.borrow().name(),
        }
    }

    pub fn extent(&self) -> (u32, u32) {
        match self {
            Self::Native(v) => {
                let v = v.borrow();
                (v.width(), v.height())
            }
            Self::Raster(v) => {
                let v = v.borrow();
                (v.width(), v.height())
            }
        }
    }

    /// Same underlying visual instance?
    pub fn same_instance(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Native(a), Self::Native(b)) => same_rc(a, b),
            (Self::Raster(a), Self::Raster(b)) => same_rc(a, b),
            _ => false,
        }
    }
}
