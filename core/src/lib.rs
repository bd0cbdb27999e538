//! simcx-core: step simulators on a fixed clock, compose their visuals
//! into one frame and optionally stream that frame to a video encoder.

pub mod clock;
pub mod command;
pub mod config;
pub mod display;
pub mod error;
pub mod event_loop;
pub mod frame;
pub mod raster;
pub mod recorder;
pub mod rng;
pub mod simulator;
pub mod types;
pub mod visual;

// Bundled simulators and visuals.
pub mod final_state_iterator;
pub mod function_iterator;
pub mod game_of_life;
pub mod grid_visual;
pub mod ifs_simulator;
pub mod plot_visuals;
pub mod point_cloud_visual;
