//! Reference simulations.

mod counter;
mod gps;

pub use counter::ControllableCounter;
pub use gps::GpsSim;
