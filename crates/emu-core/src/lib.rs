//! Core traits and types for instruction-level emulation.
//!
//! Everything is timed against the master crystal. CPU cores convert their
//! own clock into master ticks through [`MasterClock`], so every component
//! agrees on a single notion of "now".

mod bus;
mod clock;
mod cpu;
mod observable;
mod state;

pub use bus::{Bus, IoBus, SimpleBus};
pub use clock::{MasterClock, SystemTime, has_reached};
pub use cpu::Cpu;
pub use observable::{Observable, Value};
pub use state::{SaveState, StateEntry, StateError, StateStore};
