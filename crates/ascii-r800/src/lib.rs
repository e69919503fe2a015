//! Dual-personality Z80/R800 CPU emulator.
//!
//! One instruction set, two timing profiles. Each call to
//! [`R800::execute_instruction`] runs one whole instruction and advances
//! system time, measured in master-crystal ticks, by the delays the active
//! personality charges for it.

mod alu;
mod config;
mod cpu;
mod flags;
mod host;
mod registers;
mod state;
mod timing;

pub use config::R800Config;
pub use cpu::R800;
pub use flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
pub use host::{DebugCommand, Host, Signals};
pub use registers::{RegisterPair, Registers};
pub use timing::{
    Delay, DelayTable, MASTER_FREQUENCY, Personality, REFRESH_INTERVAL, REFRESH_STALL_BOUNDED,
    REFRESH_STALL_FREE_RUN,
};
