//! The host side of the engine: bus access plus optional hooks.
//!
//! Hooks never receive the engine itself, so they cannot re-enter a run
//! loop. They get [`Signals`] instead, which is enough to raise or drop
//! interrupt lines, move the deadline, or ask the current run to stop.

use std::fmt;

use emu_core::{IoBus, SimpleBus, SystemTime};

use crate::registers::Registers;

/// Everything the engine needs from the machine around it.
///
/// Memory and ports come from [`IoBus`]. Every hook has a no-op default, so
/// a bare bus is already a complete host.
pub trait Host: IoBus {
    /// `ED FE` was executed. The host may rewrite any register.
    fn patch(&mut self, regs: &mut Registers) {
        let _ = regs;
    }

    /// System time passed the deadline set with
    /// [`Signals::set_timeout_at`]. Only the run-until-stopped loop calls
    /// this, once per instruction while the deadline stays in the past.
    /// The deadline starts at 0, so until a host sets one this fires on
    /// every iteration of that loop.
    fn timeout(&mut self, signals: &mut Signals) {
        let _ = signals;
    }

    /// About to fetch an opcode at a flagged address.
    fn breakpoint(&mut self, pc: u16, signals: &mut Signals) {
        let _ = (pc, signals);
    }

    /// An inline assembler debug command was decoded.
    fn debug(&mut self, command: &DebugCommand) {
        let _ = command;
    }

    /// A software trap was decoded.
    fn trap(&mut self, value: u8) {
        let _ = value;
    }
}

impl Host for SimpleBus {}

/// Inline debug commands embedded in guest code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugCommand {
    /// Request a breakpoint. Slot and page are `0xFFFF` when not given.
    SetBreakpoint { slot: u16, page: u16, address: u16 },
    /// Text to print.
    Trace(String),
}

impl fmt::Display for DebugCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetBreakpoint { slot, page, address } => {
                write!(f, "{slot:04x} {page:04x} {address:04x}")
            }
            Self::Trace(text) => write!(f, "{text}"),
        }
    }
}

/// Lines, latches and run control shared between the engine and its hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signals {
    pub(crate) int_asserted: bool,
    pub(crate) nmi_asserted: bool,
    pub(crate) nmi_edge: bool,
    pub(crate) data_bus: u8,
    pub(crate) default_data_bus: u8,
    pub(crate) timeout: SystemTime,
    pub(crate) terminate: bool,
}

impl Signals {
    pub(crate) const fn new() -> Self {
        Self {
            int_asserted: false,
            nmi_asserted: false,
            nmi_edge: false,
            data_bus: 0xFF,
            default_data_bus: 0xFF,
            timeout: 0,
            terminate: false,
        }
    }

    /// Ask the run-until-stopped loop to return at the next instruction
    /// boundary.
    pub fn stop(&mut self) {
        self.terminate = true;
    }

    /// Set the system time at which [`Host::timeout`] fires.
    ///
    /// The deadline is 0 after construction, which counts as already
    /// reached.
    pub fn set_timeout_at(&mut self, time: SystemTime) {
        self.timeout = time;
    }

    /// Assert the maskable interrupt line.
    pub fn set_int(&mut self) {
        self.int_asserted = true;
    }

    /// Release the maskable interrupt line.
    pub fn clear_int(&mut self) {
        self.int_asserted = false;
    }

    /// Assert the NMI line. Only a rising edge arms an acknowledge.
    pub fn set_nmi(&mut self) {
        if !self.nmi_asserted {
            self.nmi_edge = true;
        }
        self.nmi_asserted = true;
    }

    /// Release the NMI line.
    pub fn clear_nmi(&mut self) {
        self.nmi_asserted = false;
    }

    /// Latch the byte an IM 0/IM 2 acknowledge will read. The bus returns
    /// to the default after each acknowledge.
    pub fn set_data_bus(&mut self, value: u8, default: u8, set_default: bool) {
        self.data_bus = value;
        if set_default {
            self.default_data_bus = default;
        }
    }

    /// Maskable line state.
    #[must_use]
    pub const fn int_asserted(&self) -> bool {
        self.int_asserted
    }

    /// NMI line state.
    #[must_use]
    pub const fn nmi_asserted(&self) -> bool {
        self.nmi_asserted
    }

    /// An NMI edge is waiting to be acknowledged.
    #[must_use]
    pub const fn nmi_pending(&self) -> bool {
        self.nmi_edge
    }
}

impl Default for Signals {
    fn default() -> Self {
        Self::new()
    }
}
