//! Engine configuration.

#![allow(clippy::struct_excessive_bools)] // Independent feature switches.

/// Feature switches and initial clocks for an [`R800`](crate::R800).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct R800Config {
    /// Charge the MSX M1 wait state on every Z80 opcode fetch.
    pub m1_wait: bool,
    /// Charge the T9769 penalty on ports `0x98-0x9B`.
    pub vdp_io_delay: bool,
    /// Decode the assembler debug commands hidden behind `LD B,B` and `LD D,D`.
    pub debug_commands: bool,
    /// Decode the software trap hidden behind `LD C,C`.
    pub trap_opcode: bool,
    /// Track call return addresses.
    pub call_stack: bool,
    /// Initial Z80 clock in Hz.
    pub z80_frequency: u32,
    /// Initial R800 clock in Hz.
    pub r800_frequency: u32,
}

impl Default for R800Config {
    fn default() -> Self {
        Self {
            m1_wait: false,
            vdp_io_delay: false,
            debug_commands: false,
            trap_opcode: false,
            call_stack: false,
            z80_frequency: 3_579_545,
            r800_frequency: 7_159_090,
        }
    }
}
