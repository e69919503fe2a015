//! Per-personality delay tables.
//!
//! Every bus access and every internal operation charges one named delay to
//! system time. The delays are small integers scaled by the ratio between
//! the master crystal and the active personality's clock.

use std::fmt;
use std::ops::Index;

use emu_core::MasterClock;

/// Master crystal every delay is expressed in.
pub const MASTER_FREQUENCY: u32 = 21_477_270;

/// Ticks the R800 may run between DRAM refresh stalls.
pub const REFRESH_INTERVAL: u32 = 222 * 3;

/// Refresh stall charged by the run-until-stopped loop.
pub const REFRESH_STALL_FREE_RUN: u32 = 20 * 3;

/// Refresh stall charged by the run-until-time and single-step loops.
pub const REFRESH_STALL_BOUNDED: u32 = 12 * 3;

/// One of the two CPU personalities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Personality {
    /// Zilog-compatible timing.
    #[default]
    Z80,
    /// ASCII R800 timing, with the multiply instructions enabled.
    R800,
}

impl Personality {
    /// Register bank index.
    #[must_use]
    pub const fn bank(self) -> usize {
        match self {
            Self::Z80 => 0,
            Self::R800 => 1,
        }
    }

    /// Inverse of [`Personality::bank`]; anything non-zero reads as R800.
    #[must_use]
    pub const fn from_bank(bank: u32) -> Self {
        if bank == 0 { Self::Z80 } else { Self::R800 }
    }
}

impl fmt::Display for Personality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Z80 => write!(f, "Z80"),
            Self::R800 => write!(f, "R800"),
        }
    }
}

/// Named delay slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delay {
    /// Data memory access.
    Mem,
    /// Opcode or operand fetch.
    MemOp,
    /// Fetch crossing into a different 256-byte page.
    MemPage,
    /// Before every port access.
    PreIo,
    /// After every port access.
    PostIo,
    /// M1 wait state.
    M1,
    /// Index displacement.
    Xd,
    /// IM 0 and IM 1 acknowledge.
    Im,
    /// IM 2 acknowledge.
    Im2,
    /// NMI acknowledge.
    Nmi,
    /// `LD (IX+d),n`, where operand fetch overlaps address calculation.
    Parallel,
    /// Block instruction step and repeat.
    Block,
    /// Relative jump and indexed address calculation.
    Add8,
    /// 16-bit arithmetic.
    Add16,
    /// BIT on (HL).
    Bit,
    /// Taken CALL.
    Call,
    /// DJNZ.
    Djnz,
    /// EX (SP),HL.
    ExSpHl,
    /// Read-modify-write on memory.
    Inc,
    /// 16-bit increment and decrement.
    Inc16,
    /// Block I/O instructions.
    InOut,
    /// `LD A,I` family.
    Ld,
    /// LDI and LDD.
    Ldi,
    /// MULUB.
    Mul8,
    /// MULUW.
    Mul16,
    /// PUSH, RST.
    Push,
    /// RLD and RRD.
    Rld,
    /// Conditional RET.
    Ret,
    /// Minimum spacing between R800 accesses to the VDP port range.
    S1990Vdp,
    /// Per-access VDP port penalty, when enabled.
    T9769Vdp,
    /// `LD SP,HL`.
    LdSpHl,
    /// BIT on (IX+d).
    BitIx,
}

impl Delay {
    /// Number of slots.
    pub const COUNT: usize = 32;

    /// Every slot, in persisted order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Mem,
        Self::MemOp,
        Self::MemPage,
        Self::PreIo,
        Self::PostIo,
        Self::M1,
        Self::Xd,
        Self::Im,
        Self::Im2,
        Self::Nmi,
        Self::Parallel,
        Self::Block,
        Self::Add8,
        Self::Add16,
        Self::Bit,
        Self::Call,
        Self::Djnz,
        Self::ExSpHl,
        Self::Inc,
        Self::Inc16,
        Self::InOut,
        Self::Ld,
        Self::Ldi,
        Self::Mul8,
        Self::Mul16,
        Self::Push,
        Self::Rld,
        Self::Ret,
        Self::S1990Vdp,
        Self::T9769Vdp,
        Self::LdSpHl,
        Self::BitIx,
    ];

    /// Cycle multipliers for the Z80 personality.
    ///
    /// `M1` and `T9769Vdp` are configuration-dependent and patched in by
    /// [`DelayTable::derive`].
    const Z80_CYCLES: [u32; Self::COUNT] = [
        3, 3, 0, 1, 3, 0, 1, 2, 19, 11, 2, 5, 5, 7, 1, 1, 1, 3, 1, 2, 1, 1, 2, 0, 0, 1, 4, 1, 0,
        0, 2, 2,
    ];

    /// Cycle multipliers for the R800 personality.
    const R800_CYCLES: [u32; Self::COUNT] = [
        2, 1, 1, 0, 3, 0, 0, 0, 3, 0, 0, 1, 1, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 12, 34, 1, 1, 0, 57,
        0, 0, 0,
    ];
}

/// Resolved delays, in master ticks, for the active personality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DelayTable([u32; Delay::COUNT]);

impl DelayTable {
    /// Derive the table for `personality` clocked at `frequency_hz`.
    #[must_use]
    pub fn derive(personality: Personality, frequency_hz: u32, m1_wait: bool, vdp_io_delay: bool) -> Self {
        let factor = MasterClock::new(MASTER_FREQUENCY).divider(frequency_hz);
        let mut cycles = match personality {
            Personality::Z80 => Delay::Z80_CYCLES,
            Personality::R800 => Delay::R800_CYCLES,
        };
        if personality == Personality::Z80 && m1_wait {
            cycles[Delay::M1 as usize] = 2;
        }
        if vdp_io_delay {
            cycles[Delay::T9769Vdp as usize] = 1;
        }
        Self(cycles.map(|c| c * factor))
    }

    /// Rebuild a table from persisted slot values.
    #[must_use]
    pub const fn from_raw(slots: [u32; Delay::COUNT]) -> Self {
        Self(slots)
    }

    /// Slot values in persisted order.
    #[must_use]
    pub const fn raw(&self) -> &[u32; Delay::COUNT] {
        &self.0
    }
}

impl Index<Delay> for DelayTable {
    type Output = u32;

    fn index(&self, delay: Delay) -> &u32 {
        &self.0[delay as usize]
    }
}
