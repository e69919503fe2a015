//! Register file.

#![allow(clippy::cast_possible_truncation)] // Intentional truncation for low byte extraction.

/// A 16-bit register pair addressable as two 8-bit halves.
///
/// Backed by a single `u16`; the halves are derived arithmetically, so
/// host byte order never matters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RegisterPair(u16);

impl RegisterPair {
    #[must_use]
    pub const fn new(word: u16) -> Self {
        Self(word)
    }

    #[cfg(test)]
    #[must_use]
    pub const fn from_bytes(high: u8, low: u8) -> Self {
        Self((high as u16) << 8 | low as u16)
    }

    /// Whole 16-bit value.
    #[must_use]
    pub const fn word(self) -> u16 {
        self.0
    }

    /// Upper byte (B of BC, H of HL, ...).
    #[must_use]
    pub const fn high(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Lower byte (C of BC, L of HL, ...).
    #[must_use]
    pub const fn low(self) -> u8 {
        self.0 as u8
    }

    pub fn set_word(&mut self, value: u16) {
        self.0 = value;
    }

    pub fn set_high(&mut self, value: u8) {
        self.0 = (self.0 & 0x00FF) | (u16::from(value) << 8);
    }

    pub fn set_low(&mut self, value: u8) {
        self.0 = (self.0 & 0xFF00) | u16::from(value);
    }

    /// Increment the word, returning the value before the increment.
    pub fn post_inc(&mut self) -> u16 {
        let old = self.0;
        self.0 = old.wrapping_add(1);
        old
    }

    /// Decrement the word, returning the value before the decrement.
    pub fn post_dec(&mut self) -> u16 {
        let old = self.0;
        self.0 = old.wrapping_sub(1);
        old
    }
}

impl From<u16> for RegisterPair {
    fn from(word: u16) -> Self {
        Self(word)
    }
}

impl From<RegisterPair> for u16 {
    fn from(pair: RegisterPair) -> Self {
        pair.0
    }
}

/// One complete register file.
///
/// The engine keeps one of these per personality and swaps the whole struct
/// when the active personality changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    // Main registers
    pub af: RegisterPair,
    pub bc: RegisterPair,
    pub de: RegisterPair,
    pub hl: RegisterPair,

    // Index registers
    pub ix: RegisterPair,
    pub iy: RegisterPair,

    // Other registers
    pub sp: RegisterPair,
    pub pc: RegisterPair,

    // Alternate registers
    pub af_alt: RegisterPair,
    pub bc_alt: RegisterPair,
    pub de_alt: RegisterPair,
    pub hl_alt: RegisterPair,

    /// WZ/MEMPTR - internal temporary register.
    /// Affects undocumented X/Y flags in BIT instructions.
    pub wz: RegisterPair,

    pub i: u8,
    /// Refresh counter. Bit 7 is only changed by `LD R,A`.
    pub r: u8,
    /// Bit 7 as last written by `LD R,A`.
    pub r2: u8,

    // Interrupt state
    pub iff1: bool,
    pub iff2: bool,
    pub im: u8,

    // Halt state
    pub halted: bool,
    /// Set by EI; suppresses interrupt acknowledge after the next instruction.
    pub ei_pending: bool,
}

impl Registers {
    /// Register file as it comes out of reset.
    #[must_use]
    pub const fn power_on() -> Self {
        let ones = RegisterPair::new(0xFFFF);
        Self {
            af: ones,
            bc: ones,
            de: ones,
            hl: ones,
            ix: ones,
            iy: ones,
            sp: ones,
            pc: RegisterPair::new(0),
            af_alt: ones,
            bc_alt: ones,
            de_alt: ones,
            hl_alt: ones,
            wz: ones,
            i: 0,
            r: 0,
            r2: 0,
            iff1: false,
            iff2: false,
            im: 0,
            halted: false,
            ei_pending: false,
        }
    }

    /// Accumulator.
    #[must_use]
    pub const fn a(&self) -> u8 {
        self.af.high()
    }

    /// Flags.
    #[must_use]
    pub const fn f(&self) -> u8 {
        self.af.low()
    }

    pub fn set_a(&mut self, value: u8) {
        self.af.set_high(value);
    }

    pub fn set_f(&mut self, value: u8) {
        self.af.set_low(value);
    }

    /// Advance the 7-bit refresh counter, leaving bit 7 untouched.
    pub fn inc_r(&mut self) {
        self.r = (self.r & 0x80) | (self.r.wrapping_add(1) & 0x7F);
    }
}
