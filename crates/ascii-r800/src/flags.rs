//! Flag register bits and precomputed flag tables.
//!
//! The tables are built at compile time, so ALU helpers index them instead of
//! recomputing parity per instruction.

/// Sign flag (bit 7) - set if result is negative.
pub const SF: u8 = 0b1000_0000;

/// Zero flag (bit 6) - set if result is zero.
pub const ZF: u8 = 0b0100_0000;

/// Undocumented flag (bit 5) - copy of bit 5 of result.
pub const YF: u8 = 0b0010_0000;

/// Half-carry flag (bit 4) - carry from bit 3 to bit 4.
pub const HF: u8 = 0b0001_0000;

/// Undocumented flag (bit 3) - copy of bit 3 of result.
pub const XF: u8 = 0b0000_1000;

/// Parity/Overflow flag (bit 2) - parity or overflow depending on instruction.
pub const PF: u8 = 0b0000_0100;

/// Add/Subtract flag (bit 1) - set if last operation was subtraction.
pub const NF: u8 = 0b0000_0010;

/// Carry flag (bit 0) - carry out of bit 7.
pub const CF: u8 = 0b0000_0001;

/// Compute parity of a byte (true if even number of 1 bits).
#[must_use]
pub const fn parity(value: u8) -> bool {
    value.count_ones().is_multiple_of(2)
}

/// Build flags byte for common arithmetic results.
#[must_use]
pub const fn sz53(value: u8) -> u8 {
    let mut f = 0;
    if value == 0 {
        f |= ZF;
    }
    if value & 0x80 != 0 {
        f |= SF;
    }
    // Copy bits 5 and 3 from value (undocumented flags)
    f |= value & (YF | XF);
    f
}

/// Build flags byte with parity.
#[must_use]
pub const fn sz53p(value: u8) -> u8 {
    let mut f = sz53(value);
    if parity(value) {
        f |= PF;
    }
    f
}

/// Zero, sign and undocumented bits of each byte value.
pub static ZSXY: [u8; 256] = build_zsxy();

/// [`ZSXY`] plus even parity in P/V.
pub static ZSPXY: [u8; 256] = build_zspxy();

/// Zero, sign and parity with half-carry always set. Used by BIT, where the
/// masked operand is either zero or a single set bit.
pub static ZSPH: [u8; 256] = build_zsph();

/// Decimal-adjust results, indexed by `A | C << 8 | N << 9 | H << 10`.
///
/// Each entry is the complete new AF: adjusted accumulator in the high byte,
/// flags in the low byte.
pub static DAA: [u16; 0x800] = build_daa();

const fn build_zsxy() -> [u8; 256] {
    let mut table = [0; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = sz53(i as u8);
        i += 1;
    }
    table
}

const fn build_zspxy() -> [u8; 256] {
    let mut table = [0; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = sz53p(i as u8);
        i += 1;
    }
    table
}

const fn build_zsph() -> [u8; 256] {
    let mut table = [0; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = (sz53p(i as u8) & (SF | ZF | PF)) | HF;
        i += 1;
    }
    table
}

const fn build_daa() -> [u16; 0x800] {
    let mut table = [0; 0x800];
    let mut i = 0;
    while i < 0x800 {
        let carry = i & 0x100 != 0;
        let subtract = i & 0x200 != 0;
        let half = i & 0x400 != 0;
        let a = (i & 0xFF) as u8;
        let hi = a >> 4;
        let lo = a & 0x0F;

        let diff: u8 = if carry {
            if lo <= 9 && !half { 0x60 } else { 0x66 }
        } else if lo >= 10 {
            if hi <= 8 { 0x06 } else { 0x66 }
        } else if hi >= 10 {
            if half { 0x66 } else { 0x60 }
        } else if half {
            0x06
        } else {
            0x00
        };

        let result = if subtract { a.wrapping_sub(diff) } else { a.wrapping_add(diff) };

        let mut f = sz53p(result);
        if subtract {
            f |= NF;
        }
        let carry_out = if lo <= 9 { hi >= 10 } else { hi >= 9 };
        if carry || carry_out {
            f |= CF;
        }
        let half_out = if subtract { half && lo <= 5 } else { lo >= 10 };
        if half_out {
            f |= HF;
        }

        table[i] = ((result as u16) << 8) | f as u16;
        i += 1;
    }
    table
}
