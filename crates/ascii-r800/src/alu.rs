//! ALU operations shared by both personalities.
//!
//! Every routine is pure: it takes operands plus the current flag byte and
//! returns the new value and flags. Timing and register write-back belong
//! to the caller.

#![allow(clippy::cast_possible_truncation)] // Intentional truncation for low byte extraction.
#![allow(clippy::cast_sign_loss)] // Wrapped intermediates are masked back to bytes.

use crate::flags::{CF, DAA, HF, NF, PF, SF, XF, YF, ZF, ZSPH, ZSPXY, ZSXY};

/// Result of an ALU operation with flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluResult {
    pub value: u8,
    pub flags: u8,
}

/// Increment byte. Carry is preserved from `f`.
#[must_use]
pub fn inc8(value: u8, f: u8) -> AluResult {
    let result = value.wrapping_add(1);
    let mut flags = (f & CF) | ZSXY[result as usize];
    if result == 0x80 {
        flags |= PF;
    }
    if result & 0x0F == 0 {
        flags |= HF;
    }
    AluResult { value: result, flags }
}

/// Decrement byte. Carry is preserved from `f`.
#[must_use]
pub fn dec8(value: u8, f: u8) -> AluResult {
    let result = value.wrapping_sub(1);
    let mut flags = (f & CF) | ZSXY[result as usize] | NF;
    if result == 0x7F {
        flags |= PF;
    }
    if result & 0x0F == 0x0F {
        flags |= HF;
    }
    AluResult { value: result, flags }
}

/// Add with optional carry in.
#[must_use]
pub fn add8(a: u8, b: u8, carry: bool) -> AluResult {
    let (a16, b16) = (u16::from(a), u16::from(b));
    let rv = a16 + b16 + u16::from(carry);
    let flags = ZSXY[(rv & 0xFF) as usize]
        | ((rv >> 8) as u8 & CF)
        | ((a16 ^ rv ^ b16) as u8 & HF)
        | ((((b16 ^ a16 ^ 0x80) & (b16 ^ rv)) >> 5) as u8 & PF);
    AluResult { value: rv as u8, flags }
}

/// Subtract with optional borrow in.
#[must_use]
pub fn sub8(a: u8, b: u8, carry: bool) -> AluResult {
    let (a16, b16) = (u16::from(a), u16::from(b));
    let rv = a16.wrapping_sub(b16).wrapping_sub(u16::from(carry));
    let flags = ZSXY[(rv & 0xFF) as usize]
        | ((rv >> 8) as u8 & CF)
        | ((a16 ^ rv ^ b16) as u8 & HF)
        | NF
        | ((((b16 ^ a16) & (rv ^ a16)) >> 5) as u8 & PF);
    AluResult { value: rv as u8, flags }
}

/// Compare. X and Y come from the operand, not the difference.
#[must_use]
pub fn cp8(a: u8, b: u8) -> u8 {
    let result = sub8(a, b, false);
    (result.flags & !(YF | XF)) | (b & (YF | XF))
}

#[must_use]
pub fn and8(a: u8, b: u8) -> AluResult {
    let value = a & b;
    AluResult { value, flags: ZSPXY[value as usize] | HF }
}

#[must_use]
pub fn or8(a: u8, b: u8) -> AluResult {
    let value = a | b;
    AluResult { value, flags: ZSPXY[value as usize] }
}

#[must_use]
pub fn xor8(a: u8, b: u8) -> AluResult {
    let value = a ^ b;
    AluResult { value, flags: ZSPXY[value as usize] }
}

/// 16-bit add for HL/IX/IY. S, Z and P/V are preserved from `f`.
#[must_use]
pub fn add16(a: u16, b: u16, f: u8) -> (u16, u8) {
    let rv = u32::from(a) + u32::from(b);
    let flags = (f & (SF | ZF | PF))
        | (((u32::from(a) ^ u32::from(b) ^ rv) >> 8) as u8 & HF)
        | ((rv >> 16) as u8 & CF)
        | ((rv >> 8) as u8 & (XF | YF));
    (rv as u16, flags)
}

/// 16-bit add with carry for HL.
#[must_use]
pub fn adc16(a: u16, b: u16, f: u8) -> (u16, u8) {
    let (a32, b32) = (u32::from(a), u32::from(b));
    let rv = a32 + b32 + u32::from(f & CF);
    let mut flags = (((a32 ^ b32 ^ rv) >> 8) as u8 & HF)
        | ((rv >> 16) as u8 & CF)
        | ((((b32 ^ a32 ^ 0x8000) & (b32 ^ rv)) >> 13) as u8 & PF)
        | ((rv >> 8) as u8 & (SF | XF | YF));
    if rv & 0xFFFF == 0 {
        flags |= ZF;
    }
    (rv as u16, flags)
}

/// 16-bit subtract with borrow for HL.
#[must_use]
pub fn sbc16(a: u16, b: u16, f: u8) -> (u16, u8) {
    let (a32, b32) = (u32::from(a), u32::from(b));
    let rv = a32.wrapping_sub(b32).wrapping_sub(u32::from(f & CF));
    let mut flags = (((a32 ^ b32 ^ rv) >> 8) as u8 & HF)
        | NF
        | ((rv >> 16) as u8 & CF)
        | ((((b32 ^ a32) & (a32 ^ rv)) >> 13) as u8 & PF)
        | ((rv >> 8) as u8 & (SF | XF | YF));
    if rv & 0xFFFF == 0 {
        flags |= ZF;
    }
    (rv as u16, flags)
}

/// R800 8x8 unsigned multiply. Returns the product for HL.
///
/// N and H survive; Z reflects the product; C mirrors bit 15.
#[must_use]
pub fn mulu8(a: u8, b: u8, f: u8) -> (u16, u8) {
    let product = u16::from(a) * u16::from(b);
    let mut flags = (f & (NF | HF)) | ((product >> 15) as u8 & CF);
    if product == 0 {
        flags |= ZF;
    }
    (product, flags)
}

/// R800 16x16 unsigned multiply. Returns the 32-bit product for DE:HL.
#[must_use]
pub fn mulu16(a: u16, b: u16, f: u8) -> (u32, u8) {
    let product = u32::from(a) * u32::from(b);
    let mut flags = (f & (NF | HF)) | ((product >> 31) as u8 & CF);
    if product == 0 {
        flags |= ZF;
    }
    (product, flags)
}

/// Rotate and shift group, selected by bits 3-5 of a CB opcode.
///
/// 0 RLC, 1 RRC, 2 RL, 3 RR, 4 SLA, 5 SRA, 6 SLL, 7 SRL.
#[must_use]
pub fn shift(op: u8, value: u8, f: u8) -> AluResult {
    let (result, carry) = match op & 7 {
        0 => (value.rotate_left(1), value >> 7),
        1 => (value.rotate_right(1), value & 1),
        2 => ((value << 1) | (f & CF), value >> 7),
        3 => ((value >> 1) | ((f & CF) << 7), value & 1),
        4 => (value << 1, value >> 7),
        5 => ((value >> 1) | (value & 0x80), value & 1),
        6 => ((value << 1) | 1, value >> 7),
        _ => (value >> 1, value & 1),
    };
    AluResult { value: result, flags: ZSPXY[result as usize] | carry }
}

/// BIT b,r. X and Y copy the tested register.
#[must_use]
pub fn bit(bit: u8, value: u8, f: u8) -> u8 {
    (f & CF) | (value & (XF | YF)) | ZSPH[(value & (1 << bit)) as usize]
}

/// BIT b,(HL) and BIT b,(IX+d). X and Y come from MEMPTR's high byte.
#[must_use]
pub fn bit_memptr(bit: u8, value: u8, memptr_high: u8, f: u8) -> u8 {
    (f & CF) | (memptr_high & (XF | YF)) | ZSPH[(value & (1 << bit)) as usize]
}

/// RLCA.
#[must_use]
pub fn rlca(a: u8, f: u8) -> AluResult {
    let value = a.rotate_left(1);
    AluResult {
        value,
        flags: (f & (SF | ZF | PF)) | (value & (YF | XF | CF)),
    }
}

/// RRCA.
#[must_use]
pub fn rrca(a: u8, f: u8) -> AluResult {
    let value = a.rotate_right(1);
    AluResult {
        value,
        flags: (f & (SF | ZF | PF)) | (a & CF) | (value & (XF | YF)),
    }
}

/// RLA.
#[must_use]
pub fn rla(a: u8, f: u8) -> AluResult {
    let value = (a << 1) | (f & CF);
    AluResult {
        value,
        flags: (f & (SF | ZF | PF)) | (a >> 7) | (value & (XF | YF)),
    }
}

/// RRA.
#[must_use]
pub fn rra(a: u8, f: u8) -> AluResult {
    let value = (a >> 1) | ((f & CF) << 7);
    AluResult {
        value,
        flags: (f & (SF | ZF | PF)) | (a & CF) | (value & (XF | YF)),
    }
}

/// DAA. Returns the complete new AF.
#[must_use]
pub fn daa(a: u8, f: u8) -> u16 {
    let index = usize::from(a) | (usize::from(f & (NF | CF)) << 8) | (usize::from(f & HF) << 6);
    DAA[index]
}

/// CPL.
#[must_use]
pub fn cpl(a: u8, f: u8) -> AluResult {
    let value = !a;
    AluResult {
        value,
        flags: (f & (SF | ZF | PF | CF)) | HF | NF | (value & (XF | YF)),
    }
}

/// SCF flags.
#[must_use]
pub fn scf(a: u8, f: u8) -> u8 {
    (f & (SF | ZF | PF)) | CF | ((f | a) & (XF | YF))
}

/// CCF flags. H takes the old carry.
#[must_use]
pub fn ccf(a: u8, f: u8) -> u8 {
    ((f & (SF | ZF | PF | CF)) | ((f & CF) << 4) | ((f | a) & (XF | YF))) ^ CF
}
