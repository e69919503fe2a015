//! Prefixed instruction tables: CB, ED, DD/FD and DD CB/FD CB.

#![allow(clippy::too_many_lines)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use crate::alu;
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF, ZSPXY, ZSXY};
use crate::host::Host;
use crate::registers::RegisterPair;
use crate::timing::{Delay, Personality};

use super::R800;

/// Index register selected by a DD or FD prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Index {
    Ix,
    Iy,
}

/// Direction of a block instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Increment,
    Decrement,
}

impl Step {
    fn advance(self, pair: &mut RegisterPair) -> u16 {
        match self {
            Self::Increment => pair.post_inc(),
            Self::Decrement => pair.post_dec(),
        }
    }
}

impl R800 {
    // === CB ===

    pub(super) fn execute_cb<H: Host>(&mut self, host: &mut H, op: u8) {
        let r = op & 7;
        let bit = (op >> 3) & 7;

        if r == 6 {
            let address = self.regs.hl.word();
            if op & 0xC0 == 0x40 {
                // BIT b, (HL)
                let value = self.read_mem(host, address);
                self.delay(Delay::Bit);
                let f = alu::bit_memptr(bit, value, self.regs.wz.high(), self.regs.f());
                self.regs.set_f(f);
            } else {
                // Rotate/shift, RES, SET on (HL)
                let value = self.read_mem(host, address);
                let result = self.cb_modify(op, value);
                self.delay(Delay::Inc);
                self.write_mem(host, address, result);
            }
            return;
        }

        let value = self.reg8(r);
        if op & 0xC0 == 0x40 {
            // BIT b, r
            self.regs.set_f(alu::bit(bit, value, self.regs.f()));
        } else {
            let result = self.cb_modify(op, value);
            self.set_reg8(r, result);
        }
    }

    /// Rotate/shift, RES or SET by CB opcode. Only the rotate group touches
    /// flags.
    fn cb_modify(&mut self, op: u8, value: u8) -> u8 {
        let bit = (op >> 3) & 7;
        match op >> 6 {
            0 => {
                let result = alu::shift(bit, value, self.regs.f());
                self.regs.set_f(result.flags);
                result.value
            }
            2 => value & !(1 << bit),
            _ => value | (1 << bit),
        }
    }

    // === ED ===

    pub(super) fn execute_ed<H: Host>(&mut self, host: &mut H, op: u8) {
        match op {
            // IN r, (C)
            0x40 | 0x48 | 0x50 | 0x58 | 0x60 | 0x68 | 0x78 => {
                let port = self.regs.bc.word();
                let value = self.read_port(host, port);
                self.set_reg8(op >> 3, value);
                self.regs.set_f((self.regs.f() & CF) | ZSPXY[value as usize]);
            }

            // IN (C) - flags only
            0x70 => {
                let port = self.regs.bc.word();
                let value = self.read_port(host, port);
                self.regs.set_f((self.regs.f() & CF) | ZSPXY[value as usize]);
            }

            // OUT (C), r
            0x41 | 0x49 | 0x51 | 0x59 | 0x61 | 0x69 | 0x79 => {
                let (port, value) = (self.regs.bc.word(), self.reg8(op >> 3));
                self.write_port(host, port, value);
            }

            // OUT (C), 0
            0x71 => {
                let port = self.regs.bc.word();
                self.write_port(host, port, 0);
            }

            // SBC HL, rr
            0x42 | 0x52 | 0x62 | 0x72 => {
                let value = self.pair_mut(op >> 4).word();
                let hl = self.regs.hl.word();
                let (result, flags) = alu::sbc16(hl, value, self.regs.f());
                self.regs.wz.set_word(hl.wrapping_add(1));
                self.regs.hl.set_word(result);
                self.regs.set_f(flags);
                self.delay(Delay::Add16);
            }

            // ADC HL, rr
            0x4A | 0x5A | 0x6A | 0x7A => {
                let value = self.pair_mut(op >> 4).word();
                let hl = self.regs.hl.word();
                let (result, flags) = alu::adc16(hl, value, self.regs.f());
                self.regs.wz.set_word(hl.wrapping_add(1));
                self.regs.hl.set_word(result);
                self.regs.set_f(flags);
                self.delay(Delay::Add16);
            }

            // LD (nn), rr
            0x43 | 0x53 | 0x63 | 0x73 => {
                let address = self.fetch_word(host);
                self.regs.wz.set_word(address.wrapping_add(1));
                let value = self.pair_mut(op >> 4).word();
                self.write_word(host, address, value);
            }

            // LD rr, (nn)
            0x4B | 0x5B | 0x6B | 0x7B => {
                let address = self.fetch_word(host);
                self.regs.wz.set_word(address.wrapping_add(1));
                let value = self.read_word(host, address);
                self.pair_mut(op >> 4).set_word(value);
            }

            // NEG
            0x44 | 0x4C | 0x54 | 0x5C | 0x64 | 0x6C | 0x74 | 0x7C => {
                let result = alu::sub8(0, self.regs.a(), false);
                self.apply_accumulator(result);
            }

            // RETN / RETI
            0x45 | 0x4D | 0x55 | 0x5D | 0x65 | 0x6D | 0x75 | 0x7D => {
                self.regs.iff1 = self.regs.iff2;
                self.ret(host);
            }

            // IM 0
            0x46 | 0x4E | 0x66 | 0x6E => self.regs.im = 0,

            // IM 1
            0x56 | 0x76 => self.regs.im = 1,

            // IM 2
            0x5E | 0x7E => self.regs.im = 2,

            // LD I, A
            0x47 => {
                self.delay(Delay::Ld);
                self.regs.i = self.regs.a();
            }

            // LD R, A
            0x4F => {
                self.delay(Delay::Ld);
                self.regs.r = self.regs.a();
                self.regs.r2 = self.regs.a();
            }

            // LD A, I
            0x57 => {
                self.delay(Delay::Ld);
                let value = self.regs.i;
                self.load_a_special(value);
            }

            // LD A, R
            0x5F => {
                self.delay(Delay::Ld);
                let value = (self.regs.r & 0x7F) | (self.regs.r2 & 0x80);
                self.load_a_special(value);
            }

            // RRD
            0x67 => {
                let address = self.regs.hl.word();
                let value = self.read_mem(host, address);
                self.regs.wz.set_word(address.wrapping_add(1));
                self.delay(Delay::Rld);
                let a = self.regs.a();
                self.write_mem(host, address, (value >> 4) | (a << 4));
                self.rotate_digit_result((a & 0xF0) | (value & 0x0F));
            }

            // RLD
            0x6F => {
                let address = self.regs.hl.word();
                let value = self.read_mem(host, address);
                self.regs.wz.set_word(address.wrapping_add(1));
                self.delay(Delay::Rld);
                let a = self.regs.a();
                self.write_mem(host, address, (value << 4) | (a & 0x0F));
                self.rotate_digit_result((a & 0xF0) | (value >> 4));
            }

            // LDI / LDD / LDIR / LDDR
            0xA0 | 0xA8 | 0xB0 | 0xB8 => {
                self.block_load(host, Self::step_for(op));
                if op & 0x10 != 0 && self.regs.bc.word() != 0 {
                    self.repeat_block();
                }
            }

            // CPI / CPD / CPIR / CPDR
            0xA1 | 0xA9 | 0xB1 | 0xB9 => {
                self.block_compare(host, Self::step_for(op));
                if op & 0x10 != 0 && self.regs.bc.word() != 0 && self.regs.f() & ZF == 0 {
                    self.repeat_block();
                }
            }

            // INI / IND / INIR / INDR
            0xA2 | 0xAA | 0xB2 | 0xBA => {
                self.block_in(host, Self::step_for(op));
                if op & 0x10 != 0 && self.regs.bc.high() != 0 {
                    self.repeat_block();
                }
            }

            // OUTI / OUTD / OTIR / OTDR
            0xA3 | 0xAB | 0xB3 | 0xBB => {
                self.block_out(host, Self::step_for(op));
                if op & 0x10 != 0 && self.regs.bc.high() != 0 {
                    self.repeat_block();
                }
            }

            // MULUB A, r
            0xC1 | 0xC9 | 0xD1 | 0xD9 => {
                if self.personality == Personality::R800 {
                    let value = self.reg8(op >> 3);
                    let (product, flags) = alu::mulu8(self.regs.a(), value, self.regs.f());
                    self.regs.hl.set_word(product);
                    self.regs.set_f(flags);
                    self.delay(Delay::Mul8);
                }
            }

            // MULUW HL, rr
            0xC3 | 0xF3 => {
                if self.personality == Personality::R800 {
                    let value = self.pair_mut(op >> 4).word();
                    let (product, flags) =
                        alu::mulu16(self.regs.hl.word(), value, self.regs.f());
                    self.regs.de.set_word((product >> 16) as u16);
                    self.regs.hl.set_word(product as u16);
                    self.regs.set_f(flags);
                    self.delay(Delay::Mul16);
                }
            }

            // Host patch hook
            0xFE => host.patch(&mut self.regs),

            // Everything else is a two-byte NOP
            _ => {}
        }
    }

    /// Shared tail of `LD A,I` and `LD A,R`. P/V copies IFF2, except that
    /// the Z80 reads it as clear when an interrupt is about to be taken.
    fn load_a_special(&mut self, value: u8) {
        self.regs.set_a(value);
        let mut f = (self.regs.f() & CF) | ZSXY[value as usize];
        if self.regs.iff2 {
            f |= PF;
        }
        if self.personality == Personality::Z80 && self.interrupt_requested() {
            f &= !PF;
        }
        self.regs.set_f(f);
    }

    fn rotate_digit_result(&mut self, a: u8) {
        self.regs.set_a(a);
        self.regs.set_f((self.regs.f() & CF) | ZSPXY[a as usize]);
    }

    const fn step_for(op: u8) -> Step {
        if op & 0x08 == 0 { Step::Increment } else { Step::Decrement }
    }

    /// Undo the fetch so the same block instruction runs again.
    fn repeat_block(&mut self) {
        self.delay(Delay::Block);
        self.regs.pc.set_word(self.regs.pc.word().wrapping_sub(2));
        self.instruction_count = self.instruction_count.wrapping_sub(1);
    }

    /// LDI / LDD.
    fn block_load<H: Host>(&mut self, host: &mut H, step: Step) {
        let source = step.advance(&mut self.regs.hl);
        let value = self.read_mem(host, source);
        let dest = step.advance(&mut self.regs.de);
        self.write_mem(host, dest, value);
        self.delay(Delay::Ldi);

        self.regs.bc.post_dec();
        let n = self.regs.a().wrapping_add(value);
        let mut f = (self.regs.f() & (SF | ZF | CF)) | ((n << 4) & YF) | (n & XF);
        if self.regs.bc.word() != 0 {
            f |= PF;
        }
        self.regs.set_f(f);
    }

    /// CPI / CPD.
    fn block_compare<H: Host>(&mut self, host: &mut H, step: Step) {
        let address = step.advance(&mut self.regs.hl);
        let value = self.read_mem(host, address);
        let a = self.regs.a();
        let mut rv = a.wrapping_sub(value);
        self.delay(Delay::Block);

        self.regs.bc.post_dec();
        let mut f = (self.regs.f() & CF)
            | ((a ^ value ^ rv) & HF)
            | (ZSPXY[rv as usize] & (ZF | SF))
            | NF;
        rv = rv.wrapping_sub((f & HF) >> 4);
        f |= ((rv << 4) & YF) | (rv & XF);
        if self.regs.bc.word() != 0 {
            f |= PF;
        }
        self.regs.set_f(f);
    }

    /// INI / IND.
    fn block_in<H: Host>(&mut self, host: &mut H, step: Step) {
        self.delay(Delay::InOut);
        let b = self.regs.bc.high().wrapping_sub(1);
        self.regs.bc.set_high(b);
        let port = self.regs.bc.word();
        let value = self.read_port(host, port);
        let address = step.advance(&mut self.regs.hl);
        self.write_mem(host, address, value);

        let c = match step {
            Step::Increment => self.regs.bc.low().wrapping_add(1),
            Step::Decrement => self.regs.bc.low().wrapping_sub(1),
        };
        self.block_io_flags(value, c);
    }

    /// OUTI / OUTD.
    fn block_out<H: Host>(&mut self, host: &mut H, step: Step) {
        self.delay(Delay::InOut);
        let address = step.advance(&mut self.regs.hl);
        let value = self.read_mem(host, address);
        let port = self.regs.bc.word();
        self.write_port(host, port, value);
        let b = self.regs.bc.high().wrapping_sub(1);
        self.regs.bc.set_high(b);

        let l = self.regs.hl.low();
        self.block_io_flags(value, l);
    }

    /// Flags after a block I/O step, from the transferred byte and the
    /// adjusted counterpart (C for input, L for output).
    fn block_io_flags(&mut self, value: u8, counterpart: u8) {
        let b = self.regs.bc.high();
        let tmp = u16::from(value) + u16::from(counterpart);
        let mut f = ZSXY[b as usize] | ((value >> 6) & NF);
        if tmp > 0xFF {
            f |= HF | CF;
        }
        f |= ZSPXY[(((tmp as u8) & 7) ^ b) as usize] & PF;
        self.regs.set_f(f);
    }

    // === DD / FD ===

    fn index_pair(&self, index: Index) -> RegisterPair {
        match index {
            Index::Ix => self.regs.ix,
            Index::Iy => self.regs.iy,
        }
    }

    fn index_pair_mut(&mut self, index: Index) -> &mut RegisterPair {
        match index {
            Index::Ix => &mut self.regs.ix,
            Index::Iy => &mut self.regs.iy,
        }
    }

    /// Register by 3-bit encoding with H and L replaced by the index halves.
    fn index_reg8(&self, index: Index, r: u8) -> u8 {
        match r & 7 {
            4 => self.index_pair(index).high(),
            5 => self.index_pair(index).low(),
            _ => self.reg8(r),
        }
    }

    fn set_index_reg8(&mut self, index: Index, r: u8, value: u8) {
        match r & 7 {
            4 => self.index_pair_mut(index).set_high(value),
            5 => self.index_pair_mut(index).set_low(value),
            _ => self.set_reg8(r, value),
        }
    }

    /// Fetch a displacement, charge the address calculation and return
    /// the effective address, which also lands in MEMPTR.
    fn indexed_address<H: Host>(&mut self, host: &mut H, index: Index) -> u16 {
        let base = self.index_pair(index).word();
        let address = self.fetch_displaced(host, base);
        self.delay(Delay::Add8);
        self.regs.wz.set_word(address);
        address
    }

    /// DD/FD table. Opcodes that don't involve HL fall back to the
    /// unprefixed table.
    pub(super) fn execute_index<H: Host>(&mut self, host: &mut H, index: Index, op: u8) {
        match op {
            // ADD IX, rr
            0x09 | 0x19 | 0x29 | 0x39 => {
                let value = match op >> 4 {
                    0 => self.regs.bc.word(),
                    1 => self.regs.de.word(),
                    2 => self.index_pair(index).word(),
                    _ => self.regs.sp.word(),
                };
                let base = self.index_pair(index).word();
                let (result, flags) = alu::add16(base, value, self.regs.f());
                self.regs.wz.set_word(base.wrapping_add(1));
                self.index_pair_mut(index).set_word(result);
                self.regs.set_f(flags);
                self.delay(Delay::Add16);
            }

            // LD IX, nn
            0x21 => {
                let value = self.fetch_word(host);
                self.index_pair_mut(index).set_word(value);
            }

            // LD (nn), IX
            0x22 => {
                let address = self.fetch_word(host);
                self.regs.wz.set_word(address.wrapping_add(1));
                let value = self.index_pair(index).word();
                self.write_word(host, address, value);
            }

            // LD IX, (nn)
            0x2A => {
                let address = self.fetch_word(host);
                self.regs.wz.set_word(address.wrapping_add(1));
                let value = self.read_word(host, address);
                self.index_pair_mut(index).set_word(value);
            }

            // INC IX
            0x23 => {
                self.delay(Delay::Inc16);
                self.index_pair_mut(index).post_inc();
            }

            // DEC IX
            0x2B => {
                self.delay(Delay::Inc16);
                self.index_pair_mut(index).post_dec();
            }

            // INC IXH / INC IXL
            0x24 | 0x2C => {
                let r = op >> 3;
                let result = alu::inc8(self.index_reg8(index, r), self.regs.f());
                self.set_index_reg8(index, r, result.value);
                self.regs.set_f(result.flags);
            }

            // DEC IXH / DEC IXL
            0x25 | 0x2D => {
                let r = op >> 3;
                let result = alu::dec8(self.index_reg8(index, r), self.regs.f());
                self.set_index_reg8(index, r, result.value);
                self.regs.set_f(result.flags);
            }

            // LD IXH, n / LD IXL, n
            0x26 | 0x2E => {
                let value = self.fetch(host);
                self.set_index_reg8(index, op >> 3, value);
            }

            // INC (IX+d) / DEC (IX+d)
            0x34 | 0x35 => {
                let base = self.index_pair(index).word();
                let address = self.fetch_displaced(host, base);
                self.delay(Delay::Add8);
                let value = self.read_mem(host, address);
                let result = if op == 0x34 {
                    alu::inc8(value, self.regs.f())
                } else {
                    alu::dec8(value, self.regs.f())
                };
                self.regs.set_f(result.flags);
                self.delay(Delay::Inc);
                self.write_mem(host, address, result.value);
                self.regs.wz.set_word(address);
            }

            // LD (IX+d), n
            0x36 => {
                let base = self.index_pair(index).word();
                let address = self.fetch_displaced(host, base);
                let value = self.fetch(host);
                self.delay(Delay::Parallel);
                self.regs.wz.set_word(address);
                self.write_mem(host, address, value);
            }

            // HALT
            0x76 => self.execute_unprefixed(host, op),

            // LD r, (IX+d) - H and L are the real registers here
            0x46 | 0x4E | 0x56 | 0x5E | 0x66 | 0x6E | 0x7E => {
                let address = self.indexed_address(host, index);
                let value = self.read_mem(host, address);
                self.set_reg8(op >> 3, value);
            }

            // LD (IX+d), r
            0x70..=0x77 => {
                let address = self.indexed_address(host, index);
                let value = self.reg8(op);
                self.write_mem(host, address, value);
            }

            // LD r, r' with IXH/IXL standing in for H/L
            0x40..=0x7F if matches!(op & 7, 4 | 5) || matches!((op >> 3) & 7, 4 | 5) => {
                let value = self.index_reg8(index, op);
                self.set_index_reg8(index, op >> 3, value);
            }

            // ALU A, (IX+d)
            0x86 | 0x8E | 0x96 | 0x9E | 0xA6 | 0xAE | 0xB6 | 0xBE => {
                let address = self.indexed_address(host, index);
                let value = self.read_mem(host, address);
                self.alu_a(op, value);
            }

            // ALU A, r with IXH/IXL
            0x80..=0xBF => {
                let value = self.index_reg8(index, op);
                self.alu_a(op, value);
            }

            // DD CB d op
            0xCB => {
                let base = self.index_pair(index).word();
                let address = self.fetch_displaced(host, base);
                let op = self.fetch(host);
                self.delay(Delay::M1);
                self.execute_index_cb(host, address, op);
            }

            // POP IX
            0xE1 => {
                let value = self.pop(host);
                self.index_pair_mut(index).set_word(value);
            }

            // EX (SP), IX
            0xE3 => {
                let value = self.index_pair(index).word();
                let value = self.ex_sp(host, value);
                self.index_pair_mut(index).set_word(value);
            }

            // PUSH IX
            0xE5 => {
                let value = self.index_pair(index).word();
                self.delay(Delay::Push);
                self.push(host, value);
            }

            // JP (IX)
            0xE9 => {
                let value = self.index_pair(index).word();
                self.regs.pc.set_word(value);
            }

            // LD SP, IX
            0xF9 => {
                self.delay(Delay::LdSpHl);
                self.regs.sp = self.index_pair(index);
            }

            // The prefix has no effect on anything else
            _ => self.execute_unprefixed(host, op),
        }
    }

    // === DD CB / FD CB ===

    /// Effective-address CB table. Rotate/shift, RES and SET also copy the
    /// result into the register named by the low bits, unless they are 6.
    fn execute_index_cb<H: Host>(&mut self, host: &mut H, address: u16, op: u8) {
        let bit = (op >> 3) & 7;

        if op & 0xC0 == 0x40 {
            // BIT b, (IX+d)
            self.delay(Delay::BitIx);
            self.regs.wz.set_word(address);
            let value = self.read_mem(host, address);
            let f = alu::bit_memptr(bit, value, self.regs.wz.high(), self.regs.f());
            self.regs.set_f(f);
            return;
        }

        let value = self.read_mem(host, address);
        self.regs.wz.set_word(address);
        let result = self.cb_modify(op, value);
        self.delay(Delay::Bit);
        self.delay(Delay::Inc);
        self.write_mem(host, address, result);

        let r = op & 7;
        if r != 6 {
            self.set_reg8(r, result);
        }
    }
}
