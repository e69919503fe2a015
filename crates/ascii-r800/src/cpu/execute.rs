//! Unprefixed instruction table and the helpers shared with the prefixed
//! tables.

#![allow(clippy::too_many_lines)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use crate::alu;
use crate::flags::{CF, PF, SF, ZF};
use crate::host::{DebugCommand, Host};
use crate::registers::RegisterPair;
use crate::timing::Delay;

use super::R800;
use super::prefixed::Index;

impl R800 {
    /// Execute unprefixed instruction.
    pub(super) fn execute_unprefixed<H: Host>(&mut self, host: &mut H, op: u8) {
        match op {
            // NOP
            0x00 => {}

            // LD rr, nn
            0x01 | 0x11 | 0x21 | 0x31 => {
                let value = self.fetch_word(host);
                self.pair_mut(op >> 4).set_word(value);
            }

            // LD (BC), A
            0x02 => {
                let (address, a) = (self.regs.bc.word(), self.regs.a());
                self.write_mem(host, address, a);
            }

            // LD (DE), A
            0x12 => {
                let (address, a) = (self.regs.de.word(), self.regs.a());
                self.write_mem(host, address, a);
            }

            // INC rr
            0x03 | 0x13 | 0x23 | 0x33 => {
                self.delay(Delay::Inc16);
                self.pair_mut(op >> 4).post_inc();
            }

            // DEC rr
            0x0B | 0x1B | 0x2B | 0x3B => {
                self.delay(Delay::Inc16);
                self.pair_mut(op >> 4).post_dec();
            }

            // INC r
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x3C => {
                let r = op >> 3;
                let result = alu::inc8(self.reg8(r), self.regs.f());
                self.set_reg8(r, result.value);
                self.regs.set_f(result.flags);
            }

            // INC (HL)
            0x34 => {
                let address = self.regs.hl.word();
                let value = self.read_mem(host, address);
                let result = alu::inc8(value, self.regs.f());
                self.regs.set_f(result.flags);
                self.delay(Delay::Inc);
                self.write_mem(host, address, result.value);
            }

            // DEC r
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x3D => {
                let r = op >> 3;
                let result = alu::dec8(self.reg8(r), self.regs.f());
                self.set_reg8(r, result.value);
                self.regs.set_f(result.flags);
            }

            // DEC (HL)
            0x35 => {
                let address = self.regs.hl.word();
                let value = self.read_mem(host, address);
                let result = alu::dec8(value, self.regs.f());
                self.regs.set_f(result.flags);
                self.delay(Delay::Inc);
                self.write_mem(host, address, result.value);
            }

            // LD r, n
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x3E => {
                let value = self.fetch(host);
                self.set_reg8(op >> 3, value);
            }

            // LD (HL), n
            0x36 => {
                let value = self.fetch(host);
                let address = self.regs.hl.word();
                self.write_mem(host, address, value);
            }

            // RLCA
            0x07 => self.apply_accumulator(alu::rlca(self.regs.a(), self.regs.f())),

            // RRCA
            0x0F => self.apply_accumulator(alu::rrca(self.regs.a(), self.regs.f())),

            // RLA
            0x17 => self.apply_accumulator(alu::rla(self.regs.a(), self.regs.f())),

            // RRA
            0x1F => self.apply_accumulator(alu::rra(self.regs.a(), self.regs.f())),

            // EX AF, AF'
            0x08 => std::mem::swap(&mut self.regs.af, &mut self.regs.af_alt),

            // ADD HL, rr
            0x09 | 0x19 | 0x29 | 0x39 => {
                let value = self.pair_mut(op >> 4).word();
                let hl = self.regs.hl.word();
                let (result, flags) = alu::add16(hl, value, self.regs.f());
                self.regs.wz.set_word(hl.wrapping_add(1));
                self.regs.hl.set_word(result);
                self.regs.set_f(flags);
                self.delay(Delay::Add16);
            }

            // LD A, (BC)
            0x0A => {
                let address = self.regs.bc.word();
                let value = self.read_mem(host, address);
                self.regs.set_a(value);
            }

            // LD A, (DE)
            0x1A => {
                let address = self.regs.de.word();
                let value = self.read_mem(host, address);
                self.regs.set_a(value);
            }

            // DJNZ d
            0x10 => {
                self.delay(Delay::Djnz);
                let b = self.regs.bc.high().wrapping_sub(1);
                self.regs.bc.set_high(b);
                self.jr(host, b != 0);
            }

            // JR d
            0x18 => self.jr(host, true),

            // JR NZ/Z/NC/C, d
            0x20 | 0x28 | 0x30 | 0x38 => {
                let taken = self.condition((op >> 3) & 3);
                self.jr(host, taken);
            }

            // LD (nn), HL
            0x22 => {
                let address = self.fetch_word(host);
                self.regs.wz.set_word(address.wrapping_add(1));
                let hl = self.regs.hl.word();
                self.write_word(host, address, hl);
            }

            // LD HL, (nn)
            0x2A => {
                let address = self.fetch_word(host);
                self.regs.wz.set_word(address.wrapping_add(1));
                let value = self.read_word(host, address);
                self.regs.hl.set_word(value);
            }

            // DAA
            0x27 => {
                let af = alu::daa(self.regs.a(), self.regs.f());
                self.regs.af.set_word(af);
            }

            // CPL
            0x2F => self.apply_accumulator(alu::cpl(self.regs.a(), self.regs.f())),

            // SCF
            0x37 => self.regs.set_f(alu::scf(self.regs.a(), self.regs.f())),

            // CCF
            0x3F => self.regs.set_f(alu::ccf(self.regs.a(), self.regs.f())),

            // LD (nn), A
            0x32 => {
                let address = self.fetch_word(host);
                let a = self.regs.a();
                self.regs.wz.set_word(u16::from(a) << 8);
                self.write_mem(host, address, a);
            }

            // LD A, (nn)
            0x3A => {
                let address = self.fetch_word(host);
                let value = self.read_mem(host, address);
                self.regs.set_a(value);
                self.regs.wz.set_word(address.wrapping_add(1));
            }

            // LD B, B (assembler breakpoint command)
            0x40 => {
                if self.config.debug_commands {
                    self.breakpoint_command(host);
                }
            }

            // LD C, C (software trap)
            0x49 => {
                if self.config.trap_opcode {
                    self.trap_command(host);
                }
            }

            // LD D, D (assembler trace command)
            0x52 => {
                if self.config.debug_commands {
                    self.trace_command(host);
                }
            }

            // HALT
            0x76 => {
                if self.interrupt_requested() {
                    self.regs.halted = false;
                } else {
                    self.regs.pc.post_dec();
                    self.regs.halted = true;
                }
            }

            // LD r, r' / LD r, (HL) / LD (HL), r
            0x40..=0x7F => {
                let src = op & 7;
                let dst = (op >> 3) & 7;
                if src == 6 {
                    let address = self.regs.hl.word();
                    let value = self.read_mem(host, address);
                    self.set_reg8(dst, value);
                } else if dst == 6 {
                    let address = self.regs.hl.word();
                    let value = self.reg8(src);
                    self.write_mem(host, address, value);
                } else {
                    let value = self.reg8(src);
                    self.set_reg8(dst, value);
                }
            }

            // ADD/ADC/SUB/SBC/AND/XOR/OR/CP r
            0x80..=0xBF => {
                let src = op & 7;
                let value = if src == 6 {
                    let address = self.regs.hl.word();
                    self.read_mem(host, address)
                } else {
                    self.reg8(src)
                };
                self.alu_a(op, value);
            }

            // RET cc
            0xC0 | 0xC8 | 0xD0 | 0xD8 | 0xE0 | 0xE8 | 0xF0 | 0xF8 => {
                self.delay(Delay::Ret);
                if self.condition(op >> 3) {
                    self.ret(host);
                }
            }

            // POP rr
            0xC1 | 0xD1 | 0xE1 | 0xF1 => {
                let value = self.pop(host);
                self.stack_pair_mut(op >> 4).set_word(value);
            }

            // PUSH rr
            0xC5 | 0xD5 | 0xE5 | 0xF5 => {
                let value = self.stack_pair_mut(op >> 4).word();
                self.delay(Delay::Push);
                self.push(host, value);
            }

            // JP cc, nn
            0xC2 | 0xCA | 0xD2 | 0xDA | 0xE2 | 0xEA | 0xF2 | 0xFA => {
                let taken = self.condition(op >> 3);
                self.jp(host, taken);
            }

            // JP nn
            0xC3 => self.jp(host, true),

            // CALL cc, nn
            0xC4 | 0xCC | 0xD4 | 0xDC | 0xE4 | 0xEC | 0xF4 | 0xFC => {
                let taken = self.condition(op >> 3);
                self.call(host, taken);
            }

            // CALL nn
            0xCD => self.call(host, true),

            // ALU A, n
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
                let value = self.fetch(host);
                self.alu_a(op, value);
            }

            // RST p
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                self.rst(host, u16::from(op & 0x38));
            }

            // RET
            0xC9 => self.ret(host),

            // CB prefix
            0xCB => {
                let op = self.fetch(host);
                self.m1();
                self.execute_cb(host, op);
            }

            // OUT (n), A
            0xD3 => {
                let n = self.fetch(host);
                let a = self.regs.a();
                self.write_port(host, u16::from_le_bytes([n, a]), a);
            }

            // IN A, (n)
            0xDB => {
                let n = self.fetch(host);
                let value = self.read_port(host, u16::from_le_bytes([n, self.regs.a()]));
                self.regs.set_a(value);
            }

            // EXX
            0xD9 => {
                std::mem::swap(&mut self.regs.bc, &mut self.regs.bc_alt);
                std::mem::swap(&mut self.regs.de, &mut self.regs.de_alt);
                std::mem::swap(&mut self.regs.hl, &mut self.regs.hl_alt);
            }

            // DD prefix
            0xDD => {
                let op = self.fetch(host);
                self.m1();
                self.execute_index(host, Index::Ix, op);
            }

            // EX (SP), HL
            0xE3 => {
                let hl = self.regs.hl.word();
                let value = self.ex_sp(host, hl);
                self.regs.hl.set_word(value);
            }

            // JP (HL)
            0xE9 => {
                let hl = self.regs.hl.word();
                self.regs.pc.set_word(hl);
            }

            // EX DE, HL
            0xEB => std::mem::swap(&mut self.regs.de, &mut self.regs.hl),

            // ED prefix
            0xED => {
                let op = self.fetch(host);
                self.m1();
                self.execute_ed(host, op);
            }

            // DI
            0xF3 => {
                self.regs.iff1 = false;
                self.regs.iff2 = false;
            }

            // LD SP, HL
            0xF9 => {
                self.delay(Delay::LdSpHl);
                self.regs.sp = self.regs.hl;
            }

            // EI
            0xFB => {
                self.regs.iff1 = true;
                self.regs.iff2 = true;
                self.regs.ei_pending = true;
            }

            // FD prefix
            0xFD => {
                let op = self.fetch(host);
                self.m1();
                self.execute_index(host, Index::Iy, op);
            }
        }
    }

    // === Operand helpers ===

    /// Register by 3-bit encoding. Code 6, (HL), is handled by the caller.
    pub(super) fn reg8(&self, r: u8) -> u8 {
        match r & 7 {
            0 => self.regs.bc.high(),
            1 => self.regs.bc.low(),
            2 => self.regs.de.high(),
            3 => self.regs.de.low(),
            4 => self.regs.hl.high(),
            5 => self.regs.hl.low(),
            6 => 0, // (HL) - handled by the caller
            _ => self.regs.a(),
        }
    }

    /// Set register by 3-bit encoding.
    pub(super) fn set_reg8(&mut self, r: u8, value: u8) {
        match r & 7 {
            0 => self.regs.bc.set_high(value),
            1 => self.regs.bc.set_low(value),
            2 => self.regs.de.set_high(value),
            3 => self.regs.de.set_low(value),
            4 => self.regs.hl.set_high(value),
            5 => self.regs.hl.set_low(value),
            6 => {} // (HL) - handled by the caller
            _ => self.regs.set_a(value),
        }
    }

    /// BC, DE, HL, SP by 2-bit encoding.
    pub(super) fn pair_mut(&mut self, p: u8) -> &mut RegisterPair {
        match p & 3 {
            0 => &mut self.regs.bc,
            1 => &mut self.regs.de,
            2 => &mut self.regs.hl,
            _ => &mut self.regs.sp,
        }
    }

    /// BC, DE, HL, AF by 2-bit encoding, as PUSH and POP use them.
    fn stack_pair_mut(&mut self, p: u8) -> &mut RegisterPair {
        match p & 3 {
            0 => &mut self.regs.bc,
            1 => &mut self.regs.de,
            2 => &mut self.regs.hl,
            _ => &mut self.regs.af,
        }
    }

    /// NZ, Z, NC, C, PO, PE, P, M by 3-bit encoding.
    fn condition(&self, cc: u8) -> bool {
        let f = self.regs.f();
        match cc & 7 {
            0 => f & ZF == 0,
            1 => f & ZF != 0,
            2 => f & CF == 0,
            3 => f & CF != 0,
            4 => f & PF == 0,
            5 => f & PF != 0,
            6 => f & SF == 0,
            _ => f & SF != 0,
        }
    }

    /// 8-bit ALU group selected by bits 3-5 of `op`, applied to A.
    pub(super) fn alu_a(&mut self, op: u8, value: u8) {
        let a = self.regs.a();
        let carry = self.regs.f() & CF != 0;
        let result = match (op >> 3) & 7 {
            0 => alu::add8(a, value, false),
            1 => alu::add8(a, value, carry),
            2 => alu::sub8(a, value, false),
            3 => alu::sub8(a, value, carry),
            4 => alu::and8(a, value),
            5 => alu::xor8(a, value),
            6 => alu::or8(a, value),
            _ => {
                self.regs.set_f(alu::cp8(a, value));
                return;
            }
        };
        self.apply_accumulator(result);
    }

    pub(super) fn apply_accumulator(&mut self, result: alu::AluResult) {
        self.regs.set_a(result.value);
        self.regs.set_f(result.flags);
    }

    // === Control flow ===

    /// Relative jump. The displacement is always fetched.
    fn jr<H: Host>(&mut self, host: &mut H, taken: bool) {
        let d = self.fetch(host) as i8;
        if taken {
            let target = self.regs.pc.word().wrapping_add(d as u16);
            self.regs.pc.set_word(target);
            self.regs.wz.set_word(target);
            self.delay(Delay::Add8);
        }
    }

    /// Absolute jump. MEMPTR takes the target either way.
    fn jp<H: Host>(&mut self, host: &mut H, taken: bool) {
        let target = self.fetch_word(host);
        if taken {
            self.regs.pc.set_word(target);
        }
        self.regs.wz.set_word(target);
    }

    fn call<H: Host>(&mut self, host: &mut H, taken: bool) {
        let target = self.fetch_word(host);
        if taken {
            self.delay(Delay::Call);
            let pc = self.regs.pc.word();
            self.record_call(pc);
            self.push(host, pc);
            self.regs.pc.set_word(target);
        }
        self.regs.wz.set_word(target);
    }

    pub(super) fn ret<H: Host>(&mut self, host: &mut H) {
        let target = self.pop(host);
        self.regs.pc.set_word(target);
        self.regs.wz.set_word(target);
        self.record_return(target);
    }

    fn rst<H: Host>(&mut self, host: &mut H, vector: u16) {
        let pc = self.regs.pc.word();
        self.record_call(pc);
        self.delay(Delay::Push);
        self.push(host, pc);
        self.regs.pc.set_word(vector);
        self.regs.wz.set_word(vector);
    }

    /// Swap `value` with the word at (SP). Returns the word that was there.
    pub(super) fn ex_sp<H: Host>(&mut self, host: &mut H, value: u16) -> u16 {
        let sp = self.regs.sp.word();
        let [lo, hi] = value.to_le_bytes();
        let old_lo = self.read_mem(host, sp);
        let old_hi = self.read_mem(host, sp.wrapping_add(1));
        self.write_mem(host, sp.wrapping_add(1), hi);
        self.write_mem(host, sp, lo);
        let old = u16::from_le_bytes([old_lo, old_hi]);
        self.regs.wz.set_word(old);
        self.delay(Delay::ExSpHl);
        old
    }

    // === Inline debug commands ===
    //
    // All three sit in front of a `JR` (0x18) that skips the payload, and
    // read it without charging time.

    /// `LD B,B; JR size; [slot; [page;]] [address]`. The displacement is
    /// the payload size, so the jump lands just past it.
    fn breakpoint_command<H: Host>(&mut self, host: &mut H) {
        let mut address = self.regs.pc.word();
        if host.read(address) != 0x18 {
            return;
        }
        address = address.wrapping_add(1);
        let size = host.read(address);
        address = address.wrapping_add(1);

        if !matches!(size, 0 | 2 | 3 | 4) {
            return;
        }
        let mut bytes = [0u16; 4];
        for byte in bytes.iter_mut().take(usize::from(size)) {
            *byte = u16::from(host.read(address));
            address = address.wrapping_add(1);
        }
        let (slot, page, target) = match size {
            0 => (0xFFFF, 0xFFFF, address),
            2 => (0xFFFF, 0xFFFF, bytes[0] | (bytes[1] << 8)),
            3 => (bytes[0], 0xFFFF, bytes[1] | (bytes[2] << 8)),
            _ => (bytes[0], bytes[1], bytes[2] | (bytes[3] << 8)),
        };

        let command = DebugCommand::SetBreakpoint { slot, page, address: target };
        log::debug!("R800: debug breakpoint command {command}");
        host.debug(&command);
    }

    /// `LD D,D; JR length; text`. Text of 5+ bytes may carry a
    /// `100, 100, 0, 0` header, which is dropped.
    fn trace_command<H: Host>(&mut self, host: &mut H) {
        let mut address = self.regs.pc.word();
        if host.read(address) != 0x18 {
            return;
        }
        address = address.wrapping_add(1);
        let offset = host.read(address) as i8;
        let end = address.wrapping_add(1).wrapping_add(offset as u16);
        address = address.wrapping_add(1);

        if end.wrapping_sub(address) > 127 {
            return;
        }
        if end.wrapping_sub(address) > 4
            && host.read(address) == 100
            && host.read(address.wrapping_add(1)) == 100
            && host.read(address.wrapping_add(2)) == 0
            && host.read(address.wrapping_add(3)) == 0
        {
            address = address.wrapping_add(4);
        }

        let mut text = String::new();
        while address < end {
            text.push(char::from(host.read(address)));
            address = address.wrapping_add(1);
        }
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }

        host.debug(&DebugCommand::Trace(text));
    }

    /// `LD C,C; JR n`. The displacement doubles as the trap number.
    fn trap_command<H: Host>(&mut self, host: &mut H) {
        let address = self.regs.pc.word();
        if host.read(address) != 0x18 {
            return;
        }
        let value = host.read(address.wrapping_add(1));
        log::trace!("R800: trap {value:#04X} at {address:#06X}");
        host.trap(value);
    }
}
