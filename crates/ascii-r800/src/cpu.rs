//! Dual-personality Z80/R800 core with master-clock timing.
//!
//! The engine runs whole instructions. Each bus access and internal step
//! charges a named delay from the active personality's [`DelayTable`], so
//! system time advances in master ticks regardless of which personality is
//! running.

#![allow(clippy::cast_possible_truncation)] // Intentional truncation for low byte extraction.
#![allow(clippy::cast_possible_wrap)] // Intentional i8 casts for displacements.
#![allow(clippy::cast_sign_loss)] // Sign-extended displacements wrap back into u16.

mod execute;
mod prefixed;

use emu_core::{Cpu, MasterClock, Observable, SystemTime, Value, has_reached};

use crate::config::R800Config;
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
use crate::host::{Host, Signals};
use crate::registers::Registers;
use crate::timing::{
    Delay, DelayTable, MASTER_FREQUENCY, Personality, REFRESH_INTERVAL, REFRESH_STALL_BOUNDED,
    REFRESH_STALL_FREE_RUN,
};

/// Depth of the call-stack ring.
const CALL_STACK_DEPTH: usize = 256;

/// Z80/R800 CPU.
///
/// The CPU does not own the bus. The host (bus plus hooks) is passed to each
/// run call, so it can be shared with other components between calls.
pub struct R800 {
    /// Register file of the active personality.
    pub(crate) regs: Registers,
    /// Stored register files, indexed by [`Personality::bank`].
    pub(crate) banks: [Registers; 2],
    /// Personality whose timing and register file are live.
    pub(crate) personality: Personality,
    /// Switch (or delay-table rebuild) to apply at the next fetch boundary.
    pub(crate) pending: Option<Personality>,
    /// Clock per personality, indexed by [`Personality::bank`].
    pub(crate) frequencies: [u32; 2],
    pub(crate) delays: DelayTable,
    pub(crate) config: R800Config,

    // === Timing ===
    pub(crate) system_time: SystemTime,
    /// Time of the last R800 access to the VDP port range.
    pub(crate) vdp_time: SystemTime,
    /// High byte of the last opcode fetch; `0xFFFF` after any data access.
    pub(crate) cache_page: u16,
    /// Time of the last R800 DRAM refresh stall.
    pub(crate) last_refresh: SystemTime,

    // === Lines, latches and run control ===
    pub(crate) signals: Signals,

    // === Debug surface ===
    breakpoints: Box<[u64; 1024]>,
    breakpoint_count: u32,
    call_stack: Box<[u16; CALL_STACK_DEPTH]>,
    call_stack_size: u32,
    pub(crate) instruction_count: u32,
}

impl R800 {
    /// Create a CPU in its reset state, running as a Z80.
    #[must_use]
    pub fn new(config: R800Config) -> Self {
        let frequencies = [config.z80_frequency.max(1), config.r800_frequency.max(1)];
        let delays = DelayTable::derive(
            Personality::Z80,
            frequencies[0],
            config.m1_wait,
            config.vdp_io_delay,
        );
        Self {
            regs: Registers::power_on(),
            banks: [Registers::power_on(); 2],
            personality: Personality::Z80,
            pending: None,
            frequencies,
            delays,
            config,
            system_time: 0,
            vdp_time: 0,
            cache_page: 0xFFFF,
            last_refresh: 0,
            signals: Signals::new(),
            breakpoints: Box::new([0; 1024]),
            breakpoint_count: 0,
            call_stack: Box::new([0; CALL_STACK_DEPTH]),
            call_stack_size: 0,
            instruction_count: 0,
        }
    }

    // === Bus access ===

    /// Charge one named delay.
    pub(crate) fn delay(&mut self, delay: Delay) {
        self.system_time = self.system_time.wrapping_add(self.delays[delay]);
    }

    /// Opcode or operand fetch. Crossing into a new page costs extra.
    pub(crate) fn read_opcode<H: Host>(&mut self, host: &mut H, address: u16) -> u8 {
        self.delay(Delay::MemOp);
        let page = address >> 8;
        if page != self.cache_page {
            self.cache_page = page;
            self.delay(Delay::MemPage);
        }
        host.read(address)
    }

    /// Fetch the byte at PC and advance PC.
    pub(crate) fn fetch<H: Host>(&mut self, host: &mut H) -> u8 {
        let pc = self.regs.pc.post_inc();
        self.read_opcode(host, pc)
    }

    /// Fetch a little-endian word at PC.
    pub(crate) fn fetch_word<H: Host>(&mut self, host: &mut H) -> u16 {
        let lo = self.fetch(host);
        let hi = self.fetch(host);
        u16::from_le_bytes([lo, hi])
    }

    /// Fetch a displacement and add it to `base`.
    pub(crate) fn fetch_displaced<H: Host>(&mut self, host: &mut H, base: u16) -> u16 {
        let d = self.fetch(host) as i8;
        base.wrapping_add(d as u16)
    }

    pub(crate) fn read_mem<H: Host>(&mut self, host: &mut H, address: u16) -> u8 {
        self.delay(Delay::Mem);
        self.cache_page = 0xFFFF;
        host.read(address)
    }

    pub(crate) fn write_mem<H: Host>(&mut self, host: &mut H, address: u16, value: u8) {
        self.delay(Delay::Mem);
        self.cache_page = 0xFFFF;
        host.write(address, value);
    }

    pub(crate) fn read_word<H: Host>(&mut self, host: &mut H, address: u16) -> u16 {
        let lo = self.read_mem(host, address);
        let hi = self.read_mem(host, address.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    pub(crate) fn write_word<H: Host>(&mut self, host: &mut H, address: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write_mem(host, address, lo);
        self.write_mem(host, address.wrapping_add(1), hi);
    }

    pub(crate) fn read_port<H: Host>(&mut self, host: &mut H, port: u16) -> u8 {
        self.regs.wz.set_word(port.wrapping_add(1));
        self.delay(Delay::PreIo);
        self.delay_vdp_io(port);
        let value = host.read_io(port);
        self.delay(Delay::PostIo);
        value
    }

    pub(crate) fn write_port<H: Host>(&mut self, host: &mut H, port: u16, value: u8) {
        self.regs.wz.set_word(port.wrapping_add(1));
        self.delay(Delay::PreIo);
        self.delay_vdp_io(port);
        host.write_io(port, value);
        self.delay(Delay::PostIo);
    }

    /// VDP port penalties. The R800 additionally waits out the S1990's
    /// minimum spacing between VDP accesses.
    fn delay_vdp_io(&mut self, port: u16) {
        if port & 0xFC == 0x98 {
            self.delay(Delay::T9769Vdp);
        }
        if port & 0xF8 == 0x98 && self.personality == Personality::R800 {
            let spacing = self.delays[Delay::S1990Vdp];
            if self.system_time.wrapping_sub(self.vdp_time) < spacing {
                self.system_time = self.vdp_time.wrapping_add(spacing);
            }
            self.vdp_time = self.system_time;
        }
    }

    /// Push a word with timed writes.
    pub(crate) fn push<H: Host>(&mut self, host: &mut H, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        let sp = self.regs.sp.word().wrapping_sub(1);
        self.write_mem(host, sp, hi);
        let sp = sp.wrapping_sub(1);
        self.write_mem(host, sp, lo);
        self.regs.sp.set_word(sp);
    }

    /// Pop a word with timed reads.
    pub(crate) fn pop<H: Host>(&mut self, host: &mut H) -> u16 {
        let sp = self.regs.sp.word();
        let value = self.read_word(host, sp);
        self.regs.sp.set_word(sp.wrapping_add(2));
        value
    }

    /// Push PC without charging time, as interrupt acknowledge does.
    fn push_pc_untimed<H: Host>(&mut self, host: &mut H) {
        let [lo, hi] = self.regs.pc.word().to_le_bytes();
        let sp = self.regs.sp.word().wrapping_sub(1);
        host.write(sp, hi);
        let sp = sp.wrapping_sub(1);
        host.write(sp, lo);
        self.regs.sp.set_word(sp);
    }

    /// Opcode fetch cycle bookkeeping: refresh counter plus M1 wait.
    pub(crate) fn m1(&mut self) {
        self.regs.inc_r();
        self.delay(Delay::M1);
    }

    // === Call stack ===

    pub(crate) fn record_call(&mut self, return_address: u16) {
        if self.config.call_stack {
            self.call_stack[self.call_stack_size as usize % CALL_STACK_DEPTH] = return_address;
            self.call_stack_size = self.call_stack_size.wrapping_add(1);
        }
    }

    pub(crate) fn record_return(&mut self, target: u16) {
        if self.config.call_stack {
            let top = self.call_stack_size.wrapping_sub(1) as usize % CALL_STACK_DEPTH;
            if self.call_stack[top] == target {
                self.call_stack_size = self.call_stack_size.wrapping_sub(1);
            }
        }
    }

    /// Tracked return addresses, oldest first. Empty unless enabled in
    /// [`R800Config::call_stack`].
    #[must_use]
    pub fn call_stack(&self) -> Vec<u16> {
        let depth = (self.call_stack_size as usize).min(CALL_STACK_DEPTH);
        (0..depth)
            .rev()
            .map(|back| {
                let slot = self.call_stack_size.wrapping_sub(1).wrapping_sub(back as u32);
                self.call_stack[slot as usize % CALL_STACK_DEPTH]
            })
            .collect()
    }

    // === Personality switching ===

    /// Apply a pending switch: park the live register file, load the
    /// target's, and rebuild the delay table from the target's clock.
    fn switch_personality(&mut self, target: Personality) {
        self.banks[self.personality.bank()] = self.regs;
        self.regs = self.banks[target.bank()];
        self.personality = target;
        self.delays = DelayTable::derive(
            target,
            self.frequencies[target.bank()],
            self.config.m1_wait,
            self.config.vdp_io_delay,
        );
        let frequency = self.frequencies[target.bank()];
        log::debug!(
            "R800: running as {target} at {frequency} Hz (x{})",
            MasterClock::new(MASTER_FREQUENCY).divider(frequency)
        );
    }

    /// Set the clock of one personality. Takes effect at the next fetch.
    pub fn set_frequency(&mut self, personality: Personality, frequency_hz: u32) {
        let frequency_hz = if frequency_hz == 0 {
            log::warn!("R800: {personality} frequency 0 Hz clamped to 1 Hz");
            1
        } else {
            frequency_hz
        };
        self.frequencies[personality.bank()] = frequency_hz;
        self.pending = Some(self.pending.unwrap_or(self.personality));
    }

    /// Clock of one personality in Hz.
    #[must_use]
    pub fn frequency(&self, personality: Personality) -> u32 {
        self.frequencies[personality.bank()]
    }

    /// Request a personality. The switch happens at the next fetch; asking
    /// for the personality already requested is a no-op.
    pub fn set_mode(&mut self, personality: Personality) {
        if self.mode() != personality {
            self.pending = Some(personality);
        }
    }

    /// Requested personality, which becomes active at the next fetch.
    #[must_use]
    pub fn mode(&self) -> Personality {
        self.pending.unwrap_or(self.personality)
    }

    /// Personality whose register file and timing are live right now.
    #[must_use]
    pub fn active_personality(&self) -> Personality {
        self.personality
    }

    /// Active delay table.
    #[must_use]
    pub fn delays(&self) -> &DelayTable {
        &self.delays
    }

    /// Work done at every fetch boundary before breakpoints are consulted.
    fn begin_fetch(&mut self, refresh_stall: u32) {
        if let Some(target) = self.pending.take() {
            self.switch_personality(target);
        }
        if self.personality == Personality::R800
            && self.system_time.wrapping_sub(self.last_refresh) > REFRESH_INTERVAL
        {
            self.last_refresh = self.system_time;
            self.system_time = self.system_time.wrapping_add(refresh_stall);
        }
    }

    // === Run entry points ===

    /// Run until [`R800::stop_execution`] or [`Signals::stop`] is called.
    ///
    /// The stop request is consumed on return.
    pub fn execute<H: Host>(&mut self, host: &mut H) {
        while !self.signals.terminate {
            if has_reached(self.system_time, self.signals.timeout) {
                host.timeout(&mut self.signals);
            }

            self.begin_fetch(REFRESH_STALL_FREE_RUN);

            if self.breakpoint_hit() {
                let pc = self.regs.pc.word();
                host.breakpoint(pc, &mut self.signals);
                if self.signals.terminate {
                    log::debug!("R800: stopped at breakpoint {pc:#06X}");
                    break;
                }
            }

            self.step(host);
        }
        self.signals.terminate = false;
    }

    /// Run until system time reaches `end_time`.
    pub fn execute_until<H: Host>(&mut self, host: &mut H, end_time: SystemTime) {
        while !has_reached(self.system_time, end_time) {
            self.bounded_step(host);
        }
    }

    /// Execute one instruction, plus any interrupt acknowledge it allows.
    pub fn execute_instruction<H: Host>(&mut self, host: &mut H) {
        self.bounded_step(host);
    }

    fn bounded_step<H: Host>(&mut self, host: &mut H) {
        self.begin_fetch(REFRESH_STALL_BOUNDED);
        if self.breakpoint_hit() {
            host.breakpoint(self.regs.pc.word(), &mut self.signals);
        }
        self.step(host);
    }

    /// Fetch, execute, then service interrupt lines.
    fn step<H: Host>(&mut self, host: &mut H) {
        let opcode = self.fetch(host);
        self.execute_main(host, opcode);
        self.service_interrupts(host);
    }

    /// Run one main-table opcode that has already been fetched.
    fn execute_main<H: Host>(&mut self, host: &mut H, opcode: u8) {
        self.m1();
        self.instruction_count = self.instruction_count.wrapping_add(1);
        self.execute_unprefixed(host, opcode);
    }

    /// An interrupt would be taken at this boundary.
    pub(crate) fn interrupt_requested(&self) -> bool {
        (self.signals.int_asserted && self.regs.iff1) || self.signals.nmi_edge
    }

    fn service_interrupts<H: Host>(&mut self, host: &mut H) {
        if self.regs.halted {
            return;
        }
        if self.regs.ei_pending {
            self.regs.ei_pending = false;
            return;
        }
        if !self.interrupt_requested() {
            return;
        }

        if self.signals.nmi_edge {
            self.signals.nmi_edge = false;
            log::trace!("R800: NMI acknowledged, return to {:#06X}", self.regs.pc.word());
            self.record_call(self.regs.pc.word());
            self.push_pc_untimed(host);
            self.regs.iff1 = false;
            self.regs.pc.set_word(0x0066);
            self.m1();
            self.delay(Delay::Nmi);
            return;
        }

        self.regs.iff1 = false;
        self.regs.iff2 = false;

        match self.regs.im {
            0 => {
                let opcode = self.signals.data_bus;
                self.signals.data_bus = self.signals.default_data_bus;
                log::trace!("R800: IM 0 acknowledged, executing {opcode:#04X}");
                self.delay(Delay::Im);
                self.execute_main(host, opcode);
            }
            1 => {
                log::trace!("R800: IM 1 acknowledged");
                self.delay(Delay::Im);
                self.execute_main(host, 0xFF);
            }
            _ => {
                let vector = u16::from_le_bytes([self.signals.data_bus, self.regs.i]);
                self.signals.data_bus = self.signals.default_data_bus;
                log::trace!("R800: IM 2 acknowledged through {vector:#06X}");
                self.record_call(self.regs.pc.word());
                self.push_pc_untimed(host);
                let lo = host.read(vector);
                let hi = host.read(vector.wrapping_add(1));
                self.regs.pc.set_word(u16::from_le_bytes([lo, hi]));
                self.regs.inc_r();
                self.delay(Delay::Im2);
            }
        }
    }

    // === Run control ===

    /// Make [`R800::execute`] return at the next instruction boundary.
    pub fn stop_execution(&mut self) {
        self.signals.stop();
    }

    /// Set the time at which [`Host::timeout`] fires. Until this is called
    /// the deadline is 0 and `execute` reports a timeout every instruction.
    pub fn set_timeout_at(&mut self, time: SystemTime) {
        self.signals.set_timeout_at(time);
    }

    /// Current system time in master ticks.
    #[must_use]
    pub fn system_time(&self) -> SystemTime {
        self.system_time
    }

    /// Main opcodes executed. Repeating block instructions count once.
    #[must_use]
    pub fn instruction_count(&self) -> u32 {
        self.instruction_count
    }

    // === Interrupt lines ===

    pub fn set_int(&mut self) {
        self.signals.set_int();
    }

    pub fn clear_int(&mut self) {
        self.signals.clear_int();
    }

    /// Assert NMI. Arms one acknowledge if the line was released.
    pub fn set_nmi(&mut self) {
        self.signals.set_nmi();
    }

    pub fn clear_nmi(&mut self) {
        self.signals.clear_nmi();
    }

    /// Latch the data bus for IM 0 and IM 2 acknowledge.
    pub fn set_data_bus(&mut self, value: u8, default: u8, set_default: bool) {
        self.signals.set_data_bus(value, default, set_default);
    }

    /// Lines and latches.
    #[must_use]
    pub fn signals(&self) -> &Signals {
        &self.signals
    }

    // === Breakpoints ===

    pub fn set_breakpoint(&mut self, address: u16) {
        let (word, mask) = Self::breakpoint_slot(address);
        if self.breakpoints[word] & mask == 0 {
            self.breakpoints[word] |= mask;
            self.breakpoint_count += 1;
        }
    }

    pub fn clear_breakpoint(&mut self, address: u16) {
        let (word, mask) = Self::breakpoint_slot(address);
        if self.breakpoints[word] & mask != 0 {
            self.breakpoints[word] &= !mask;
            self.breakpoint_count -= 1;
        }
    }

    const fn breakpoint_slot(address: u16) -> (usize, u64) {
        ((address >> 6) as usize, 1 << (address & 63))
    }

    fn breakpoint_hit(&self) -> bool {
        if self.breakpoint_count == 0 {
            return false;
        }
        let (word, mask) = Self::breakpoint_slot(self.regs.pc.word());
        self.breakpoints[word] & mask != 0
    }

    // === Register access ===

    /// Live register file.
    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    /// Set the program counter.
    ///
    /// Only available in test builds.
    #[cfg(feature = "test-utils")]
    pub fn set_pc(&mut self, value: u16) {
        self.regs.pc.set_word(value);
    }

    /// Set the stack pointer.
    ///
    /// Only available in test builds.
    #[cfg(feature = "test-utils")]
    pub fn set_sp(&mut self, value: u16) {
        self.regs.sp.set_word(value);
    }

    /// Apply a pending personality switch without executing anything.
    ///
    /// Only available in test builds.
    #[cfg(feature = "test-utils")]
    pub fn flush_personality_switch(&mut self) {
        if let Some(target) = self.pending.take() {
            self.switch_personality(target);
        }
    }
}

impl Default for R800 {
    fn default() -> Self {
        Self::new(R800Config::default())
    }
}

impl Cpu for R800 {
    type Registers = Registers;

    fn pc(&self) -> u32 {
        u32::from(self.regs.pc.word())
    }

    fn registers(&self) -> Self::Registers {
        self.regs
    }

    fn is_halted(&self) -> bool {
        self.regs.halted
    }

    fn set_irq_line(&mut self, asserted: bool) {
        if asserted {
            self.set_int();
        } else {
            self.clear_int();
        }
    }

    fn set_nmi_line(&mut self, asserted: bool) {
        if asserted {
            self.set_nmi();
        } else {
            self.clear_nmi();
        }
    }

    /// Power-on registers in both banks, Z80 timing, lines released.
    ///
    /// System time, breakpoints and the deadline survive a reset.
    fn reset(&mut self) {
        self.banks = [Registers::power_on(); 2];
        self.regs = Registers::power_on();
        self.personality = Personality::Z80;
        self.pending = None;
        self.delays = DelayTable::derive(
            Personality::Z80,
            self.frequencies[Personality::Z80.bank()],
            self.config.m1_wait,
            self.config.vdp_io_delay,
        );
        self.signals.data_bus = 0xFF;
        self.signals.default_data_bus = 0xFF;
        self.signals.int_asserted = false;
        self.signals.nmi_asserted = false;
        self.signals.nmi_edge = false;
        self.call_stack_size = 0;
        log::debug!("R800: reset");
    }
}

/// All query paths supported by the R800.
const R800_QUERY_PATHS: &[&str] = &[
    // Main registers
    "a", "f", "b", "c", "d", "e", "h", "l",
    // Register pairs
    "af", "bc", "de", "hl",
    // Alternate pairs
    "af'", "bc'", "de'", "hl'",
    // Index registers
    "ix", "iy", "ixh", "ixl", "iyh", "iyl",
    // Other registers
    "sp", "pc", "i", "r", "memptr",
    // Flags (individual)
    "flags.s", "flags.z", "flags.y", "flags.h",
    "flags.x", "flags.p", "flags.n", "flags.c",
    // Interrupt state
    "iff1", "iff2", "im", "ei_pending",
    "int", "nmi", "nmi_pending", "data_bus", "default_data_bus",
    // CPU state
    "halted", "personality", "mode", "system_time", "instruction_count",
    "breakpoints", "call_depth",
];

impl Observable for R800 {
    fn query(&self, path: &str) -> Option<Value> {
        let regs = &self.regs;
        let f = regs.f();
        match path {
            // Main registers
            "a" => Some(regs.a().into()),
            "f" => Some(f.into()),
            "b" => Some(regs.bc.high().into()),
            "c" => Some(regs.bc.low().into()),
            "d" => Some(regs.de.high().into()),
            "e" => Some(regs.de.low().into()),
            "h" => Some(regs.hl.high().into()),
            "l" => Some(regs.hl.low().into()),

            // Register pairs
            "af" => Some(regs.af.word().into()),
            "bc" => Some(regs.bc.word().into()),
            "de" => Some(regs.de.word().into()),
            "hl" => Some(regs.hl.word().into()),

            // Alternate pairs
            "af'" => Some(regs.af_alt.word().into()),
            "bc'" => Some(regs.bc_alt.word().into()),
            "de'" => Some(regs.de_alt.word().into()),
            "hl'" => Some(regs.hl_alt.word().into()),

            // Index registers
            "ix" => Some(regs.ix.word().into()),
            "iy" => Some(regs.iy.word().into()),
            "ixh" => Some(regs.ix.high().into()),
            "ixl" => Some(regs.ix.low().into()),
            "iyh" => Some(regs.iy.high().into()),
            "iyl" => Some(regs.iy.low().into()),

            // Other registers
            "sp" => Some(regs.sp.word().into()),
            "pc" => Some(regs.pc.word().into()),
            "i" => Some(regs.i.into()),
            "r" => Some(((regs.r & 0x7F) | (regs.r2 & 0x80)).into()),
            "memptr" => Some(regs.wz.word().into()),

            // Individual flags
            "flags.s" => Some((f & SF != 0).into()),
            "flags.z" => Some((f & ZF != 0).into()),
            "flags.y" => Some((f & YF != 0).into()),
            "flags.h" => Some((f & HF != 0).into()),
            "flags.x" => Some((f & XF != 0).into()),
            "flags.p" => Some((f & PF != 0).into()),
            "flags.n" => Some((f & NF != 0).into()),
            "flags.c" => Some((f & CF != 0).into()),

            // Interrupt state
            "iff1" => Some(regs.iff1.into()),
            "iff2" => Some(regs.iff2.into()),
            "im" => Some(regs.im.into()),
            "ei_pending" => Some(regs.ei_pending.into()),
            "int" => Some(self.signals.int_asserted.into()),
            "nmi" => Some(self.signals.nmi_asserted.into()),
            "nmi_pending" => Some(self.signals.nmi_edge.into()),
            "data_bus" => Some(self.signals.data_bus.into()),
            "default_data_bus" => Some(self.signals.default_data_bus.into()),

            // CPU state
            "halted" => Some(regs.halted.into()),
            "personality" => Some(Value::String(self.personality.to_string())),
            "mode" => Some(Value::String(self.mode().to_string())),
            "system_time" => Some(self.system_time.into()),
            "instruction_count" => Some(self.instruction_count.into()),
            "breakpoints" => Some(self.breakpoint_count.into()),
            "call_depth" => Some(self.call_stack_size.min(CALL_STACK_DEPTH as u32).into()),

            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        R800_QUERY_PATHS
    }
}
