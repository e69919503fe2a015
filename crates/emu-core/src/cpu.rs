//! CPU core trait.

/// A CPU core.
///
/// CPUs execute instructions and access memory through a bus. The bus is
/// passed to each run call rather than owned, so it can be shared with other
/// components (e.g., video chip) between calls. Run entry points differ
/// between cores and live on the concrete type.
///
/// CPUs expose their internal state for observation and debugging.
pub trait Cpu {
    /// The type used for register inspection.
    type Registers;

    /// Returns the current program counter.
    ///
    /// Returns `u32` to support all CPU address widths: 16-bit (Z80),
    /// 24-bit (68000), and 32-bit (ARM7TDMI). Narrower CPUs zero-extend.
    fn pc(&self) -> u32;

    /// Returns a snapshot of all registers for inspection.
    fn registers(&self) -> Self::Registers;

    /// Returns true if the CPU is halted.
    fn is_halted(&self) -> bool;

    /// Drive the maskable interrupt line. The line is level-sensitive.
    fn set_irq_line(&mut self, asserted: bool);

    /// Drive the non-maskable interrupt line. Only a rising edge is latched.
    fn set_nmi_line(&mut self, asserted: bool);

    /// Reset the CPU to its initial state.
    fn reset(&mut self);
}
