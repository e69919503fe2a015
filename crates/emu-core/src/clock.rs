//! Master clock configuration.

/// Position on the master-clock timeline.
///
/// Wraps at 32 bits. Compare two times with [`has_reached`], never with `<`.
pub type SystemTime = u32;

/// True once `now` has reached or passed `target`, tolerating wrap-around.
#[must_use]
pub const fn has_reached(now: SystemTime, target: SystemTime) -> bool {
    (target.wrapping_sub(now) as i32) <= 0
}

/// Master clock configuration for a system.
///
/// Each system has a master crystal that drives all timing. Components may
/// run at divided rates, but everything derives from this frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterClock {
    /// Crystal frequency in Hz (e.g., `21_477_270` for an MSX turboR).
    pub frequency_hz: u32,
}

impl MasterClock {
    #[must_use]
    pub const fn new(frequency_hz: u32) -> Self {
        Self { frequency_hz }
    }

    /// Master ticks per cycle of a component clocked at `frequency_hz`.
    ///
    /// Integer division against `frequency_hz - 1`, so a component running at
    /// exactly a sixth of the crystal still gets a divider of 6. Frequencies
    /// of 0 and 1 are treated as 2 to keep the divisor non-zero.
    #[must_use]
    pub const fn divider(&self, frequency_hz: u32) -> u32 {
        let divisor = if frequency_hz > 1 { frequency_hz - 1 } else { 1 };
        self.frequency_hz / divisor
    }
}
