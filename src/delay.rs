//! Delays

use embedded_hal::delay::DelayNs;

const NANOS_PER_SECOND: u64 = 1_000_000_000;
const MICROS_PER_SECOND: u64 = 1_000_000;
const MILLIS_PER_SECOND: u64 = 1_000;

/// Machine mode cycle counter (`mcycle`) as a delay provider
///
/// Meant for RISC-V parts such as the GD32VF, where it paces the RTC status polls without
/// borrowing a timer peripheral:
///
/// ```ignore
/// let poll = Poll::bounded(McycleDelay::new(108_000_000), 10_000);
/// let mut rtc = Gd32Rtc::new(regs, Gd32RegisterMap::DEFAULT, poll);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct McycleDelay {
    core_frequency: u32,
}

impl McycleDelay {
    /// Delay provider for a hart running at `core_frequency` Hz.
    pub const fn new(core_frequency: u32) -> Self {
        Self { core_frequency }
    }

    pub const fn core_frequency(&self) -> u32 {
        self.core_frequency
    }

    /// Cycles covering `amount` units of `1 / units_per_second` s, rounded up so a delay never
    /// comes out short.
    pub const fn cycles_for(&self, amount: u32, units_per_second: u64) -> u64 {
        (amount as u64 * self.core_frequency as u64).div_ceil(units_per_second)
    }

    /// Busy-waits until `cycles` have elapsed on this hart.
    fn spin(cycles: u64) {
        let start = riscv::register::mcycle::read64();
        while riscv::register::mcycle::read64().wrapping_sub(start) < cycles {}
    }
}

impl DelayNs for McycleDelay {
    fn delay_ns(&mut self, ns: u32) {
        Self::spin(self.cycles_for(ns, NANOS_PER_SECOND));
    }

    fn delay_us(&mut self, us: u32) {
        Self::spin(self.cycles_for(us, MICROS_PER_SECOND));
    }

    fn delay_ms(&mut self, ms: u32) {
        Self::spin(self.cycles_for(ms, MILLIS_PER_SECOND));
    }
}
