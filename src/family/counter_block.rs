//! Register protocol shared by the STM32F1 RTC and the GD32VF RTC, which copies its layout bit for
//! bit: a 32-bit seconds counter split over two 16-bit registers, a configuration flag guarding
//! counter and prescaler writes, and the RTC clock gate in the backup domain control register.
//!
//! Register names follow the STM32F1 reference manual. On the GD32VF, `CRL` is `RTC_CTL`,
//! `CNF` is `CMF`, `RTOFF` is `LWOFF`, `RSF` is `RSYNF` and `BDCR` is `RCU_BDCTL`.

use crate::counter;
use crate::poll::Poll;
use crate::register::{Register, RegisterAccess};
use crate::rtc::Error;
use embedded_hal::delay::DelayNs;

/// Registers synchronized flag
pub(crate) const CRL_RSF: u8 = 3;
/// Configuration flag
pub(crate) const CRL_CNF: u8 = 4;
/// Last write operation finished
pub(crate) const CRL_RTOFF: u8 = 5;

pub(crate) const BDCR_LSEON: u8 = 0;
pub(crate) const BDCR_LSERDY: u8 = 1;
pub(crate) const BDCR_RTCSEL_0: u8 = 8;
pub(crate) const BDCR_RTCEN: u8 = 15;
pub(crate) const BDCR_BDRST: u8 = 16;

pub(crate) const APB1ENR_BKPEN: u8 = 27;
pub(crate) const APB1ENR_PWREN: u8 = 28;
pub(crate) const PWR_CR_DBP: u8 = 8;

/// 32.768 kHz / (0x7FFF + 1) = 1 Hz
pub(crate) const PRESCALER_1HZ: u32 = 0x7FFF;

const HALF_MASK: u32 = 0xFFFF;
const PRLH_MASK: u32 = 0xF;

/// Addresses of the shared registers, taken from the family's register map.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CounterBlock {
    pub crl: Register,
    pub prlh: Register,
    pub prll: Register,
    pub cnth: Register,
    pub cntl: Register,
    pub bdcr: Register,
}

impl CounterBlock {
    /// Waits for `RTOFF`: the previous write has landed in the RTC domain.
    pub fn wait_write_access<R: RegisterAccess, D: DelayNs>(
        &self,
        regs: &R,
        poll: &mut Poll<D>,
    ) -> Result<(), Error> {
        let crl = self.crl;
        poll.until(|| regs.test_bit(crl, CRL_RTOFF))
    }

    pub fn enter_configuration<R: RegisterAccess, D: DelayNs>(
        &self,
        regs: &mut R,
        poll: &mut Poll<D>,
    ) -> Result<(), Error> {
        self.wait_write_access(regs, poll)?;
        regs.set_bit(self.crl, CRL_CNF);
        Ok(())
    }

    /// Clearing `CNF` starts the transfer; it is done once `RTOFF` is back.
    pub fn exit_configuration<R: RegisterAccess, D: DelayNs>(
        &self,
        regs: &mut R,
        poll: &mut Poll<D>,
    ) -> Result<(), Error> {
        regs.clear_bit(self.crl, CRL_CNF);
        self.wait_write_access(regs, poll)
    }

    /// Clears `RSF` and waits for the APB side to resynchronize, needed before the first read
    /// after a reset or clock change.
    pub fn synchronize<R: RegisterAccess, D: DelayNs>(
        &self,
        regs: &mut R,
        poll: &mut Poll<D>,
    ) -> Result<(), Error> {
        regs.clear_bit(self.crl, CRL_RSF);
        let crl = self.crl;
        poll.until(|| regs.test_bit(crl, CRL_RSF))
    }

    pub fn write_counter<R: RegisterAccess>(&self, regs: &mut R, count: u32) {
        let (high, low) = counter::split_counter(count);
        regs.write32(self.cnth, high);
        regs.write32(self.cntl, low);
    }

    /// Reads both halves, re-reading the low half if the high half moved in between.
    pub fn read_counter<R: RegisterAccess>(&self, regs: &R) -> u32 {
        let high = regs.read32(self.cnth);
        let mut low = regs.read32(self.cntl);
        let high_again = regs.read32(self.cnth);
        if high != high_again {
            low = regs.read32(self.cntl);
        }
        counter::join_counter(high_again, low)
    }

    pub fn write_prescaler<R: RegisterAccess>(&self, regs: &mut R, reload: u32) {
        regs.write32(self.prlh, (reload >> 16) & PRLH_MASK);
        regs.write32(self.prll, reload & HALF_MASK);
    }

    pub fn clock_enabled<R: RegisterAccess>(&self, regs: &R) -> bool {
        regs.test_bit(self.bdcr, BDCR_RTCEN)
    }

    pub fn enable_clock<R: RegisterAccess>(&self, regs: &mut R, on: bool) {
        if on {
            regs.set_bit(self.bdcr, BDCR_RTCEN);
        } else {
            regs.clear_bit(self.bdcr, BDCR_RTCEN);
        }
    }

    /// Sets `BDRST` then clears it, wiping the backup domain: counter, prescaler and clock
    /// selection.
    pub fn pulse_backup_reset<R: RegisterAccess>(&self, regs: &mut R) {
        regs.set_bit(self.bdcr, BDCR_BDRST);
        regs.clear_bit(self.bdcr, BDCR_BDRST);
    }
}
