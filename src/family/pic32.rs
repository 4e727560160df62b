//! PIC32 RTCC
//!
//! Packed BCD time and date in `RTCTIME` / `RTCDATE`. Writes need `RTCCON.RTCWREN`, which in turn
//! needs the `SYSKEY` unlock. Control bits go through the `RTCCONSET` / `RTCCONCLR` aliases so a
//! single write never disturbs the neighbouring bits.

use crate::bcd::{self, PIC32_DATE, PIC32_TIME};
use crate::datetime::CalendarTime;
use crate::poll::Poll;
use crate::register::RegisterAccess;
use crate::rtc::{check_century, verify, Error, RealTimeClock, RtcState};
use crate::unlock::{WriteSequencer, PIC32_SYSKEY};
use crate::watchdog;
use embedded_hal::delay::DelayNs;

register_map! {
    /// RTCC, system and interrupt controller registers. Defaults are the PIC32MX addresses.
    pub struct Pic32RegisterMap {
        syskey: 0xBF80_F230,
        rtccon: 0xBF80_0200,
        rtccon_clr: 0xBF80_0204,
        rtccon_set: 0xBF80_0208,
        rtcalrm_clr: 0xBF80_0214,
        rtctime: 0xBF80_0220,
        rtcdate: 0xBF80_0230,
        rswrst: 0xBF80_F610,
        rswrst_set: 0xBF80_F618,
        /// Interrupt enable, clear alias
        iec1_clr: 0xBF88_1074,
        /// Interrupt flag, clear alias
        ifs1_clr: 0xBF88_1044,
        /// Interrupt priority, clear alias
        ipc8_clr: 0xBF88_1114,
    }
}

/// 00:00:00
pub const DEFAULT_TIME: u32 = 0x0000_0000;
/// 2000-01-01, weekday 7
pub const DEFAULT_DATE: u32 = 0x0001_0107;

const RTCCON_ON: u32 = 1 << 15;
const RTCCON_RTCCLKON: u8 = 6;
const RTCCON_RTCWREN: u32 = 1 << 3;
const RTCCON_RTCSYNC: u8 = 2;

const RTCC_INTERRUPT: u32 = 1 << 15;
const RTCC_PRIORITY: u32 = 0x1F00_0000;
/// ALRMEN, CHIME, PIV, ALRMSYNC, AMASK and ARPT
const RTCALRM_ALL: u32 = 0x0000_CFFF;

/// PIC32 RTCC driver
pub struct Pic32Rtc<R, D> {
    regs: R,
    map: Pic32RegisterMap,
    poll: Poll<D>,
    state: RtcState,
}

impl<R: RegisterAccess, D: DelayNs> Pic32Rtc<R, D> {
    pub fn new(regs: R, map: Pic32RegisterMap, poll: Poll<D>) -> Self {
        Pic32Rtc {
            regs,
            map,
            poll,
            state: RtcState::Uninitialized,
        }
    }

    pub fn registers(&self) -> &R {
        &self.regs
    }

    pub fn free(self) -> (R, D) {
        (self.regs, self.poll.free())
    }

    /// `RTCCLKON` is the hardware's own view of whether the RTCC is counting.
    fn clock_on(&self) -> bool {
        self.regs.test_bit(self.map.rtccon, RTCCON_RTCCLKON)
    }

    fn enabled(&self) -> bool {
        self.regs.read32(self.map.rtccon) & RTCCON_ON != 0
    }

    fn wait_clock(&mut self, on: bool) -> Result<(), Error> {
        let regs = &self.regs;
        let rtccon = self.map.rtccon;
        self.poll.until(|| regs.test_bit(rtccon, RTCCON_RTCCLKON) == on)
    }

    fn switch_on(&mut self) -> Result<(), Error> {
        self.regs.write32(self.map.rtccon_set, RTCCON_ON);
        self.wait_clock(true)
    }

    fn switch_off(&mut self) -> Result<(), Error> {
        self.regs.write32(self.map.rtccon_clr, RTCCON_ON);
        self.wait_clock(false)
    }

    fn observed_state(&self) -> RtcState {
        if self.clock_on() {
            RtcState::Running
        } else {
            RtcState::Stopped
        }
    }

    /// Writes both value registers with the counter halted, then restores the previous enable.
    fn load(&mut self, time: u32, date: u32) -> Result<(), Error> {
        self.with_write_mode(|rtc| {
            let was_enabled = rtc.enabled();
            rtc.regs.write32(rtc.map.iec1_clr, RTCC_INTERRUPT);
            rtc.switch_off()?;
            rtc.regs.write32(rtc.map.rtctime, time);
            rtc.regs.write32(rtc.map.rtcdate, date);
            if was_enabled {
                rtc.switch_on()?;
            }
            Ok(())
        })?;

        verify(self.value_is(time, date))
    }

    fn value_is(&self, time: u32, date: u32) -> bool {
        self.regs.read32(self.map.rtctime) == time && self.regs.read32(self.map.rtcdate) == date
    }
}

impl<R: RegisterAccess, D: DelayNs> WriteSequencer for Pic32Rtc<R, D> {
    fn enter_write_mode(&mut self) -> Result<(), Error> {
        PIC32_SYSKEY.unlock(&mut self.regs, self.map.syskey);
        self.regs.write32(self.map.rtccon_set, RTCCON_RTCWREN);
        self.state = RtcState::Initializing;
        Ok(())
    }

    fn exit_write_mode(&mut self) -> Result<(), Error> {
        self.regs.write32(self.map.rtccon_clr, RTCCON_RTCWREN);
        PIC32_SYSKEY.lock(&mut self.regs, self.map.syskey);
        self.state = self.observed_state();
        Ok(())
    }
}

impl<R: RegisterAccess, D: DelayNs> RealTimeClock for Pic32Rtc<R, D> {
    /// Leaves the RTCC off with its interrupt, flag, priority and alarm cleared.
    fn init(&mut self) -> Result<(), Error> {
        self.with_write_mode(|rtc| {
            rtc.regs.write32(rtc.map.iec1_clr, RTCC_INTERRUPT);
            rtc.switch_off()?;
            rtc.regs.write32(rtc.map.ifs1_clr, RTCC_INTERRUPT);
            rtc.regs.write32(rtc.map.ipc8_clr, RTCC_PRIORITY);
            rtc.regs.write32(rtc.map.rtcalrm_clr, RTCALRM_ALL);
            Ok(())
        })?;

        self.state = self.observed_state();
        Ok(())
    }

    /// Only allowed while the RTCC is off; fails with [`Error::Busy`] otherwise.
    fn configure_default(&mut self, time: &CalendarTime) -> Result<(), Error> {
        check_century(time)?;
        if self.clock_on() {
            warn!("pic32 rtcc: configure_default while running");
            return Err(Error::Busy);
        }
        self.load(PIC32_TIME.encode(time), PIC32_DATE.encode(time))
    }

    fn start(&mut self) -> Result<(), Error> {
        self.with_write_mode(|rtc| rtc.switch_on())?;
        verify(self.state == RtcState::Running)
    }

    fn stop(&mut self) -> Result<(), Error> {
        self.with_write_mode(|rtc| rtc.switch_off())?;
        verify(self.state == RtcState::Stopped)
    }

    fn reset(&mut self) -> Result<(), Error> {
        self.load(DEFAULT_TIME, DEFAULT_DATE)
    }

    fn set_time(&mut self, time: &CalendarTime) -> Result<(), Error> {
        check_century(time)?;
        self.load(PIC32_TIME.encode(time), PIC32_DATE.encode(time))
    }

    /// Waits out `RTCSYNC` so both words come from the same second.
    fn get_time(&mut self) -> Result<CalendarTime, Error> {
        let regs = &self.regs;
        let rtccon = self.map.rtccon;
        self.poll.until(|| !regs.test_bit(rtccon, RTCCON_RTCSYNC))?;

        let time = self.regs.read32(self.map.rtctime);
        let date = self.regs.read32(self.map.rtcdate);
        Ok(bcd::decode(&PIC32_TIME, &PIC32_DATE, time, date))
    }

    fn trigger_software_reset(&mut self) {
        watchdog::pic32_software_reset(
            &mut self.regs,
            &PIC32_SYSKEY,
            self.map.syskey,
            self.map.rswrst_set,
            self.map.rswrst,
        );
    }

    fn state(&self) -> RtcState {
        self.state
    }
}
