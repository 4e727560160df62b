/*!
  # STM32 calendar RTC
  The calendar RTC of the STM32 F2/F4/L0/L1 lines. Time and date live in BCD in `RTC_TR` and
  `RTC_DR`; writing them needs the `RTC_WPR` key sequence (`0xCA`, `0x53`) followed by
  initialization mode (`RTC_ISR.INIT`, confirmed by `RTC_ISR.INITF`).

  Two variants differ in how the calendar is started and stopped:

  * [`Stm32Variant::InitGated`]: the calendar is frozen while in initialization mode, so
    `stop` enters it and `start` leaves it. Writes on a stopped calendar return to
    initialization mode afterwards, so the calendar stays stopped. `software_reset` stashes `RTC_TR` / `RTC_DR` in the
    backup registers and the next `init` puts them back.
  * [`Stm32Variant::BackupDomainGated`]: the calendar is gated by `RCC_BDCR.RTCEN`.

  ## Initialisation example
  ```ignore
    let mut rtc = Stm32Rtc::new(regs, Stm32RegisterMap::DEFAULT, Stm32Variant::InitGated, poll);
    rtc.init()?;
    rtc.set_time(&CalendarTime::new(2024, 2, 2, 3, 5, 0).with_day_week(5))?;
  ```
*/

use crate::bcd::{self, STM32_DATE, STM32_TIME};
use crate::datetime::CalendarTime;
use crate::poll::Poll;
use crate::register::{Register, RegisterAccess};
use crate::rtc::{check_century, verify, Error, RealTimeClock, RtcState};
use crate::unlock::{WriteSequencer, STM32_WPR};
use crate::watchdog::IndependentWatchdog;
use embedded_hal::delay::DelayNs;

register_map! {
    /// RTC, RCC, PWR and IWDG registers used by the driver. Defaults are the STM32F4 addresses.
    pub struct Stm32RegisterMap {
        tr: 0x4000_2800,
        dr: 0x4000_2804,
        cr: 0x4000_2808,
        isr: 0x4000_280C,
        prer: 0x4000_2810,
        wpr: 0x4000_2824,
        bkp0r: 0x4000_2850,
        bkp1r: 0x4000_2854,
        rcc_apb1enr: 0x4002_3840,
        rcc_bdcr: 0x4002_3870,
        pwr_cr: 0x4000_7000,
        iwdg_kr: 0x4000_3000,
        iwdg_pr: 0x4000_3004,
        iwdg_rlr: 0x4000_3008,
    }
}

/// How the calendar is started and stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stm32Variant {
    /// Stopped while in initialization mode; time survives `software_reset` in the backup
    /// registers.
    InitGated,
    /// Stopped by clearing `RCC_BDCR.RTCEN`.
    BackupDomainGated,
}

/// 00:00:00 with the PM flag set, as the reference sequence loads it.
pub const DEFAULT_TIME: u32 = 0x0040_0000;
/// 2000-01-01, weekday 1.
pub const DEFAULT_DATE: u32 = 0x0000_2101;
/// PREDIV_A = 127, PREDIV_S = 255: 1 Hz from a 32.768 kHz LSE.
pub const DEFAULT_PRESCALER: u32 = 0x007F_00FF;

const ISR_ENABLE_INIT: u32 = 1 << ISR_INIT;
const ISR_EXIT: u32 = 0;
const ISR_INIT: u8 = 7;
const ISR_INITF: u8 = 6;
const ISR_RSF: u8 = 5;
const CR_FMT: u8 = 6;

const APB1ENR_PWREN: u8 = 28;
const PWR_CR_DBP: u8 = 8;

const BDCR_LSEON: u8 = 0;
const BDCR_LSERDY: u8 = 1;
const BDCR_RTCSEL_0: u8 = 8;
const BDCR_RTCSEL_1: u8 = 9;
const BDCR_RTCEN: u8 = 15;
/// Backup domain reset, needed before the clock source can change.
const BDCR_RESET: u32 = 1 << 16;
/// RTCEN, RTCSEL = LSE, LSEON.
const BDCR_LSE_RTC: u32 = (1 << BDCR_RTCEN) | (1 << BDCR_RTCSEL_0) | (1 << BDCR_LSEON);

/// STM32 calendar RTC driver
pub struct Stm32Rtc<R, D> {
    regs: R,
    map: Stm32RegisterMap,
    variant: Stm32Variant,
    poll: Poll<D>,
    state: RtcState,
}

impl<R: RegisterAccess, D: DelayNs> Stm32Rtc<R, D> {
    pub fn new(regs: R, map: Stm32RegisterMap, variant: Stm32Variant, poll: Poll<D>) -> Self {
        Stm32Rtc {
            regs,
            map,
            variant,
            poll,
            state: RtcState::Uninitialized,
        }
    }

    pub fn variant(&self) -> Stm32Variant {
        self.variant
    }

    /// Register backend, for inspection.
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Releases the register backend and the delay provider.
    pub fn free(self) -> (R, D) {
        (self.regs, self.poll.free())
    }

    fn wait_bit(&mut self, reg: Register, bit: u8, set: bool) -> Result<(), Error> {
        let regs = &self.regs;
        self.poll.until(|| regs.test_bit(reg, bit) == set)
    }

    fn is_running(&self) -> bool {
        match self.variant {
            Stm32Variant::InitGated => !self.regs.test_bit(self.map.isr, ISR_INITF),
            Stm32Variant::BackupDomainGated => self.regs.test_bit(self.map.rcc_bdcr, BDCR_RTCEN),
        }
    }

    fn observed_state(&self) -> RtcState {
        if self.is_running() {
            RtcState::Running
        } else {
            RtcState::Stopped
        }
    }

    fn write_calendar(&mut self, time: u32, date: u32) {
        self.regs.write32(self.map.tr, time);
        self.regs.write32(self.map.dr, date);
        self.regs.clear_bit(self.map.cr, CR_FMT);
    }

    fn calendar_is(&self, time: u32, date: u32) -> bool {
        self.regs.read32(self.map.tr) == time && self.regs.read32(self.map.dr) == date
    }

    /// Takes the time stashed by `software_reset`, clearing the backup registers.
    ///
    /// The date word is the marker: a valid BCD date is never zero, while midnight is a valid
    /// all-zero time word.
    fn take_stash(&mut self) -> Option<(u32, u32)> {
        let date = self.regs.read32(self.map.bkp1r);
        if date == 0 {
            return None;
        }
        let time = self.regs.read32(self.map.bkp0r);
        self.regs.write32(self.map.bkp0r, 0);
        self.regs.write32(self.map.bkp1r, 0);
        Some((time, date))
    }

    /// Runs `write` in write mode. Leaving init mode restarts an `InitGated` calendar, so a
    /// calendar that was stopped is put back into init mode afterwards.
    fn write_keeping_run_state<F>(&mut self, write: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Self),
    {
        let was_running = self.is_running();
        self.with_write_mode(|rtc| {
            write(rtc);
            Ok(())
        })?;

        if !was_running && self.variant == Stm32Variant::InitGated {
            self.stop()?;
        }
        Ok(())
    }

    fn select_lse(&mut self) {
        match self.variant {
            Stm32Variant::InitGated => {
                self.regs.write32(self.map.rcc_bdcr, BDCR_RESET);
                self.regs.write32(self.map.rcc_bdcr, BDCR_LSE_RTC);
            }
            Stm32Variant::BackupDomainGated => {
                self.regs.set_bit(self.map.rcc_bdcr, BDCR_RTCSEL_0);
                self.regs.clear_bit(self.map.rcc_bdcr, BDCR_RTCSEL_1);
                self.regs.set_bit(self.map.rcc_bdcr, BDCR_LSEON);
            }
        }
    }
}

impl<R: RegisterAccess, D: DelayNs> WriteSequencer for Stm32Rtc<R, D> {
    fn enter_write_mode(&mut self) -> Result<(), Error> {
        STM32_WPR.unlock(&mut self.regs, self.map.wpr);
        self.regs.write32(self.map.isr, ISR_ENABLE_INIT);

        if let Err(e) = self.wait_bit(self.map.isr, ISR_INITF, true) {
            self.regs.write32(self.map.isr, ISR_EXIT);
            STM32_WPR.lock(&mut self.regs, self.map.wpr);
            return Err(e);
        }
        trace!("stm32 rtc: init mode");
        self.state = RtcState::Initializing;
        Ok(())
    }

    fn exit_write_mode(&mut self) -> Result<(), Error> {
        self.regs.write32(self.map.isr, ISR_EXIT);
        STM32_WPR.lock(&mut self.regs, self.map.wpr);
        self.state = self.observed_state();
        Ok(())
    }
}

impl<R: RegisterAccess, D: DelayNs> RealTimeClock for Stm32Rtc<R, D> {
    fn init(&mut self) -> Result<(), Error> {
        self.regs.set_bit(self.map.rcc_apb1enr, APB1ENR_PWREN);
        self.regs.set_bit(self.map.pwr_cr, PWR_CR_DBP);

        // The stash has to be read before the backup domain reset wipes it.
        let stash = match self.variant {
            Stm32Variant::InitGated => self.take_stash(),
            Stm32Variant::BackupDomainGated => None,
        };

        self.select_lse();
        self.wait_bit(self.map.rcc_bdcr, BDCR_LSERDY, true)?;
        if self.variant == Stm32Variant::InitGated {
            self.wait_bit(self.map.isr, ISR_RSF, true)?;
        }

        self.with_write_mode(|rtc| {
            rtc.regs.write32(rtc.map.prer, DEFAULT_PRESCALER);
            rtc.regs.write32(rtc.map.prer, DEFAULT_PRESCALER);
            if let Some((time, date)) = stash {
                debug!("stm32 rtc: restoring stashed calendar");
                rtc.regs.write32(rtc.map.tr, time);
                rtc.regs.write32(rtc.map.dr, date);
            }
            Ok(())
        })?;

        self.state = self.observed_state();
        Ok(())
    }

    fn configure_default(&mut self, time: &CalendarTime) -> Result<(), Error> {
        check_century(time)?;
        let new_time = STM32_TIME.encode(time);
        let new_date = STM32_DATE.encode(time);

        self.write_keeping_run_state(|rtc| {
            rtc.regs.write32(rtc.map.prer, DEFAULT_PRESCALER);
            rtc.regs.write32(rtc.map.prer, DEFAULT_PRESCALER);
            rtc.write_calendar(new_time, new_date);
        })?;

        verify(self.calendar_is(new_time, new_date))
    }

    fn start(&mut self) -> Result<(), Error> {
        match self.variant {
            Stm32Variant::InitGated => {
                STM32_WPR.unlock(&mut self.regs, self.map.wpr);
                self.regs.write32(self.map.isr, ISR_EXIT);
                STM32_WPR.lock(&mut self.regs, self.map.wpr);
                self.wait_bit(self.map.isr, ISR_INITF, false)?;
            }
            Stm32Variant::BackupDomainGated => {
                self.regs.set_bit(self.map.rcc_bdcr, BDCR_RTCEN);
            }
        }

        self.state = self.observed_state();
        verify(self.state == RtcState::Running)
    }

    fn stop(&mut self) -> Result<(), Error> {
        match self.variant {
            Stm32Variant::InitGated => {
                STM32_WPR.unlock(&mut self.regs, self.map.wpr);
                self.regs.write32(self.map.isr, ISR_ENABLE_INIT);
                let entered = self.wait_bit(self.map.isr, ISR_INITF, true);
                STM32_WPR.lock(&mut self.regs, self.map.wpr);
                entered?;
            }
            Stm32Variant::BackupDomainGated => {
                self.regs.clear_bit(self.map.rcc_bdcr, BDCR_RTCEN);
            }
        }

        self.state = self.observed_state();
        verify(self.state == RtcState::Stopped)
    }

    fn reset(&mut self) -> Result<(), Error> {
        self.write_keeping_run_state(|rtc| {
            rtc.regs.write32(rtc.map.tr, DEFAULT_TIME);
            rtc.regs.write32(rtc.map.dr, DEFAULT_DATE);
        })?;

        verify(self.calendar_is(DEFAULT_TIME, DEFAULT_DATE))
    }

    fn set_time(&mut self, time: &CalendarTime) -> Result<(), Error> {
        check_century(time)?;
        let new_time = STM32_TIME.encode(time);
        let new_date = STM32_DATE.encode(time);

        self.write_keeping_run_state(|rtc| rtc.write_calendar(new_time, new_date))?;

        verify(self.calendar_is(new_time, new_date))
    }

    fn get_time(&mut self) -> Result<CalendarTime, Error> {
        let time = self.regs.read32(self.map.tr);
        let date = self.regs.read32(self.map.dr);
        Ok(bcd::decode(&STM32_TIME, &STM32_DATE, time, date))
    }

    fn trigger_software_reset(&mut self) {
        if self.variant == Stm32Variant::InitGated {
            STM32_WPR.unlock(&mut self.regs, self.map.wpr);
            let time = self.regs.read32(self.map.tr);
            let date = self.regs.read32(self.map.dr);
            self.regs.write32(self.map.bkp0r, time);
            self.regs.write32(self.map.bkp1r, date);
            STM32_WPR.lock(&mut self.regs, self.map.wpr);
        }

        IndependentWatchdog::new(self.map.iwdg_kr, self.map.iwdg_pr, self.map.iwdg_rlr)
            .arm_minimal_timeout(&mut self.regs);
    }

    fn state(&self) -> RtcState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RegisterFile;
    use embedded_hal_mock::eh1::delay::NoopDelay;

    const TR_MASK: u32 = 0x007F_7F7F;
    const DR_MASK: u32 = 0x00FF_FF3F;

    /// Reacts like the STM32 RTC: WPR key state machine, INIT/INITF handshake, calendar writes only
    /// in init mode, LSERDY following LSEON and a backup domain reset wiping the backup registers.
    struct Stm32Sim {
        file: RegisterFile,
        map: Stm32RegisterMap,
        key_stage: u8,
        /// INITF never rises, as with a dead RTC clock.
        init_stuck: bool,
    }

    impl Stm32Sim {
        fn new() -> Self {
            let map = Stm32RegisterMap::DEFAULT;
            let mut file = RegisterFile::new();
            file.poke_bit(map.isr, ISR_RSF, true);
            Stm32Sim {
                file,
                map,
                key_stage: 0,
                init_stuck: false,
            }
        }

        fn unlocked(&self) -> bool {
            self.key_stage == 2
        }

        fn in_init(&self) -> bool {
            self.file.bit(self.map.isr, ISR_INITF)
        }
    }

    impl RegisterAccess for Stm32Sim {
        fn read32(&self, reg: Register) -> u32 {
            self.file.get(reg)
        }

        fn write32(&mut self, reg: Register, value: u32) {
            self.file.record(reg, value);
            let map = self.map;

            if reg == map.wpr {
                self.key_stage = match (self.key_stage, value) {
                    (_, 0xCA) => 1,
                    (1, 0x53) => 2,
                    _ => 0,
                };
            } else if reg == map.isr {
                if self.unlocked() {
                    let init = value & ISR_ENABLE_INIT != 0;
                    self.file.poke_bit(map.isr, ISR_INIT, init);
                    self.file.poke_bit(map.isr, ISR_INITF, init && !self.init_stuck);
                }
            } else if reg == map.tr {
                if self.unlocked() && self.in_init() {
                    self.file.poke(reg, value & TR_MASK);
                }
            } else if reg == map.dr {
                if self.unlocked() && self.in_init() {
                    self.file.poke(reg, value & DR_MASK);
                }
            } else if reg == map.cr || reg == map.prer {
                if self.unlocked() {
                    self.file.poke(reg, value);
                }
            } else if reg == map.rcc_bdcr {
                self.file.poke(reg, value);
                let lse_on = value & (1 << BDCR_LSEON) != 0;
                self.file.poke_bit(reg, BDCR_LSERDY, lse_on);
                if value & BDCR_RESET != 0 {
                    self.file.poke(map.bkp0r, 0);
                    self.file.poke(map.bkp1r, 0);
                }
            } else {
                self.file.poke(reg, value);
            }
        }
    }

    fn rtc(variant: Stm32Variant) -> Stm32Rtc<Stm32Sim, NoopDelay> {
        Stm32Rtc::new(
            Stm32Sim::new(),
            Stm32RegisterMap::DEFAULT,
            variant,
            Poll::bounded(NoopDelay::new(), 100),
        )
    }

    fn sample() -> CalendarTime {
        CalendarTime::new(2024, 2, 2, 3, 5, 0).with_day_week(1)
    }

    #[test]
    fn init_brings_up_backup_domain_and_lse() {
        let mut rtc = rtc(Stm32Variant::InitGated);
        assert_eq!(rtc.state(), RtcState::Uninitialized);
        rtc.init().unwrap();

        let sim = rtc.registers();
        let map = Stm32RegisterMap::DEFAULT;
        assert!(sim.file.bit(map.rcc_apb1enr, APB1ENR_PWREN));
        assert!(sim.file.bit(map.pwr_cr, PWR_CR_DBP));
        assert_eq!(sim.file.writes_to(map.rcc_bdcr), vec![BDCR_RESET, BDCR_LSE_RTC]);
        assert_eq!(sim.file.get(map.prer), DEFAULT_PRESCALER);
        assert_eq!(rtc.state(), RtcState::Running);
    }

    #[test]
    fn set_time_then_get_time() {
        for variant in [Stm32Variant::InitGated, Stm32Variant::BackupDomainGated] {
            let mut rtc = rtc(variant);
            rtc.init().unwrap();
            rtc.set_time(&sample()).unwrap();

            assert_eq!(rtc.get_time().unwrap(), sample());
            let sim = rtc.registers();
            assert_eq!(sim.file.get(sim.map.tr), 0x0003_0500);
            assert_eq!(sim.file.get(sim.map.dr), 0x0024_2202);
        }
    }

    #[test]
    fn set_time_brackets_writes_with_unlock_and_init() {
        let mut rtc = rtc(Stm32Variant::InitGated);
        rtc.set_time(&sample()).unwrap();

        let sim = rtc.registers();
        let map = sim.map;
        let log = sim.file.log();
        assert_eq!(&log[..4], &[(map.wpr, 0xFF), (map.wpr, 0xCA), (map.wpr, 0x53), (map.isr, 0x80)]);

        let tr_write = sim.file.position_of(map.tr, 0x0003_0500).unwrap();
        let exit = sim.file.position_of(map.isr, 0).unwrap();
        assert!(tr_write > 3 && tr_write < exit);
        assert_eq!(log.last(), Some(&(map.wpr, 0xFF)));
        assert!(!sim.unlocked());
    }

    #[test]
    fn calendar_is_write_protected_without_keys() {
        let mut sim = Stm32Sim::new();
        let map = sim.map;

        sim.write32(map.isr, ISR_ENABLE_INIT);
        sim.write32(map.tr, 0x0012_3456);
        assert_eq!(sim.read32(map.tr), 0);

        // Keys in the wrong order do not unlock either.
        sim.write32(map.wpr, 0x53);
        sim.write32(map.wpr, 0xCA);
        sim.write32(map.isr, ISR_ENABLE_INIT);
        sim.write32(map.tr, 0x0012_3456);
        assert_eq!(sim.read32(map.tr), 0);

        STM32_WPR.unlock(&mut sim, map.wpr);
        sim.write32(map.isr, ISR_ENABLE_INIT);
        sim.write32(map.tr, 0x0012_3456);
        assert_eq!(sim.read32(map.tr), 0x0012_3456);
    }

    #[test]
    fn reset_loads_defaults() {
        let mut rtc = rtc(Stm32Variant::InitGated);
        rtc.set_time(&sample()).unwrap();
        rtc.reset().unwrap();

        assert_eq!(
            rtc.get_time().unwrap(),
            CalendarTime::new(2000, 1, 1, 0, 0, 0).with_day_week(1)
        );
    }

    #[test]
    fn start_and_stop_toggle_init_mode() {
        let mut rtc = rtc(Stm32Variant::InitGated);
        rtc.init().unwrap();

        rtc.stop().unwrap();
        assert_eq!(rtc.state(), RtcState::Stopped);
        assert!(rtc.registers().in_init());

        rtc.start().unwrap();
        assert_eq!(rtc.state(), RtcState::Running);
        assert!(!rtc.registers().in_init());

        rtc.stop().unwrap();
        assert!(rtc.registers().in_init());
    }

    #[test]
    fn writes_keep_a_stopped_calendar_stopped() {
        let mut rtc = rtc(Stm32Variant::InitGated);
        rtc.init().unwrap();
        rtc.stop().unwrap();

        rtc.set_time(&sample()).unwrap();
        assert_eq!(rtc.state(), RtcState::Stopped);
        assert!(rtc.registers().in_init());
        assert!(!rtc.registers().unlocked());
        assert_eq!(rtc.get_time().unwrap(), sample());

        rtc.reset().unwrap();
        assert_eq!(rtc.state(), RtcState::Stopped);
        rtc.configure_default(&sample()).unwrap();
        assert_eq!(rtc.state(), RtcState::Stopped);
        assert!(rtc.registers().in_init());

        rtc.start().unwrap();
        rtc.set_time(&sample()).unwrap();
        assert_eq!(rtc.state(), RtcState::Running);
        assert!(!rtc.registers().in_init());
    }

    #[test]
    fn start_and_stop_toggle_rtcen() {
        let mut rtc = rtc(Stm32Variant::BackupDomainGated);
        rtc.init().unwrap();
        let bdcr = Stm32RegisterMap::DEFAULT.rcc_bdcr;

        rtc.start().unwrap();
        assert!(rtc.registers().file.bit(bdcr, BDCR_RTCEN));
        rtc.stop().unwrap();
        assert!(!rtc.registers().file.bit(bdcr, BDCR_RTCEN));
        assert_eq!(rtc.state(), RtcState::Stopped);
    }

    #[test]
    fn dead_clock_times_out_and_leaves_registers_alone() {
        let mut rtc = rtc(Stm32Variant::InitGated);
        rtc.init().unwrap();
        rtc.set_time(&sample()).unwrap();

        let mut sim = rtc.free().0;
        sim.init_stuck = true;
        let mut rtc = Stm32Rtc::new(
            sim,
            Stm32RegisterMap::DEFAULT,
            Stm32Variant::InitGated,
            Poll::bounded(NoopDelay::new(), 5),
        );

        let later = CalendarTime::new(2030, 6, 15, 12, 0, 0);
        assert_eq!(rtc.set_time(&later), Err(Error::Timeout));
        assert_eq!(rtc.get_time().unwrap(), sample());
        assert!(!rtc.registers().unlocked());
    }

    #[test]
    fn rejected_write_is_reported() {
        let mut rtc = rtc(Stm32Variant::InitGated);
        rtc.init().unwrap();
        rtc.set_time(&sample()).unwrap();

        // A seconds tens digit of 8 lands on a reserved bit, which the hardware drops.
        let odd = CalendarTime::new(2024, 2, 2, 3, 5, 85);
        assert_eq!(rtc.set_time(&odd), Err(Error::Verify));
    }

    #[test]
    fn year_outside_century_is_rejected() {
        let mut rtc = rtc(Stm32Variant::InitGated);
        rtc.init().unwrap();
        let before = rtc.registers().file.log().len();

        let t = CalendarTime::new(1999, 12, 31, 23, 59, 59);
        assert_eq!(rtc.set_time(&t), Err(Error::YearOutOfRange));
        assert_eq!(rtc.configure_default(&t), Err(Error::YearOutOfRange));
        assert_eq!(rtc.registers().file.log().len(), before);
    }

    #[test]
    fn configure_default_programs_prescaler_and_24h() {
        let mut rtc = rtc(Stm32Variant::BackupDomainGated);
        rtc.init().unwrap();
        rtc.configure_default(&sample()).unwrap();

        let sim = rtc.registers();
        assert_eq!(sim.file.get(sim.map.prer), DEFAULT_PRESCALER);
        assert!(!sim.file.bit(sim.map.cr, CR_FMT));
        assert_eq!(rtc.get_time().unwrap(), sample());
    }

    #[test]
    fn software_reset_stashes_and_init_restores() {
        let mut rtc = rtc(Stm32Variant::InitGated);
        rtc.init().unwrap();
        rtc.set_time(&sample()).unwrap();
        rtc.trigger_software_reset();

        let map = Stm32RegisterMap::DEFAULT;
        let mut sim = rtc.free().0;
        assert_eq!(sim.file.get(map.bkp0r), 0x0003_0500);
        assert_eq!(sim.file.get(map.bkp1r), 0x0024_2202);
        assert_eq!(sim.file.writes_to(map.iwdg_kr), vec![0xCCCC, 0x5555, 0xAAAA]);

        // The chip comes back with a blank calendar.
        sim.file.poke(map.tr, 0);
        sim.file.poke(map.dr, 0);
        sim.key_stage = 0;

        let mut rtc = Stm32Rtc::new(sim, map, Stm32Variant::InitGated, Poll::bounded(NoopDelay::new(), 100));
        rtc.init().unwrap();
        assert_eq!(rtc.get_time().unwrap(), sample());
        assert_eq!(rtc.registers().file.get(map.bkp1r), 0);

        // Nothing stashed any more, so a second init leaves the calendar as it is.
        rtc.reset().unwrap();
        rtc.init().unwrap();
        assert_eq!(rtc.registers().file.get(map.tr), DEFAULT_TIME & TR_MASK);
    }

    #[test]
    fn midnight_survives_software_reset() {
        let mut rtc = rtc(Stm32Variant::InitGated);
        rtc.init().unwrap();
        let midnight = CalendarTime::new(2024, 3, 1, 0, 0, 0).with_day_week(5);
        rtc.set_time(&midnight).unwrap();
        rtc.trigger_software_reset();

        let mut sim = rtc.free().0;
        sim.file.poke(sim.map.dr, 0);
        let mut rtc = Stm32Rtc::new(
            sim,
            Stm32RegisterMap::DEFAULT,
            Stm32Variant::InitGated,
            Poll::bounded(NoopDelay::new(), 100),
        );
        rtc.init().unwrap();
        assert_eq!(rtc.get_time().unwrap(), midnight);
    }

    #[test]
    fn backup_domain_variant_does_not_stash() {
        let mut rtc = rtc(Stm32Variant::BackupDomainGated);
        rtc.init().unwrap();
        rtc.set_time(&sample()).unwrap();
        rtc.trigger_software_reset();

        let sim = rtc.registers();
        assert_eq!(sim.file.get(sim.map.bkp0r), 0);
        assert_eq!(sim.file.get(sim.map.bkp1r), 0);
        assert_eq!(sim.file.writes_to(sim.map.iwdg_rlr), vec![1]);
    }
}
