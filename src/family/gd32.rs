/*!
  # GD32VF RTC
  The GD32VF103 RTC is register compatible with the STM32F1 one: a split 32-bit seconds counter
  (`RTC_CNTH` / `RTC_CNTL`), the `CTL.CMF` configuration window, the `CTL.LWOFF` write-done flag
  and the `RCU_BDCTL.RTCEN` clock gate.

  The counter holds a simplified calendar: seconds since 2000-01-01 00:00:00 with 30-day months
  and 365-day years (see [`crate::counter`]). Years 2000 to [`LAST_CALENDAR_YEAR`] fit; the
  weekday is not kept. The five days after December 30 read back as month 13, days 1 to 5, and
  `set_time` accepts them in that form.

  Status polls on this RISC-V part are usually paced with [`crate::delay::McycleDelay`].

  ## Initialisation example
  ```ignore
    let delay = McycleDelay::new(108_000_000);
    let mut rtc = Gd32Rtc::new(regs, Gd32RegisterMap::DEFAULT, Poll::bounded(delay, 10_000));
    rtc.init()?;
    rtc.set_time(&CalendarTime::new(2024, 2, 2, 3, 5, 0))?;
    rtc.start()?;
  ```
*/

use super::counter_block::{
    CounterBlock, APB1ENR_BKPEN, APB1ENR_PWREN, BDCR_LSEON, BDCR_LSERDY, BDCR_RTCSEL_0,
    PRESCALER_1HZ, PWR_CR_DBP,
};
use crate::bcd::CENTURY;
use crate::counter::{self, LAST_CALENDAR_YEAR};
use crate::datetime::CalendarTime;
use crate::poll::Poll;
use crate::register::RegisterAccess;
use crate::rtc::{verify, Error, RealTimeClock, RtcState};
use crate::unlock::WriteSequencer;
use crate::watchdog::IndependentWatchdog;
use embedded_hal::delay::DelayNs;
use embedded_time::Clock;

register_map! {
    /// RTC, PMU, RCU and FWDGT registers of the GD32VF103.
    pub struct Gd32RegisterMap {
        rtc_inten: 0x4000_2800,
        rtc_ctl: 0x4000_2804,
        rtc_psch: 0x4000_2808,
        rtc_pscl: 0x4000_280C,
        rtc_cnth: 0x4000_2818,
        rtc_cntl: 0x4000_281C,
        pmu_ctl: 0x4000_7000,
        rcu_apb1en: 0x4002_101C,
        rcu_bdctl: 0x4002_1020,
        fwdgt_ctl: 0x4000_3000,
        fwdgt_psc: 0x4000_3004,
        fwdgt_rld: 0x4000_3008,
    }
}

impl Gd32RegisterMap {
    pub(crate) const fn counter_block(&self) -> CounterBlock {
        CounterBlock {
            crl: self.rtc_ctl,
            prlh: self.rtc_psch,
            prll: self.rtc_pscl,
            cnth: self.rtc_cnth,
            cntl: self.rtc_cntl,
            bdcr: self.rcu_bdctl,
        }
    }
}

// Same positions as on the STM32F1, under GigaDevice names.
const APB1EN_BKPIEN: u8 = APB1ENR_BKPEN;
const APB1EN_PMUEN: u8 = APB1ENR_PWREN;
const PMU_CTL_BKPWEN: u8 = PWR_CR_DBP;
const BDCTL_LXTALEN: u8 = BDCR_LSEON;
const BDCTL_LXTALSTB: u8 = BDCR_LSERDY;
const BDCTL_RTCSRC_LXTAL: u8 = BDCR_RTCSEL_0;

/// GD32VF RTC driver
pub struct Gd32Rtc<R, D> {
    regs: R,
    map: Gd32RegisterMap,
    block: CounterBlock,
    poll: Poll<D>,
    state: RtcState,
}

impl<R: RegisterAccess, D: DelayNs> Gd32Rtc<R, D> {
    pub fn new(regs: R, map: Gd32RegisterMap, poll: Poll<D>) -> Self {
        Gd32Rtc {
            regs,
            map,
            block: map.counter_block(),
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

    /// Raw counter value: simplified-calendar seconds since 2000-01-01.
    pub fn counter(&self) -> u32 {
        self.block.read_counter(&self.regs)
    }

    fn observed_state(&self) -> RtcState {
        if self.block.clock_enabled(&self.regs) {
            RtcState::Running
        } else {
            RtcState::Stopped
        }
    }

    fn switch(&mut self, on: bool) -> Result<(), Error> {
        self.block.enable_clock(&mut self.regs, on);
        self.state = self.observed_state();
        verify(self.block.clock_enabled(&self.regs) == on)
    }

    /// Starts the LXTAL and routes it to the RTC.
    fn select_lxtal(&mut self) -> Result<(), Error> {
        self.regs.set_bit(self.map.rcu_bdctl, BDCTL_LXTALEN);
        let regs = &self.regs;
        let bdctl = self.map.rcu_bdctl;
        self.poll.until(|| regs.test_bit(bdctl, BDCTL_LXTALSTB))?;
        self.regs.set_bit(self.map.rcu_bdctl, BDCTL_RTCSRC_LXTAL);
        Ok(())
    }

    /// Runs `f` with the RTC clock gated on, since the RTC domain only acknowledges writes while
    /// it is clocked. A stopped clock is stopped again afterwards.
    fn clocked<T, F>(&mut self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut Self) -> Result<T, Error>,
    {
        let was_running = self.block.clock_enabled(&self.regs);
        if !was_running {
            self.block.enable_clock(&mut self.regs, true);
        }
        let result = f(self);
        if !was_running {
            self.block.enable_clock(&mut self.regs, false);
            self.state = RtcState::Stopped;
        }
        result
    }

    fn load(&mut self, prescaler: Option<u32>, count: u32) -> Result<(), Error> {
        self.clocked(|rtc| {
            rtc.with_write_mode(|rtc| {
                if let Some(reload) = prescaler {
                    rtc.block.write_prescaler(&mut rtc.regs, reload);
                }
                rtc.block.write_counter(&mut rtc.regs, count);
                Ok(())
            })
        })?;
        verify(self.counter() == count)
    }
}

fn check_calendar_range(time: &CalendarTime) -> Result<(), Error> {
    if (CENTURY..=LAST_CALENDAR_YEAR).contains(&time.year) {
        Ok(())
    } else {
        warn!("gd32 rtc: year {=u16} does not fit the counter", time.year);
        Err(Error::YearOutOfRange)
    }
}

impl<R: RegisterAccess, D: DelayNs> WriteSequencer for Gd32Rtc<R, D> {
    fn enter_write_mode(&mut self) -> Result<(), Error> {
        self.block.enter_configuration(&mut self.regs, &mut self.poll)?;
        self.state = RtcState::Initializing;
        Ok(())
    }

    fn exit_write_mode(&mut self) -> Result<(), Error> {
        let done = self.block.exit_configuration(&mut self.regs, &mut self.poll);
        self.state = self.observed_state();
        done
    }
}

impl<R: RegisterAccess, D: DelayNs> RealTimeClock for Gd32Rtc<R, D> {
    /// Powers the backup domain and selects the LXTAL on first use, then waits for the counter
    /// registers to resynchronize. RTC interrupts are left disabled.
    fn init(&mut self) -> Result<(), Error> {
        let first_use = !self.regs.test_bit(self.map.pmu_ctl, PMU_CTL_BKPWEN);
        if first_use {
            debug!("gd32 rtc: powering backup domain");
            self.regs.set_bit(self.map.rcu_apb1en, APB1EN_BKPIEN);
            self.regs.set_bit(self.map.rcu_apb1en, APB1EN_PMUEN);
            self.regs.set_bit(self.map.pmu_ctl, PMU_CTL_BKPWEN);
            self.select_lxtal()?;
        }

        self.clocked(|rtc| {
            rtc.block.synchronize(&mut rtc.regs, &mut rtc.poll)?;
            if first_use {
                rtc.with_write_mode(|rtc| {
                    rtc.block.write_prescaler(&mut rtc.regs, PRESCALER_1HZ);
                    Ok(())
                })?;
            }
            Ok(())
        })?;
        self.regs.write32(self.map.rtc_inten, 0);

        self.state = self.observed_state();
        Ok(())
    }

    fn configure_default(&mut self, time: &CalendarTime) -> Result<(), Error> {
        check_calendar_range(time)?;
        self.load(Some(PRESCALER_1HZ), counter::encode_calendar(time))
    }

    fn start(&mut self) -> Result<(), Error> {
        self.regs.set_bit(self.map.rcu_bdctl, BDCTL_LXTALEN);
        self.switch(true)
    }

    fn stop(&mut self) -> Result<(), Error> {
        self.switch(false)
    }

    /// Wipes the backup domain, then restores the clock selection and prescaler with a zero
    /// counter. The counter is left stopped.
    fn reset(&mut self) -> Result<(), Error> {
        self.block.pulse_backup_reset(&mut self.regs);
        self.state = RtcState::Stopped;
        self.select_lxtal()?;
        self.load(Some(PRESCALER_1HZ), 0)
    }

    fn set_time(&mut self, time: &CalendarTime) -> Result<(), Error> {
        check_calendar_range(time)?;
        self.load(None, counter::encode_calendar(time))
    }

    fn get_time(&mut self) -> Result<CalendarTime, Error> {
        Ok(counter::decode_calendar(self.counter()))
    }

    fn trigger_software_reset(&mut self) {
        IndependentWatchdog::new(self.map.fwdgt_ctl, self.map.fwdgt_psc, self.map.fwdgt_rld)
            .arm_minimal_timeout(&mut self.regs);
    }

    fn state(&self) -> RtcState {
        self.state
    }
}

impl<R: RegisterAccess, D: DelayNs> Clock for Gd32Rtc<R, D> {
    type T = u32;

    const SCALING_FACTOR: embedded_time::fraction::Fraction =
        <embedded_time::fraction::Fraction>::new(1, 1);

    /// Seconds since 2000-01-01 in the simplified calendar.
    fn try_now(&self) -> Result<embedded_time::Instant<Self>, embedded_time::clock::Error> {
        if !self.block.clock_enabled(&self.regs) {
            return Err(embedded_time::clock::Error::NotRunning);
        }
        Ok(embedded_time::Instant::new(self.counter()))
    }
}
