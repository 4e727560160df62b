/*!
  # STM32F1 counter RTC
  A 32-bit seconds counter split over `RTC_CNTH` / `RTC_CNTL`, clocked from the LSE through a
  1 Hz prescaler. Writes happen inside the `CRL.CNF` configuration window and take effect once
  `CRL.RTOFF` is back. The RTC clock gate `RCC_BDCR.RTCEN` starts and stops counting.

  Only the time of day is kept. The counter is read modulo one day.

  The driver is also an [`embedded_time::Clock`] ticking once per second.

  ## Initialisation example
  ```ignore
    let mut rtc = Stm32f1Rtc::new(regs, Stm32f1RegisterMap::DEFAULT, Poll::forever(delay));
    rtc.init()?;
    rtc.configure_default(&CalendarTime::from_hms(12, 0, 0))?;
    rtc.start()?;
  ```
*/

use super::counter_block::{
    CounterBlock, APB1ENR_BKPEN, APB1ENR_PWREN, BDCR_LSEON, BDCR_LSERDY, BDCR_RTCEN, BDCR_RTCSEL_0,
    PRESCALER_1HZ, PWR_CR_DBP,
};
use crate::counter;
use crate::datetime::CalendarTime;
use crate::poll::Poll;
use crate::register::RegisterAccess;
use crate::rtc::{verify, Error, RealTimeClock, RtcState};
use crate::unlock::WriteSequencer;
use crate::watchdog::IndependentWatchdog;
use embedded_hal::delay::DelayNs;
use embedded_time::Clock;

register_map! {
    /// RTC, RCC, PWR and IWDG registers. Defaults are the STM32F103 addresses.
    pub struct Stm32f1RegisterMap {
        rtc_crl: 0x4000_2804,
        rtc_prlh: 0x4000_2808,
        rtc_prll: 0x4000_280C,
        rtc_cnth: 0x4000_2818,
        rtc_cntl: 0x4000_281C,
        rcc_apb1enr: 0x4002_101C,
        rcc_bdcr: 0x4002_1020,
        pwr_cr: 0x4000_7000,
        iwdg_kr: 0x4000_3000,
        iwdg_pr: 0x4000_3004,
        iwdg_rlr: 0x4000_3008,
    }
}

impl Stm32f1RegisterMap {
    pub(crate) const fn counter_block(&self) -> CounterBlock {
        CounterBlock {
            crl: self.rtc_crl,
            prlh: self.rtc_prlh,
            prll: self.rtc_prll,
            cnth: self.rtc_cnth,
            cntl: self.rtc_cntl,
            bdcr: self.rcc_bdcr,
        }
    }
}

/// RTCEN, RTCSEL = LSE, LSEON
const BDCR_LSE_RTC: u32 = (1 << BDCR_RTCEN) | (1 << BDCR_RTCSEL_0) | (1 << BDCR_LSEON);

/// STM32F1 counter RTC driver
pub struct Stm32f1Rtc<R, D> {
    regs: R,
    map: Stm32f1RegisterMap,
    block: CounterBlock,
    poll: Poll<D>,
    state: RtcState,
}

impl<R: RegisterAccess, D: DelayNs> Stm32f1Rtc<R, D> {
    pub fn new(regs: R, map: Stm32f1RegisterMap, poll: Poll<D>) -> Self {
        Stm32f1Rtc {
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

    /// Raw counter value in seconds.
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

    /// Writes the counter (and the prescaler, if given). The write needs RTC clock cycles to
    /// complete, so a stopped clock is gated on for the duration and off again afterwards.
    fn load(&mut self, prescaler: Option<u32>, count: u32) -> Result<(), Error> {
        let was_running = self.block.clock_enabled(&self.regs);
        if !was_running {
            self.block.enable_clock(&mut self.regs, true);
        }

        let loaded = self.with_write_mode(|rtc| {
            if let Some(reload) = prescaler {
                rtc.block.write_prescaler(&mut rtc.regs, reload);
            }
            rtc.block.write_counter(&mut rtc.regs, count);
            Ok(())
        });

        if !was_running {
            self.block.enable_clock(&mut self.regs, false);
            self.state = RtcState::Stopped;
        }
        loaded?;
        verify(self.counter() == count)
    }
}

impl<R: RegisterAccess, D: DelayNs> WriteSequencer for Stm32f1Rtc<R, D> {
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

impl<R: RegisterAccess, D: DelayNs> RealTimeClock for Stm32f1Rtc<R, D> {
    /// Selects the LSE, programs the 1 Hz prescaler and leaves the counter stopped.
    fn init(&mut self) -> Result<(), Error> {
        self.regs.set_bit(self.map.rcc_apb1enr, APB1ENR_PWREN);
        self.regs.set_bit(self.map.rcc_apb1enr, APB1ENR_BKPEN);
        self.regs.set_bit(self.map.pwr_cr, PWR_CR_DBP);
        self.regs.write32(self.map.rcc_bdcr, BDCR_LSE_RTC);

        let regs = &self.regs;
        let bdcr = self.map.rcc_bdcr;
        self.poll.until(|| regs.test_bit(bdcr, BDCR_LSERDY))?;
        self.block.synchronize(&mut self.regs, &mut self.poll)?;

        self.with_write_mode(|rtc| {
            rtc.block.write_prescaler(&mut rtc.regs, PRESCALER_1HZ);
            Ok(())
        })?;

        self.block.enable_clock(&mut self.regs, false);
        self.state = RtcState::Stopped;
        Ok(())
    }

    /// Reprograms the 1 Hz prescaler along with the counter.
    fn configure_default(&mut self, time: &CalendarTime) -> Result<(), Error> {
        self.load(Some(PRESCALER_1HZ), counter::encode_time_of_day(time))
    }

    fn start(&mut self) -> Result<(), Error> {
        self.switch(true)
    }

    fn stop(&mut self) -> Result<(), Error> {
        self.switch(false)
    }

    fn reset(&mut self) -> Result<(), Error> {
        self.load(None, 0)
    }

    fn set_time(&mut self, time: &CalendarTime) -> Result<(), Error> {
        self.load(None, counter::encode_time_of_day(time))
    }

    fn get_time(&mut self) -> Result<CalendarTime, Error> {
        Ok(counter::decode_time_of_day(self.counter()))
    }

    fn trigger_software_reset(&mut self) {
        IndependentWatchdog::new(self.map.iwdg_kr, self.map.iwdg_pr, self.map.iwdg_rlr)
            .arm_minimal_timeout(&mut self.regs);
    }

    fn state(&self) -> RtcState {
        self.state
    }
}

impl<R: RegisterAccess, D: DelayNs> Clock for Stm32f1Rtc<R, D> {
    type T = u32;

    const SCALING_FACTOR: embedded_time::fraction::Fraction =
        <embedded_time::fraction::Fraction>::new(1, 1);

    fn try_now(&self) -> Result<embedded_time::Instant<Self>, embedded_time::clock::Error> {
        if !self.block.clock_enabled(&self.regs) {
            return Err(embedded_time::clock::Error::NotRunning);
        }
        Ok(embedded_time::Instant::new(self.counter()))
    }
}
