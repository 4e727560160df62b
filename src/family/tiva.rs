/*!
  # Tiva hibernation RTC
  A free-running seconds counter in the hibernation module. `HIB_RTCC` counts, `HIB_RTCLD`
  loads it. Every hibernation register write completes asynchronously in the 32 kHz domain, so
  the driver waits for `HIB_CTL.WRC` before and after each one. Parts with a `HIB_LOCK`
  register (TM4C129) also need its key before `HIB_RTCLD` accepts a value; enable that with
  [`TivaRtc::with_lock_key`].

  Only the time of day is kept: `get_time` reports the counter modulo one day and leaves the
  date fields zero.

  The driver is also an [`embedded_time::Clock`] ticking once per second.

  ## Initialisation example
  ```ignore
    let mut rtc = TivaRtc::new(regs, TivaRegisterMap::DEFAULT, Poll::forever(delay));
    rtc.init()?;
    rtc.set_time(&CalendarTime::from_hms(3, 5, 0))?;
    rtc.start()?;
  ```
*/

use crate::counter;
use crate::datetime::CalendarTime;
use crate::poll::Poll;
use crate::register::RegisterAccess;
use crate::rtc::{verify, Error, RealTimeClock, RtcState};
use crate::unlock::{WriteSequencer, TIVA_HIB_LOCK};
use crate::watchdog;
use embedded_hal::delay::DelayNs;
use embedded_time::Clock;

register_map! {
    /// Hibernation module and NVIC registers. Defaults are the TM4C123 addresses, with `HIB_LOCK`
    /// where the TM4C129 has it.
    pub struct TivaRegisterMap {
        sysctl_rcgchib: 0x400F_E614,
        hib_rtcc: 0x400F_C000,
        hib_rtcld: 0x400F_C00C,
        hib_ctl: 0x400F_C010,
        hib_im: 0x400F_C014,
        hib_mis: 0x400F_C01C,
        hib_lock: 0x400F_C360,
        nvic_apint: 0xE000_ED0C,
    }
}

const RCGCHIB_R0: u8 = 0;
const CTL_RTCEN: u8 = 0;
const CTL_CLK32EN: u8 = 6;
const CTL_WRC: u8 = 31;
const IM_WC: u8 = 4;
const MIS_WC: u8 = 4;

/// Tiva hibernation RTC driver
pub struct TivaRtc<R, D> {
    regs: R,
    map: TivaRegisterMap,
    poll: Poll<D>,
    lock_key: bool,
    state: RtcState,
}

impl<R: RegisterAccess, D: DelayNs> TivaRtc<R, D> {
    pub fn new(regs: R, map: TivaRegisterMap, poll: Poll<D>) -> Self {
        TivaRtc {
            regs,
            map,
            poll,
            lock_key: false,
            state: RtcState::Uninitialized,
        }
    }

    /// Writes the `HIB_LOCK` key before loading the counter.
    pub fn with_lock_key(mut self) -> Self {
        self.lock_key = true;
        self
    }

    pub fn registers(&self) -> &R {
        &self.regs
    }

    pub fn free(self) -> (R, D) {
        (self.regs, self.poll.free())
    }

    /// Raw `HIB_RTCC` value in seconds.
    pub fn counter(&self) -> u32 {
        self.regs.read32(self.map.hib_rtcc)
    }

    fn clock_enabled(&self) -> bool {
        self.regs.test_bit(self.map.hib_ctl, CTL_CLK32EN)
    }

    fn running(&self) -> bool {
        self.regs.test_bit(self.map.hib_ctl, CTL_RTCEN)
    }

    fn observed_state(&self) -> RtcState {
        if self.running() {
            RtcState::Running
        } else {
            RtcState::Stopped
        }
    }

    fn require_clock(&self) -> Result<(), Error> {
        if self.clock_enabled() {
            Ok(())
        } else {
            warn!("tiva hib: 32 kHz clock disabled");
            Err(Error::ClockDisabled)
        }
    }

    fn wait_write_complete(&mut self) -> Result<(), Error> {
        let regs = &self.regs;
        let hib_ctl = self.map.hib_ctl;
        self.poll.until(|| regs.test_bit(hib_ctl, CTL_WRC))
    }

    fn set_rtcen(&mut self, on: bool) -> Result<(), Error> {
        self.wait_write_complete()?;
        if on {
            self.regs.set_bit(self.map.hib_ctl, CTL_RTCEN);
        } else {
            self.regs.clear_bit(self.map.hib_ctl, CTL_RTCEN);
        }
        self.wait_write_complete()?;

        self.state = self.observed_state();
        verify(self.running() == on)
    }

    fn load(&mut self, count: u32) -> Result<(), Error> {
        self.with_write_mode(|rtc| {
            rtc.regs.write32(rtc.map.hib_rtcld, count);
            Ok(())
        })?;
        verify(self.counter() == count)
    }

    /// Loads `count` with the counter halted, restarting it if it was running.
    fn load_stopped(&mut self, count: u32) -> Result<(), Error> {
        self.require_clock()?;
        let was_running = self.running();
        if was_running {
            self.stop()?;
        }
        self.load(count)?;
        if was_running {
            self.start()?;
        }
        Ok(())
    }
}

impl<R: RegisterAccess, D: DelayNs> WriteSequencer for TivaRtc<R, D> {
    fn enter_write_mode(&mut self) -> Result<(), Error> {
        if self.lock_key {
            TIVA_HIB_LOCK.unlock(&mut self.regs, self.map.hib_lock);
        }
        self.wait_write_complete()?;
        self.state = RtcState::Initializing;
        Ok(())
    }

    fn exit_write_mode(&mut self) -> Result<(), Error> {
        let done = self.wait_write_complete();
        self.state = self.observed_state();
        done
    }
}

impl<R: RegisterAccess, D: DelayNs> RealTimeClock for TivaRtc<R, D> {
    /// Gates the module clock on and, the first time round, enables the 32 kHz oscillator.
    fn init(&mut self) -> Result<(), Error> {
        self.regs.set_bit(self.map.sysctl_rcgchib, RCGCHIB_R0);

        if !self.clock_enabled() {
            debug!("tiva hib: enabling 32 kHz oscillator");
            self.regs.set_bit(self.map.hib_im, IM_WC);
            self.wait_write_complete()?;
            self.regs.set_bit(self.map.hib_ctl, CTL_CLK32EN);

            let regs = &self.regs;
            let hib_mis = self.map.hib_mis;
            self.poll.until(|| regs.test_bit(hib_mis, MIS_WC))?;
        }

        self.state = self.observed_state();
        Ok(())
    }

    /// Fails with [`Error::ClockDisabled`] unless `init` has enabled the oscillator.
    fn configure_default(&mut self, time: &CalendarTime) -> Result<(), Error> {
        self.require_clock()?;
        self.load(counter::encode_time_of_day(time))
    }

    fn start(&mut self) -> Result<(), Error> {
        self.set_rtcen(true)
    }

    fn stop(&mut self) -> Result<(), Error> {
        self.set_rtcen(false)
    }

    fn reset(&mut self) -> Result<(), Error> {
        self.load_stopped(0)
    }

    fn set_time(&mut self, time: &CalendarTime) -> Result<(), Error> {
        self.load_stopped(counter::encode_time_of_day(time))
    }

    fn get_time(&mut self) -> Result<CalendarTime, Error> {
        Ok(counter::decode_time_of_day(self.counter()))
    }

    fn trigger_software_reset(&mut self) {
        watchdog::request_system_reset(&mut self.regs, self.map.nvic_apint);
    }

    fn state(&self) -> RtcState {
        self.state
    }
}

impl<R: RegisterAccess, D: DelayNs> Clock for TivaRtc<R, D> {
    type T = u32;

    const SCALING_FACTOR: embedded_time::fraction::Fraction =
        <embedded_time::fraction::Fraction>::new(1, 1);

    fn try_now(&self) -> Result<embedded_time::Instant<Self>, embedded_time::clock::Error> {
        if !self.running() {
            return Err(embedded_time::clock::Error::NotRunning);
        }
        Ok(embedded_time::Instant::new(self.counter()))
    }
}
