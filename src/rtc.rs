/*!
  # Real Time Clock
  The operation contract every family driver implements.

  Each fallible operation performs its register writes unconditionally and then reads the
  hardware back: the returned status comes from the observed post-condition, never from the write
  itself. There are no retries and nothing is rolled back.

  ## Example
  ```ignore
    let mut rtc = Pic32Rtc::new(regs, Pic32RegisterMap::DEFAULT, Poll::forever(delay));
    rtc.init()?;
    rtc.configure_default(&CalendarTime::new(2024, 2, 2, 3, 5, 0))?;
    rtc.start()?;

    let now = rtc.get_time()?;
  ```
*/

use crate::datetime::CalendarTime;

/// RTC error type
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// The registers did not read back as expected after the operation.
    Verify,
    /// A bounded status poll gave up before the peripheral acknowledged.
    Timeout,
    /// BCD calendars only hold years 2000 to 2099.
    YearOutOfRange,
    /// The peripheral has to be stopped before this operation.
    Busy,
    /// The RTC oscillator is not running.
    ClockDisabled,
}

/// Last known state of the peripheral, as tracked by the driver.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RtcState {
    /// `init` has not run yet.
    Uninitialized,
    /// Powered and clocked, counter halted.
    Stopped,
    /// Write-unlocked and, where the hardware has one, in initialization mode.
    Initializing,
    /// Counting.
    Running,
}

/// Blocking real-time clock
pub trait RealTimeClock {
    /// Enables the peripheral clock and backup domain access and selects the RTC clock source.
    fn init(&mut self) -> Result<(), Error>;

    /// Programs the family's default prescaler and format, then loads `time` like
    /// [`set_time`](RealTimeClock::set_time).
    fn configure_default(&mut self, time: &CalendarTime) -> Result<(), Error>;

    /// Lets the counter run. Fails with [`Error::Verify`] if the running indication is not
    /// observed afterwards.
    fn start(&mut self) -> Result<(), Error>;

    /// Halts the counter. Fails with [`Error::Verify`] if it is still observed running.
    fn stop(&mut self) -> Result<(), Error>;

    /// Loads the family's default time and date and verifies them.
    fn reset(&mut self) -> Result<(), Error>;

    /// Writes `time` and verifies the registers hold its encoding.
    fn set_time(&mut self, time: &CalendarTime) -> Result<(), Error>;

    /// Reads and decodes the current time.
    ///
    /// Reads are not verified. The only way this fails is a bounded poll expiring on families that
    /// must wait for a readable snapshot.
    fn get_time(&mut self) -> Result<CalendarTime, Error>;

    /// Arms the family's reset source (watchdog or reset controller). The chip resets shortly
    /// after this returns.
    fn trigger_software_reset(&mut self);

    /// Resets the whole chip. Never returns.
    fn software_reset(&mut self) -> ! {
        self.trigger_software_reset();
        loop {
            core::hint::spin_loop();
        }
    }

    /// Last known peripheral state.
    fn state(&self) -> RtcState;
}

/// Rejects years a two-digit BCD calendar cannot hold instead of letting them corrupt the
/// neighbouring fields.
pub(crate) fn check_century(time: &CalendarTime) -> Result<(), Error> {
    if (2000..=2099).contains(&time.year) {
        Ok(())
    } else {
        warn!("rejecting year {=u16}", time.year);
        Err(Error::YearOutOfRange)
    }
}

/// Maps a read-back comparison onto the status result.
pub(crate) fn verify(matches: bool) -> Result<(), Error> {
    if matches {
        Ok(())
    } else {
        debug!("register read-back mismatch");
        Err(Error::Verify)
    }
}
