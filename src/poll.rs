/*!
  # Status polling
  Every hardware-confirmed transition (init mode entered, write access granted, counter
  enabled) is a busy-wait on a status bit. [`Poll`] owns the delay provider and decides how long
  such a wait may last:

  * [`Poll::forever`] spins until the bit flips. A dead oscillator hangs the caller.
  * [`Poll::bounded`] gives up after a number of attempts and reports [`Error::Timeout`].

  One poll step is an `nb` operation: `Err(nb::Error::WouldBlock)` means "not yet".

  ## Example
  ```ignore
    use embedded_time::duration::Extensions;

    let mut poll = Poll::bounded(delay, 1_000).with_interval(50_u32.microseconds());
    poll.until(|| regs.test_bit(isr, INITF))?;
  ```
*/

use crate::rtc::Error;
use embedded_hal::delay::DelayNs;
use embedded_time::duration::Microseconds;

const DEFAULT_INTERVAL: Microseconds<u32> = Microseconds(10);

/// Wait policy for status polls
pub struct Poll<D> {
    delay: D,
    attempts: Option<u32>,
    interval: Microseconds<u32>,
}

impl<D: DelayNs> Poll<D> {
    /// Never gives up.
    pub fn forever(delay: D) -> Self {
        Poll {
            delay,
            attempts: None,
            interval: DEFAULT_INTERVAL,
        }
    }

    /// Gives up with [`Error::Timeout`] once `attempts` steps all returned `WouldBlock`.
    pub fn bounded(delay: D, attempts: u32) -> Self {
        Poll {
            delay,
            attempts: Some(attempts),
            interval: DEFAULT_INTERVAL,
        }
    }

    /// Time slept between two unsuccessful steps. Zero spins without calling the delay.
    pub fn with_interval(mut self, interval: impl Into<Microseconds<u32>>) -> Self {
        self.interval = interval.into();
        self
    }

    pub fn is_bounded(&self) -> bool {
        self.attempts.is_some()
    }

    /// Drives `step` until it completes, fails, or the attempt budget runs out.
    pub fn wait<F>(&mut self, mut step: F) -> Result<(), Error>
    where
        F: FnMut() -> nb::Result<(), Error>,
    {
        let mut tries: u32 = 0;
        loop {
            match step() {
                Ok(()) => return Ok(()),
                Err(nb::Error::Other(e)) => return Err(e),
                Err(nb::Error::WouldBlock) => {}
            }

            tries = tries.saturating_add(1);
            if let Some(limit) = self.attempts {
                if tries >= limit {
                    warn!("status poll gave up after {=u32} attempts", tries);
                    return Err(Error::Timeout);
                }
            }

            self.pause();
        }
    }

    /// Waits for `ready` to return `true`.
    pub fn until<F>(&mut self, mut ready: F) -> Result<(), Error>
    where
        F: FnMut() -> bool,
    {
        self.wait(|| {
            if ready() {
                Ok(())
            } else {
                Err(nb::Error::WouldBlock)
            }
        })
    }

    /// Plain blocking delay, for the few sequences that need settling time rather than a flag.
    pub fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    /// Releases the delay provider.
    pub fn free(self) -> D {
        self.delay
    }

    fn pause(&mut self) {
        if self.interval.0 == 0 {
            core::hint::spin_loop();
        } else {
            self.delay.delay_us(self.interval.0);
        }
    }
}
