/*!
  # Write protection and init mode
  Calendar registers only accept writes after a vendor-specific unlock. Two building blocks cover
  the supported families:

  * [`KeySequence`]: a clear value followed by magic keys written to one protection register
    (STM32 `RTC_WPR`, PIC32 `SYSKEY`, Tiva `HIB_LOCK`).
  * [`WriteSequencer`]: the per-driver enter / exit protocol built on top, which may also request
    initialization mode and wait for the hardware to confirm it.

  Every time or date register write has to sit between `enter_write_mode` and `exit_write_mode`;
  [`WriteSequencer::with_write_mode`] enforces the bracket.
*/

use crate::register::{Register, RegisterAccess};
use crate::rtc::Error;

/// Unlock keys for one protection register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeySequence {
    /// Written first, and again to relock. `None` for registers without a relock value.
    pub clear: Option<u32>,
    pub keys: &'static [u32],
}

/// STM32 `RTC_WPR`
pub const STM32_WPR: KeySequence = KeySequence {
    clear: Some(0xFF),
    keys: &[0xCA, 0x53],
};

/// PIC32 `SYSKEY`
pub const PIC32_SYSKEY: KeySequence = KeySequence {
    clear: Some(0),
    keys: &[0xAA99_6655, 0x5566_99AA],
};

/// Tiva `HIB_LOCK`
pub const TIVA_HIB_LOCK: KeySequence = KeySequence {
    clear: None,
    keys: &[0xA335_9554],
};

impl KeySequence {
    /// Writes the clear value, then every key in order.
    pub fn unlock<R: RegisterAccess>(&self, regs: &mut R, reg: Register) {
        if let Some(clear) = self.clear {
            regs.write32(reg, clear);
        }
        for key in self.keys {
            regs.write32(reg, *key);
        }
    }

    /// Writes the clear value, which aborts any partial sequence and relocks.
    pub fn lock<R: RegisterAccess>(&self, regs: &mut R, reg: Register) {
        if let Some(clear) = self.clear {
            regs.write32(reg, clear);
        }
    }
}

/// Enter / exit protocol around calendar register writes
pub trait WriteSequencer {
    /// Disables write protection and, where the hardware has one, enters initialization mode.
    /// Returns once the peripheral confirms it accepts writes.
    fn enter_write_mode(&mut self) -> Result<(), Error>;

    /// Leaves initialization mode and restores write protection.
    fn exit_write_mode(&mut self) -> Result<(), Error>;

    /// Runs `f` in write mode. Write mode is left even when `f` fails; the first error wins.
    fn with_write_mode<T, F>(&mut self, f: F) -> Result<T, Error>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T, Error>,
    {
        self.enter_write_mode()?;
        let result = f(self);
        let exit = self.exit_write_mode();
        let value = result?;
        exit?;
        Ok(value)
    }
}
