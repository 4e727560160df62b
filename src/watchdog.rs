/*!
    # Software reset
    None of the supported RTCs can reset the chip themselves, so `software_reset` borrows whatever
    reset source the family has:

    * STM32 and GD32: the independent watchdog (IWDG / FWDGT), armed with the largest prescaler
      and a reload value of one so it expires almost immediately.
    * Tiva: the Cortex-M `APINT` (AIRCR) system reset request.
    * PIC32: the software reset register `RSWRST`, unlocked through `SYSKEY`.

    Each helper only issues the register writes; the caller spins until the reset lands.

    ## Example
    ```ignore
    let iwdg = IndependentWatchdog::new(kr, pr, rlr);
    iwdg.arm_minimal_timeout(&mut regs);
    loop {}
    ```
 */

use crate::register::{Register, RegisterAccess};
use crate::unlock::KeySequence;

/// Key register values of the independent watchdog. STM32 IWDG and GD32 FWDGT share them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchdogKeys {
    /// Starts the counter
    Start,
    /// Unlocks the prescaler and reload registers
    Access,
    /// Reloads the counter ("feeds" the watchdog)
    Reload,
}

impl WatchdogKeys {
    /// Returns the value that must be written to the key register
    pub const fn get_key_value(&self) -> u32 {
        match self {
            WatchdogKeys::Start => 0xCCCC,
            WatchdogKeys::Access => 0x5555,
            WatchdogKeys::Reload => 0xAAAA,
        }
    }
}

/// Prescaler code for a /256 divider.
const PRESCALER_DIV_256: u32 = 0b111;
/// Shortest usable reload value.
const RELOAD_MINIMAL: u32 = 1;

/// STM32 IWDG / GD32 FWDGT register block
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IndependentWatchdog {
    /// Key register (`IWDG_KR`, `FWDGT_CTL`)
    pub kr: Register,
    /// Prescaler (`IWDG_PR`, `FWDGT_PSC`)
    pub pr: Register,
    /// Reload value (`IWDG_RLR`, `FWDGT_RLD`)
    pub rlr: Register,
}

impl IndependentWatchdog {
    pub const fn new(kr: Register, pr: Register, rlr: Register) -> Self {
        IndependentWatchdog { kr, pr, rlr }
    }

    /// Starts the watchdog and shortens its timeout to a single tick.
    pub fn arm_minimal_timeout<R: RegisterAccess>(&self, regs: &mut R) {
        debug!("arming independent watchdog for reset");
        regs.write32(self.kr, WatchdogKeys::Start.get_key_value());
        regs.write32(self.kr, WatchdogKeys::Access.get_key_value());
        regs.write32(self.pr, PRESCALER_DIV_256);
        regs.write32(self.rlr, RELOAD_MINIMAL);
        // Loads the new reload value into the running counter.
        regs.write32(self.kr, WatchdogKeys::Reload.get_key_value());
    }
}

/// `VECTKEY` (0x05FA) with `SYSRESETREQ` set.
const AIRCR_SYSRESETREQ: u32 = 0x05FA_0004;

/// Requests a Cortex-M system reset through the `APINT` / `AIRCR` register.
pub fn request_system_reset<R: RegisterAccess>(regs: &mut R, aircr: Register) {
    debug!("requesting system reset");
    regs.write32(aircr, AIRCR_SYSRESETREQ);
}

/// `RSWRST.SWRST`
const RSWRST_SWRST: u32 = 1 << 0;

/// PIC32 software reset: unlock `SYSKEY`, arm `SWRST` through the SET alias, then read `RSWRST`
/// to fire it.
pub fn pic32_software_reset<R: RegisterAccess>(
    regs: &mut R,
    syskey: &KeySequence,
    syskey_reg: Register,
    rswrst_set: Register,
    rswrst: Register,
) {
    debug!("requesting PIC32 software reset");
    syskey.unlock(regs, syskey_reg);
    regs.write32(rswrst_set, RSWRST_SWRST);
    let _ = regs.read32(rswrst);
}
