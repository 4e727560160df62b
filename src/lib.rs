//! # Real-time clock HAL for STM32, PIC32, Tiva and GD32 microcontrollers
//!
//! Every supported family gets a driver implementing [`rtc::RealTimeClock`], a small blocking
//! contract (`init`, `configure_default`, `start`, `stop`, `reset`, `set_time`, `get_time`,
//! `software_reset`) over the chip's memory-mapped RTC registers.
//!
//! The drivers never touch memory themselves. They are generic over a
//! [`register::RegisterAccess`] backend, which is [`register::Mmio`] on hardware, and over an
//! [`embedded_hal::delay::DelayNs`] provider used between status polls.
//!
//! # Usage
//!
//! ## STM32 calendar RTC
//!
//! ```ignore
//! use mcu_rtc_hal::{datetime::CalendarTime, family::stm32, poll::Poll, register::Mmio, prelude::*};
//!
//! // Safety: the addresses in `Stm32RegisterMap::DEFAULT` belong to this part.
//! let regs = unsafe { Mmio::new() };
//! let mut rtc = stm32::Stm32Rtc::new(
//!     regs,
//!     stm32::Stm32RegisterMap::DEFAULT,
//!     stm32::Stm32Variant::InitGated,
//!     Poll::bounded(delay, 1_000),
//! );
//!
//! rtc.init()?;
//! rtc.set_time(&CalendarTime::new(2024, 2, 2, 3, 5, 0).with_day_week(5))?;
//! let now = rtc.get_time()?;
//! ```
//!
//! ## Selecting a family
//!
//! Each family sits behind a cargo feature (`stm32`, `stm32f1`, `pic32`, `tiva`, `gd32`), all
//! enabled by default. A firmware image usually keeps just the one it runs on:
//!
//! ```toml
//! mcu-rtc-hal = { version = "0.1", default-features = false, features = ["pic32"] }
//! ```
//!
//! Enable the `defmt` feature to get driver traces and `defmt::Format` on the public types.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;
#[macro_use]
pub mod register;

pub mod bcd;
pub mod counter;
pub mod datetime;
pub mod delay;
pub mod family;
pub mod poll;
pub mod rtc;
pub mod unlock;
pub mod watchdog;

#[cfg(test)]
mod testing;

pub use rtc::{Error, RealTimeClock, RtcState};

/// HAL crate prelude
pub mod prelude {
    pub use crate::register::RegisterAccess as _mcu_rtc_hal_register_RegisterAccess;
    pub use crate::rtc::RealTimeClock as _mcu_rtc_hal_rtc_RealTimeClock;
    pub use crate::unlock::WriteSequencer as _mcu_rtc_hal_unlock_WriteSequencer;
}
