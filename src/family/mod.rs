//! One driver per microcontroller family, each behind the cargo feature of the same name.

#[cfg(any(feature = "stm32f1", feature = "gd32"))]
mod counter_block;

#[cfg(feature = "gd32")]
pub mod gd32;
#[cfg(feature = "pic32")]
pub mod pic32;
#[cfg(feature = "stm32")]
pub mod stm32;
#[cfg(feature = "stm32f1")]
pub mod stm32f1;
#[cfg(feature = "tiva")]
pub mod tiva;
