/*!
  # Register access
  The drivers only ever see a register as an address and talk to it through [`RegisterAccess`].
  On hardware that is [`Mmio`], a zero-sized backend doing volatile 32-bit accesses. Host tests
  plug in a simulated register file instead.

  ## Example
  ```ignore
    let mut regs = unsafe { Mmio::new() };
    let isr = Register::new(0x4000_280C);
    regs.set_bit(isr, 7);
    while !regs.test_bit(isr, 6) {}
  ```
*/

use core::ptr;

/// A memory-mapped 32-bit register, identified by its physical address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Register(usize);

impl Register {
    pub const fn new(address: usize) -> Self {
        Register(address)
    }

    /// The register `bytes` past this one, for walking a peripheral block from its base.
    pub const fn offset(self, bytes: usize) -> Self {
        Register(self.0 + bytes)
    }

    pub const fn address(self) -> usize {
        self.0
    }
}

/// Word and bit access to 32-bit registers.
///
/// Only `read32` and `write32` are required. The bit helpers are read-modify-write, which is what
/// every supported RTC expects for its control registers; registers with set/clear aliases (PIC32)
/// are written whole through `write32` instead.
pub trait RegisterAccess {
    fn read32(&self, reg: Register) -> u32;

    fn write32(&mut self, reg: Register, value: u32);

    fn set_bit(&mut self, reg: Register, bit: u8) {
        let value = self.read32(reg);
        self.write32(reg, value | (1 << bit));
    }

    fn clear_bit(&mut self, reg: Register, bit: u8) {
        let value = self.read32(reg);
        self.write32(reg, value & !(1 << bit));
    }

    fn test_bit(&self, reg: Register, bit: u8) -> bool {
        self.read32(reg) & (1 << bit) != 0
    }
}

impl<T: RegisterAccess + ?Sized> RegisterAccess for &mut T {
    fn read32(&self, reg: Register) -> u32 {
        (**self).read32(reg)
    }

    fn write32(&mut self, reg: Register, value: u32) {
        (**self).write32(reg, value)
    }
}

/// Volatile memory-mapped I/O
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// Creates the hardware register backend.
    ///
    /// # Safety
    ///
    /// Every [`Register`] later handed to this backend must be a valid, aligned 32-bit peripheral
    /// register on the running chip, and nothing else may drive the same RTC registers
    /// concurrently.
    pub const unsafe fn new() -> Self {
        Mmio { _private: () }
    }
}

impl RegisterAccess for Mmio {
    #[inline(always)]
    fn read32(&self, reg: Register) -> u32 {
        unsafe { ptr::read_volatile(reg.address() as *const u32) }
    }

    #[inline(always)]
    fn write32(&mut self, reg: Register, value: u32) {
        unsafe { ptr::write_volatile(reg.address() as *mut u32, value) }
    }
}

/// Declares a family's register map: a `Copy` struct of [`Register`]s, a `DEFAULT` constant with
/// the reference part's addresses and one `with_<field>` override per register for derivatives
/// that move things around.
macro_rules! register_map {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field:ident: $address:expr,
            )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        pub struct $name {
            $(
                $(#[$field_meta])*
                pub $field: $crate::register::Register,
            )+
        }

        paste::paste! {
            impl $name {
                /// Register addresses of the reference part.
                pub const DEFAULT: $name = $name {
                    $( $field: $crate::register::Register::new($address), )+
                };

                $(
                    #[doc = "Moves `" $field "` to another address."]
                    pub const fn [<with_ $field>](mut self, reg: $crate::register::Register) -> Self {
                        self.$field = reg;
                        self
                    }
                )+
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::DEFAULT
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RegisterFile;

    register_map! {
        /// Two registers are enough to exercise the macro.
        pub struct DemoMap {
            ctl: 0x4000_0000,
            cnt: 0x4000_0004,
        }
    }

    #[test]
    fn bit_helpers_read_modify_write() {
        let mut regs = RegisterFile::new();
        let reg = Register::new(0x100);
        regs.write32(reg, 0b1000_0001);

        regs.set_bit(reg, 4);
        assert_eq!(regs.read32(reg), 0b1001_0001);
        assert!(regs.test_bit(reg, 4));

        regs.clear_bit(reg, 0);
        assert_eq!(regs.read32(reg), 0b1001_0000);
        assert!(!regs.test_bit(reg, 0));
    }

    #[test]
    fn bit_31_is_reachable() {
        let mut regs = RegisterFile::new();
        let reg = Register::new(0x200);
        regs.set_bit(reg, 31);
        assert_eq!(regs.read32(reg), 0x8000_0000);
        assert!(regs.test_bit(reg, 31));
    }

    #[test]
    fn register_map_defaults_and_overrides() {
        let map = DemoMap::DEFAULT;
        assert_eq!(map.ctl.address(), 0x4000_0000);
        assert_eq!(map.cnt, map.ctl.offset(4));

        let moved = map.with_cnt(Register::new(0x5000_0000));
        assert_eq!(moved.cnt.address(), 0x5000_0000);
        assert_eq!(moved.ctl, map.ctl);
        assert_eq!(DemoMap::default(), map);
    }

    #[test]
    fn mutable_reference_forwards() {
        fn poke<R: RegisterAccess>(mut regs: R, reg: Register) {
            regs.write32(reg, 7);
            regs.set_bit(reg, 8);
        }

        let mut regs = RegisterFile::new();
        let reg = Register::new(0x10);
        poke(&mut regs, reg);
        assert_eq!(regs.read32(reg), 0x107);
    }
}
