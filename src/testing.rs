//! Host-side register file used by the unit tests. Family tests wrap it in a small simulator that
//! reacts to writes the way the peripheral does.

use crate::register::{Register, RegisterAccess};
use std::collections::BTreeMap;

/// Plain memory: reads return the last value written (zero if never written) and every write is
/// logged.
#[derive(Default, Debug)]
pub struct RegisterFile {
    values: BTreeMap<Register, u32>,
    log: Vec<(Register, u32)>,
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value, without going through the access trait.
    pub fn get(&self, reg: Register) -> u32 {
        self.values.get(&reg).copied().unwrap_or(0)
    }

    /// Sets a value the way the hardware would, without logging a write.
    pub fn poke(&mut self, reg: Register, value: u32) {
        self.values.insert(reg, value);
    }

    pub fn poke_bit(&mut self, reg: Register, bit: u8, set: bool) {
        let value = self.get(reg);
        let value = if set { value | (1 << bit) } else { value & !(1 << bit) };
        self.poke(reg, value);
    }

    pub fn bit(&self, reg: Register, bit: u8) -> bool {
        self.get(reg) & (1 << bit) != 0
    }

    /// Every value written to `reg`, oldest first.
    pub fn writes_to(&self, reg: Register) -> Vec<u32> {
        self.log.iter().filter(|(r, _)| *r == reg).map(|(_, v)| *v).collect()
    }

    pub fn log(&self) -> &[(Register, u32)] {
        &self.log
    }

    /// Index in the write log of the first write of `value` to `reg`.
    pub fn position_of(&self, reg: Register, value: u32) -> Option<usize> {
        self.log.iter().position(|entry| *entry == (reg, value))
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Logs a write without storing it, for simulators that filter writes.
    pub fn record(&mut self, reg: Register, value: u32) {
        self.log.push((reg, value));
    }
}

impl RegisterAccess for RegisterFile {
    fn read32(&self, reg: Register) -> u32 {
        self.get(reg)
    }

    fn write32(&mut self, reg: Register, value: u32) {
        self.record(reg, value);
        self.poke(reg, value);
    }
}
