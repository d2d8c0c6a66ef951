// MD25 dual motor driver register protocol
//
// Mode 0: each wheel has its own unsigned speed register,
// 0 = full reverse, 128 = stopped, 255 = full forward.

use tracing::debug;

use crate::bus::{BusSerializer, Result};
use crate::config::{MD25_ADDRESS, MD25_MODE_REG, MD25_SPEED1_REG, MD25_SPEED2_REG};

/// Register addresses used by the controller
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    Speed1 = MD25_SPEED1_REG,
    Speed2 = MD25_SPEED2_REG,
    Mode = MD25_MODE_REG,
}

/// Operating modes the controller selects
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Independent unsigned speeds, 128 = stop
    IndependentUnsigned = 0,
}

/// MD25 on the shared bus
pub struct Md25 {
    bus: BusSerializer,
    addr: u16,
}

impl Md25 {
    pub fn new(bus: BusSerializer) -> Self {
        Self {
            bus,
            addr: MD25_ADDRESS,
        }
    }

    pub fn write_register(&self, register: Register, value: u8) -> Result<()> {
        debug!("MD25 write: reg={:?}, value={}", register, value);
        self.bus.write(self.addr, register as u8, value)
    }

    pub fn set_mode(&self, mode: Mode) -> Result<()> {
        self.write_register(Register::Mode, mode as u8)
    }

    /// Two writes, left wheel first. Not atomic across the pair.
    pub fn set_speeds(&self, left: u8, right: u8) -> Result<()> {
        self.write_register(Register::Speed1, left)?;
        self.write_register(Register::Speed2, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::sim::SimBus;

    #[test]
    fn test_register_map() {
        assert_eq!(Register::Speed1 as u8, 0x00);
        assert_eq!(Register::Speed2 as u8, 0x01);
        assert_eq!(Register::Mode as u8, 0x0F);
        assert_eq!(Mode::IndependentUnsigned as u8, 0);
    }

    #[test]
    fn test_set_speeds_writes_left_then_right() {
        let sim = SimBus::new();
        let md25 = Md25::new(BusSerializer::new(sim.clone()));

        md25.set_speeds(130, 140).unwrap();
        assert_eq!(sim.writes_to(MD25_ADDRESS), vec![(0x00, 130), (0x01, 140)]);
    }

    #[test]
    fn test_left_failure_skips_right() {
        let sim = SimBus::new();
        sim.fail_writes_to(Some(MD25_ADDRESS));
        let md25 = Md25::new(BusSerializer::new(sim.clone()));

        assert!(md25.set_speeds(140, 140).is_err());
        assert_eq!(sim.failed_writes(), 1);
    }
}
