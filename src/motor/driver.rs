// High-level motor driver for the rover base
//
// A plain actuator interface: no safety logic lives here. Callers decide
// whether a speed pair is allowed; this only puts it on the wire.

use tracing::{debug, info, warn};

use super::md25::{Md25, Mode};
use super::skid_steer::WheelSpeeds;
use crate::bus::{BusSerializer, Result};

pub struct MotorDriver {
    md25: Md25,
}

impl MotorDriver {
    pub fn new(bus: BusSerializer) -> Self {
        Self {
            md25: Md25::new(bus),
        }
    }

    /// Select independent unsigned speed mode. Called once at start-up.
    pub fn configure(&self) -> Result<()> {
        info!("Configuring MD25 for independent wheel speeds");
        self.md25.set_mode(Mode::IndependentUnsigned)
    }

    pub fn set_speeds(&self, speeds: WheelSpeeds) -> Result<()> {
        debug!(
            "Setting wheel speeds: left={}, right={}",
            speeds.left, speeds.right
        );
        self.md25.set_speeds(speeds.left, speeds.right)
    }

    pub fn stop(&self) -> Result<()> {
        self.set_speeds(WheelSpeeds::STOP)
    }
}

impl Drop for MotorDriver {
    fn drop(&mut self) {
        // Last handle gone: leave the vehicle stopped
        info!("Stopping motors on shutdown");
        if let Err(e) = self.stop() {
            warn!("Failed to stop motors on drop: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::sim::SimBus;
    use crate::config::{MD25_ADDRESS, SPEED_FORWARD, SPEED_STOP};

    #[test]
    fn test_configure_writes_mode_zero() {
        let sim = SimBus::new();
        let driver = MotorDriver::new(BusSerializer::new(sim.clone()));

        driver.configure().unwrap();
        assert_eq!(sim.writes_to(MD25_ADDRESS), vec![(0x0F, 0)]);
    }

    #[test]
    fn test_set_speeds_has_no_safety_logic() {
        let sim = SimBus::new();
        let driver = MotorDriver::new(BusSerializer::new(sim.clone()));

        driver
            .set_speeds(WheelSpeeds::new(SPEED_FORWARD, SPEED_FORWARD))
            .unwrap();
        assert_eq!(sim.register(MD25_ADDRESS, 0x00), Some(SPEED_FORWARD));
        assert_eq!(sim.register(MD25_ADDRESS, 0x01), Some(SPEED_FORWARD));
    }

    #[test]
    fn test_drop_stops_exactly_once() {
        let sim = SimBus::new();
        let driver = MotorDriver::new(BusSerializer::new(sim.clone()));
        driver
            .set_speeds(WheelSpeeds::new(SPEED_FORWARD, SPEED_FORWARD))
            .unwrap();
        sim.clear_writes();

        drop(driver);
        assert_eq!(
            sim.writes_to(MD25_ADDRESS),
            vec![(0x00, SPEED_STOP), (0x01, SPEED_STOP)]
        );
    }

    #[test]
    fn test_drop_tolerates_bus_failure() {
        let sim = SimBus::new();
        let driver = MotorDriver::new(BusSerializer::new(sim.clone()));
        sim.fail_writes_to(Some(MD25_ADDRESS));

        drop(driver);
        assert_eq!(sim.failed_writes(), 1);
    }
}
