// LIDAR-Lite range sensor driver
//
// Protocol: write 0x04 to the measure register, wait for acquisition, then
// read the high and low result bytes. The result is in centimeters.

use std::thread;

use tracing::debug;

use crate::bus::{BusSerializer, Result};
use crate::config::{
    LIDAR_ADDRESS, LIDAR_HIGH_BYTE_REG, LIDAR_LOW_BYTE_REG, LIDAR_MEASURE_CMD, LIDAR_MEASURE_REG,
    RANGING_SETTLE,
};
use crate::messages::RangeSample;

/// Range sensor on the shared bus.
///
/// `measure` takes `&mut self` and the sensor is not `Clone`, so whoever owns
/// it (the obstacle monitor) is the only caller.
pub struct RangeSensor {
    bus: BusSerializer,
    addr: u16,
}

impl RangeSensor {
    pub fn new(bus: BusSerializer) -> Self {
        Self {
            bus,
            addr: LIDAR_ADDRESS,
        }
    }

    /// Take one measurement. Blocks for at least `RANGING_SETTLE`.
    /// Any failed transaction yields `RangeSample::Failed`, never partial data.
    pub fn measure(&mut self) -> RangeSample {
        match self.try_measure() {
            Ok(cm) => RangeSample::Distance(cm),
            Err(e) => {
                debug!("Distance measurement failed: {}", e);
                RangeSample::Failed
            }
        }
    }

    fn try_measure(&mut self) -> Result<u16> {
        self.bus
            .write(self.addr, LIDAR_MEASURE_REG, LIDAR_MEASURE_CMD)?;
        // bus is released while the sensor acquires
        thread::sleep(RANGING_SETTLE);
        let high = self.bus.read(self.addr, LIDAR_HIGH_BYTE_REG)?;
        let low = self.bus.read(self.addr, LIDAR_LOW_BYTE_REG)?;
        Ok(combine(high, low))
    }
}

fn combine(high: u8, low: u8) -> u16 {
    ((high as u16) << 8) | low as u16
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::bus::sim::SimBus;

    #[test]
    fn test_combine_bytes() {
        assert_eq!(combine(0x00, 0x00), 0);
        assert_eq!(combine(0x01, 0x2C), 300);
        assert_eq!(combine(0xFF, 0xFF), 65535);
    }

    #[test]
    fn test_measure_writes_trigger_and_reads_distance() {
        let sim = SimBus::with_distance(123);
        let mut sensor = RangeSensor::new(BusSerializer::new(sim.clone()));

        assert_eq!(sensor.measure(), RangeSample::Distance(123));
        assert_eq!(sim.writes_to(LIDAR_ADDRESS), vec![(0x00, 0x04)]);
    }

    #[test]
    fn test_measure_waits_for_settle() {
        let sim = SimBus::with_distance(80);
        let mut sensor = RangeSensor::new(BusSerializer::new(sim));

        let start = Instant::now();
        sensor.measure();
        assert!(start.elapsed() >= RANGING_SETTLE);
    }

    #[test]
    fn test_failed_read_returns_marker() {
        let sim = SimBus::with_distance(80);
        sim.push_failure();
        let mut sensor = RangeSensor::new(BusSerializer::new(sim));

        assert_eq!(sensor.measure(), RangeSample::Failed);
        assert_eq!(sensor.measure(), RangeSample::Distance(80));
    }

    #[test]
    fn test_failed_trigger_returns_marker() {
        let sim = SimBus::with_distance(80);
        sim.fail_writes_to(Some(LIDAR_ADDRESS));
        let mut sensor = RangeSensor::new(BusSerializer::new(sim));

        assert_eq!(sensor.measure(), RangeSample::Failed);
    }
}
