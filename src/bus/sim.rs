// In-memory bus for simulation mode and tests
//
// Behaves like the real peripherals as far as the controller can tell:
// registers hold the last value written, and a LIDAR trigger loads the next
// scripted distance into the result registers.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{BusError, I2cBus, Result, Transaction};
use crate::config::{
    LIDAR_ADDRESS, LIDAR_HIGH_BYTE_REG, LIDAR_LOW_BYTE_REG, LIDAR_MEASURE_CMD, LIDAR_MEASURE_REG,
};

const DEFAULT_DISTANCE_CM: u16 = 200;

// Write log length; the oldest writes are dropped beyond it
pub const WRITE_LOG_CAPACITY: usize = 4096;

#[derive(Debug)]
struct SimState {
    registers: HashMap<(u16, u8), u8>,
    writes: VecDeque<Transaction>,
    // Next measurements; `None` makes that measurement fail
    script: VecDeque<Option<u16>>,
    resting: Option<u16>,
    measurement_failed: bool,
    fail_writes_to: Option<u16>,
    failed_writes: usize,
}

/// Cloneable handle; all clones share the same simulated peripherals.
#[derive(Debug, Clone)]
pub struct SimBus {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBus {
    pub fn new() -> Self {
        Self::with_distance(DEFAULT_DISTANCE_CM)
    }

    /// Sensor reports `cm` whenever nothing is scripted
    pub fn with_distance(cm: u16) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                registers: HashMap::new(),
                writes: VecDeque::new(),
                script: VecDeque::new(),
                resting: Some(cm),
                measurement_failed: false,
                fail_writes_to: None,
                failed_writes: 0,
            })),
        }
    }

    pub fn set_distance(&self, cm: u16) {
        self.state.lock().resting = Some(cm);
    }

    /// Every measurement fails until `set_distance` is called
    pub fn set_sensor_failed(&self) {
        self.state.lock().resting = None;
    }

    /// Queue the result of the next measurement
    pub fn push_distance(&self, cm: u16) {
        self.state.lock().script.push_back(Some(cm));
    }

    /// Queue a failed measurement
    pub fn push_failure(&self) {
        self.state.lock().script.push_back(None);
    }

    /// Make every write to `addr` fail with a NACK (`None` clears it)
    pub fn fail_writes_to(&self, addr: Option<u16>) {
        self.state.lock().fail_writes_to = addr;
    }

    pub fn set_register(&self, addr: u16, register: u8, value: u8) {
        self.state.lock().registers.insert((addr, register), value);
    }

    pub fn register(&self, addr: u16, register: u8) -> Option<u8> {
        self.state.lock().registers.get(&(addr, register)).copied()
    }

    /// Most recent successful writes, in bus order
    pub fn writes(&self) -> Vec<Transaction> {
        self.state.lock().writes.iter().copied().collect()
    }

    /// Successful writes to one device as (register, value)
    pub fn writes_to(&self, addr: u16) -> Vec<(u8, u8)> {
        self.state
            .lock()
            .writes
            .iter()
            .filter_map(|w| match *w {
                Transaction::Write {
                    addr: a,
                    register,
                    value,
                } if a == addr => Some((register, value)),
                _ => None,
            })
            .collect()
    }

    pub fn clear_writes(&self) {
        self.state.lock().writes.clear();
    }

    pub fn failed_writes(&self) -> usize {
        self.state.lock().failed_writes
    }
}

impl SimState {
    fn trigger_measurement(&mut self) {
        let next = self.script.pop_front().unwrap_or(self.resting);
        match next {
            Some(cm) => {
                self.measurement_failed = false;
                self.registers
                    .insert((LIDAR_ADDRESS, LIDAR_HIGH_BYTE_REG), (cm >> 8) as u8);
                self.registers
                    .insert((LIDAR_ADDRESS, LIDAR_LOW_BYTE_REG), (cm & 0xFF) as u8);
            }
            None => self.measurement_failed = true,
        }
    }
}

impl I2cBus for SimBus {
    fn write_byte(&mut self, addr: u16, register: u8, value: u8) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_writes_to == Some(addr) {
            state.failed_writes += 1;
            return Err(BusError::Nack { addr, register });
        }

        state.registers.insert((addr, register), value);
        if state.writes.len() == WRITE_LOG_CAPACITY {
            state.writes.pop_front();
        }
        state.writes.push_back(Transaction::Write {
            addr,
            register,
            value,
        });

        if addr == LIDAR_ADDRESS && register == LIDAR_MEASURE_REG && value == LIDAR_MEASURE_CMD {
            state.trigger_measurement();
        }
        Ok(())
    }

    fn read_byte(&mut self, addr: u16, register: u8) -> Result<u8> {
        let state = self.state.lock();
        if addr == LIDAR_ADDRESS && state.measurement_failed {
            return Err(BusError::Nack { addr, register });
        }
        Ok(state.registers.get(&(addr, register)).copied().unwrap_or(0))
    }
}
