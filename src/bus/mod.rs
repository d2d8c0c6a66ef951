// Shared I2C bus access
//
// The motor driver and the ranging sensor sit on the same bus. Every
// register access goes through `BusSerializer`, which owns the single bus
// handle behind a mutex so transactions never interleave on the wire.

#[cfg(feature = "rpi")]
pub mod rpi;
pub mod sim;

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

/// Error types for bus transactions
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Failed to open I2C bus: {0}")]
    Open(String),

    #[error("No acknowledge from device 0x{addr:02X} (register 0x{register:02X})")]
    Nack { addr: u16, register: u8 },

    #[error("Transfer with device 0x{addr:02X} failed (register 0x{register:02X}): {reason}")]
    Transfer { addr: u16, register: u8, reason: String },
}

pub type Result<T> = std::result::Result<T, BusError>;

/// Raw single-register access to a bus. Implementations do not retry.
pub trait I2cBus: Send {
    fn write_byte(&mut self, addr: u16, register: u8, value: u8) -> Result<()>;
    fn read_byte(&mut self, addr: u16, register: u8) -> Result<u8>;
}

/// One register read or write against a peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
    Write { addr: u16, register: u8, value: u8 },
    Read { addr: u16, register: u8 },
}

/// Mutual-exclusion gate around the physical bus handle.
///
/// Cloning hands out another reference to the same handle; the handle is
/// released when the last clone is dropped.
#[derive(Clone)]
pub struct BusSerializer {
    bus: Arc<Mutex<Box<dyn I2cBus>>>,
}

impl BusSerializer {
    pub fn new(bus: impl I2cBus + 'static) -> Self {
        Self {
            bus: Arc::new(Mutex::new(Box::new(bus))),
        }
    }

    /// Run one transaction with exclusive bus access.
    /// Reads return the byte read, writes return `None`.
    pub fn transact(&self, op: Transaction) -> Result<Option<u8>> {
        let mut bus = self.bus.lock();
        trace!("{:?}", op);
        match op {
            Transaction::Write {
                addr,
                register,
                value,
            } => bus.write_byte(addr, register, value).map(|_| None),
            Transaction::Read { addr, register } => bus.read_byte(addr, register).map(Some),
        }
    }

    pub fn write(&self, addr: u16, register: u8, value: u8) -> Result<()> {
        self.transact(Transaction::Write {
            addr,
            register,
            value,
        })
        .map(|_| ())
    }

    pub fn read(&self, addr: u16, register: u8) -> Result<u8> {
        match self.transact(Transaction::Read { addr, register })? {
            Some(value) => Ok(value),
            None => Err(BusError::Transfer {
                addr,
                register,
                reason: "read returned no data".to_string(),
            }),
        }
    }
}
