// Raspberry Pi I2C backend (SMBus byte-data transfers via /dev/i2c-N)

use rppal::i2c::{self, I2c};
use tracing::{debug, info};

use super::{BusError, I2cBus, Result};

// Linux reports a missing ACK as EREMOTEIO
const EREMOTEIO: i32 = 121;

pub struct RpiBus {
    i2c: I2c,
    selected: Option<u16>,
}

impl RpiBus {
    /// Open /dev/i2c-`bus`
    pub fn open(bus: u8) -> Result<Self> {
        info!("Opening I2C bus {}", bus);
        let i2c = I2c::with_bus(bus).map_err(|e| BusError::Open(e.to_string()))?;
        Ok(Self {
            i2c,
            selected: None,
        })
    }

    fn select(&mut self, addr: u16, register: u8) -> Result<()> {
        if self.selected != Some(addr) {
            debug!("Selecting slave 0x{:02X}", addr);
            self.i2c
                .set_slave_address(addr)
                .map_err(|e| map_error(addr, register, e))?;
            self.selected = Some(addr);
        }
        Ok(())
    }
}

fn map_error(addr: u16, register: u8, err: i2c::Error) -> BusError {
    match err {
        i2c::Error::Io(ref io) if io.raw_os_error() == Some(EREMOTEIO) => {
            BusError::Nack { addr, register }
        }
        other => BusError::Transfer {
            addr,
            register,
            reason: other.to_string(),
        },
    }
}

impl I2cBus for RpiBus {
    fn write_byte(&mut self, addr: u16, register: u8, value: u8) -> Result<()> {
        self.select(addr, register)?;
        self.i2c
            .smbus_write_byte(register, value)
            .map_err(|e| map_error(addr, register, e))
    }

    fn read_byte(&mut self, addr: u16, register: u8) -> Result<u8> {
        self.select(addr, register)?;
        self.i2c
            .smbus_read_byte(register)
            .map_err(|e| map_error(addr, register, e))
    }
}
