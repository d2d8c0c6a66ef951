// Timing, register map, speed table, topics, CLI
use std::time::Duration;

use clap::Parser;

// Obstacle monitor cycle (sampling + stop enforcement)
pub const MONITOR_PERIOD: Duration = Duration::from_millis(100);

// Obstacles closer than this (cm) put the vehicle in emergency
pub const SAFE_DISTANCE_CM: i32 = 50;

// Acquisition time the LIDAR needs between trigger and result.
// Hardware requirement, not a tuning knob.
pub const RANGING_SETTLE: Duration = Duration::from_millis(20);

// MD25 motor driver
pub const MD25_ADDRESS: u16 = 0x58;
pub const MD25_SPEED1_REG: u8 = 0x00; // left wheel
pub const MD25_SPEED2_REG: u8 = 0x01; // right wheel
pub const MD25_MODE_REG: u8 = 0x0F;

// LIDAR-Lite ranging sensor
pub const LIDAR_ADDRESS: u16 = 0x62;
pub const LIDAR_MEASURE_REG: u8 = 0x00;
pub const LIDAR_MEASURE_CMD: u8 = 0x04; // begin measurement
pub const LIDAR_HIGH_BYTE_REG: u8 = 0x0F;
pub const LIDAR_LOW_BYTE_REG: u8 = 0x10;

// Raw wheel speeds (0..=255, 128 = stopped)
pub const SPEED_FORWARD: u8 = 140;
pub const SPEED_BACKWARD: u8 = 90;
pub const SPEED_STOP: u8 = 128;
pub const SPEED_TURN_INNER: u8 = 130;
// Unused: turns drive the outer wheel at SPEED_FORWARD
pub const SPEED_TURN_OUTER: u8 = 160;

// Zenoh status topic and publish rate
pub const TOPIC_STATUS: &str = "rover/state/safety";
pub const STATUS_PUBLISH_PERIOD: Duration = Duration::from_millis(500);

// Video feed
pub const CAMERA_WIDTH: u32 = 640;
pub const CAMERA_HEIGHT: u32 = 480;
pub const CAMERA_FRAME_PERIOD: Duration = Duration::from_millis(50);

/// Deployment options. The safety constants above are deliberately not flags.
#[derive(Debug, Clone, Parser)]
#[command(name = "rover-runtime", about = "Onboard motion arbitration and obstacle stop")]
pub struct Args {
    /// Address the HTTP control surface listens on
    #[arg(long, default_value = "0.0.0.0:5000")]
    pub bind: String,

    /// I2C bus number (/dev/i2c-N)
    #[arg(long, default_value_t = 1)]
    pub i2c_bus: u8,

    /// Run against the in-memory bus instead of hardware
    #[arg(long)]
    pub simulate: bool,

    /// Distance (cm) the simulated sensor reports
    #[arg(long, default_value_t = 200)]
    pub sim_distance: u16,

    /// Video capture device index
    #[arg(long, default_value_t = 0)]
    pub camera_index: i32,

    /// Do not open the camera
    #[arg(long)]
    pub no_camera: bool,

    /// Publish the safety status on zenoh
    #[arg(long)]
    pub publish_status: bool,
}
