// Motor control module for the rover base
//
// Provides:
// - MD25 register protocol
// - Skid-steer command mapping (command -> wheel speeds)
// - High-level motor driver API

mod driver;
mod md25;
mod skid_steer;

pub use driver::MotorDriver;
pub use skid_steer::{WheelSpeeds, wheel_speeds};
