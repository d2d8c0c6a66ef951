// Obstacle ranging
//
// Provides:
// - LIDAR-Lite register protocol (trigger, settle, two-byte result)

pub mod lidar;

pub use lidar::RangeSensor;
