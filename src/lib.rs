// Onboard controller for a remotely driven rover
//
// An obstacle monitor samples a LIDAR over I2C and holds the motors stopped
// while anything is inside the safety radius. Remote motion commands arrive
// over HTTP and go through the command arbiter, which refuses everything but
// Stop during an emergency.

pub mod arbiter;
pub mod bus;
pub mod camera;
pub mod config;
pub mod messages;
pub mod monitor;
pub mod motor;
pub mod ranging;
pub mod runtime;
pub mod safety;
pub mod telemetry;
pub mod web;
