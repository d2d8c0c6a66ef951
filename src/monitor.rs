// Obstacle monitor: samples the range sensor every cycle, publishes the
// result to the safety state and holds the motors stopped while an obstacle
// is inside the safety radius.
//
// Stop is re-asserted on every emergency cycle, not only on entry, so a
// command that slipped past the arbiter's emergency check is overwritten
// within one MONITOR_PERIOD.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{error, info, warn};

use crate::config::{MONITOR_PERIOD, SAFE_DISTANCE_CM};
use crate::motor::MotorDriver;
use crate::ranging::RangeSensor;
use crate::safety::{SafetyState, Transition};

pub struct ObstacleMonitor {
    sensor: RangeSensor,
    motors: Arc<MotorDriver>,
    state: SafetyState,
}

impl ObstacleMonitor {
    pub fn new(sensor: RangeSensor, motors: Arc<MotorDriver>, state: SafetyState) -> Self {
        Self {
            sensor,
            motors,
            state,
        }
    }

    /// One monitor cycle: measure, record, enforce
    pub fn step(&mut self) -> Transition {
        let sample = self.sensor.measure();
        let transition = self.state.record(sample);

        match transition {
            Transition::EnteredEmergency => {
                warn!(distance_cm = sample.as_cm(), "Emergency: obstacle detected");
            }
            Transition::Cleared => {
                info!(distance_cm = sample.as_cm(), "Emergency cleared");
            }
            _ => {}
        }

        if transition.is_emergency() {
            if let Err(e) = self.motors.stop() {
                error!("Failed to enforce emergency stop: {}", e);
            }
        }

        transition
    }

    /// Run cycles on a fixed schedule until `running` is cleared.
    /// The settle wait counts towards the period.
    pub fn run(mut self, running: &AtomicBool) {
        info!(
            "Obstacle monitor started: {}ms period, {}cm threshold",
            MONITOR_PERIOD.as_millis(),
            SAFE_DISTANCE_CM
        );

        let mut deadline = Instant::now();
        while running.load(Ordering::Acquire) {
            self.step();

            deadline += MONITOR_PERIOD;
            let now = Instant::now();
            if deadline > now {
                thread::sleep(deadline - now);
            } else {
                // overran, start a fresh schedule
                deadline = now;
            }
        }

        info!("Obstacle monitor stopped");
    }

    /// Run on a dedicated thread
    pub fn spawn(self) -> std::io::Result<MonitorHandle> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let thread = thread::Builder::new()
            .name("obstacle-monitor".into())
            .spawn(move || self.run(&flag))?;

        Ok(MonitorHandle {
            running,
            thread: Some(thread),
        })
    }
}

/// Owns the monitor thread. Dropping it stops and joins the thread.
pub struct MonitorHandle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Obstacle monitor thread panicked");
            }
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
