// Process wiring and lifecycle
//
// Start-up: open the bus, configure the motor driver, start the obstacle
// monitor, then serve commands. Shutdown (signal, server error, or early
// return): stop the monitor, then drop the last motor handle, which issues
// the final Stop exactly once and releases the bus.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::arbiter::CommandArbiter;
use crate::bus::sim::SimBus;
use crate::bus::{BusError, BusSerializer};
use crate::camera::{CameraFeed, CaptureHandle};
use crate::config::Args;
use crate::monitor::ObstacleMonitor;
use crate::motor::MotorDriver;
use crate::ranging::RangeSensor;
use crate::safety::SafetyState;
use crate::telemetry;
use crate::web::{self, AppState};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Built without hardware support (enable the `rpi` feature or pass --simulate)")]
    NoHardware,
}

pub async fn run(args: Args) -> Result<(), RuntimeError> {
    let bus = open_bus(&args)?;
    let listener = TcpListener::bind(&args.bind).await?;
    run_with(args, bus, listener, shutdown_signal()).await
}

/// Run on an already opened bus and listener until `shutdown` resolves
pub async fn run_with(
    args: Args,
    bus: BusSerializer,
    listener: TcpListener,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), RuntimeError> {
    let motors = Arc::new(MotorDriver::new(bus.clone()));
    motors.configure()?;

    let safety = SafetyState::new();
    let mut monitor =
        ObstacleMonitor::new(RangeSensor::new(bus), motors.clone(), safety.clone()).spawn()?;

    let (feed, capture) = open_camera(&args, &safety).unzip();

    let publisher = args.publish_status.then(|| {
        let safety = safety.clone();
        tokio::spawn(async move {
            if let Err(e) = telemetry::publish_status(safety).await {
                warn!("Status publisher stopped: {}", e);
            }
        })
    });

    let state = AppState {
        arbiter: Arc::new(CommandArbiter::new(motors.clone(), safety.clone())),
        safety,
        camera: feed,
    };

    // video streams only end once capture stops
    let shutdown = async move {
        shutdown.await;
        info!("Shutting down...");
        if let Some(capture) = capture {
            stop_capture(capture).await;
        }
    };
    let served = web::serve(listener, state, shutdown).await;
    if let Err(e) = &served {
        error!("Server error: {}", e);
    }

    if let Some(publisher) = publisher {
        publisher.abort();
    }
    monitor.stop();
    drop(motors);

    served?;
    info!("Shutdown complete");
    Ok(())
}

pub fn open_bus(args: &Args) -> Result<BusSerializer, RuntimeError> {
    if args.simulate {
        info!(
            "Simulation mode: sensor reports {} cm",
            args.sim_distance
        );
        return Ok(BusSerializer::new(SimBus::with_distance(args.sim_distance)));
    }
    open_hardware_bus(args.i2c_bus)
}

#[cfg(feature = "rpi")]
fn open_hardware_bus(bus: u8) -> Result<BusSerializer, RuntimeError> {
    let bus = crate::bus::rpi::RpiBus::open(bus)?;
    Ok(BusSerializer::new(bus))
}

#[cfg(not(feature = "rpi"))]
fn open_hardware_bus(_bus: u8) -> Result<BusSerializer, RuntimeError> {
    Err(RuntimeError::NoHardware)
}

fn open_camera(args: &Args, safety: &SafetyState) -> Option<(CameraFeed, CaptureHandle)> {
    if args.no_camera {
        info!("Video feed disabled");
        return None;
    }
    start_camera(args.camera_index, safety)
}

#[cfg(feature = "camera")]
fn start_camera(index: i32, safety: &SafetyState) -> Option<(CameraFeed, CaptureHandle)> {
    let camera = match crate::camera::OpenCvCamera::open(index) {
        Ok(camera) => camera,
        Err(e) => {
            warn!("{}; continuing without video", e);
            return None;
        }
    };
    match CameraFeed::start(camera, safety.clone()) {
        Ok(started) => Some(started),
        Err(e) => {
            warn!("Failed to start camera thread: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "camera"))]
fn start_camera(_index: i32, _safety: &SafetyState) -> Option<(CameraFeed, CaptureHandle)> {
    warn!("Built without camera support, video feed disabled");
    None
}

// Joining the capture thread blocks, keep it off the async workers
async fn stop_capture(mut capture: CaptureHandle) {
    if let Err(e) = tokio::task::spawn_blocking(move || capture.stop()).await {
        error!("Camera shutdown failed: {}", e);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
