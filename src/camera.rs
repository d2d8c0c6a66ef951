// Best-effort video feed for the operator
//
// A capture thread pulls annotated JPEG frames from a `FrameSource` and keeps
// the latest one. HTTP clients read from that slot; nothing here touches the
// bus or the motors.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::config::CAMERA_FRAME_PERIOD;
use crate::safety::{SafetySnapshot, SafetyState};

pub const MULTIPART_BOUNDARY: &str = "frame";

#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("Camera unavailable: {0}")]
    Unavailable(String),

    #[error("Frame capture failed: {0}")]
    Capture(String),

    #[error("JPEG encoding failed: {0}")]
    Encode(String),
}

/// Text drawn on each frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlay {
    pub distance: i32,
    pub emergency: bool,
}

impl From<SafetySnapshot> for Overlay {
    fn from(snapshot: SafetySnapshot) -> Self {
        Self {
            distance: snapshot.distance,
            emergency: snapshot.emergency,
        }
    }
}

impl Overlay {
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Distancia: {} cm", self.distance)];
        if self.emergency {
            lines.push("OBSTACULO DETECTADO!".to_string());
        }
        lines
    }
}

/// Produces one JPEG frame with the overlay drawn on it
pub trait FrameSource: Send + 'static {
    fn capture(&mut self, overlay: &Overlay) -> Result<Vec<u8>, CameraError>;
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub seq: u64,
    pub jpeg: Arc<Vec<u8>>,
}

#[derive(Debug, Default)]
struct FeedShared {
    latest: Mutex<Option<Frame>>,
    next_seq: AtomicU64,
    running: AtomicBool,
}

/// Read side of the feed. Clones share the same frame slot.
#[derive(Debug, Clone, Default)]
pub struct CameraFeed {
    shared: Arc<FeedShared>,
}

impl CameraFeed {
    /// Start the capture thread
    pub fn start(
        mut source: impl FrameSource,
        safety: SafetyState,
    ) -> std::io::Result<(CameraFeed, CaptureHandle)> {
        let feed = CameraFeed::default();
        feed.shared.running.store(true, Ordering::Release);

        let writer = feed.clone();
        let thread = thread::Builder::new()
            .name("camera".into())
            .spawn(move || {
                let guard = StopOnExit(writer);
                let writer = &guard.0;
                info!("Camera capture started");
                while writer.is_running() {
                    let overlay = Overlay::from(safety.snapshot());
                    match source.capture(&overlay) {
                        Ok(jpeg) => writer.publish(jpeg),
                        Err(e) => {
                            warn!("{}", e);
                            break;
                        }
                    }
                    thread::sleep(CAMERA_FRAME_PERIOD);
                }
                info!("Camera capture stopped");
            })?;

        let handle = CaptureHandle {
            feed: feed.clone(),
            thread: Some(thread),
        };
        Ok((feed, handle))
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    fn publish(&self, jpeg: Vec<u8>) {
        let seq = self.shared.next_seq.fetch_add(1, Ordering::AcqRel) + 1;
        *self.shared.latest.lock() = Some(Frame {
            seq,
            jpeg: Arc::new(jpeg),
        });
    }

    /// Latest frame if it is newer than `seq`
    pub fn latest_after(&self, seq: u64) -> Option<Frame> {
        self.shared
            .latest
            .lock()
            .as_ref()
            .filter(|f| f.seq > seq)
            .cloned()
    }
}

// Marks the feed stopped when the capture thread exits, panics included
struct StopOnExit(CameraFeed);

impl Drop for StopOnExit {
    fn drop(&mut self) {
        self.0.shared.running.store(false, Ordering::Release);
    }
}

/// Owns the capture thread. Dropping it stops the thread and releases the camera.
pub struct CaptureHandle {
    feed: CameraFeed,
    thread: Option<JoinHandle<()>>,
}

impl CaptureHandle {
    pub fn stop(&mut self) {
        self.feed.shared.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Camera capture thread panicked");
            }
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One part of a multipart/x-mixed-replace JPEG stream
pub fn multipart_part(jpeg: &[u8]) -> Vec<u8> {
    let header = format!("--{MULTIPART_BOUNDARY}\r\nContent-Type: image/jpeg\r\n\r\n");
    let mut part = Vec::with_capacity(header.len() + jpeg.len() + 2);
    part.extend_from_slice(header.as_bytes());
    part.extend_from_slice(jpeg);
    part.extend_from_slice(b"\r\n");
    part
}

#[cfg(feature = "camera")]
pub use opencv_source::OpenCvCamera;

#[cfg(feature = "camera")]
mod opencv_source {
    use opencv::core::{Mat, Point, Scalar, Vector};
    use opencv::prelude::*;
    use opencv::{imgcodecs, imgproc, videoio};

    use super::{CameraError, FrameSource, Overlay};
    use crate::config::{CAMERA_HEIGHT, CAMERA_WIDTH};

    fn capture_err(e: opencv::Error) -> CameraError {
        CameraError::Capture(e.to_string())
    }

    pub struct OpenCvCamera {
        cap: videoio::VideoCapture,
    }

    impl OpenCvCamera {
        pub fn open(index: i32) -> Result<Self, CameraError> {
            let mut cap = videoio::VideoCapture::new(index, videoio::CAP_ANY)
                .map_err(|e| CameraError::Unavailable(e.to_string()))?;
            if !cap.is_opened().map_err(capture_err)? {
                return Err(CameraError::Unavailable(format!(
                    "device {index} could not be opened"
                )));
            }
            cap.set(videoio::CAP_PROP_FRAME_WIDTH, CAMERA_WIDTH as f64)
                .map_err(capture_err)?;
            cap.set(videoio::CAP_PROP_FRAME_HEIGHT, CAMERA_HEIGHT as f64)
                .map_err(capture_err)?;
            Ok(Self { cap })
        }
    }

    impl FrameSource for OpenCvCamera {
        fn capture(&mut self, overlay: &Overlay) -> Result<Vec<u8>, CameraError> {
            let mut frame = Mat::default();
            self.cap.read(&mut frame).map_err(capture_err)?;
            if frame.size().map_err(capture_err)?.width == 0 {
                return Err(CameraError::Capture("empty frame".to_string()));
            }

            // BGR
            let green = Scalar::new(0.0, 255.0, 0.0, 0.0);
            let red = Scalar::new(0.0, 0.0, 255.0, 0.0);
            for (i, line) in overlay.lines().iter().enumerate() {
                let color = if i == 0 { green } else { red };
                imgproc::put_text(
                    &mut frame,
                    line,
                    Point::new(10, 30 + 40 * i as i32),
                    imgproc::FONT_HERSHEY_SIMPLEX,
                    0.7,
                    color,
                    2,
                    imgproc::LINE_8,
                    false,
                )
                .map_err(capture_err)?;
            }

            let mut buf = Vector::<u8>::new();
            imgcodecs::imencode(".jpg", &frame, &mut buf, &Vector::new())
                .map_err(|e| CameraError::Encode(e.to_string()))?;
            Ok(buf.to_vec())
        }
    }
}
