// Shared safety state written by the obstacle monitor and read by everyone else

use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::SAFE_DISTANCE_CM;
use crate::messages::RangeSample;

/// Consistent view of both fields from a single monitor cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafetySnapshot {
    pub emergency: bool,
    /// Centimeters; -1 when the last read failed or nothing was read yet
    pub distance: i32,
}

impl Default for SafetySnapshot {
    fn default() -> Self {
        Self {
            emergency: false,
            distance: -1,
        }
    }
}

/// What one recorded sample did to the emergency flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    EnteredEmergency,
    StillEmergency,
    Cleared,
    StillNormal,
}

impl Transition {
    pub fn is_emergency(self) -> bool {
        matches!(self, Self::EnteredEmergency | Self::StillEmergency)
    }
}

/// True when `distance` (cm) is an obstacle inside the safety radius.
///
/// A failed read (-1) is not an obstacle. This keeps the vehicle drivable
/// with a dead sensor, which also means a dead sensor never triggers a stop.
pub fn is_emergency_distance(distance: i32) -> bool {
    0 < distance && distance < SAFE_DISTANCE_CM
}

/// Process-wide safety state. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct SafetyState {
    inner: Arc<RwLock<SafetySnapshot>>,
}

impl SafetyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> SafetySnapshot {
        *self.inner.read()
    }

    pub fn emergency(&self) -> bool {
        self.inner.read().emergency
    }

    /// Store a sample and re-evaluate the emergency flag in one write.
    /// Only the obstacle monitor records samples.
    pub(crate) fn record(&self, sample: RangeSample) -> Transition {
        let distance = sample.as_cm();
        let emergency = is_emergency_distance(distance);

        let mut state = self.inner.write();
        let was_emergency = state.emergency;
        *state = SafetySnapshot {
            emergency,
            distance,
        };

        match (was_emergency, emergency) {
            (false, true) => Transition::EnteredEmergency,
            (true, true) => Transition::StillEmergency,
            (true, false) => Transition::Cleared,
            (false, false) => Transition::StillNormal,
        }
    }
}
