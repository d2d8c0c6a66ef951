// Command arbiter: the only path from an external command token to the motors
//
// The emergency flag is read once per command. If the obstacle monitor
// asserts emergency after that read, the command may still reach the
// motors; the monitor's next cycle stops them again.

use std::sync::Arc;

use tracing::{info, warn};

use crate::bus::BusError;
use crate::messages::{MotorCommand, RejectReason, Verdict};
use crate::motor::{MotorDriver, wheel_speeds};
use crate::safety::SafetyState;

pub struct CommandArbiter {
    motors: Arc<MotorDriver>,
    state: SafetyState,
}

impl CommandArbiter {
    pub fn new(motors: Arc<MotorDriver>, state: SafetyState) -> Self {
        Self { motors, state }
    }

    /// Validate, check the emergency flag, actuate.
    ///
    /// Rejected commands are dropped, never queued. A bus failure while
    /// writing the speeds is returned as an error and not retried.
    pub fn handle(&self, token: &str) -> Result<Verdict, BusError> {
        info!("Received command: {:?}", token);

        let command = MotorCommand::parse(token);
        let Some(speeds) = wheel_speeds(&command) else {
            return Ok(Verdict::Invalid(token.to_string()));
        };

        if self.state.emergency() && !command.is_stop() {
            let reason = RejectReason::EmergencyActive;
            warn!("Rejecting {:?}: {}", command, reason);
            return Ok(Verdict::Rejected(reason));
        }

        self.motors.set_speeds(speeds)?;
        Ok(Verdict::Accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::BusSerializer;
    use crate::bus::sim::SimBus;
    use crate::config::{MD25_ADDRESS, SPEED_STOP};
    use crate::messages::RangeSample;

    const MOTION_TOKENS: [&str; 4] = ["frente", "esquerda", "direita", "tras"];

    fn setup() -> (SimBus, CommandArbiter, SafetyState) {
        let sim = SimBus::new();
        let motors = Arc::new(MotorDriver::new(BusSerializer::new(sim.clone())));
        let state = SafetyState::new();
        let arbiter = CommandArbiter::new(motors, state.clone());
        (sim, arbiter, state)
    }

    fn last_speeds(sim: &SimBus) -> (Option<u8>, Option<u8>) {
        (
            sim.register(MD25_ADDRESS, 0x00),
            sim.register(MD25_ADDRESS, 0x01),
        )
    }

    #[test]
    fn test_valid_tokens_map_to_speed_table() {
        let (sim, arbiter, _state) = setup();
        let expected = [
            ("frente", (140, 140)),
            ("tras", (90, 90)),
            ("esquerda", (130, 140)),
            ("direita", (140, 130)),
            ("parar", (128, 128)),
        ];

        for (token, (left, right)) in expected {
            sim.clear_writes();
            assert_eq!(arbiter.handle(token).unwrap(), Verdict::Accepted);
            assert_eq!(
                sim.writes_to(MD25_ADDRESS),
                vec![(0x00, left), (0x01, right)],
                "{}",
                token
            );
        }
    }

    #[test]
    fn test_invalid_token_writes_nothing() {
        let (sim, arbiter, _state) = setup();
        assert_eq!(
            arbiter.handle("pular").unwrap(),
            Verdict::Invalid("pular".to_string())
        );
        assert!(sim.writes().is_empty());
    }

    #[test]
    fn test_emergency_rejects_motion() {
        let (sim, arbiter, state) = setup();
        state.record(RangeSample::Distance(30));

        for token in MOTION_TOKENS {
            assert_eq!(
                arbiter.handle(token).unwrap(),
                Verdict::Rejected(RejectReason::EmergencyActive),
                "{}",
                token
            );
        }
        assert!(sim.writes().is_empty());
    }

    #[test]
    fn test_emergency_allows_stop() {
        let (sim, arbiter, state) = setup();
        state.record(RangeSample::Distance(30));

        assert_eq!(arbiter.handle("parar").unwrap(), Verdict::Accepted);
        assert_eq!(last_speeds(&sim), (Some(SPEED_STOP), Some(SPEED_STOP)));
    }

    #[test]
    fn test_invalid_token_during_emergency_is_invalid() {
        let (_sim, arbiter, state) = setup();
        state.record(RangeSample::Distance(30));
        assert!(matches!(arbiter.handle("x").unwrap(), Verdict::Invalid(_)));
    }

    #[test]
    fn test_repeated_stop_is_idempotent() {
        let (_sim, arbiter, state) = setup();
        state.record(RangeSample::Distance(75));
        let before = state.snapshot();

        for _ in 0..5 {
            assert_eq!(arbiter.handle("parar").unwrap(), Verdict::Accepted);
        }
        assert_eq!(state.snapshot(), before);
    }

    #[test]
    fn test_rejection_is_not_queued() {
        let (sim, arbiter, state) = setup();
        state.record(RangeSample::Distance(30));
        arbiter.handle("frente").unwrap();

        state.record(RangeSample::Distance(100));
        assert!(sim.writes().is_empty());
    }

    #[test]
    fn test_bus_failure_is_surfaced() {
        let (sim, arbiter, _state) = setup();
        sim.fail_writes_to(Some(MD25_ADDRESS));

        let err = arbiter.handle("frente").unwrap_err();
        assert!(matches!(err, BusError::Nack { .. }));
        assert_eq!(sim.failed_writes(), 1);
    }
}
