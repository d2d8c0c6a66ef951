// Command to wheel-speed mapping for the two-wheel skid-steer base
//
// Turns drive the outer wheel at the forward speed and the inner wheel just
// above neutral, so the vehicle arcs instead of pivoting in place.

use crate::config::{SPEED_BACKWARD, SPEED_FORWARD, SPEED_STOP, SPEED_TURN_INNER};
use crate::messages::MotorCommand;

/// Raw speed pair for the MD25 (128 = stopped)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelSpeeds {
    pub left: u8,
    pub right: u8,
}

impl WheelSpeeds {
    pub const STOP: WheelSpeeds = WheelSpeeds {
        left: SPEED_STOP,
        right: SPEED_STOP,
    };

    pub fn new(left: u8, right: u8) -> Self {
        Self { left, right }
    }
}

/// Speed pair for a command; `None` for an invalid command
pub fn wheel_speeds(command: &MotorCommand) -> Option<WheelSpeeds> {
    let speeds = match command {
        MotorCommand::Forward => WheelSpeeds::new(SPEED_FORWARD, SPEED_FORWARD),
        MotorCommand::Backward => WheelSpeeds::new(SPEED_BACKWARD, SPEED_BACKWARD),
        MotorCommand::Stop => WheelSpeeds::STOP,
        MotorCommand::Left => WheelSpeeds::new(SPEED_TURN_INNER, SPEED_FORWARD),
        MotorCommand::Right => WheelSpeeds::new(SPEED_FORWARD, SPEED_TURN_INNER),
        MotorCommand::Invalid(_) => return None,
    };
    Some(speeds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_table() {
        let table = [
            (MotorCommand::Forward, (140, 140)),
            (MotorCommand::Backward, (90, 90)),
            (MotorCommand::Stop, (128, 128)),
            (MotorCommand::Left, (130, 140)),
            (MotorCommand::Right, (140, 130)),
        ];
        for (command, (left, right)) in table {
            assert_eq!(
                wheel_speeds(&command),
                Some(WheelSpeeds { left, right }),
                "{:?}",
                command
            );
        }
    }

    #[test]
    fn test_invalid_has_no_speeds() {
        assert_eq!(wheel_speeds(&MotorCommand::Invalid("voar".into())), None);
    }

    #[test]
    fn test_only_stop_maps_to_neutral() {
        for command in [
            MotorCommand::Forward,
            MotorCommand::Backward,
            MotorCommand::Left,
            MotorCommand::Right,
        ] {
            assert_ne!(wheel_speeds(&command), Some(WheelSpeeds::STOP), "{:?}", command);
        }
    }
}
