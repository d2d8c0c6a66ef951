// Value types exchanged between the monitor, the arbiter and the HTTP surface

use serde::{Deserialize, Serialize};

use crate::safety::SafetySnapshot;

/// Motion request parsed from a command token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MotorCommand {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
    Invalid(String),
}

impl MotorCommand {
    pub fn parse(token: &str) -> Self {
        match token {
            "frente" => Self::Forward,
            "tras" => Self::Backward,
            "esquerda" => Self::Left,
            "direita" => Self::Right,
            "parar" => Self::Stop,
            other => Self::Invalid(other.to_string()),
        }
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, Self::Stop)
    }
}

/// Outcome of one ranging transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSample {
    Distance(u16),
    Failed,
}

impl RangeSample {
    /// Centimeters, or -1 for a failed read
    pub fn as_cm(self) -> i32 {
        match self {
            Self::Distance(cm) => cm as i32,
            Self::Failed => -1,
        }
    }
}

/// Why a valid command was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    EmergencyActive,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmergencyActive => f.write_str("emergency active"),
        }
    }
}

/// Arbiter verdict for one command token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(RejectReason),
    Invalid(String),
}

/// Motor summary reported by /status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MotorsState {
    Parado,
    Ativo,
}

/// Body of /status, also published on the status topic
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusReport {
    pub emergencia: bool,
    pub distancia: i32,
    pub motores: MotorsState,
}

impl From<SafetySnapshot> for StatusReport {
    fn from(snapshot: SafetySnapshot) -> Self {
        Self {
            emergencia: snapshot.emergency,
            distancia: snapshot.distance,
            motores: if snapshot.emergency {
                MotorsState::Parado
            } else {
                MotorsState::Ativo
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_tokens() {
        assert_eq!(MotorCommand::parse("frente"), MotorCommand::Forward);
        assert_eq!(MotorCommand::parse("tras"), MotorCommand::Backward);
        assert_eq!(MotorCommand::parse("esquerda"), MotorCommand::Left);
        assert_eq!(MotorCommand::parse("direita"), MotorCommand::Right);
        assert_eq!(MotorCommand::parse("parar"), MotorCommand::Stop);
    }

    #[test]
    fn test_parse_is_exact_match() {
        assert_eq!(
            MotorCommand::parse("FRENTE"),
            MotorCommand::Invalid("FRENTE".to_string())
        );
        assert_eq!(
            MotorCommand::parse(" parar"),
            MotorCommand::Invalid(" parar".to_string())
        );
        assert_eq!(MotorCommand::parse(""), MotorCommand::Invalid(String::new()));
    }

    #[test]
    fn test_failed_sample_is_minus_one() {
        assert_eq!(RangeSample::Failed.as_cm(), -1);
        assert_eq!(RangeSample::Distance(300).as_cm(), 300);
    }

    #[test]
    fn test_status_json_shape() {
        let report = StatusReport::from(SafetySnapshot {
            emergency: true,
            distance: 30,
        });
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"emergencia": true, "distancia": 30, "motores": "parado"})
        );

        let report = StatusReport::from(SafetySnapshot {
            emergency: false,
            distance: -1,
        });
        assert_eq!(report.motores, MotorsState::Ativo);
    }
}
