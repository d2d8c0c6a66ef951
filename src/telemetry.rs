// Periodic safety status publisher over zenoh
//
// Same payload as GET /status, for consumers that prefer pub/sub to polling.

use tokio::time::interval;
use tracing::{debug, info};

use crate::config::{STATUS_PUBLISH_PERIOD, TOPIC_STATUS};
use crate::messages::StatusReport;
use crate::safety::SafetyState;

pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Serialized status payload for the current state
pub fn status_payload(safety: &SafetyState) -> serde_json::Result<String> {
    serde_json::to_string(&StatusReport::from(safety.snapshot()))
}

/// Publish until the task is aborted or the session fails
pub async fn publish_status(safety: SafetyState) -> Result<(), Error> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_STATUS).await?;

    info!(
        "Publishing status to {} every {}ms",
        TOPIC_STATUS,
        STATUS_PUBLISH_PERIOD.as_millis()
    );

    let mut tick = interval(STATUS_PUBLISH_PERIOD);
    loop {
        tick.tick().await;
        let payload = status_payload(&safety)?;
        debug!("Status: {}", payload);
        publisher.put(payload).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::RangeSample;

    #[test]
    fn test_payload_matches_status_endpoint() {
        let safety = SafetyState::new();
        safety.record(RangeSample::Distance(12));

        let payload = status_payload(&safety).unwrap();
        assert_eq!(
            payload,
            r#"{"emergencia":true,"distancia":12,"motores":"parado"}"#
        );
    }
}
