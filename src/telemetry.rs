use std::time::Duration;

use rumqttc::{Client, Event, MqttOptions, Outgoing, Packet, QoS};
use thiserror::Error;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::pipeline::Batch;

/// Errors crossing the telemetry boundary. All of them are transient from
/// the pipeline's point of view; the publisher retries on its next tick.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to encode batch payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("telemetry request rejected: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("telemetry connection failed: {0}")]
    Connection(#[from] rumqttc::ConnectionError),
}

/// The telemetry endpoint as the pipeline sees it: one call that forwards a
/// batch sequence, or fails as a whole.
///
/// Connection management lives behind this boundary. Tests substitute a mock.
pub trait TelemetryClient {
    fn publish(&mut self, batches: &[Batch]) -> std::result::Result<(), TelemetryError>;
}

/// MQTT-backed telemetry client.
///
/// Each publish call runs a short-lived session: connect, send the full
/// batch sequence as one JSON message, disconnect. With a publish tick far
/// above any sensible keep-alive there is no point holding the connection
/// open between ticks.
pub struct MqttTelemetry {
    options: MqttOptions,
    topic: String,
    qos: QoS,
}

impl MqttTelemetry {
    /// Builds the client, validating the configured QoS level.
    ///
    /// Fails with `InvalidConfig` when the configuration cannot produce a
    /// working client; the caller must treat that as fatal at startup.
    pub fn new(
        host: &str,
        port: u16,
        client_id: &str,
        credentials: Option<(&str, &str)>,
        topic: &str,
        qos: u8,
    ) -> Result<Self> {
        if host.is_empty() {
            return Err(Error::InvalidConfig("MQTT host must not be empty".into()));
        }
        if topic.is_empty() {
            return Err(Error::InvalidConfig("MQTT topic must not be empty".into()));
        }
        let qos = match qos {
            0 => QoS::AtMostOnce,
            1 => QoS::AtLeastOnce,
            2 => QoS::ExactlyOnce,
            other => {
                return Err(Error::InvalidConfig(format!(
                    "QoS must be 0, 1 or 2, got {}",
                    other
                )))
            }
        };

        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(Duration::from_secs(5));
        if let Some((username, password)) = credentials {
            options.set_credentials(username, password);
        }

        info!("Telemetry endpoint: {}:{}, topic {}.", host, port, topic);

        Ok(MqttTelemetry {
            options,
            topic: topic.to_string(),
            qos,
        })
    }
}

impl TelemetryClient for MqttTelemetry {
    fn publish(&mut self, batches: &[Batch]) -> std::result::Result<(), TelemetryError> {
        let payload = serde_json::to_vec(batches)?;

        let (client, mut connection) = Client::new(self.options.clone(), 10);
        client.publish(self.topic.as_str(), self.qos, false, payload)?;
        client.disconnect()?;

        // Drive the session until the disconnect goes out; any transport
        // error before that fails the whole publish call.
        for event in connection.iter() {
            match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    debug!("Connected to the telemetry endpoint.");
                }
                Ok(Event::Incoming(Packet::PubAck(_))) => {
                    debug!("Publish acknowledged.");
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                Ok(_) => {}
                Err(e) => return Err(TelemetryError::Connection(e)),
            }
        }

        Ok(())
    }
}
