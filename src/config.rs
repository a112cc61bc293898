use clap::Parser;

use crate::constants::{
    DEFAULT_AGGREGATE_INTERVAL, DEFAULT_PRODUCT_ID, DEFAULT_PUBLISH_INTERVAL, DEFAULT_VENDOR_ID,
};
use crate::devices::ScaleIdentifier;
use crate::error::{Error, Result};
use crate::telemetry::MqttTelemetry;

/// Command line configuration.
///
/// Without an MQTT host the process runs in the minimal standalone mode:
/// readings still go to stdout, nothing is published.
#[derive(Debug, Parser)]
#[command(name = "scale_usb", about = "Relays readings from a USB keyboard scale.")]
pub struct Config {
    /// USB vendor id of the scale, as a short hex string.
    #[arg(long, default_value = DEFAULT_VENDOR_ID)]
    pub vendor_id: String,

    /// USB product id of the scale, as a short hex string.
    #[arg(long, default_value = DEFAULT_PRODUCT_ID)]
    pub product_id: String,

    /// Seconds between two aggregation ticks (T1).
    #[arg(long, default_value_t = DEFAULT_AGGREGATE_INTERVAL.as_secs())]
    pub aggregate_interval: u64,

    /// Seconds between two publish ticks (T2).
    #[arg(long, default_value_t = DEFAULT_PUBLISH_INTERVAL.as_secs())]
    pub publish_interval: u64,

    /// Hostname of the MQTT telemetry endpoint.
    #[arg(long)]
    pub mqtt_host: Option<String>,

    /// Port of the MQTT telemetry endpoint.
    #[arg(long, default_value_t = 1883)]
    pub mqtt_port: u16,

    /// Client id presented to the MQTT broker.
    #[arg(long, default_value = "scale-usb")]
    pub mqtt_client_id: String,

    /// Username for the MQTT broker. Requires --mqtt-password.
    #[arg(long)]
    pub mqtt_username: Option<String>,

    /// Password for the MQTT broker. Requires --mqtt-username.
    #[arg(long)]
    pub mqtt_password: Option<String>,

    /// Topic the batch payloads are published on.
    #[arg(long, default_value = "scale/measurements")]
    pub mqtt_topic: String,

    /// MQTT quality of service level (0, 1 or 2).
    #[arg(long, default_value_t = 1)]
    pub mqtt_qos: u8,
}

impl Config {
    /// Checks the options clap cannot validate on its own.
    pub fn validate(&self) -> Result<()> {
        if self.aggregate_interval == 0 {
            return Err(Error::InvalidConfig(
                "aggregate interval must be at least one second".into(),
            ));
        }
        if self.publish_interval == 0 {
            return Err(Error::InvalidConfig(
                "publish interval must be at least one second".into(),
            ));
        }
        Ok(())
    }

    /// The instrument identity to look for, normalized to lowercase hex as
    /// udev reports it.
    pub fn identifier(&self) -> ScaleIdentifier {
        ScaleIdentifier {
            vendor_id: self.vendor_id.to_lowercase(),
            product_id: self.product_id.to_lowercase(),
        }
    }

    /// Constructs the telemetry client, or `None` in standalone mode.
    ///
    /// Errors here are fatal: a broken telemetry configuration must stop the
    /// process before acquisition starts.
    pub fn telemetry(&self) -> Result<Option<MqttTelemetry>> {
        let host = match &self.mqtt_host {
            Some(host) => host,
            None => return Ok(None),
        };

        let credentials = match (&self.mqtt_username, &self.mqtt_password) {
            (Some(username), Some(password)) => Some((username.as_str(), password.as_str())),
            (None, None) => None,
            _ => {
                return Err(Error::InvalidConfig(
                    "MQTT username and password must be given together".into(),
                ))
            }
        };

        MqttTelemetry::new(
            host,
            self.mqtt_port,
            &self.mqtt_client_id,
            credentials,
            &self.mqtt_topic,
            self.mqtt_qos,
        )
        .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::parse_from(std::iter::once(&"scale_usb").chain(args))
    }

    #[test]
    fn defaults_target_the_gram_scale() {
        let config = parse(&[]);
        assert_eq!(config.identifier(), ScaleIdentifier::default());
        assert_eq!(config.aggregate_interval, 1);
        assert_eq!(config.publish_interval, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn no_mqtt_host_selects_standalone_mode() {
        let config = parse(&[]);
        assert!(matches!(config.telemetry(), Ok(None)));
    }

    #[test]
    fn identifier_override_is_normalized_to_lowercase() {
        let config = parse(&["--vendor-id", "C216", "--product-id", "010A"]);
        let identifier = config.identifier();
        assert_eq!(identifier.vendor_id, "c216");
        assert_eq!(identifier.product_id, "010a");
    }

    #[test]
    fn out_of_range_qos_is_a_fatal_configuration_error() {
        let config = parse(&["--mqtt-host", "broker.local", "--mqtt-qos", "3"]);
        assert!(matches!(config.telemetry(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn username_without_password_is_rejected() {
        let config = parse(&["--mqtt-host", "broker.local", "--mqtt-username", "scale"]);
        assert!(matches!(config.telemetry(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn zero_intervals_are_rejected() {
        assert!(parse(&["--aggregate-interval", "0"]).validate().is_err());
        assert!(parse(&["--publish-interval", "0"]).validate().is_err());
    }
}
