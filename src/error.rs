use std::io;

use thiserror::Error;

use crate::telemetry::TelemetryError;

/// Errors produced by the acquisition and forwarding pipeline.
///
/// Only `InvalidConfig` is fatal. Device and telemetry errors are transient
/// by policy: the acquisition loop reconnects and the publisher retries.
#[derive(Debug, Error)]
pub enum Error {
    /// Enumerating input devices through udev failed.
    #[error("failed to enumerate input devices: {0}")]
    Enumeration(#[source] io::Error),

    /// The udev hot-plug monitor could not be set up.
    #[error("failed to monitor hot-plug events: {0}")]
    Hotplug(#[source] io::Error),

    /// The device is absent, or it disappeared mid-read.
    #[error("scale device unavailable: {0}")]
    DeviceUnavailable(#[source] io::Error),

    /// The exclusive grab was refused, e.g. because another process holds it.
    #[error("exclusive grab denied: {0}")]
    ExclusiveAccessDenied(#[source] io::Error),

    /// The telemetry collaborator rejected a connect or publish call.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// The configuration cannot produce a working pipeline. Fatal at startup.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Shutdown was requested while blocked.
    #[error("shutdown requested")]
    Shutdown,
}

impl Error {
    /// Whether the acquisition loop should swallow this error and reconnect.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Enumeration(_)
                | Error::Hotplug(_)
                | Error::DeviceUnavailable(_)
                | Error::ExclusiveAccessDenied(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
