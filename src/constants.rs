use std::time::Duration;

/// The GRAM scale USB keyboard adapter's USB vendor id.
pub static DEFAULT_VENDOR_ID: &str = "c216";

/// The GRAM scale USB keyboard adapter's USB product id.
pub static DEFAULT_PRODUCT_ID: &str = "0109";

/// Default time between two aggregation ticks (T1).
pub static DEFAULT_AGGREGATE_INTERVAL: Duration = Duration::from_secs(1);

/// Default time between two publish ticks (T2).
pub static DEFAULT_PUBLISH_INTERVAL: Duration = Duration::from_secs(30);

/// How long to wait before re-resolving the device after a transient failure.
pub static RECONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll interval of the cancellable hot-plug wait.
pub static HOTPLUG_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How often a pending batch set is offered to the telemetry endpoint before
/// it is dropped with a warning.
pub static MAX_PUBLISH_ATTEMPTS: u32 = 3;
