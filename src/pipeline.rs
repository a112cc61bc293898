use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::constants::MAX_PUBLISH_ATTEMPTS;
use crate::shutdown::ShutdownListener;
use crate::telemetry::TelemetryClient;

/// One tick's worth of measurements, stamped at aggregation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Batch {
    /// Creation time in whole seconds since the Unix epoch.
    pub timestamp: u64,
    /// Parsed measurements in the order their readings were emitted.
    pub measurements: Vec<u64>,
}

fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

/// Runs the measurement aggregator until shutdown.
///
/// Every tick drains the readings that were queued at tick start, parses
/// them, and turns them into at most one batch.
pub fn run_aggregator(
    readings: Receiver<String>,
    batches: Sender<Batch>,
    interval: Duration,
    shutdown: ShutdownListener,
) {
    info!("Starting measurement aggregator with a {:?} tick.", interval);
    while shutdown.sleep(interval) {
        aggregate_tick(&readings, &batches);
    }
    info!("Measurement aggregator stopped.");
}

/// One aggregation tick.
///
/// The drain is a snapshot: only readings already queued when the tick
/// starts are taken, anything arriving mid-drain waits for the next tick.
/// Empty readings mean "no value" and are skipped. A non-empty reading that
/// does not parse as an integer violates the decoder contract; it is logged
/// and skipped rather than allowed to take the tick down.
fn aggregate_tick(readings: &Receiver<String>, batches: &Sender<Batch>) {
    let queued = readings.len();
    let mut measurements = Vec::with_capacity(queued);

    for _ in 0..queued {
        let reading = match readings.try_recv() {
            Ok(reading) => reading,
            Err(_) => break,
        };
        if reading.is_empty() {
            continue;
        }
        match reading.parse::<u64>() {
            Ok(value) => measurements.push(value),
            Err(e) => warn!("Dropping malformed reading {:?}: {}.", reading, e),
        }
    }

    if measurements.is_empty() {
        return;
    }

    let batch = Batch {
        timestamp: epoch_seconds(),
        measurements,
    };
    debug!("Aggregated batch: {:?}.", batch);

    if batches.send(batch).is_err() {
        warn!("Batch queue is disconnected, dropping batch.");
    }
}

/// Forwards accumulated batches to the telemetry endpoint.
///
/// A failed publish keeps the drained batches in a pending buffer and
/// retries them on following ticks, ahead of newly drained batches so FIFO
/// order holds. After too many failed attempts the pending set is dropped
/// with a warning instead of growing without bound.
pub struct Publisher<T: TelemetryClient> {
    client: T,
    batches: Receiver<Batch>,
    pending: Vec<Batch>,
    attempts: u32,
}

impl<T: TelemetryClient> Publisher<T> {
    pub fn new(client: T, batches: Receiver<Batch>) -> Self {
        Publisher {
            client,
            batches,
            pending: Vec::new(),
            attempts: 0,
        }
    }

    /// Runs the publisher until shutdown.
    pub fn run(mut self, interval: Duration, shutdown: ShutdownListener) {
        info!("Starting telemetry publisher with a {:?} tick.", interval);
        while shutdown.sleep(interval) {
            self.tick();
        }
        info!("Telemetry publisher stopped.");
    }

    /// One publish tick. A tick with nothing pending makes no connection
    /// attempt at all, to avoid reconnect churn while the scale is idle.
    fn tick(&mut self) {
        let queued = self.batches.len();
        for _ in 0..queued {
            match self.batches.try_recv() {
                Ok(batch) => self.pending.push(batch),
                Err(_) => break,
            }
        }

        if self.pending.is_empty() {
            return;
        }

        match self.client.publish(&self.pending) {
            Ok(()) => {
                info!("Published {} batch(es).", self.pending.len());
                self.pending.clear();
                self.attempts = 0;
            }
            Err(e) => {
                self.attempts += 1;
                warn!(
                    "Publish attempt {}/{} failed: {}.",
                    self.attempts, MAX_PUBLISH_ATTEMPTS, e
                );
                if self.attempts >= MAX_PUBLISH_ATTEMPTS {
                    warn!(
                        "Dropping {} batch(es) after {} failed attempts.",
                        self.pending.len(),
                        self.attempts
                    );
                    self.pending.clear();
                    self.attempts = 0;
                }
            }
        }
    }
}
