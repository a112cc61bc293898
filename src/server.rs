use crossbeam_channel::Sender;
use evdev::{Device, InputEventKind};
use tracing::{debug, info};

use crate::constants::RECONNECT_TIMEOUT;
use crate::decoder::{KeyMap, LineDecoder};
use crate::devices::{await_hotplug, find_connected, ScaleIdentifier};
use crate::error::{Error, Result};
use crate::shutdown::ShutdownListener;

/// Owns the scale for as long as it stays connected.
///
/// Locates the device, grabs it exclusively, and pumps its key events
/// through a line decoder. Completed readings are written to stdout and
/// pushed onto the measurement queue. On disconnect or grab failure the
/// whole cycle restarts with a fresh decoder.
#[derive(Debug)]
pub struct AcquisitionServer {
    identifier: ScaleIdentifier,
    key_map: KeyMap,
    /// `None` in the standalone mode, where readings only go to stdout.
    readings: Option<Sender<String>>,
    shutdown: ShutdownListener,
}

impl AcquisitionServer {
    pub fn new(
        identifier: ScaleIdentifier,
        key_map: KeyMap,
        readings: Option<Sender<String>>,
        shutdown: ShutdownListener,
    ) -> Self {
        info!("Creating acquisition server for device: {}.", identifier);

        AcquisitionServer {
            identifier,
            key_map,
            readings,
            shutdown,
        }
    }

    /// Runs the acquisition cycle until shutdown.
    ///
    /// Transient device errors never end the loop; each one restarts the
    /// locate/grab/read cycle after a short pause.
    #[tracing::instrument(skip(self))]
    pub fn run(&self) -> Result<()> {
        info!("Starting acquisition server.");

        loop {
            if self.shutdown.is_shutdown() {
                return Err(Error::Shutdown);
            }

            match self.acquire_once() {
                Err(e) if e.is_transient() => {
                    info!(
                        "Scale has been disconnected: {}. Retrying in {:?}.",
                        e, RECONNECT_TIMEOUT
                    );
                    if !self.shutdown.sleep(RECONNECT_TIMEOUT) {
                        return Err(Error::Shutdown);
                    }
                }
                other => return other,
            }
        }
    }

    /// One connection's lifetime: locate, grab, pump events until the
    /// stream ends.
    ///
    /// The decoder is created fresh per connection, so no partial line
    /// survives a replug. The device handle is dropped on every exit path,
    /// which closes the file descriptor and releases the exclusive grab
    /// before the next grab attempt.
    fn acquire_once(&self) -> Result<()> {
        let devnode = match find_connected(&self.identifier)? {
            Some(devnode) => devnode,
            None => await_hotplug(&self.identifier, &self.shutdown)?,
        };

        let mut decoder = LineDecoder::new(self.key_map.clone());

        let mut device = Device::open(&devnode).map_err(Error::DeviceUnavailable)?;
        info!("Exclusively grabbing device {:?}.", devnode);
        device.grab().map_err(Error::ExclusiveAccessDenied)?;

        info!("Starting to read keyboard events from device {:?}.", devnode);
        loop {
            let events = device.fetch_events().map_err(Error::DeviceUnavailable)?;
            for event in events {
                if let InputEventKind::Key(key) = event.kind() {
                    if let Some(reading) = decoder.handle_key(key, event.value()) {
                        self.emit(reading);
                    }
                }
            }

            if self.shutdown.is_shutdown() {
                return Err(Error::Shutdown);
            }
        }
    }

    /// Forwards one completed reading.
    ///
    /// Readings go to stdout, one per line; diagnostics stay on stderr.
    fn emit(&self, reading: String) {
        debug!("Completed reading: {:?}.", reading);
        println!("{}", reading);

        if let Some(queue) = &self.readings {
            if queue.send(reading).is_err() {
                debug!("Measurement queue is disconnected, dropping reading.");
            }
        }
    }
}
