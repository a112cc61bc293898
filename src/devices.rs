use std::path::PathBuf;

use derive_more::Display;
use tracing::{debug, info};
use udev::{EventType, MonitorBuilder};

use crate::constants::{DEFAULT_PRODUCT_ID, DEFAULT_VENDOR_ID, HOTPLUG_POLL_INTERVAL};
use crate::error::{Error, Result};
use crate::shutdown::ShutdownListener;

/// Identifier for the scale's USB keyboard adapter.
///
/// The ids are kept as the short lowercase hex strings udev reports in the
/// `idVendor`/`idProduct` attributes of the USB parent device.
#[derive(Debug, Display, Eq, PartialEq, Clone)]
#[display(fmt = "VidPid {{ vid: {}, pid: {} }}", vendor_id, product_id)]
pub struct ScaleIdentifier {
    pub vendor_id: String,
    pub product_id: String,
}

impl Default for ScaleIdentifier {
    fn default() -> Self {
        ScaleIdentifier {
            vendor_id: DEFAULT_VENDOR_ID.to_string(),
            product_id: DEFAULT_PRODUCT_ID.to_string(),
        }
    }
}

/// Checks whether the given input device is the scale, and returns its
/// device node if so.
///
/// A device matches when its immediate USB parent carries the expected
/// `idVendor`/`idProduct` attributes and the device itself has a device node
/// that can be opened for reading.
fn validate_device(device: &udev::Device, identifier: &ScaleIdentifier) -> Option<PathBuf> {
    let parent = device
        .parent_with_subsystem_devtype("usb", "usb_device")
        .ok()??;
    let vendor = parent.attribute_value("idVendor")?.to_str()?;
    let product = parent.attribute_value("idProduct")?.to_str()?;
    if vendor != identifier.vendor_id || product != identifier.product_id {
        return None;
    }
    device.devnode().map(PathBuf::from)
}

/// Gets the scale's device node from the list of plugged-in input devices.
///
/// Returns `Ok(None)` if the scale is not currently connected; that is not
/// an error.
#[tracing::instrument]
pub fn find_connected(identifier: &ScaleIdentifier) -> Result<Option<PathBuf>> {
    let mut enumerator = udev::Enumerator::new().map_err(Error::Enumeration)?;
    enumerator
        .match_subsystem("input")
        .map_err(Error::Enumeration)?;

    for device in enumerator.scan_devices().map_err(Error::Enumeration)? {
        if let Some(devnode) = validate_device(&device, identifier) {
            info!("Scale is already plugged-in! Device node: {:?}.", devnode);
            return Ok(Some(devnode));
        }
    }

    info!("Scale is not plugged-in.");
    Ok(None)
}

/// Waits for the scale to be plugged-in and returns its device node.
///
/// Subscribes to udev "add" events on the `input` subsystem and blocks until
/// a matching device announces itself. There is no timeout; while the scale
/// stays unplugged this blocks indefinitely. The wait is cancellable through
/// the shutdown listener, which is checked between monitor polls.
#[tracing::instrument(skip(shutdown))]
pub fn await_hotplug(identifier: &ScaleIdentifier, shutdown: &ShutdownListener) -> Result<PathBuf> {
    let socket = MonitorBuilder::new()
        .and_then(|b| b.match_subsystem("input"))
        .and_then(|b| b.listen())
        .map_err(Error::Hotplug)?;

    info!("Waiting for the scale to be plugged-in...");

    loop {
        for event in socket.iter() {
            if event.event_type() != EventType::Add {
                continue;
            }
            if let Some(devnode) = validate_device(&event.device(), identifier) {
                info!("Scale has been plugged-in! Device node: {:?}.", devnode);
                return Ok(devnode);
            }
            debug!("Ignoring unrelated input device add event.");
        }

        // The monitor socket is non-blocking; nap between polls so the wait
        // stays cancellable.
        if !shutdown.sleep(HOTPLUG_POLL_INTERVAL) {
            return Err(Error::Shutdown);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_identifier_is_the_gram_scale() {
        let identifier = ScaleIdentifier::default();
        assert_eq!(identifier.vendor_id, "c216");
        assert_eq!(identifier.product_id, "0109");
    }

    #[test]
    fn identifier_display_includes_both_ids() {
        let identifier = ScaleIdentifier::default();
        assert_eq!(
            identifier.to_string(),
            "VidPid { vid: c216, pid: 0109 }"
        );
    }
}
