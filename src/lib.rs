//! Scale keyboard USB device input relay.
//!
//! The GRAM scale announces itself as a USB keyboard: every measurement is
//! typed out as digit keystrokes terminated by enter. This crate reads those
//! events from the scale's input device, grabs the device exclusively so the
//! keystrokes never reach the console (where they would pile up as failed
//! login attempts), and waits for the device to come back whenever it is
//! unplugged.
//!
//! Each completed reading is emitted as one line on stdout. Behind the
//! reader, a two-stage pipeline aggregates readings into timestamped batches
//! and forwards them to an MQTT telemetry endpoint. Log output goes to
//! stderr.

pub mod config;
pub mod constants;
pub mod decoder;
pub mod devices;
pub mod error;
pub mod pipeline;
pub mod server;
pub mod shutdown;
pub mod telemetry;
pub mod tools;
