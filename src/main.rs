use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::unbounded;
use tracing::{error, info};

use scale_usb::config::Config;
use scale_usb::decoder::KeyMap;
use scale_usb::error::Error;
use scale_usb::pipeline::{run_aggregator, Publisher};
use scale_usb::server::AcquisitionServer;
use scale_usb::shutdown::shutdown_channel;
use scale_usb::tools;

fn main() -> ExitCode {
    let config = Config::parse();
    tools::initialize_logging();
    info!("Starting the scale USB relay.");

    if let Err(e) = config.validate() {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    // A broken telemetry configuration is fatal before acquisition starts.
    let telemetry = match config.telemetry() {
        Ok(telemetry) => telemetry,
        Err(e) => {
            error!("Failed to construct the telemetry client: {}.", e);
            return ExitCode::FAILURE;
        }
    };

    let (shutdown, listener) = shutdown_channel();

    let mut workers = Vec::new();
    let readings = match telemetry {
        Some(client) => {
            let (reading_tx, reading_rx) = unbounded();
            let (batch_tx, batch_rx) = unbounded();

            let interval = Duration::from_secs(config.aggregate_interval);
            let worker_listener = listener.clone();
            workers.push(thread::spawn(move || {
                run_aggregator(reading_rx, batch_tx, interval, worker_listener)
            }));

            let interval = Duration::from_secs(config.publish_interval);
            let worker_listener = listener.clone();
            workers.push(thread::spawn(move || {
                Publisher::new(client, batch_rx).run(interval, worker_listener)
            }));

            Some(reading_tx)
        }
        None => {
            info!("No telemetry endpoint configured, readings go to stdout only.");
            None
        }
    };

    let server = AcquisitionServer::new(config.identifier(), KeyMap::default(), readings, listener);
    let result = server.run();

    shutdown.trigger();
    for worker in workers {
        if worker.join().is_err() {
            error!("A pipeline worker panicked.");
        }
    }

    match result {
        Ok(()) | Err(Error::Shutdown) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Acquisition failed: {}.", e);
            ExitCode::FAILURE
        }
    }
}
