use tracing_subscriber::EnvFilter;

/// Initializes the global logging facility.
///
/// If `RUST_LOG` is not set, the global default logging level is `info`,
/// with `debug` for `scale_usb` itself.
///
/// Log messages are formatted by `tracing_subscriber` and printed to
/// standard error. Standard output is reserved for completed readings, one
/// per line; the two streams must never interleave.
///
/// # Panics
///
/// Panics if the initialization was unsuccessful, likely because a global
/// subscriber was already installed by another call to try_init.
pub fn initialize_logging() {
    // set default logging levels:
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info,scale_usb=debug");
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}
