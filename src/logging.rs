use tracing_subscriber::EnvFilter;

/// Install the process-wide subscriber. `verbose` (the `-d` flag) turns on
/// statement-level tracing for our own targets; `RUST_LOG` still wins.
pub fn init(verbose: bool) {
    let default = if verbose { "info,chfreeze=trace" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
