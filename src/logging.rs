use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins over `level` when set. Logs go to stderr so command
/// output on stdout stays clean.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
