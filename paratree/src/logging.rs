use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Sets up the process's `tracing` subscriber: `RUST_LOG`-driven, `info`
/// by default, compact formatting to stderr -- matching the registry
/// crate's own `main.rs` setup rather than reaching for a bespoke logger.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
