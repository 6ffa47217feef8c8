//! Process-wide tracing setup.

/// Install the fmt subscriber with an env filter.
///
/// Honors `RUST_LOG`; defaults to `info`. Call once at startup.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();
}
