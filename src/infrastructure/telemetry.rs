use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber for logging.
///
/// Honors `RUST_LOG`; defaults to debug-level output for this crate.
pub fn init() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lexbill=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();
}
