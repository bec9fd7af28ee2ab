//! Tracing subscriber setup for binaries and tests.

use tracing_error::ErrorLayer;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the default subscriber: env-filterable fmt output plus span
/// traces on errors.
///
/// Honors `RUST_LOG`; defaults to engine-level info otherwise. Safe to call
/// more than once (later calls are no-ops if a global subscriber exists).
pub fn init_tracing() {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn,cinelore=info"))
        .expect("static filter directive parses");

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .try_init();
}
