//! Tracing subscriber setup for binaries and tools embedding the caches.

use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

const DEFAULT_DIRECTIVES: &str = "info";

fn filter_from(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|value| !value.trim().is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Install a compact stderr subscriber. `RUST_LOG` is honoured; when it is
/// unset or invalid the level is INFO. Calling this more than once is a no-op.
pub fn install_tracing() {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = filter_from(directives.as_deref());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
