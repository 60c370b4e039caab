use std::fmt::Display;
use std::time::Instant;

use console::Style;

const ANSI_BLUE: Style = Style::new().blue();

pub(crate) fn as_overhead(s: Instant) -> impl Display {
    let e = Instant::now();
    let f = format!("(+{}ms)", e.duration_since(s).as_millis());
    ANSI_BLUE.apply_to(f)
}

/// Install a process-wide tracing subscriber reading the `RUST_LOG`
/// environment variable, falling back to `info`. Fails if a subscriber is
/// already set.
#[cfg(feature = "logging")]
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, fmt, registry};

    registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()?;

    Ok(())
}
