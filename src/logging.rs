//! Log output setup.
//!
//! While the editor owns the terminal, progress messages would be drawn over
//! its screen, so a [`QuietGuard`] holds back everything but debug output.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static QUIET: AtomicBool = AtomicBool::new(false);

/// Install the global subscriber. Logs always go to stderr.
///
/// `RUST_LOG` takes precedence over the `debug` switch, and
/// `LOG_FORMAT=json` selects structured output.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(debug: bool) -> Result<()> {
    let default_filter = if debug { "discedit=debug" } else { "discedit=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    let quiet_filter = filter_fn(|meta| !is_quiet() || *meta.level() > Level::INFO);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_filter(quiet_filter),
            )
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_filter(quiet_filter),
            )
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

/// Whether non-debug log output is currently held back.
#[must_use]
pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Hold back non-debug log output until the returned guard is dropped.
#[must_use]
pub fn quiet() -> QuietGuard {
    QUIET.store(true, Ordering::Relaxed);
    QuietGuard { _private: () }
}

#[derive(Debug)]
pub struct QuietGuard {
    _private: (),
}

impl Drop for QuietGuard {
    fn drop(&mut self) {
        QUIET.store(false, Ordering::Relaxed);
    }
}
