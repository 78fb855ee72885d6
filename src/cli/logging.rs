//! Diagnostic logging setup
//!
//! Library code logs through `tracing`; the binary installs a stderr
//! subscriber so stdout stays clean for `--format json`.

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "confedit=debug"
    } else {
        "confedit=warn"
    }
}

/// Initialize logging for the confedit CLI
///
/// The level can be controlled via the RUST_LOG environment variable:
/// - RUST_LOG=debug confedit list  (everything)
/// - RUST_LOG=confedit=info confedit list
pub fn init(verbose: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time()
                .compact(),
        )
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_raises_level() {
        assert_eq!(default_filter(false), "confedit=warn");
        assert_eq!(default_filter(true), "confedit=debug");
    }
}
