/*!
Logging and profiling setup for the command-line front end.

Log output always goes to stderr so stdout carries nothing but the JSON answer.
The filter comes from `RUST_LOG` and falls back to `info`.

There are two implementations:

- real: compiled only when `feature = "profiling"` is set. Adds a
  tracing-chrome layer writing a Chrome trace when a trace path is given.
- stub: compiled in all other configurations. Logging only; a requested trace
  path is reported and ignored.
*/

use std::path::Path;

/// Keeps the trace writer alive; the trace file is flushed when this is dropped
#[must_use = "dropping the guard stops and flushes the trace"]
pub struct LoggingGuard {
    #[cfg(feature = "profiling")]
    _flush: Option<tracing_chrome::FlushGuard>,
}

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

#[cfg(feature = "profiling")]
mod inner {
    use super::{LoggingGuard, env_filter};
    use std::path::Path;
    use tracing_chrome::ChromeLayerBuilder;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    pub fn setup_logging(trace: Option<&Path>) -> LoggingGuard {
        let (chrome_layer, flush) = match trace {
            Some(path) => {
                let (layer, guard) = ChromeLayerBuilder::new()
                    .file(path)
                    .include_args(true)
                    .build();
                (Some(layer), Some(guard))
            }
            None => (None, None),
        };

        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(env_filter());

        tracing_subscriber::registry()
            .with(chrome_layer)
            .with(fmt_layer)
            .init();

        match trace {
            Some(path) => tracing::info!("Writing Chrome trace to {}", path.display()),
            None => tracing::debug!("Logging initialized (no trace requested)"),
        }

        LoggingGuard { _flush: flush }
    }
}

#[cfg(not(feature = "profiling"))]
mod inner {
    use super::{LoggingGuard, env_filter};
    use std::path::Path;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    pub fn setup_logging(trace: Option<&Path>) -> LoggingGuard {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(env_filter());
        tracing_subscriber::registry().with(fmt_layer).init();

        if let Some(path) = trace {
            tracing::warn!(
                "Ignoring --trace {}: built without the profiling feature",
                path.display()
            );
        }

        LoggingGuard {}
    }
}

/// Install the global subscriber
///
/// # Arguments
/// * `trace` - Chrome trace output file, honoured in profiling builds
///
/// # Returns
/// A guard that must outlive every traced operation
pub fn setup_logging(trace: Option<&Path>) -> LoggingGuard {
    inner::setup_logging(trace)
}
