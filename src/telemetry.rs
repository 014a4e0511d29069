//! Tracing initialisation for the forkfleet binary.
//!
//! Two sinks: a console layer on stderr (so it never interleaves with the
//! progress UI on stdout) and a daily-rotated run log under
//! `.forkfleet/logs/`. `RUST_LOG` overrides both default levels.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

pub const LOG_FILE_PREFIX: &str = "forkfleet.log";

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Console default: `warn`, or `debug` with `--verbose`.
pub fn console_level(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "warn" }
}

/// Run-log default: `info`, or `debug` with `--verbose`.
pub fn file_level(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

/// Install the global subscriber.
///
/// Returns the appender guard when a run log was opened; hold it until the
/// process exits or buffered lines are lost. Only the first call in a process
/// takes effect.
pub fn init_tracing(verbose: bool, json: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    let console_filter = env_filter(console_level(verbose));
    if json {
        layers.push(
            fmt::layer()
                .json()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(console_filter)
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(console_filter)
                .boxed(),
        );
    }

    let mut guard = None;
    if let Some(dir) = log_dir {
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_FILE_PREFIX)
            .build(dir);
        match appender {
            Ok(appender) => {
                let (writer, worker) = tracing_appender::non_blocking(appender);
                layers.push(
                    fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer)
                        .with_filter(env_filter(file_level(verbose)))
                        .boxed(),
                );
                guard = Some(worker);
            }
            Err(e) => eprintln!("warning: run log disabled: {}", e),
        }
    }

    tracing_subscriber::registry().with(layers).try_init().ok();
    guard
}
