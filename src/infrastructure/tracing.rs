use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Output destination for tracing
pub enum TracingOutput {
    /// Output to stderr (interactive debugging with --verbose)
    Stderr,
    /// Output to a log file (default, keeps the menu readable)
    File(PathBuf),
}

/// Initialize tracing based on configuration
/// Priority: SITEKEEP_LOG env > verbose flag > default (info)
pub fn init_tracing(verbose: bool, output: TracingOutput) {
    let filter = EnvFilter::try_from_env("SITEKEEP_LOG").unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("sitekeep={}", level))
    });

    match output {
        TracingOutput::Stderr => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                .init();
        }
        TracingOutput::File(path) => {
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }

            // An unwritable log file must not stop the tool; fall back to stderr.
            match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(
                            fmt::layer()
                                .with_target(false)
                                .with_ansi(false)
                                .with_writer(Mutex::new(file)),
                        )
                        .init();
                }
                Err(e) => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                        .init();
                    tracing::warn!(path = %path.display(), error = %e, "Cannot open log file");
                }
            }
        }
    }
}
