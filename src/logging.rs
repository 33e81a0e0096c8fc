//! Console and per-run log output.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context as _;
use chrono::{Local, SecondsFormat};
use tracing::{Event, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, fmt};

use crate::foundation::error::DailiesResult;

const DEFAULT_CONSOLE_FILTER: &str = "info";

fn console_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_CONSOLE_FILTER))
}

/// Install the process-wide stderr subscriber. `RUST_LOG` overrides the default `info` level.
///
/// Calling this more than once is harmless.
pub fn init_console() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(console_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Log output for one sequence run: console plus a `<movie>.log` file beside the movie.
///
/// The file is truncated when the run starts. Events are routed to it only inside
/// [`RunLog::in_scope`].
pub struct RunLog {
    dispatch: tracing::Dispatch,
    path: PathBuf,
}

impl RunLog {
    pub fn create(path: &Path, verbose: bool) -> DailiesResult<Self> {
        let file = File::create(path)
            .with_context(|| format!("failed to create log file '{}'", path.display()))?;
        let file_level = if verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        };

        let subscriber = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_filter(console_filter()),
            )
            .with(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .event_format(RunLogFormat)
                    .with_filter(file_level),
            );

        Ok(Self {
            dispatch: tracing::Dispatch::new(subscriber),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` with this log as the current thread's subscriber.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}

/// Run log line: `LEVEL <rfc3339 timestamp> message fields`.
struct RunLogFormat;

impl<S, N> FormatEvent<S, N> for RunLogFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        write!(
            writer,
            "{:<5} {} ",
            event.metadata().level(),
            Local::now().to_rfc3339_opts(SecondsFormat::Millis, false)
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[cfg(test)]
#[path = "../tests/unit/logging.rs"]
mod tests;
