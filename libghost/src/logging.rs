//! Append-only log sink for an injection run.
//!
//! A [`LogSink`] is opened once at process start and handed to whatever it
//! should cover through [`LogSink::scope`].  It is never installed as the
//! global default, so nothing outside the scoped future writes to it.  The
//! file is synced when the sink is dropped, on every exit path.

use std::fs::{File, OpenOptions};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use tracing::Dispatch;
use tracing::instrument::{WithDispatch, WithSubscriber};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Default log location, relative to the working directory.
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const LOG_FILE_NAME: &str = "ghostedme.log";

/// Record layout written to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// `<timestamp> <LEVEL> <span>: <message> <fields>`
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format {other:?}, expected text or json")),
        }
    }
}

/// File-backed `tracing` dispatcher.
pub struct LogSink {
    path: PathBuf,
    file: Arc<File>,
    dispatch: Dispatch,
}

impl LogSink {
    /// Open (creating if absent) the log file at `path` and its parent
    /// directory.
    ///
    /// `default_directive` is used unless `RUST_LOG` is set, e.g. `"debug"`.
    pub fn open(
        path: impl AsRef<Path>,
        format: LogFormat,
        default_directive: &str,
    ) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = Arc::new(OpenOptions::new().create(true).append(true).open(&path)?);

        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_directive))
            .unwrap_or_else(|_| EnvFilter::new("debug"));

        let dispatch = match format {
            LogFormat::Text => Dispatch::new(
                tracing_subscriber::registry().with(filter).with(
                    fmt::layer()
                        .with_writer(Arc::clone(&file))
                        .with_ansi(false)
                        .with_target(false),
                ),
            ),
            LogFormat::Json => Dispatch::new(
                tracing_subscriber::registry().with(filter).with(
                    fmt::layer()
                        .json()
                        .with_writer(Arc::clone(&file))
                        .with_target(false),
                ),
            ),
        };

        Ok(Self {
            path,
            file,
            dispatch,
        })
    }

    /// Where records are appended.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `fut` with this sink as its subscriber.
    pub fn scope<F: Future>(&self, fut: F) -> WithDispatch<F> {
        fut.with_subscriber(self.dispatch.clone())
    }
}

impl Drop for LogSink {
    fn drop(&mut self) {
        // Nothing left to report to if this fails.
        let _ = self.file.sync_all();
    }
}
