use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use libghost::LogFormat;

/// Randomly delete attached volumes and storage resources in a Kubernetes cluster.
///
/// Without `--timetoghost` a random persistent volume is deleted together
/// with a claim whose name contains the volume name. With it, the volume is
/// detached, left alone for the given number of seconds, then reattached to
/// a random claim.
#[derive(Debug, Parser)]
#[command(name = "rkghost", version)]
pub struct Cli {
    /// Detached volume time in seconds
    #[arg(long = "timetoghost", visible_alias = "wait", value_name = "SECONDS")]
    pub time_to_ghost: Option<u64>,

    /// Seed for target selection, for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Cluster administrative tool [default: $RKGHOST_KUBECTL or kubectl]
    #[arg(long, value_name = "PATH")]
    pub kubectl: Option<PathBuf>,

    /// Kubeconfig forwarded to every tool invocation
    #[arg(long, value_name = "PATH")]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context forwarded to every tool invocation
    #[arg(long)]
    pub context: Option<String>,

    /// Log file [default: $RKGHOST_LOG_DIR/ghostedme.log or logs/ghostedme.log]
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Log record format: text or json
    #[arg(long, default_value = "text")]
    pub log_format: LogFormat,

    /// Exit with status 1 when a disruption or recovery step fails
    #[arg(long)]
    pub fail_on_error: bool,
}

impl Cli {
    /// Wait between detach and reattach; `None` selects the delete path.
    pub fn wait(&self) -> Option<Duration> {
        self.time_to_ghost.map(Duration::from_secs)
    }
}
