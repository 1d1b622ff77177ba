//! rkghost environment configuration.
//!
//! Environment variables:
//! - `RKGHOST_KUBECTL`: path or name of the cluster administrative tool.
//!   Defaults to `kubectl` (resolved through `PATH`).
//! - `RKGHOST_LOG_DIR`: directory holding `ghostedme.log`. Defaults to `logs`
//!   under the working directory. Created on first use.
//!
//! Command-line flags take precedence over both.

use std::path::PathBuf;
use std::sync::LazyLock;

use libghost::logging::{DEFAULT_LOG_DIR, LOG_FILE_NAME};

/// Environment defaults for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GhostConfig {
    /// Cluster administrative tool binary.
    pub kubectl: PathBuf,
    /// Directory holding the log file.
    pub log_dir: PathBuf,
}

impl GhostConfig {
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            kubectl: lookup("RKGHOST_KUBECTL")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("kubectl")),
            log_dir: lookup("RKGHOST_LOG_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
        }
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join(LOG_FILE_NAME)
    }
}

/// Globally initialized configuration, read from environment variables at first access.
pub static GHOST_CONFIG: LazyLock<GhostConfig> =
    LazyLock::new(|| GhostConfig::from_lookup(|key| std::env::var(key).ok()));

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_without_environment() {
        let cfg = GhostConfig::from_lookup(|_| None);
        assert_eq!(cfg.kubectl, PathBuf::from("kubectl"));
        assert_eq!(cfg.log_file(), PathBuf::from("logs/ghostedme.log"));
    }

    #[test]
    fn environment_overrides() {
        let env = HashMap::from([
            ("RKGHOST_KUBECTL", "/opt/bin/kubectl"),
            ("RKGHOST_LOG_DIR", "/var/log/rkghost"),
        ]);
        let cfg = GhostConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.kubectl, PathBuf::from("/opt/bin/kubectl"));
        assert_eq!(
            cfg.log_file(),
            PathBuf::from("/var/log/rkghost/ghostedme.log")
        );
    }

    #[test]
    fn empty_values_fall_back() {
        let cfg = GhostConfig::from_lookup(|_| Some(String::new()));
        assert_eq!(cfg, GhostConfig::from_lookup(|_| None));
    }
}
