//! Fault injection error types.
//!
//! Every failure inside `libghost` is a [`GhostError`].  None of them are
//! fatal to a run: the lifecycle controller maps each one onto a terminal
//! state and reports it.

use thiserror::Error;

/// Unified error type for inventory and selection operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GhostError {
    /// Reading the inventory failed (tool error or malformed payload).
    #[error("failed to list {resource}: {reason}")]
    Query {
        /// Resource kind being listed, e.g. `"pv"`.
        resource: &'static str,
        reason: String,
    },

    /// A delete, detach, or attach call failed.
    #[error("failed to {action} {target}: {reason}")]
    Mutation {
        /// Verb of the failed mutation, e.g. `"detach"`.
        action: &'static str,
        /// Human-readable target, e.g. `"pv pv-a"`.
        target: String,
        reason: String,
    },

    /// There were no candidates to choose from.
    #[error("no {0} to choose from")]
    EmptySet(&'static str),

    /// No claim name contains the volume name.
    #[error("no claim matches volume {volume}")]
    NoMatch { volume: String },
}

impl GhostError {
    /// Create a [`GhostError::Query`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn query<E: std::fmt::Display>(resource: &'static str, e: E) -> Self {
        Self::Query {
            resource,
            reason: e.to_string(),
        }
    }

    /// Create a [`GhostError::Mutation`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn mutation<E: std::fmt::Display>(
        action: &'static str,
        target: impl Into<String>,
        e: E,
    ) -> Self {
        Self::Mutation {
            action,
            target: target.into(),
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = GhostError::mutation("detach", "pv pv-a", "exit status 1");
        assert_eq!(err.to_string(), "failed to detach pv pv-a: exit status 1");

        let err = GhostError::query("pvc", "connection refused");
        assert_eq!(err.to_string(), "failed to list pvc: connection refused");
    }

    #[test]
    fn no_match_names_volume() {
        let err = GhostError::NoMatch {
            volume: "pv-b".into(),
        };
        assert_eq!(err.to_string(), "no claim matches volume pv-b");
    }
}
