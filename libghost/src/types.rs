//! Core data model: volumes, claims, and the list payloads they are decoded from.
//!
//! Nothing here is cached across operations.  A [`Volume`] or [`Claim`] is only
//! the identity of a remote object, threaded through a single injection run.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Volume identity
// ---------------------------------------------------------------------------

/// A cluster-scoped persistent volume, identified by name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Volume {
    pub name: String,
}

impl Volume {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for Volume {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// ---------------------------------------------------------------------------
// Claim identity
// ---------------------------------------------------------------------------

/// A namespaced persistent volume claim.
///
/// Claim names are only unique inside a namespace, so the `(name, namespace)`
/// pair is the identity key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Claim {
    pub name: String,
    pub namespace: String,
}

impl Claim {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

// ---------------------------------------------------------------------------
// Reclaim policy
// ---------------------------------------------------------------------------

/// What the cluster does with a volume once its claim is released.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ReclaimPolicy {
    #[default]
    Delete,
    /// Keep the volume and its data after release.  Detaching sets this.
    Retain,
}

// ---------------------------------------------------------------------------
// List payloads
// ---------------------------------------------------------------------------

/// The `{"items": [...]}` envelope returned by list queries.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectList {
    #[serde(default)]
    pub items: Vec<ObjectRecord>,
}

/// One record of a list payload.  Only its metadata is consumed.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectRecord {
    pub metadata: ObjectMeta,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

impl ObjectList {
    /// Decode the records as cluster-scoped volumes.
    pub fn into_volumes(self) -> Vec<Volume> {
        self.items
            .into_iter()
            .map(|item| Volume::new(item.metadata.name))
            .collect()
    }

    /// Decode the records as claims.  Returns the name of the first record
    /// that carries no namespace as the error.
    pub fn into_claims(self) -> Result<Vec<Claim>, String> {
        self.items
            .into_iter()
            .map(|item| match item.metadata.namespace {
                Some(ns) => Ok(Claim::new(item.metadata.name, ns)),
                None => Err(item.metadata.name),
            })
            .collect()
    }
}
