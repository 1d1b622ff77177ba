//! Cluster inventory capability.
//!
//! The fault injector reads and mutates remote volume and claim state only
//! through [`ClusterClient`].  Implementations hold no state between calls
//! and never retry: one remote failure is one [`GhostError`].

use async_trait::async_trait;

use crate::error::GhostError;
use crate::types::{Claim, Volume};

/// Remote volume/claim management, as seen by the fault injector.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Enumerate all volumes cluster-wide.
    async fn list_volumes(&self) -> Result<Vec<Volume>, GhostError>;

    /// Enumerate all claims across all namespaces.
    async fn list_claims(&self) -> Result<Vec<Claim>, GhostError>;

    /// Delete a volume.
    async fn delete_volume(&self, volume: &Volume) -> Result<(), GhostError>;

    /// Set the volume's reclaim policy to `Retain` and clear its claim
    /// binding, so it can be rebound without being reclaimed.
    async fn detach_volume(&self, volume: &Volume) -> Result<(), GhostError>;

    /// Point the volume's claim reference at `claim`.
    async fn attach_volume(&self, volume: &Volume, claim: &Claim) -> Result<(), GhostError>;

    /// Delete a claim.
    async fn delete_claim(&self, claim: &Claim) -> Result<(), GhostError>;
}
