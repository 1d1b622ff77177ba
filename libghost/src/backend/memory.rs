//! In-memory cluster backend.
//!
//! [`MemoryCluster`] implements [`ClusterClient`] over a local model of
//! volumes and claims.  Every call is appended to a call log, and any
//! [`Operation`] can be made to fail, so injection runs can be asserted on
//! without a real control plane.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use crate::error::GhostError;
use crate::inventory::ClusterClient;
use crate::types::{Claim, ReclaimPolicy, Volume};

/// The kinds of remote call a [`ClusterClient`] can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListVolumes,
    ListClaims,
    DeleteVolume,
    DetachVolume,
    AttachVolume,
    DeleteClaim,
}

/// Modelled remote state of one volume.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeRecord {
    pub reclaim_policy: ReclaimPolicy,
    pub claim_ref: Option<Claim>,
}

#[derive(Debug, Default)]
struct State {
    volumes: BTreeMap<Volume, VolumeRecord>,
    claims: Vec<Claim>,
    failing: HashSet<Operation>,
    calls: Vec<Operation>,
}

/// Fake cluster holding volumes and claims in memory.
#[derive(Debug, Default)]
pub struct MemoryCluster {
    state: Mutex<State>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an unbound volume with the default reclaim policy.
    pub fn with_volume(self, name: &str) -> Self {
        self.lock()
            .volumes
            .insert(Volume::new(name), VolumeRecord::default());
        self
    }

    /// Add a volume bound to `claim`.
    pub fn with_bound_volume(self, name: &str, claim: Claim) -> Self {
        self.lock().volumes.insert(
            Volume::new(name),
            VolumeRecord {
                claim_ref: Some(claim),
                ..Default::default()
            },
        );
        self
    }

    pub fn with_claim(self, name: &str, namespace: &str) -> Self {
        self.lock().claims.push(Claim::new(name, namespace));
        self
    }

    /// Make every future call of `op` fail.
    pub fn failing(self, op: Operation) -> Self {
        self.lock().failing.insert(op);
        self
    }

    /// Operations received so far, in call order.
    pub fn calls(&self) -> Vec<Operation> {
        self.lock().calls.clone()
    }

    pub fn volume(&self, name: &str) -> Option<VolumeRecord> {
        self.lock().volumes.get(&Volume::new(name)).cloned()
    }

    pub fn claims(&self) -> Vec<Claim> {
        self.lock().claims.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the call and report whether it was configured to fail.
    fn record(&self, op: Operation) -> (MutexGuard<'_, State>, bool) {
        let mut state = self.lock();
        state.calls.push(op);
        let fail = state.failing.contains(&op);
        debug!(?op, fail, "memory cluster call");
        (state, fail)
    }
}

// ---------------------------------------------------------------------------
// ClusterClient
// ---------------------------------------------------------------------------

#[async_trait]
impl ClusterClient for MemoryCluster {
    async fn list_volumes(&self) -> Result<Vec<Volume>, GhostError> {
        let (state, fail) = self.record(Operation::ListVolumes);
        if fail {
            return Err(GhostError::query("pv", "injected failure"));
        }
        Ok(state.volumes.keys().cloned().collect())
    }

    async fn list_claims(&self) -> Result<Vec<Claim>, GhostError> {
        let (state, fail) = self.record(Operation::ListClaims);
        if fail {
            return Err(GhostError::query("pvc", "injected failure"));
        }
        Ok(state.claims.clone())
    }

    async fn delete_volume(&self, volume: &Volume) -> Result<(), GhostError> {
        let (mut state, fail) = self.record(Operation::DeleteVolume);
        let target = format!("pv {volume}");
        if fail {
            return Err(GhostError::mutation("delete", target, "injected failure"));
        }
        state
            .volumes
            .remove(volume)
            .map(drop)
            .ok_or_else(|| GhostError::mutation("delete", target, "not found"))
    }

    async fn detach_volume(&self, volume: &Volume) -> Result<(), GhostError> {
        let (mut state, fail) = self.record(Operation::DetachVolume);
        let target = format!("pv {volume}");
        if fail {
            return Err(GhostError::mutation("detach", target, "injected failure"));
        }
        let record = state
            .volumes
            .get_mut(volume)
            .ok_or_else(|| GhostError::mutation("detach", target, "not found"))?;
        record.reclaim_policy = ReclaimPolicy::Retain;
        record.claim_ref = None;
        Ok(())
    }

    async fn attach_volume(&self, volume: &Volume, claim: &Claim) -> Result<(), GhostError> {
        let (mut state, fail) = self.record(Operation::AttachVolume);
        let target = format!("pv {volume}");
        if fail {
            return Err(GhostError::mutation("attach", target, "injected failure"));
        }
        let record = state
            .volumes
            .get_mut(volume)
            .ok_or_else(|| GhostError::mutation("attach", target, "not found"))?;
        record.claim_ref = Some(claim.clone());
        Ok(())
    }

    async fn delete_claim(&self, claim: &Claim) -> Result<(), GhostError> {
        let (mut state, fail) = self.record(Operation::DeleteClaim);
        let target = format!("pvc {claim}");
        if fail {
            return Err(GhostError::mutation("delete", target, "injected failure"));
        }
        let before = state.claims.len();
        state.claims.retain(|c| c != claim);
        if state.claims.len() == before {
            return Err(GhostError::mutation("delete", target, "not found"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn detach_retains_and_clears_binding() {
        let cluster = MemoryCluster::new().with_bound_volume("pv-a", Claim::new("data", "ns1"));

        cluster.detach_volume(&Volume::new("pv-a")).await.unwrap();

        let record = cluster.volume("pv-a").unwrap();
        assert_eq!(record.reclaim_policy, ReclaimPolicy::Retain);
        assert_eq!(record.claim_ref, None);
    }

    #[tokio::test]
    async fn attach_sets_binding() {
        let cluster = MemoryCluster::new().with_volume("pv-a");
        let claim = Claim::new("other", "ns2");

        cluster
            .attach_volume(&Volume::new("pv-a"), &claim)
            .await
            .unwrap();
        assert_eq!(cluster.volume("pv-a").unwrap().claim_ref, Some(claim));
    }

    #[tokio::test]
    async fn delete_missing_volume_fails() {
        let cluster = MemoryCluster::new();
        let err = cluster.delete_volume(&Volume::new("pv-a")).await.unwrap_err();
        assert!(matches!(err, GhostError::Mutation { action: "delete", .. }));
    }

    #[tokio::test]
    async fn delete_claim_is_namespace_scoped() {
        let cluster = MemoryCluster::new()
            .with_claim("data", "ns1")
            .with_claim("data", "ns2");

        cluster.delete_claim(&Claim::new("data", "ns2")).await.unwrap();
        assert_eq!(cluster.claims(), vec![Claim::new("data", "ns1")]);
    }

    #[tokio::test]
    async fn injected_failures_are_recorded() {
        let cluster = MemoryCluster::new()
            .with_volume("pv-a")
            .failing(Operation::ListVolumes);

        assert!(cluster.list_volumes().await.is_err());
        assert!(cluster.list_claims().await.unwrap().is_empty());
        assert_eq!(
            cluster.calls(),
            vec![Operation::ListVolumes, Operation::ListClaims]
        );
    }
}
