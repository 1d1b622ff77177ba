//! One end-to-end fault injection cycle.
//!
//! [`LifecycleController::run`] lists volumes, picks a target, then takes one
//! of two paths:
//!
//! ```text
//! detach path (wait configured):
//!   detach ──ok──▶ sleep(wait) ─▶ list claims ─▶ choose claim ─▶ attach
//!     └─err─▶ DetachFailed          └─empty─▶ ReattachSkipped   ├─ok──▶ Reattached
//!                                                               └─err─▶ ReattachFailed
//! delete path (no wait):
//!   delete ──ok──▶ list claims ─▶ filter by name ─▶ choose ─▶ delete claim
//!     └─err─▶ DeleteFailed └─empty─▶ CleanupSkipped  └─none─▶ NoMatchingClaim
//!                                                           ├─ok──▶ ClaimDeleted
//!                                                           └─err─▶ ClaimDeleteFailed
//! ```
//!
//! Nothing is retried or rolled back.  A failed reattach leaves the volume
//! detached.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, instrument, warn};

use crate::error::GhostError;
use crate::inventory::ClusterClient;
use crate::selection::{RandomSource, SelectionPolicy};
use crate::types::{Claim, Volume};

// ---------------------------------------------------------------------------
// Outcome model
// ---------------------------------------------------------------------------

/// Which disruption was applied to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionPath {
    /// Detach, wait, reattach to a random claim.
    Detach { wait: Duration },
    /// Delete the volume, then delete its matching claim.
    Delete,
}

/// Remote operations and suspensions performed during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ListVolumes,
    DetachVolume,
    Wait,
    ListClaims,
    AttachVolume,
    DeleteVolume,
    DeleteClaim,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepResult {
    pub step: Step,
    pub ok: bool,
}

/// Where a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalState {
    /// No volumes were found, nothing was mutated.
    NoTargets,
    DetachFailed { volume: Volume },
    /// The volume was detached but there was no claim to reattach it to.
    ReattachSkipped { volume: Volume },
    Reattached { volume: Volume, claim: Claim },
    ReattachFailed { volume: Volume, claim: Claim },
    DeleteFailed { volume: Volume },
    /// The volume was deleted but no claims exist at all.
    CleanupSkipped { volume: Volume },
    /// The volume was deleted but no claim name contains its name.
    NoMatchingClaim { volume: Volume },
    ClaimDeleted { volume: Volume, claim: Claim },
    ClaimDeleteFailed { volume: Volume, claim: Claim },
}

impl TerminalState {
    /// Whether a remote mutation failed.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::DetachFailed { .. }
                | Self::ReattachFailed { .. }
                | Self::DeleteFailed { .. }
                | Self::ClaimDeleteFailed { .. }
        )
    }

    /// Human-readable report line.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TerminalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTargets => f.write_str("No persistent volumes found"),
            Self::DetachFailed { volume } => write!(f, "Failed to detach volume '{volume}'"),
            Self::ReattachSkipped { volume } => write!(
                f,
                "No persistent volume claims found, volume '{volume}' left detached"
            ),
            Self::Reattached { volume, claim } => write!(
                f,
                "Volume '{volume}' reattached to claim '{}' in namespace '{}' successfully",
                claim.name, claim.namespace
            ),
            Self::ReattachFailed { volume, .. } => {
                write!(f, "Failed to reattach volume '{volume}'")
            }
            Self::DeleteFailed { volume } => write!(f, "Failed to delete volume '{volume}'"),
            Self::CleanupSkipped { volume } => write!(
                f,
                "No persistent volume claims found to clean up after deleting volume '{volume}'"
            ),
            Self::NoMatchingClaim { volume } => write!(
                f,
                "No matching persistent volume claims found for volume '{volume}'"
            ),
            Self::ClaimDeleted { volume, claim } => write!(
                f,
                "Persistent volume '{volume}' and claim '{}' in namespace '{}' deleted successfully",
                claim.name, claim.namespace
            ),
            Self::ClaimDeleteFailed { claim, .. } => write!(
                f,
                "Failed to delete persistent volume claim '{}' in namespace '{}'",
                claim.name, claim.namespace
            ),
        }
    }
}

/// Result of one full run.  Lives only for the duration of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionOutcome {
    /// `None` only when no target could be chosen.
    pub target: Option<Volume>,
    pub path: Option<InjectionPath>,
    pub state: TerminalState,
    /// Every step attempted, in order.
    pub steps: Vec<StepResult>,
}

impl InjectionOutcome {
    /// Whether a mutation failed or an inventory query could not be read.
    pub fn is_failure(&self) -> bool {
        self.state.is_failure() || self.steps.iter().any(|s| !s.ok)
    }

    /// Report line for the run.  A failed inventory query is named instead
    /// of being reported as an empty cluster.
    pub fn message(&self) -> String {
        if self.step(Step::ListVolumes) == Some(false) {
            return "Failed to list persistent volumes, no volume was disrupted".to_owned();
        }
        match (&self.state, self.step(Step::ListClaims)) {
            (TerminalState::ReattachSkipped { volume }, Some(false)) => format!(
                "Failed to list persistent volume claims, volume '{volume}' left detached"
            ),
            (TerminalState::CleanupSkipped { volume }, Some(false)) => format!(
                "Failed to list persistent volume claims after deleting volume '{volume}'"
            ),
            (state, _) => state.message(),
        }
    }

    /// Result of the first attempt of `step`, or `None` if it never ran.
    pub fn step(&self, step: Step) -> Option<bool> {
        self.steps.iter().find(|s| s.step == step).map(|s| s.ok)
    }

    pub fn attempted(&self, step: Step) -> bool {
        self.step(step).is_some()
    }
}

/// Notices emitted while the detach path is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Detached { volume: Volume, wait: Duration },
    WaitElapsed { volume: Volume },
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detached { volume, wait } => write!(
                f,
                "Detached volume '{volume}', waiting {} seconds...",
                wait.as_secs()
            ),
            Self::WaitElapsed { .. } => f.write_str("Time's up! Reattaching volume..."),
        }
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

type ProgressObserver = Box<dyn FnMut(&Progress) + Send>;

/// Drives a single fault injection cycle against a [`ClusterClient`].
///
/// `run` consumes the controller, so one instance performs exactly one
/// cycle.
pub struct LifecycleController<R> {
    client: Arc<dyn ClusterClient>,
    policy: SelectionPolicy<R>,
    /// Presence selects the detach path.
    wait: Option<Duration>,
    observer: Option<ProgressObserver>,
    steps: Vec<StepResult>,
}

impl<R: RandomSource> LifecycleController<R> {
    pub fn new(
        client: Arc<dyn ClusterClient>,
        policy: SelectionPolicy<R>,
        wait: Option<Duration>,
    ) -> Self {
        Self {
            client,
            policy,
            wait,
            observer: None,
            steps: Vec::new(),
        }
    }

    pub fn on_progress(mut self, observer: impl FnMut(&Progress) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Run one cycle to a terminal state.  Never fails: every error ends in
    /// a reported terminal state.
    #[instrument(name = "fault_injection", skip_all)]
    pub async fn run(mut self) -> InjectionOutcome {
        let volumes = match self.client.list_volumes().await {
            Ok(volumes) => {
                self.record(Step::ListVolumes, true);
                volumes
            }
            Err(e) => {
                self.record(Step::ListVolumes, false);
                error!(error = %e, "volume inventory unavailable");
                Vec::new()
            }
        };

        let target = match self.policy.choose_volume(&volumes) {
            Ok(target) => target,
            Err(e) => {
                info!(reason = %e, "no fault injection target");
                return self.finish(None, None, TerminalState::NoTargets);
            }
        };
        info!(volume = %target, candidates = volumes.len(), "target volume chosen");

        let wait = self.wait;
        let (path, state) = match wait {
            Some(wait) => (
                InjectionPath::Detach { wait },
                self.detach_path(&target, wait).await,
            ),
            None => (InjectionPath::Delete, self.delete_path(&target).await),
        };
        self.finish(Some(target), Some(path), state)
    }

    async fn detach_path(&mut self, volume: &Volume, wait: Duration) -> TerminalState {
        let detached = self.client.detach_volume(volume).await;
        self.record(Step::DetachVolume, detached.is_ok());
        if let Err(e) = detached {
            error!(%volume, error = %e, "detach failed, skipping wait and reattach");
            return TerminalState::DetachFailed {
                volume: volume.clone(),
            };
        }

        self.notify(Progress::Detached {
            volume: volume.clone(),
            wait,
        });
        info!(%volume, wait_secs = wait.as_secs(), "volume detached, waiting");
        tokio::time::sleep(wait).await;
        self.record(Step::Wait, true);
        self.notify(Progress::WaitElapsed {
            volume: volume.clone(),
        });

        let claims = self.list_claims().await;
        let claim = match self.policy.choose_claim(&claims) {
            Ok(claim) => claim,
            Err(e) => {
                warn!(%volume, reason = %e, "volume left detached");
                return TerminalState::ReattachSkipped {
                    volume: volume.clone(),
                };
            }
        };

        let attached = self.client.attach_volume(volume, &claim).await;
        self.record(Step::AttachVolume, attached.is_ok());
        match attached {
            Ok(()) => TerminalState::Reattached {
                volume: volume.clone(),
                claim,
            },
            Err(e) => {
                error!(%volume, %claim, error = %e, "reattach failed, volume left detached");
                TerminalState::ReattachFailed {
                    volume: volume.clone(),
                    claim,
                }
            }
        }
    }

    async fn delete_path(&mut self, volume: &Volume) -> TerminalState {
        let deleted = self.client.delete_volume(volume).await;
        self.record(Step::DeleteVolume, deleted.is_ok());
        if let Err(e) = deleted {
            error!(%volume, error = %e, "delete failed, skipping claim cleanup");
            return TerminalState::DeleteFailed {
                volume: volume.clone(),
            };
        }

        let claims = self.list_claims().await;
        if claims.is_empty() {
            return TerminalState::CleanupSkipped {
                volume: volume.clone(),
            };
        }

        let claim = match self.policy.choose_matching_claim(&claims, &volume.name) {
            Ok(claim) => claim,
            Err(GhostError::NoMatch { .. }) => {
                info!(%volume, "no claim name matches deleted volume");
                return TerminalState::NoMatchingClaim {
                    volume: volume.clone(),
                };
            }
            Err(e) => {
                warn!(%volume, reason = %e, "claim cleanup skipped");
                return TerminalState::CleanupSkipped {
                    volume: volume.clone(),
                };
            }
        };

        let cleaned = self.client.delete_claim(&claim).await;
        self.record(Step::DeleteClaim, cleaned.is_ok());
        match cleaned {
            Ok(()) => TerminalState::ClaimDeleted {
                volume: volume.clone(),
                claim,
            },
            Err(e) => {
                error!(%volume, %claim, error = %e, "claim cleanup failed");
                TerminalState::ClaimDeleteFailed {
                    volume: volume.clone(),
                    claim,
                }
            }
        }
    }

    /// List claims, treating a query failure as an empty inventory.
    async fn list_claims(&mut self) -> Vec<Claim> {
        match self.client.list_claims().await {
            Ok(claims) => {
                self.record(Step::ListClaims, true);
                claims
            }
            Err(e) => {
                self.record(Step::ListClaims, false);
                error!(error = %e, "claim inventory unavailable");
                Vec::new()
            }
        }
    }

    fn record(&mut self, step: Step, ok: bool) {
        self.steps.push(StepResult { step, ok });
    }

    fn notify(&mut self, progress: Progress) {
        if let Some(observer) = self.observer.as_mut() {
            observer(&progress);
        }
    }

    fn finish(
        self,
        target: Option<Volume>,
        path: Option<InjectionPath>,
        state: TerminalState,
    ) -> InjectionOutcome {
        let outcome = InjectionOutcome {
            target,
            path,
            state,
            steps: self.steps,
        };
        if outcome.is_failure() {
            warn!(outcome = %outcome.message(), "fault injection ended in failure");
        } else {
            info!(outcome = %outcome.message(), "fault injection finished");
        }
        outcome
    }
}
