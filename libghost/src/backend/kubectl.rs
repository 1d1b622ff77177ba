//! `kubectl` subprocess backend.
//!
//! [`KubectlClient`] implements [`ClusterClient`] by invoking the cluster's
//! administrative tool once per operation and parsing its JSON output.
//!
//! # Invocations
//!
//! ```text
//! kubectl get pv --output json
//! kubectl get pvc --all-namespaces --output json
//! kubectl delete pv <name>
//! kubectl delete pvc <name> -n <namespace>
//! kubectl patch pv <name> -p {"spec":{"persistentVolumeReclaimPolicy":"Retain","claimRef":null}}
//! kubectl patch pv <name> -p {"spec":{"claimRef":{"name":<claim>,"namespace":<namespace>}}}
//! ```

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::json;
use tokio::process::Command;
use tracing::{debug, error, info, instrument};

use crate::error::GhostError;
use crate::inventory::ClusterClient;
use crate::types::{Claim, ObjectList, Volume};

/// Concrete [`ClusterClient`] that shells out to `kubectl`.
#[derive(Debug, Clone)]
pub struct KubectlClient {
    /// Path or name of the tool binary.
    program: PathBuf,
    /// Forwarded as `--kubeconfig` when set.
    kubeconfig: Option<PathBuf>,
    /// Forwarded as `--context` when set.
    context: Option<String>,
}

impl Default for KubectlClient {
    fn default() -> Self {
        Self::new("kubectl")
    }
}

impl KubectlClient {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            kubeconfig: None,
            context: None,
        }
    }

    pub fn kubeconfig(mut self, kubeconfig: Option<PathBuf>) -> Self {
        self.kubeconfig = kubeconfig;
        self
    }

    pub fn context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(kubeconfig) = &self.kubeconfig {
            cmd.arg("--kubeconfig").arg(kubeconfig);
        }
        if let Some(context) = &self.context {
            cmd.arg("--context").arg(context);
        }
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Run the tool to completion and return its stdout.
    ///
    /// A spawn error or any non-zero exit status is an error carrying the
    /// captured stderr.
    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, String> {
        debug!(program = %self.program.display(), ?args, "invoking cluster tool");

        let output = self
            .command(args)
            .output()
            .await
            .map_err(|e| format!("spawn {}: {e}", self.program.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("{} ({})", stderr.trim(), output.status));
        }
        Ok(output.stdout)
    }

    async fn list(&self, resource: &'static str, extra: &[&str]) -> Result<ObjectList, GhostError> {
        let mut args = vec!["get", resource];
        args.extend_from_slice(extra);
        args.extend(["--output", "json"]);

        let stdout = self
            .run(&args)
            .await
            .map_err(|e| GhostError::query(resource, e))?;

        serde_json::from_slice(&stdout)
            .map_err(|e| GhostError::query(resource, format!("malformed response: {e}")))
    }

    async fn patch_volume(
        &self,
        action: &'static str,
        volume: &Volume,
        body: serde_json::Value,
    ) -> Result<(), GhostError> {
        let body = body.to_string();
        self.run(&["patch", "pv", &volume.name, "-p", &body])
            .await
            .map(drop)
            .map_err(|e| GhostError::mutation(action, format!("pv {volume}"), e))
    }
}

// ---------------------------------------------------------------------------
// ClusterClient
// ---------------------------------------------------------------------------

#[async_trait]
impl ClusterClient for KubectlClient {
    #[instrument(skip(self))]
    async fn list_volumes(&self) -> Result<Vec<Volume>, GhostError> {
        let volumes = self
            .list("pv", &[])
            .await
            .inspect_err(|e| error!(error = %e, "error retrieving persistent volumes"))?
            .into_volumes();
        debug!(count = volumes.len(), "persistent volumes listed");
        Ok(volumes)
    }

    #[instrument(skip(self))]
    async fn list_claims(&self) -> Result<Vec<Claim>, GhostError> {
        let claims = self
            .list("pvc", &["--all-namespaces"])
            .await
            .and_then(|list| {
                list.into_claims().map_err(|name| {
                    GhostError::query(
                        "pvc",
                        format!("malformed response: claim {name} has no namespace"),
                    )
                })
            })
            .inspect_err(|e| error!(error = %e, "error retrieving persistent volume claims"))?;
        debug!(count = claims.len(), "persistent volume claims listed");
        Ok(claims)
    }

    #[instrument(skip_all, fields(volume = %volume))]
    async fn delete_volume(&self, volume: &Volume) -> Result<(), GhostError> {
        self.run(&["delete", "pv", &volume.name])
            .await
            .map_err(|e| GhostError::mutation("delete", format!("pv {volume}"), e))
            .inspect_err(|e| error!(error = %e, "error deleting persistent volume"))?;
        info!("persistent volume '{volume}' deleted successfully");
        Ok(())
    }

    #[instrument(skip_all, fields(volume = %volume))]
    async fn detach_volume(&self, volume: &Volume) -> Result<(), GhostError> {
        let body = json!({
            "spec": {
                "persistentVolumeReclaimPolicy": "Retain",
                "claimRef": null,
            }
        });
        self.patch_volume("detach", volume, body)
            .await
            .inspect_err(|e| error!(error = %e, "error detaching persistent volume"))?;
        info!("persistent volume '{volume}' detached successfully");
        Ok(())
    }

    #[instrument(skip_all, fields(volume = %volume, claim = %claim.name, namespace = %claim.namespace))]
    async fn attach_volume(&self, volume: &Volume, claim: &Claim) -> Result<(), GhostError> {
        let body = json!({
            "spec": {
                "claimRef": {
                    "name": claim.name,
                    "namespace": claim.namespace,
                }
            }
        });
        self.patch_volume("attach", volume, body)
            .await
            .inspect_err(|e| error!(error = %e, "error attaching persistent volume"))?;
        info!(
            "persistent volume '{volume}' attached to claim '{}' in namespace '{}' successfully",
            claim.name, claim.namespace,
        );
        Ok(())
    }

    #[instrument(skip_all, fields(claim = %claim.name, namespace = %claim.namespace))]
    async fn delete_claim(&self, claim: &Claim) -> Result<(), GhostError> {
        self.run(&["delete", "pvc", &claim.name, "-n", &claim.namespace])
            .await
            .map_err(|e| GhostError::mutation("delete", format!("pvc {claim}"), e))
            .inspect_err(|e| error!(error = %e, "error deleting persistent volume claim"))?;
        info!(
            "persistent volume claim '{}' in namespace '{}' deleted successfully",
            claim.name, claim.namespace,
        );
        Ok(())
    }
}
