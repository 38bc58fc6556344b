use kubestrap_host::JoinOptions;
use kubestrap_saga::{CompensationStack, Step, StepError};
use tracing::info;

use crate::context::HostContext;
use crate::error::ResultExt;

/// `kubeadm join` against an existing control plane.
pub struct KubeadmJoin;

impl Step for KubeadmJoin {
    type Context = HostContext;

    fn name(&self) -> &str {
        "kubeadm_join"
    }

    fn execute(
        &self,
        ctx: &HostContext,
        compensations: &mut CompensationStack<HostContext>,
    ) -> Result<(), StepError> {
        let join = ctx
            .join()
            .ok_or_else(|| StepError::new("no join credentials configured"))?;
        let options = JoinOptions {
            api_server: join.api_server.clone(),
            token: join.token.clone(),
            discovery_token_ca_cert_hash: join.discovery_token_ca_cert_hash.clone(),
        };
        info!(api_server = %options.api_server, "joining cluster");

        ctx.kubeadm()
            .join(&options)
            .step_context("kubeadm join failed")?;
        compensations.push("kubeadm reset -f", |ctx: &HostContext| {
            ctx.kubeadm()
                .reset()
                .action_context("kubeadm reset failed")
        });
        Ok(())
    }
}
