use std::path::{Path, PathBuf};

use kubestrap_host::InitOptions;
use kubestrap_saga::{CompensationStack, Criticality, Step, StepError};
use tracing::info;

use super::{ROOT_KUBECONFIG, replace_file, restore_description, restore_file};
use crate::context::{ADMIN_KUBECONFIG, HostContext};
use crate::error::{OperationError, ResultExt};

/// `kubeadm init` with the configured networking and version.
pub struct KubeadmInit;

impl Step for KubeadmInit {
    type Context = HostContext;

    fn name(&self) -> &str {
        "kubeadm_init"
    }

    fn execute(
        &self,
        ctx: &HostContext,
        compensations: &mut CompensationStack<HostContext>,
    ) -> Result<(), StepError> {
        let cluster = ctx.cluster();
        let options = InitOptions {
            kubernetes_version: cluster.kubernetes_version.clone(),
            pod_network_cidr: Some(cluster.effective_pod_cidr().to_string()),
            service_cidr: cluster.service_cidr.clone(),
            control_plane_endpoint: cluster.control_plane_endpoint.clone(),
        };

        ctx.kubeadm()
            .init(&options)
            .step_context("kubeadm init failed")?;
        compensations.push("kubeadm reset -f", |ctx: &HostContext| {
            ctx.kubeadm()
                .reset()
                .action_context("kubeadm reset failed")
        });
        Ok(())
    }
}

/// Installs the admin kubeconfig for root.
pub struct ConfigureKubectl;

impl Step for ConfigureKubectl {
    type Context = HostContext;

    fn name(&self) -> &str {
        "configure_kubectl"
    }

    fn execute(
        &self,
        ctx: &HostContext,
        compensations: &mut CompensationStack<HostContext>,
    ) -> Result<(), StepError> {
        let admin = ctx
            .fs()
            .read(Path::new(ADMIN_KUBECONFIG))
            .step_context("failed to read admin kubeconfig")?
            .ok_or_else(|| {
                StepError::with_source(
                    "admin kubeconfig missing",
                    OperationError::MissingFile(PathBuf::from(ADMIN_KUBECONFIG)),
                )
            })?;

        let previous = replace_file(ctx, ROOT_KUBECONFIG, &admin)?;
        compensations.push(
            restore_description(ROOT_KUBECONFIG, previous.as_ref()),
            move |ctx: &HostContext| restore_file(ctx, ROOT_KUBECONFIG, previous.as_deref()),
        );
        Ok(())
    }
}

/// Applies the pod network add-on manifest.
pub struct InstallCni;

impl Step for InstallCni {
    type Context = HostContext;

    fn name(&self) -> &str {
        "install_cni"
    }

    fn execute(
        &self,
        ctx: &HostContext,
        compensations: &mut CompensationStack<HostContext>,
    ) -> Result<(), StepError> {
        let cni = ctx.cluster().cni;
        info!(%cni, "applying pod network add-on");
        ctx.kubectl()
            .apply(cni.manifest_url())
            .step_context(format!("failed to apply {cni} manifest"))?;
        compensations.push(format!("delete {cni} manifest"), move |ctx: &HostContext| {
            ctx.kubectl()
                .delete(cni.manifest_url())
                .action_context(format!("failed to delete {cni} manifest"))
        });
        Ok(())
    }
}

/// Lets ordinary workloads schedule on the control-plane node.
pub struct UntaintControlPlane;

impl Step for UntaintControlPlane {
    type Context = HostContext;

    fn name(&self) -> &str {
        "untaint_control_plane"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Warning
    }

    fn execute(
        &self,
        ctx: &HostContext,
        _compensations: &mut CompensationStack<HostContext>,
    ) -> Result<(), StepError> {
        ctx.kubectl()
            .untaint_control_plane()
            .step_context("failed to remove control-plane taint")
    }
}
