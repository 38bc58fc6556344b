use kubestrap_saga::{CompensationStack, Criticality, Step, StepError};
use tracing::debug;

use super::KUBE_PACKAGES;
use crate::context::HostContext;
use crate::error::ResultExt;

/// Installs kubelet, kubeadm and kubectl, pinned when a version is configured.
pub struct InstallKubernetesPackages;

impl Step for InstallKubernetesPackages {
    type Context = HostContext;

    fn name(&self) -> &str {
        "install_kubernetes_packages"
    }

    fn execute(
        &self,
        ctx: &HostContext,
        compensations: &mut CompensationStack<HostContext>,
    ) -> Result<(), StepError> {
        let pm = ctx.package_manager();
        let version = ctx
            .cluster()
            .kubernetes_version
            .as_deref()
            .map(|v| v.trim_start_matches('v'));
        let specs: Vec<String> = KUBE_PACKAGES
            .iter()
            .map(|pkg| pm.pinned(pkg, version))
            .collect();
        let specs: Vec<&str> = specs.iter().map(String::as_str).collect();
        debug!(?specs, "installing kubernetes packages");

        pm.install(ctx.exec(), &specs)
            .step_context("failed to install kubernetes packages")?;
        compensations.push("uninstall kubernetes packages", |ctx: &HostContext| {
            ctx.package_manager()
                .remove(ctx.exec(), &KUBE_PACKAGES)
                .action_context("failed to uninstall kubernetes packages")
        });
        Ok(())
    }
}

/// Stops the package manager from upgrading the cluster binaries.
pub struct HoldKubernetesPackages;

impl Step for HoldKubernetesPackages {
    type Context = HostContext;

    fn name(&self) -> &str {
        "hold_kubernetes_packages"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Warning
    }

    fn execute(
        &self,
        ctx: &HostContext,
        compensations: &mut CompensationStack<HostContext>,
    ) -> Result<(), StepError> {
        ctx.package_manager()
            .hold(ctx.exec(), &KUBE_PACKAGES)
            .step_context("failed to hold kubernetes packages")?;
        compensations.push("release hold on kubernetes packages", |ctx: &HostContext| {
            ctx.package_manager()
                .unhold(ctx.exec(), &KUBE_PACKAGES)
                .action_context("failed to release package hold")
        });
        Ok(())
    }
}

pub struct EnableKubelet;

impl Step for EnableKubelet {
    type Context = HostContext;

    fn name(&self) -> &str {
        "enable_kubelet"
    }

    fn execute(
        &self,
        ctx: &HostContext,
        compensations: &mut CompensationStack<HostContext>,
    ) -> Result<(), StepError> {
        let systemd = ctx.systemd();
        systemd
            .daemon_reload()
            .step_context("failed to reload systemd units")?;
        systemd
            .enable_now("kubelet")
            .step_context("failed to enable kubelet")?;
        compensations.push("disable and stop kubelet", |ctx: &HostContext| {
            ctx.systemd()
                .disable_now("kubelet")
                .action_context("failed to disable kubelet")
        });
        Ok(())
    }
}
