//! Teardown steps. All of them are warnings: a reset keeps going past
//! whatever is already gone, and registers nothing to undo.

use std::path::Path;

use kubestrap_saga::{CompensationStack, Criticality, Step, StepError};

use super::{CNI_CONFIG_DIR, KUBE_PACKAGES, MODULES_CONF, ROOT_KUBECONFIG, SYSCTL_CONF};
use crate::context::HostContext;
use crate::error::ResultExt;

const IPTABLES_FLUSH: [&[&str]; 4] = [
    &["-F"],
    &["-t", "nat", "-F"],
    &["-t", "mangle", "-F"],
    &["-X"],
];

pub struct KubeadmReset;

impl Step for KubeadmReset {
    type Context = HostContext;

    fn name(&self) -> &str {
        "kubeadm_reset"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Warning
    }

    fn execute(
        &self,
        ctx: &HostContext,
        _compensations: &mut CompensationStack<HostContext>,
    ) -> Result<(), StepError> {
        ctx.kubeadm().reset().step_context("kubeadm reset failed")
    }
}

pub struct StopKubelet;

impl Step for StopKubelet {
    type Context = HostContext;

    fn name(&self) -> &str {
        "stop_kubelet"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Warning
    }

    fn execute(
        &self,
        ctx: &HostContext,
        _compensations: &mut CompensationStack<HostContext>,
    ) -> Result<(), StepError> {
        ctx.systemd()
            .stop("kubelet")
            .step_context("failed to stop kubelet")
    }
}

pub struct RemoveCniConfig;

impl Step for RemoveCniConfig {
    type Context = HostContext;

    fn name(&self) -> &str {
        "remove_cni_config"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Warning
    }

    fn execute(
        &self,
        ctx: &HostContext,
        _compensations: &mut CompensationStack<HostContext>,
    ) -> Result<(), StepError> {
        ctx.fs()
            .remove(Path::new(CNI_CONFIG_DIR))
            .step_context("failed to remove CNI configuration")
    }
}

pub struct FlushIptables;

impl Step for FlushIptables {
    type Context = HostContext;

    fn name(&self) -> &str {
        "flush_iptables"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Warning
    }

    fn execute(
        &self,
        ctx: &HostContext,
        _compensations: &mut CompensationStack<HostContext>,
    ) -> Result<(), StepError> {
        for args in IPTABLES_FLUSH {
            ctx.exec()
                .run_checked("iptables", args)
                .step_context("failed to flush iptables rules")?;
        }
        Ok(())
    }
}

pub struct RemoveKubeconfig;

impl Step for RemoveKubeconfig {
    type Context = HostContext;

    fn name(&self) -> &str {
        "remove_kubeconfig"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Warning
    }

    fn execute(
        &self,
        ctx: &HostContext,
        _compensations: &mut CompensationStack<HostContext>,
    ) -> Result<(), StepError> {
        ctx.fs()
            .remove(Path::new(ROOT_KUBECONFIG))
            .step_context("failed to remove kubeconfig")
    }
}

pub struct UnholdKubernetesPackages;

impl Step for UnholdKubernetesPackages {
    type Context = HostContext;

    fn name(&self) -> &str {
        "unhold_kubernetes_packages"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Warning
    }

    fn execute(
        &self,
        ctx: &HostContext,
        _compensations: &mut CompensationStack<HostContext>,
    ) -> Result<(), StepError> {
        ctx.package_manager()
            .unhold(ctx.exec(), &KUBE_PACKAGES)
            .step_context("failed to release package hold")
    }
}

pub struct PurgeKubernetesPackages;

impl Step for PurgeKubernetesPackages {
    type Context = HostContext;

    fn name(&self) -> &str {
        "purge_kubernetes_packages"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Warning
    }

    fn execute(
        &self,
        ctx: &HostContext,
        _compensations: &mut CompensationStack<HostContext>,
    ) -> Result<(), StepError> {
        ctx.package_manager()
            .remove(ctx.exec(), &KUBE_PACKAGES)
            .step_context("failed to purge kubernetes packages")
    }
}

/// Removes the module and sysctl drop-ins written by install.
pub struct RemoveKernelConfig;

impl Step for RemoveKernelConfig {
    type Context = HostContext;

    fn name(&self) -> &str {
        "remove_kernel_config"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Warning
    }

    fn execute(
        &self,
        ctx: &HostContext,
        _compensations: &mut CompensationStack<HostContext>,
    ) -> Result<(), StepError> {
        for path in [MODULES_CONF, SYSCTL_CONF] {
            ctx.fs()
                .remove(Path::new(path))
                .step_context(format!("failed to remove {path}"))?;
        }
        Ok(())
    }
}
