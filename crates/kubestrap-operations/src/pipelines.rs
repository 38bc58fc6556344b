use kubestrap_saga::{HasSteps, Pipeline, PipelineBuilder};

use crate::config::ClusterConfig;
use crate::context::HostContext;
use crate::steps::{
    CaptureJoinCommand, ConfigureContainerRuntime, ConfigureKubectl, ConfigureSysctl, DisableSwap,
    EnableKubelet, FlushIptables, HoldKubernetesPackages, InstallCni, InstallContainerRuntime,
    InstallKubernetesPackages, KubeadmInit, KubeadmJoin, KubeadmReset, LoadKernelModules,
    PurgeKubernetesPackages, RemoveCniConfig, RemoveKernelConfig, RemoveKubeconfig, RequireRoot,
    RequireTools, StopKubelet, UnholdKubernetesPackages, UntaintControlPlane, VerifyServiceActive,
    WaitNodeReady,
};

/// Services probed before every run and restarted on rollback if they were up.
pub const WATCHED_SERVICES: [&str; 3] = ["kubelet", "containerd", "docker"];

pub const REQUIRED_TOOLS: &[&str] = &["systemctl", "modprobe", "sysctl"];

pub const RESET_PROMPT: &str = "This will tear down Kubernetes on this host. Continue?";

pub const INSTALL_MASTER: &str = "install-master";
pub const JOIN_NODE: &str = "join-node";
pub const RESET: &str = "reset";

fn watching<S>(mut builder: PipelineBuilder<HostContext, S>) -> PipelineBuilder<HostContext, S> {
    for service in WATCHED_SERVICES {
        builder = builder.watch_service(service);
    }
    builder
}

/// Node preparation shared by control-plane and worker installs.
fn prepare_node(kind: &str) -> PipelineBuilder<HostContext, HasSteps> {
    watching(PipelineBuilder::new(kind))
        .preflight(RequireRoot)
        .preflight(RequireTools(REQUIRED_TOOLS))
        .step(DisableSwap)
        .step(LoadKernelModules)
        .step(ConfigureSysctl)
        .step(InstallContainerRuntime)
        .step(ConfigureContainerRuntime)
        .step(InstallKubernetesPackages)
        .step(HoldKubernetesPackages)
        .step(EnableKubelet)
}

/// Bootstrap a control-plane node.
#[must_use]
pub fn install_master(cluster: &ClusterConfig) -> Pipeline<HostContext> {
    prepare_node(INSTALL_MASTER)
        .master(true)
        .step(KubeadmInit)
        .step(ConfigureKubectl)
        .step(InstallCni)
        .step_if(cluster.allow_schedule_on_control_plane, UntaintControlPlane)
        .postflight(VerifyServiceActive("kubelet"))
        .postflight(WaitNodeReady)
        .postflight(CaptureJoinCommand)
        .build()
}

/// Join this host to an existing cluster as a worker.
#[must_use]
pub fn join_node() -> Pipeline<HostContext> {
    prepare_node(JOIN_NODE)
        .step(KubeadmJoin)
        .postflight(VerifyServiceActive("kubelet"))
        .build()
}

/// Tear Kubernetes off this host, after confirmation.
#[must_use]
pub fn reset() -> Pipeline<HostContext> {
    watching(PipelineBuilder::new(RESET))
        .confirm_with(RESET_PROMPT)
        .preflight(RequireRoot)
        .step(KubeadmReset)
        .step(StopKubelet)
        .step(RemoveCniConfig)
        .step(FlushIptables)
        .step(RemoveKubeconfig)
        .step(UnholdKubernetesPackages)
        .step(PurgeKubernetesPackages)
        .step(RemoveKernelConfig)
        .build()
}
