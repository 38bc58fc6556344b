//! Provisioning step bodies.
//!
//! Each step makes one related group of host mutations and pushes the
//! compensation for every mutation as soon as it has been made, so a later
//! failure inside the same step still unwinds what already happened.

mod control_plane;
mod join;
mod kube_packages;
mod preflight;
mod reset;
mod runtime;
mod system;
mod verify;

use std::path::Path;

use kubestrap_saga::{ActionError, StepError};

pub use control_plane::{ConfigureKubectl, InstallCni, KubeadmInit, UntaintControlPlane};
pub use join::KubeadmJoin;
pub use kube_packages::{EnableKubelet, HoldKubernetesPackages, InstallKubernetesPackages};
pub use preflight::{RequireRoot, RequireTools};
pub use reset::{
    FlushIptables, KubeadmReset, PurgeKubernetesPackages, RemoveCniConfig, RemoveKernelConfig,
    RemoveKubeconfig, StopKubelet, UnholdKubernetesPackages,
};
pub use runtime::{ConfigureContainerRuntime, InstallContainerRuntime};
pub use system::{ConfigureSysctl, DisableSwap, LoadKernelModules};
pub use verify::{CaptureJoinCommand, VerifyServiceActive, WaitNodeReady};

use crate::context::HostContext;
use crate::error::ResultExt;

pub const FSTAB: &str = "/etc/fstab";
pub const MODULES_CONF: &str = "/etc/modules-load.d/k8s.conf";
pub const SYSCTL_CONF: &str = "/etc/sysctl.d/k8s.conf";
pub const CONTAINERD_CONFIG: &str = "/etc/containerd/config.toml";
pub const ROOT_KUBECONFIG: &str = "/root/.kube/config";
pub const CNI_CONFIG_DIR: &str = "/etc/cni/net.d";

pub const KUBE_PACKAGES: [&str; 3] = ["kubelet", "kubeadm", "kubectl"];

/// Write `contents` to `path` and return what was there before.
fn replace_file(
    ctx: &HostContext,
    path: &str,
    contents: &str,
) -> Result<Option<String>, StepError> {
    let path = Path::new(path);
    let previous = ctx
        .fs()
        .read(path)
        .step_context(format!("failed to read {}", path.display()))?;
    ctx.fs()
        .write(path, contents)
        .step_context(format!("failed to write {}", path.display()))?;
    Ok(previous)
}

/// Put `path` back the way [`replace_file`] found it.
fn restore_file(ctx: &HostContext, path: &str, previous: Option<&str>) -> Result<(), ActionError> {
    let path = Path::new(path);
    match previous {
        Some(contents) => ctx
            .fs()
            .write(path, contents)
            .action_context(format!("failed to restore {}", path.display())),
        None => ctx
            .fs()
            .remove(path)
            .action_context(format!("failed to remove {}", path.display())),
    }
}

fn restore_description(path: &str, previous: Option<&String>) -> String {
    if previous.is_some() {
        format!("restore previous {path}")
    } else {
        format!("remove {path}")
    }
}
