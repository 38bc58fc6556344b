use kubestrap_saga::{CompensationStack, Step, StepError};
use tracing::{debug, info};

use super::{CONTAINERD_CONFIG, replace_file, restore_description, restore_file};
use crate::context::HostContext;
use crate::error::ResultExt;

const CONTAINERD: &str = "containerd";

/// Installs containerd unless it is already present.
pub struct InstallContainerRuntime;

impl Step for InstallContainerRuntime {
    type Context = HostContext;

    fn name(&self) -> &str {
        "install_container_runtime"
    }

    fn execute(
        &self,
        ctx: &HostContext,
        compensations: &mut CompensationStack<HostContext>,
    ) -> Result<(), StepError> {
        let pm = ctx.package_manager();
        if pm.is_installed(ctx.exec(), CONTAINERD) {
            info!("containerd already installed; leaving it in place");
            return Ok(());
        }

        pm.install(ctx.exec(), &[CONTAINERD])
            .step_context("failed to install containerd")?;
        compensations.push("uninstall containerd", move |ctx: &HostContext| {
            ctx.package_manager()
                .remove(ctx.exec(), &[CONTAINERD])
                .action_context("failed to uninstall containerd")
        });
        Ok(())
    }
}

/// Writes a containerd config using the systemd cgroup driver and restarts
/// the daemon.
pub struct ConfigureContainerRuntime;

impl Step for ConfigureContainerRuntime {
    type Context = HostContext;

    fn name(&self) -> &str {
        "configure_container_runtime"
    }

    fn execute(
        &self,
        ctx: &HostContext,
        compensations: &mut CompensationStack<HostContext>,
    ) -> Result<(), StepError> {
        let defaults = ctx
            .exec()
            .run_checked(CONTAINERD, &["config", "default"])
            .step_context("failed to generate default containerd config")?;
        let config = with_systemd_cgroup(&defaults.stdout);

        let previous = replace_file(ctx, CONTAINERD_CONFIG, &config)?;
        debug!(had_previous = previous.is_some(), "wrote containerd config");
        compensations.push(
            format!(
                "{} and restart containerd",
                restore_description(CONTAINERD_CONFIG, previous.as_ref())
            ),
            move |ctx: &HostContext| {
                restore_file(ctx, CONTAINERD_CONFIG, previous.as_deref())?;
                ctx.systemd()
                    .restart(CONTAINERD)
                    .action_context("failed to restart containerd")
            },
        );

        ctx.systemd()
            .restart(CONTAINERD)
            .step_context("failed to restart containerd")?;
        Ok(())
    }
}

fn with_systemd_cgroup(config: &str) -> String {
    config.replace("SystemdCgroup = false", "SystemdCgroup = true")
}
