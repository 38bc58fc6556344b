use std::path::Path;

use kubestrap_saga::{CompensationStack, Step, StepError};
use tracing::debug;

use super::{FSTAB, MODULES_CONF, SYSCTL_CONF, replace_file, restore_description, restore_file};
use crate::context::HostContext;
use crate::error::ResultExt;

const KERNEL_MODULES: [&str; 2] = ["overlay", "br_netfilter"];

const SYSCTL_SETTINGS: &str = "\
net.bridge.bridge-nf-call-iptables = 1
net.bridge.bridge-nf-call-ip6tables = 1
net.ipv4.ip_forward = 1
";

/// Turns swap off now and on every boot.
pub struct DisableSwap;

impl Step for DisableSwap {
    type Context = HostContext;

    fn name(&self) -> &str {
        "disable_swap"
    }

    fn execute(
        &self,
        ctx: &HostContext,
        compensations: &mut CompensationStack<HostContext>,
    ) -> Result<(), StepError> {
        let swap_active = ctx
            .exec()
            .run("swapon", &["--show", "--noheadings"])
            .is_ok_and(|out| out.is_success() && !out.stdout.trim().is_empty());

        if swap_active {
            ctx.exec()
                .run_checked("swapoff", &["-a"])
                .step_context("failed to turn swap off")?;
            compensations.push("re-enable swap", |ctx: &HostContext| {
                ctx.exec()
                    .run_checked("swapon", &["-a"])
                    .map(|_| ())
                    .action_context("failed to re-enable swap")
            });
        }

        let fstab = ctx
            .fs()
            .read(Path::new(FSTAB))
            .step_context("failed to read /etc/fstab")?;
        let Some(original) = fstab else {
            debug!("no fstab; nothing to persist");
            return Ok(());
        };
        let Some(edited) = comment_out_swap(&original) else {
            debug!(swap_active, "fstab has no active swap entries");
            return Ok(());
        };

        ctx.fs()
            .write(Path::new(FSTAB), &edited)
            .step_context("failed to update /etc/fstab")?;
        compensations.push("restore original /etc/fstab", move |ctx: &HostContext| {
            restore_file(ctx, FSTAB, Some(original.as_str()))
        });
        Ok(())
    }
}

/// `fstab` with every active swap entry commented out, or `None` if there was
/// nothing to change.
fn comment_out_swap(fstab: &str) -> Option<String> {
    let mut changed = false;
    let mut out = String::with_capacity(fstab.len() + 8);
    for line in fstab.lines() {
        let trimmed = line.trim_start();
        let is_swap = !trimmed.starts_with('#')
            && trimmed.split_whitespace().nth(2) == Some("swap");
        if is_swap {
            out.push_str("# ");
            changed = true;
        }
        out.push_str(line);
        out.push('\n');
    }
    changed.then_some(out)
}

/// Loads the bridge and overlay modules and persists them across reboots.
pub struct LoadKernelModules;

impl Step for LoadKernelModules {
    type Context = HostContext;

    fn name(&self) -> &str {
        "load_kernel_modules"
    }

    fn execute(
        &self,
        ctx: &HostContext,
        compensations: &mut CompensationStack<HostContext>,
    ) -> Result<(), StepError> {
        let contents = KERNEL_MODULES
            .iter()
            .map(|m| format!("{m}\n"))
            .collect::<String>();
        let previous = replace_file(ctx, MODULES_CONF, &contents)?;
        compensations.push(
            restore_description(MODULES_CONF, previous.as_ref()),
            move |ctx: &HostContext| restore_file(ctx, MODULES_CONF, previous.as_deref()),
        );

        for module in KERNEL_MODULES {
            ctx.exec()
                .run_checked("modprobe", &[module])
                .step_context(format!("failed to load kernel module {module}"))?;
        }
        Ok(())
    }
}

/// Enables bridged traffic filtering and IP forwarding.
pub struct ConfigureSysctl;

impl Step for ConfigureSysctl {
    type Context = HostContext;

    fn name(&self) -> &str {
        "configure_sysctl"
    }

    fn execute(
        &self,
        ctx: &HostContext,
        compensations: &mut CompensationStack<HostContext>,
    ) -> Result<(), StepError> {
        let previous = replace_file(ctx, SYSCTL_CONF, SYSCTL_SETTINGS)?;
        compensations.push(
            format!("{} and reload sysctl", restore_description(SYSCTL_CONF, previous.as_ref())),
            move |ctx: &HostContext| {
                restore_file(ctx, SYSCTL_CONF, previous.as_deref())?;
                ctx.exec()
                    .run_checked("sysctl", &["--system"])
                    .map(|_| ())
                    .action_context("failed to reload sysctl settings")
            },
        );

        ctx.exec()
            .run_checked("sysctl", &["--system"])
            .step_context("failed to apply sysctl settings")?;
        Ok(())
    }
}
