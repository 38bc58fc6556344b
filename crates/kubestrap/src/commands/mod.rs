mod install;
mod join;
mod reset;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Subcommand};
use kubestrap_host::{LocalFs, PackageManager, SystemExecutor};
use kubestrap_operations::{CniPlugin, HostContext, KubestrapConfig, run_gated};
use kubestrap_saga::Pipeline;
use tracing::{debug, info};

use crate::error::Result;
use crate::interaction::TerminalGate;
use crate::output::print_summary;

/// Options shared by every subcommand.
pub(crate) struct GlobalArgs {
    pub(crate) config: Option<PathBuf>,
    pub(crate) log_dir: Option<PathBuf>,
    pub(crate) yes: bool,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Provision this host as a single control-plane node
    InstallMaster(InstallMasterArgs),
    /// Join this host to an existing cluster as a worker
    Join(JoinArgs),
    /// Tear down Kubernetes on this host
    Reset,
}

#[derive(Args)]
pub(crate) struct InstallMasterArgs {
    /// Kubernetes version to install and initialize (e.g. 1.30.2)
    #[arg(long)]
    pub kubernetes_version: Option<String>,

    /// Pod network CIDR (default depends on --cni)
    #[arg(long)]
    pub pod_network_cidr: Option<String>,

    /// Service CIDR passed to kubeadm init
    #[arg(long)]
    pub service_cidr: Option<String>,

    /// Pod network add-on: flannel or calico
    #[arg(long)]
    pub cni: Option<CniPlugin>,

    /// Stable address for the control plane (host:port)
    #[arg(long)]
    pub control_plane_endpoint: Option<String>,

    /// Remove the control-plane taint so workloads schedule here
    #[arg(long)]
    pub allow_schedule: bool,
}

#[derive(Args)]
pub(crate) struct JoinArgs {
    /// Control-plane API server address (host:port)
    #[arg(long)]
    pub api_server: String,

    /// Bootstrap token
    #[arg(long)]
    pub token: String,

    /// CA public key hash, e.g. sha256:...
    #[arg(long)]
    pub discovery_token_ca_cert_hash: String,
}

impl Commands {
    /// Returns whether the run counts as a success for the exit code.
    pub(crate) fn execute(self, globals: &GlobalArgs) -> Result<bool> {
        let config = KubestrapConfig::discover(globals.config.as_deref())?;
        debug!(?config, "configuration loaded");

        match self {
            Self::InstallMaster(args) => install::run(args, config, globals),
            Self::Join(args) => join::run(args, &config, globals),
            Self::Reset => reset::run(&config, globals),
        }
    }
}

/// Host context wired to the real machine.
fn host_context(config: &KubestrapConfig) -> Result<HostContext> {
    let exec = Arc::new(SystemExecutor::new());
    let package_manager = match config.runtime.package_manager()? {
        Some(pm) => pm,
        None => PackageManager::detect(&*exec)?,
    };
    let root = config
        .runtime
        .host_root
        .clone()
        .unwrap_or_else(|| PathBuf::from("/"));
    info!(%package_manager, root = %root.display(), "host context ready");

    Ok(HostContext::new(
        exec,
        Arc::new(LocalFs::new(root)),
        package_manager,
    ))
}

fn log_dir<'a>(config: &'a KubestrapConfig, globals: &'a GlobalArgs) -> &'a Path {
    globals
        .log_dir
        .as_deref()
        .unwrap_or_else(|| config.runtime.log_dir())
}

/// Run `pipeline` behind the terminal gate and print the outcome.
///
/// The gate is asked before `context` touches the host or the audit file is
/// opened.
fn execute_pipeline<F>(
    pipeline: &Pipeline<HostContext>,
    config: &KubestrapConfig,
    globals: &GlobalArgs,
    context: F,
) -> Result<bool>
where
    F: FnOnce() -> Result<HostContext>,
{
    let gate = TerminalGate::new(globals.yes);
    let summary = run_gated(pipeline, &gate, Some(log_dir(config, globals)), context)?;
    print_summary(&summary);
    Ok(summary.is_success())
}
