use std::cell::RefCell;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use kubestrap_host::{CommandExecutor, HostFs, Kubeadm, Kubectl, PackageManager, Systemd};
use kubestrap_saga::{ActionError, ServiceControl};

use crate::config::{ClusterConfig, JoinConfig};
use crate::error::ResultExt;

pub type SharedExecutor = Arc<dyn CommandExecutor + Send + Sync>;
pub type SharedFs = Arc<dyn HostFs + Send + Sync>;

pub const ADMIN_KUBECONFIG: &str = "/etc/kubernetes/admin.conf";

/// How long `wait_node_ready` keeps polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            attempts: 30,
            interval: Duration::from_secs(10),
        }
    }
}

/// Everything a provisioning step closes over.
///
/// Steps read configuration and reach the host only through this context, so
/// a pipeline can be driven against a scripted executor and a scratch
/// filesystem.
pub struct HostContext {
    exec: SharedExecutor,
    fs: SharedFs,
    package_manager: PackageManager,
    cluster: ClusterConfig,
    join: Option<JoinConfig>,
    readiness: ReadinessPolicy,
    join_command: RefCell<Option<String>>,
}

impl HostContext {
    pub fn new(exec: SharedExecutor, fs: SharedFs, package_manager: PackageManager) -> Self {
        Self {
            exec,
            fs,
            package_manager,
            cluster: ClusterConfig::default(),
            join: None,
            readiness: ReadinessPolicy::default(),
            join_command: RefCell::new(None),
        }
    }

    #[must_use]
    pub fn with_cluster(mut self, cluster: ClusterConfig) -> Self {
        self.cluster = cluster;
        self
    }

    #[must_use]
    pub fn with_join(mut self, join: JoinConfig) -> Self {
        self.join = Some(join);
        self
    }

    #[must_use]
    pub fn with_readiness(mut self, readiness: ReadinessPolicy) -> Self {
        self.readiness = readiness;
        self
    }

    #[must_use]
    pub fn exec(&self) -> &(dyn CommandExecutor + Send + Sync + 'static) {
        self.exec.as_ref()
    }

    #[must_use]
    pub fn fs(&self) -> &(dyn HostFs + Send + Sync + 'static) {
        self.fs.as_ref()
    }

    #[must_use]
    pub fn package_manager(&self) -> PackageManager {
        self.package_manager
    }

    #[must_use]
    pub fn cluster(&self) -> &ClusterConfig {
        &self.cluster
    }

    #[must_use]
    pub fn join(&self) -> Option<&JoinConfig> {
        self.join.as_ref()
    }

    #[must_use]
    pub fn readiness(&self) -> ReadinessPolicy {
        self.readiness
    }

    pub fn systemd(&self) -> Systemd<'_, dyn CommandExecutor + Send + Sync> {
        Systemd::new(self.exec())
    }

    pub fn kubeadm(&self) -> Kubeadm<'_, dyn CommandExecutor + Send + Sync> {
        Kubeadm::new(self.exec())
    }

    /// `kubectl` authenticated with the cluster admin credentials.
    pub fn kubectl(&self) -> Kubectl<'_, dyn CommandExecutor + Send + Sync> {
        Kubectl::new(self.exec(), Path::new(ADMIN_KUBECONFIG))
    }

    #[must_use]
    pub fn join_command(&self) -> Option<String> {
        self.join_command.borrow().clone()
    }

    pub(crate) fn set_join_command(&self, command: String) {
        *self.join_command.borrow_mut() = Some(command);
    }
}

impl ServiceControl for HostContext {
    fn is_active(&self, service: &str) -> bool {
        self.systemd().is_active(service)
    }

    fn start(&self, service: &str) -> Result<(), ActionError> {
        self.systemd()
            .start(service)
            .action_context(format!("failed to start {service}"))
    }
}
