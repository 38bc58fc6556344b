//! Host-side plumbing for kubestrap: process execution, file access, systemd,
//! package managers, and the kubeadm/kubectl front-ends.

mod error;
mod exec;
mod fs;
mod kube;
mod packages;
mod systemd;

#[cfg(any(test, feature = "testing"))]
pub mod mocks;

pub use error::{HostError, Result};
pub use exec::{CommandExecutor, CommandOutput, SystemExecutor, render_command};
pub use fs::{HostFs, LocalFs};
pub use kube::{InitOptions, JoinOptions, Kubeadm, Kubectl};
pub use packages::{PackageManager, UnknownPackageManager};
pub use systemd::Systemd;
