use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::{HostError, Result};
use crate::exec::CommandExecutor;

/// Supported package managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Dnf,
    Yum,
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Apt => write!(f, "apt"),
            Self::Dnf => write!(f, "dnf"),
            Self::Yum => write!(f, "yum"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown package manager '{0}' (expected apt, dnf or yum)")]
pub struct UnknownPackageManager(pub String);

impl FromStr for PackageManager {
    type Err = UnknownPackageManager;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "apt" | "apt-get" => Ok(Self::Apt),
            "dnf" => Ok(Self::Dnf),
            "yum" => Ok(Self::Yum),
            other => Err(UnknownPackageManager(other.to_string())),
        }
    }
}

impl PackageManager {
    /// First package manager found on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::NoPackageManager`] if none is available.
    pub fn detect<E: CommandExecutor + ?Sized>(exec: &E) -> Result<Self> {
        [Self::Apt, Self::Dnf, Self::Yum]
            .into_iter()
            .find(|pm| exec.command_exists(pm.program()))
            .ok_or(HostError::NoPackageManager)
    }

    /// Binary that performs installs and removals.
    #[must_use]
    pub fn program(self) -> &'static str {
        match self {
            Self::Apt => "apt-get",
            Self::Dnf => "dnf",
            Self::Yum => "yum",
        }
    }

    /// Install `packages`, refreshing the index first on apt.
    ///
    /// # Errors
    ///
    /// Returns an error if the package manager fails.
    pub fn install<E: CommandExecutor + ?Sized>(self, exec: &E, packages: &[&str]) -> Result<()> {
        debug!(manager = %self, ?packages, "installing packages");
        match self {
            Self::Apt => {
                apt(exec, &["update"])?;
                let mut args = vec!["install", "-y"];
                args.extend_from_slice(packages);
                apt(exec, &args)
            }
            Self::Dnf | Self::Yum => {
                let mut args = vec!["install", "-y"];
                args.extend_from_slice(packages);
                exec.run_checked(self.program(), &args).map(|_| ())
            }
        }
    }

    /// # Errors
    ///
    /// Returns an error if the package manager fails.
    pub fn remove<E: CommandExecutor + ?Sized>(self, exec: &E, packages: &[&str]) -> Result<()> {
        debug!(manager = %self, ?packages, "removing packages");
        match self {
            Self::Apt => {
                let mut args = vec!["purge", "-y"];
                args.extend_from_slice(packages);
                apt(exec, &args)
            }
            Self::Dnf | Self::Yum => {
                let mut args = vec!["remove", "-y"];
                args.extend_from_slice(packages);
                exec.run_checked(self.program(), &args).map(|_| ())
            }
        }
    }

    /// Pin packages at their installed version.
    ///
    /// # Errors
    ///
    /// Returns an error if the hold cannot be placed.
    pub fn hold<E: CommandExecutor + ?Sized>(self, exec: &E, packages: &[&str]) -> Result<()> {
        match self {
            Self::Apt => {
                let mut args = vec!["hold"];
                args.extend_from_slice(packages);
                exec.run_checked("apt-mark", &args).map(|_| ())
            }
            Self::Dnf | Self::Yum => {
                let mut args = vec!["versionlock", "add"];
                args.extend_from_slice(packages);
                exec.run_checked(self.program(), &args).map(|_| ())
            }
        }
    }

    /// # Errors
    ///
    /// Returns an error if the hold cannot be released.
    pub fn unhold<E: CommandExecutor + ?Sized>(self, exec: &E, packages: &[&str]) -> Result<()> {
        match self {
            Self::Apt => {
                let mut args = vec!["unhold"];
                args.extend_from_slice(packages);
                exec.run_checked("apt-mark", &args).map(|_| ())
            }
            Self::Dnf | Self::Yum => {
                let mut args = vec!["versionlock", "delete"];
                args.extend_from_slice(packages);
                exec.run_checked(self.program(), &args).map(|_| ())
            }
        }
    }

    /// Whether `package` is currently installed.
    pub fn is_installed<E: CommandExecutor + ?Sized>(self, exec: &E, package: &str) -> bool {
        let output = match self {
            Self::Apt => exec.run("dpkg-query", &["-W", "-f=${Status}", package]),
            Self::Dnf | Self::Yum => exec.run("rpm", &["-q", package]),
        };
        match (self, output) {
            (Self::Apt, Ok(out)) => out.is_success() && out.stdout.contains("install ok installed"),
            (_, Ok(out)) => out.is_success(),
            (_, Err(_)) => false,
        }
    }

    /// Package spec pinned to `version`, in this manager's syntax.
    ///
    /// Apt pins need the full Debian revision, so a bare `1.30.2` becomes
    /// `kubeadm=1.30.2-*`.
    #[must_use]
    pub fn pinned(self, package: &str, version: Option<&str>) -> String {
        match (self, version) {
            (_, None) => package.to_string(),
            (Self::Apt, Some(v)) if v.contains('-') => format!("{package}={v}"),
            (Self::Apt, Some(v)) => format!("{package}={v}-*"),
            (Self::Dnf | Self::Yum, Some(v)) => format!("{package}-{v}"),
        }
    }
}

fn apt<E: CommandExecutor + ?Sized>(exec: &E, args: &[&str]) -> Result<()> {
    let mut full = vec!["DEBIAN_FRONTEND=noninteractive", "apt-get"];
    full.extend_from_slice(args);
    exec.run_checked("env", &full).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_managers() {
        assert_eq!("apt".parse::<PackageManager>().ok(), Some(PackageManager::Apt));
        assert_eq!("apt-get".parse::<PackageManager>().ok(), Some(PackageManager::Apt));
        assert_eq!("dnf".parse::<PackageManager>().ok(), Some(PackageManager::Dnf));
        assert_eq!("yum".parse::<PackageManager>().ok(), Some(PackageManager::Yum));
    }

    #[test]
    fn rejects_unknown_manager() {
        let err = "pacman".parse::<PackageManager>().expect_err("unknown");

        assert!(err.to_string().contains("pacman"));
    }

    #[test]
    fn pinned_versions_follow_manager_syntax() {
        assert_eq!(PackageManager::Apt.pinned("kubeadm", None), "kubeadm");
        assert_eq!(
            PackageManager::Apt.pinned("kubeadm", Some("1.30.2")),
            "kubeadm=1.30.2-*"
        );
        assert_eq!(
            PackageManager::Apt.pinned("kubeadm", Some("1.30.2-1.1")),
            "kubeadm=1.30.2-1.1"
        );
        assert_eq!(
            PackageManager::Dnf.pinned("kubeadm", Some("1.30.2")),
            "kubeadm-1.30.2"
        );
    }
}
