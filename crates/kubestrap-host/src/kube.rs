//! Thin wrappers over `kubeadm` and `kubectl`.
//!
//! These only assemble arguments and check exit codes; cluster semantics stay
//! with the tools.

use std::path::{Path, PathBuf};

use crate::error::{HostError, Result};
use crate::exec::CommandExecutor;

/// Options for `kubeadm init`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitOptions {
    pub kubernetes_version: Option<String>,
    pub pod_network_cidr: Option<String>,
    pub service_cidr: Option<String>,
    pub control_plane_endpoint: Option<String>,
}

impl InitOptions {
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["init".to_string()];
        if let Some(version) = &self.kubernetes_version {
            args.push(format!("--kubernetes-version={version}"));
        }
        if let Some(cidr) = &self.pod_network_cidr {
            args.push(format!("--pod-network-cidr={cidr}"));
        }
        if let Some(cidr) = &self.service_cidr {
            args.push(format!("--service-cidr={cidr}"));
        }
        if let Some(endpoint) = &self.control_plane_endpoint {
            args.push(format!("--control-plane-endpoint={endpoint}"));
        }
        args
    }
}

/// Credentials for `kubeadm join`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOptions {
    pub api_server: String,
    pub token: String,
    pub discovery_token_ca_cert_hash: String,
}

impl JoinOptions {
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        vec![
            "join".to_string(),
            self.api_server.clone(),
            "--token".to_string(),
            self.token.clone(),
            "--discovery-token-ca-cert-hash".to_string(),
            self.discovery_token_ca_cert_hash.clone(),
        ]
    }
}

pub struct Kubeadm<'a, E: ?Sized> {
    exec: &'a E,
}

impl<'a, E> Kubeadm<'a, E>
where
    E: CommandExecutor + ?Sized,
{
    pub fn new(exec: &'a E) -> Self {
        Self { exec }
    }

    /// # Errors
    ///
    /// Returns an error if `kubeadm init` fails.
    pub fn init(&self, options: &InitOptions) -> Result<()> {
        self.kubeadm(&options.to_args())
    }

    /// # Errors
    ///
    /// Returns an error if `kubeadm join` fails.
    pub fn join(&self, options: &JoinOptions) -> Result<()> {
        self.kubeadm(&options.to_args())
    }

    /// `kubeadm reset -f`.
    ///
    /// # Errors
    ///
    /// Returns an error if the reset fails.
    pub fn reset(&self) -> Result<()> {
        self.exec.run_checked("kubeadm", &["reset", "-f"]).map(|_| ())
    }

    /// Mint a bootstrap token and return the full `kubeadm join ...` line.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails or prints nothing.
    pub fn token_create_print_join_command(&self) -> Result<String> {
        let args = ["token", "create", "--print-join-command"];
        let output = self.exec.run_checked("kubeadm", &args)?;
        let command = output.stdout.trim();
        if command.is_empty() {
            return Err(HostError::UnexpectedOutput {
                command: "kubeadm token create --print-join-command".to_string(),
                detail: "empty output".to_string(),
            });
        }
        Ok(command.to_string())
    }

    fn kubeadm(&self, args: &[String]) -> Result<()> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.exec.run_checked("kubeadm", &args).map(|_| ())
    }
}

pub struct Kubectl<'a, E: ?Sized> {
    exec: &'a E,
    kubeconfig: PathBuf,
}

impl<'a, E> Kubectl<'a, E>
where
    E: CommandExecutor + ?Sized,
{
    pub fn new(exec: &'a E, kubeconfig: impl Into<PathBuf>) -> Self {
        Self {
            exec,
            kubeconfig: kubeconfig.into(),
        }
    }

    #[must_use]
    pub fn kubeconfig(&self) -> &Path {
        &self.kubeconfig
    }

    /// # Errors
    ///
    /// Returns an error if `kubectl apply` fails.
    pub fn apply(&self, manifest: &str) -> Result<()> {
        self.kubectl(&["apply", "-f", manifest]).map(|_| ())
    }

    /// # Errors
    ///
    /// Returns an error if `kubectl delete` fails.
    pub fn delete(&self, manifest: &str) -> Result<()> {
        self.kubectl(&["delete", "--ignore-not-found", "-f", manifest])
            .map(|_| ())
    }

    /// Whether every node reports `Ready`.
    ///
    /// # Errors
    ///
    /// Returns an error if nodes cannot be listed.
    pub fn nodes_ready(&self) -> Result<bool> {
        let output = self.kubectl(&[
            "get",
            "nodes",
            "-o",
            "jsonpath={range .items[*]}{.status.conditions[?(@.type==\"Ready\")].status}{\"\\n\"}{end}",
        ])?;
        let statuses: Vec<&str> = output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        Ok(!statuses.is_empty() && statuses.iter().all(|s| *s == "True"))
    }

    /// Remove the control-plane `NoSchedule` taint from every node.
    ///
    /// # Errors
    ///
    /// Returns an error if the taint cannot be removed.
    pub fn untaint_control_plane(&self) -> Result<()> {
        self.kubectl(&[
            "taint",
            "nodes",
            "--all",
            "node-role.kubernetes.io/control-plane:NoSchedule-",
        ])
        .map(|_| ())
    }

    fn kubectl(&self, args: &[&str]) -> Result<String> {
        let kubeconfig = format!("--kubeconfig={}", self.kubeconfig.display());
        let mut full = vec![kubeconfig.as_str()];
        full.extend_from_slice(args);
        Ok(self.exec.run_checked("kubectl", &full)?.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_args_include_only_set_options() {
        let options = InitOptions {
            pod_network_cidr: Some("10.244.0.0/16".to_string()),
            ..InitOptions::default()
        };

        assert_eq!(
            options.to_args(),
            vec!["init", "--pod-network-cidr=10.244.0.0/16"]
        );
    }

    #[test]
    fn init_args_with_everything() {
        let options = InitOptions {
            kubernetes_version: Some("v1.30.2".to_string()),
            pod_network_cidr: Some("192.168.0.0/16".to_string()),
            service_cidr: Some("10.96.0.0/12".to_string()),
            control_plane_endpoint: Some("cp.local:6443".to_string()),
        };

        assert_eq!(
            options.to_args(),
            vec![
                "init",
                "--kubernetes-version=v1.30.2",
                "--pod-network-cidr=192.168.0.0/16",
                "--service-cidr=10.96.0.0/12",
                "--control-plane-endpoint=cp.local:6443",
            ]
        );
    }

    #[test]
    fn join_args_are_positional_endpoint_then_flags() {
        let options = JoinOptions {
            api_server: "10.0.0.1:6443".to_string(),
            token: "abcdef.0123456789abcdef".to_string(),
            discovery_token_ca_cert_hash: "sha256:deadbeef".to_string(),
        };

        assert_eq!(
            options.to_args(),
            vec![
                "join",
                "10.0.0.1:6443",
                "--token",
                "abcdef.0123456789abcdef",
                "--discovery-token-ca-cert-hash",
                "sha256:deadbeef",
            ]
        );
    }
}
