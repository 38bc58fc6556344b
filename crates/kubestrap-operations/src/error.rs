use std::path::PathBuf;

use kubestrap_host::{HostError, UnknownPackageManager};
use kubestrap_saga::{ActionError, StepError};
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read config file '{path}'")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}'")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    UnknownPackageManager(#[from] UnknownPackageManager),

    #[error("unknown CNI plugin '{0}' (expected flannel or calico)")]
    UnknownCni(String),
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OperationError {
    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("must run as root (effective uid is {uid})")]
    NotRoot { uid: String },

    #[error("service '{0}' is not active")]
    ServiceInactive(String),

    #[error("node did not become Ready after {attempts} attempt(s)")]
    NodeNotReady { attempts: u32 },

    #[error("'{0}' not found; kubeadm init did not produce it")]
    MissingFile(PathBuf),

    #[error("failed to open audit log '{path}'")]
    AuditLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, OperationError>;

/// Attach a step or rollback message to a lower-level failure.
pub(crate) trait ResultExt<T> {
    fn step_context(self, message: impl Into<String>) -> std::result::Result<T, StepError>;

    fn action_context(self, message: impl Into<String>) -> std::result::Result<T, ActionError>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn step_context(self, message: impl Into<String>) -> std::result::Result<T, StepError> {
        self.map_err(|e| StepError::with_source(message, e))
    }

    fn action_context(self, message: impl Into<String>) -> std::result::Result<T, ActionError> {
        self.map_err(|e| ActionError::with_source(message, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_context_keeps_host_error_as_cause() {
        let result: std::result::Result<(), HostError> = Err(HostError::CommandFailed {
            command: "swapoff -a".to_string(),
            code: Some(1),
            stderr: "permission denied".to_string(),
        });

        let err = result.step_context("failed to disable swap").expect_err("error");

        assert_eq!(err.message(), "failed to disable swap");
        assert_eq!(
            err.full_message(),
            "failed to disable swap: 'swapoff -a' exited with status 1: permission denied"
        );
    }

    #[test]
    fn operation_error_wraps_host_error_transparently() {
        let err = OperationError::from(HostError::MissingTool("modprobe".to_string()));

        assert_eq!(err.to_string(), "required tool 'modprobe' not found on PATH");
    }
}
