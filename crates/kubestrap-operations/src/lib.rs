//! Kubernetes node provisioning pipelines: configuration, the host context
//! steps run against, the step bodies, and run summaries.

pub mod config;
pub mod context;
mod error;
pub mod pipelines;
pub mod steps;
pub mod summary;

pub use config::{CniPlugin, ClusterConfig, JoinConfig, KubestrapConfig, RuntimeConfig};
pub use context::{HostContext, ReadinessPolicy};
pub use error::{ConfigError, OperationError, Result};
pub use summary::{RunStatus, RunSummary, run_gated, run_pipeline};
