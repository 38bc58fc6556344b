use std::thread;

use kubestrap_saga::{CompensationStack, Criticality, Step, StepError};
use tracing::{debug, info};

use crate::context::HostContext;
use crate::error::{OperationError, ResultExt};

/// Fails unless a systemd unit is active.
pub struct VerifyServiceActive(pub &'static str);

impl Step for VerifyServiceActive {
    type Context = HostContext;

    fn name(&self) -> &str {
        "verify_service_active"
    }

    fn execute(
        &self,
        ctx: &HostContext,
        _compensations: &mut CompensationStack<HostContext>,
    ) -> Result<(), StepError> {
        if ctx.systemd().is_active(self.0) {
            Ok(())
        } else {
            Err(StepError::with_source(
                format!("{} is not running", self.0),
                OperationError::ServiceInactive(self.0.to_string()),
            ))
        }
    }
}

/// Polls until every node reports `Ready`.
pub struct WaitNodeReady;

impl Step for WaitNodeReady {
    type Context = HostContext;

    fn name(&self) -> &str {
        "wait_node_ready"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Warning
    }

    fn execute(
        &self,
        ctx: &HostContext,
        _compensations: &mut CompensationStack<HostContext>,
    ) -> Result<(), StepError> {
        let policy = ctx.readiness();
        for attempt in 1..=policy.attempts {
            match ctx.kubectl().nodes_ready() {
                Ok(true) => {
                    info!(attempt, "node is Ready");
                    return Ok(());
                }
                Ok(false) => debug!(attempt, "node not Ready yet"),
                Err(e) => debug!(attempt, error = %e, "could not query nodes"),
            }
            if attempt < policy.attempts {
                thread::sleep(policy.interval);
            }
        }
        Err(StepError::with_source(
            "node did not become Ready",
            OperationError::NodeNotReady {
                attempts: policy.attempts,
            },
        ))
    }
}

/// Mints a bootstrap token and keeps the join command for the summary.
pub struct CaptureJoinCommand;

impl Step for CaptureJoinCommand {
    type Context = HostContext;

    fn name(&self) -> &str {
        "capture_join_command"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Warning
    }

    fn execute(
        &self,
        ctx: &HostContext,
        _compensations: &mut CompensationStack<HostContext>,
    ) -> Result<(), StepError> {
        let command = ctx
            .kubeadm()
            .token_create_print_join_command()
            .step_context("failed to create join command")?;
        ctx.set_join_command(command);
        Ok(())
    }
}
