use kubestrap_host::HostError;
use kubestrap_saga::{CompensationStack, Step, StepError};
use tracing::debug;

use crate::context::HostContext;
use crate::error::{OperationError, ResultExt};

/// Fails unless the effective uid is 0.
pub struct RequireRoot;

impl Step for RequireRoot {
    type Context = HostContext;

    fn name(&self) -> &str {
        "require_root"
    }

    fn execute(
        &self,
        ctx: &HostContext,
        _compensations: &mut CompensationStack<HostContext>,
    ) -> Result<(), StepError> {
        let output = ctx
            .exec()
            .run_checked("id", &["-u"])
            .step_context("failed to determine effective uid")?;
        let uid = output.stdout.trim();
        debug!(uid, "effective uid");
        if uid == "0" {
            Ok(())
        } else {
            Err(StepError::with_source(
                "root privileges required",
                OperationError::NotRoot {
                    uid: uid.to_string(),
                },
            ))
        }
    }
}

/// Fails if any of the listed programs is missing from `PATH`.
pub struct RequireTools(pub &'static [&'static str]);

impl Step for RequireTools {
    type Context = HostContext;

    fn name(&self) -> &str {
        "require_tools"
    }

    fn execute(
        &self,
        ctx: &HostContext,
        _compensations: &mut CompensationStack<HostContext>,
    ) -> Result<(), StepError> {
        match self.0.iter().find(|tool| !ctx.exec().command_exists(tool)) {
            Some(tool) => Err(StepError::with_source(
                "missing required tooling",
                HostError::MissingTool((*tool).to_string()),
            )),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use kubestrap_host::mocks::ScriptedExecutor;
    use kubestrap_host::{CommandOutput, LocalFs, PackageManager};

    use super::*;

    fn context(exec: ScriptedExecutor) -> HostContext {
        HostContext::new(Arc::new(exec), Arc::new(LocalFs::default()), PackageManager::Apt)
    }

    #[test]
    fn root_passes() {
        let ctx = context(ScriptedExecutor::root());
        let mut stack = CompensationStack::new();

        assert!(RequireRoot.execute(&ctx, &mut stack).is_ok());
        assert!(stack.is_empty());
    }

    #[test]
    fn non_root_is_rejected_with_uid() {
        let ctx = context(
            ScriptedExecutor::new().respond("id -u", CommandOutput::success("1000\n")),
        );
        let mut stack = CompensationStack::new();

        let err = RequireRoot.execute(&ctx, &mut stack).expect_err("not root");

        assert!(err.full_message().contains("effective uid is 1000"));
    }

    #[test]
    fn missing_tool_is_named() {
        let ctx = context(ScriptedExecutor::new().without_tool("modprobe"));
        let mut stack = CompensationStack::new();

        let err = RequireTools(&["systemctl", "modprobe", "sysctl"])
            .execute(&ctx, &mut stack)
            .expect_err("modprobe missing");

        assert!(err.full_message().contains("'modprobe'"));
    }
}
