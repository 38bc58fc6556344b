use tracing::debug;

use crate::audit::AuditLog;
use crate::compensation::{ActionResult, CompensationStack};
use crate::error::ActionError;
use crate::service::{ServiceControl, ServiceSnapshot};

/// Phase of the rollback state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackPhase {
    /// Forward execution; no rollback in progress.
    Idle,
    /// Popping and applying compensating actions.
    Draining,
    /// Re-asserting the pre-run state of watched services.
    Restoring,
    /// Terminal.
    Done,
}

/// A service the controller tried to bring back to its pre-run state.
#[derive(Debug)]
pub struct ServiceRestore {
    pub service: String,
    pub outcome: Result<(), ActionError>,
}

/// What rollback did.
#[derive(Debug, Default)]
pub struct RollbackReport {
    /// Compensations in the order they were applied.
    pub compensations: Vec<ActionResult>,
    pub restored_services: Vec<ServiceRestore>,
}

impl RollbackReport {
    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.compensations.iter().filter(|r| r.is_ok()).count()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.compensations.len() - self.applied_count()
            + self
                .restored_services
                .iter()
                .filter(|r| r.outcome.is_err())
                .count()
    }

    /// Every compensation and every restart succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed_count() == 0
    }
}

/// Drains the compensation stack, then restores watched services.
///
/// Never fails: every problem is written to the audit log and returned in
/// the report. A controller rolls back at most once.
#[derive(Debug)]
pub struct RollbackController {
    phase: RollbackPhase,
}

impl Default for RollbackController {
    fn default() -> Self {
        Self::new()
    }
}

impl RollbackController {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: RollbackPhase::Idle,
        }
    }

    #[must_use]
    pub fn phase(&self) -> RollbackPhase {
        self.phase
    }

    pub fn rollback<Ctx>(
        &mut self,
        ctx: &Ctx,
        stack: &mut CompensationStack<Ctx>,
        initial_services: &ServiceSnapshot,
        log: &mut AuditLog,
    ) -> RollbackReport
    where
        Ctx: ServiceControl,
    {
        if self.phase != RollbackPhase::Idle {
            log.warning("Rollback already performed for this run; skipping");
            return RollbackReport::default();
        }

        self.phase = RollbackPhase::Draining;
        log.info(format!("Rolling back {} registered action(s)", stack.len()));
        let compensations = stack.drain_and_apply_all(ctx);
        for result in &compensations {
            match &result.outcome {
                Ok(()) => log.compensated(&result.description),
                Err(e) => log.compensation_failed(&result.description, &e.full_message()),
            }
        }

        self.phase = RollbackPhase::Restoring;
        let restored_services = restore_services(ctx, initial_services, log);

        self.phase = RollbackPhase::Done;
        log.info("Rollback finished");

        RollbackReport {
            compensations,
            restored_services,
        }
    }
}

fn restore_services<Ctx>(
    ctx: &Ctx,
    initial_services: &ServiceSnapshot,
    log: &mut AuditLog,
) -> Vec<ServiceRestore>
where
    Ctx: ServiceControl,
{
    let mut restored = Vec::new();
    for service in initial_services.active() {
        if ctx.is_active(service) {
            debug!(service, "service still active, nothing to restore");
            continue;
        }
        let outcome = ctx.start(service);
        match &outcome {
            Ok(()) => log.service_restored(service),
            Err(e) => log.service_restore_failed(service, &e.full_message()),
        }
        restored.push(ServiceRestore {
            service: service.to_string(),
            outcome,
        });
    }
    restored
}
