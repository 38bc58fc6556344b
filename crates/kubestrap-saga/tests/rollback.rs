//! Integration tests for rollback: failing compensations and service restoration.

use std::cell::RefCell;
use std::collections::HashSet;

use kubestrap_saga::{
    ActionError, AssumeYes, AuditEvent, AuditLog, CompensationStack, PipelineBuilder,
    RunOutcome, ServiceControl, ServiceState, Step, StepError,
};

#[derive(Default)]
struct FakeHost {
    active: RefCell<HashSet<String>>,
    compensation_log: RefCell<Vec<String>>,
}

impl FakeHost {
    fn with_active(services: &[&str]) -> Self {
        let host = Self::default();
        for service in services {
            host.active.borrow_mut().insert((*service).to_string());
        }
        host
    }
}

impl ServiceControl for FakeHost {
    fn is_active(&self, service: &str) -> bool {
        self.active.borrow().contains(service)
    }

    fn start(&self, service: &str) -> Result<(), ActionError> {
        self.active.borrow_mut().insert(service.to_string());
        Ok(())
    }
}

struct SuccessfulStep {
    name: &'static str,
}

impl Step for SuccessfulStep {
    type Context = FakeHost;

    fn name(&self) -> &str {
        self.name
    }

    fn execute(
        &self,
        _ctx: &Self::Context,
        compensations: &mut CompensationStack<Self::Context>,
    ) -> Result<(), StepError> {
        let name = self.name;
        compensations.push(format!("undo {name}"), move |ctx: &FakeHost| {
            ctx.compensation_log
                .borrow_mut()
                .push(format!("compensated {name}"));
            Ok(())
        });
        Ok(())
    }
}

struct FailingCompensationStep {
    name: &'static str,
}

impl Step for FailingCompensationStep {
    type Context = FakeHost;

    fn name(&self) -> &str {
        self.name
    }

    fn execute(
        &self,
        _ctx: &Self::Context,
        compensations: &mut CompensationStack<Self::Context>,
    ) -> Result<(), StepError> {
        let name = self.name;
        compensations.push(format!("undo {name}"), move |ctx: &FakeHost| {
            ctx.compensation_log
                .borrow_mut()
                .push(format!("failed to compensate {name}"));
            Err(ActionError::new(format!("{name} could not be undone")))
        });
        Ok(())
    }
}

/// Stops a service without registering a restart for it.
struct StopServiceStep {
    service: &'static str,
}

impl Step for StopServiceStep {
    type Context = FakeHost;

    fn name(&self) -> &str {
        "stop_service"
    }

    fn execute(
        &self,
        ctx: &Self::Context,
        _compensations: &mut CompensationStack<Self::Context>,
    ) -> Result<(), StepError> {
        ctx.active.borrow_mut().remove(self.service);
        Ok(())
    }
}

struct TriggerFailureStep;

impl Step for TriggerFailureStep {
    type Context = FakeHost;

    fn name(&self) -> &str {
        "trigger"
    }

    fn execute(
        &self,
        _ctx: &Self::Context,
        _compensations: &mut CompensationStack<Self::Context>,
    ) -> Result<(), StepError> {
        Err(StepError::new("triggered failure"))
    }
}

#[test]
fn compensation_failure_still_runs_other_compensations() {
    let host = FakeHost::default();
    let pipeline = PipelineBuilder::new("test")
        .step(SuccessfulStep { name: "a" })
        .step(FailingCompensationStep { name: "b" })
        .step(SuccessfulStep { name: "c" })
        .step(TriggerFailureStep)
        .build();

    let report = pipeline.run(&host, &AssumeYes, AuditLog::in_memory());

    let log = host.compensation_log.borrow();
    assert_eq!(
        *log,
        vec!["compensated c", "failed to compensate b", "compensated a"]
    );

    match report.outcome {
        RunOutcome::Aborted { rollback, .. } => {
            assert_eq!(rollback.applied_count(), 2);
            assert_eq!(rollback.failed_count(), 1);
            assert!(!rollback.is_clean());
            assert_eq!(rollback.compensations[1].description, "undo b");
            let err = rollback.compensations[1]
                .outcome
                .as_ref()
                .expect_err("b should have failed");
            assert_eq!(err.to_string(), "b could not be undone");
        }
        other => panic!("expected Aborted, got {other:?}"),
    }
}

#[test]
fn compensation_failure_is_logged_not_escalated() {
    let host = FakeHost::default();
    let pipeline = PipelineBuilder::new("test")
        .step(FailingCompensationStep { name: "b" })
        .step(TriggerFailureStep)
        .build();

    let report = pipeline.run(&host, &AssumeYes, AuditLog::in_memory());

    let failures: Vec<_> = report
        .log
        .records()
        .iter()
        .filter(|r| r.event == AuditEvent::CompensationFailed)
        .map(|r| r.message.as_str())
        .collect();
    assert_eq!(
        failures,
        vec!["Rollback action 'undo b' failed: b could not be undone"]
    );
    assert!(matches!(
        report.outcome,
        RunOutcome::Aborted { ref step, .. } if step == "trigger"
    ));
}

#[test]
fn all_compensations_failing_still_empties_the_stack() {
    let host = FakeHost::default();
    let pipeline = PipelineBuilder::new("test")
        .step(FailingCompensationStep { name: "a" })
        .step(FailingCompensationStep { name: "b" })
        .step(TriggerFailureStep)
        .build();

    let report = pipeline.run(&host, &AssumeYes, AuditLog::in_memory());

    assert_eq!(host.compensation_log.borrow().len(), 2);
    assert_eq!(report.discarded_compensations, 0);
}

#[test]
fn previously_active_service_is_restarted_without_explicit_compensation() {
    let host = FakeHost::with_active(&["kubelet"]);
    let pipeline = PipelineBuilder::new("test")
        .watch_service("kubelet")
        .watch_service("containerd")
        .step(StopServiceStep { service: "kubelet" })
        .step(SuccessfulStep { name: "a" })
        .step(TriggerFailureStep)
        .build();

    let report = pipeline.run(&host, &AssumeYes, AuditLog::in_memory());

    assert!(host.is_active("kubelet"));
    assert!(!host.is_active("containerd"));
    assert_eq!(
        report.initial_services.get("kubelet"),
        Some(ServiceState::Active)
    );
    match report.outcome {
        RunOutcome::Aborted { rollback, .. } => {
            assert_eq!(rollback.restored_services.len(), 1);
            assert_eq!(rollback.restored_services[0].service, "kubelet");
        }
        other => panic!("expected Aborted, got {other:?}"),
    }
}

#[test]
fn inactive_service_is_not_started_on_rollback() {
    let host = FakeHost::default();
    let pipeline = PipelineBuilder::new("test")
        .watch_service("docker")
        .step(SuccessfulStep { name: "a" })
        .step(TriggerFailureStep)
        .build();

    pipeline.run(&host, &AssumeYes, AuditLog::in_memory());

    assert!(!host.is_active("docker"));
}

#[test]
fn services_are_not_touched_on_success() {
    let host = FakeHost::with_active(&["kubelet"]);
    let pipeline = PipelineBuilder::new("test")
        .watch_service("kubelet")
        .step(StopServiceStep { service: "kubelet" })
        .build();

    let report = pipeline.run(&host, &AssumeYes, AuditLog::in_memory());

    assert!(matches!(report.outcome, RunOutcome::Completed));
    assert!(!host.is_active("kubelet"));
}
