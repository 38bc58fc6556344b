//! Integration tests for audit logging, warning steps and the confirmation gate.

use std::cell::RefCell;
use std::fs;

use kubestrap_saga::{
    ActionError, AssumeNo, AssumeYes, AuditEvent, AuditLevel, AuditLog, CompensationStack,
    ConfirmationGate, Criticality, FnStep, PipelineBuilder, RunOutcome, ServiceControl, Step,
    StepError, scan_warnings,
};

#[derive(Default)]
struct TestContext {
    executed: RefCell<Vec<String>>,
    compensated: RefCell<Vec<String>>,
    probes: RefCell<usize>,
}

impl ServiceControl for TestContext {
    fn is_active(&self, _service: &str) -> bool {
        *self.probes.borrow_mut() += 1;
        false
    }

    fn start(&self, _service: &str) -> Result<(), ActionError> {
        Ok(())
    }
}

struct SimpleStep {
    name: &'static str,
}

impl Step for SimpleStep {
    type Context = TestContext;

    fn name(&self) -> &str {
        self.name
    }

    fn execute(
        &self,
        ctx: &Self::Context,
        compensations: &mut CompensationStack<Self::Context>,
    ) -> Result<(), StepError> {
        ctx.executed.borrow_mut().push(self.name.to_string());
        let name = self.name;
        compensations.push(format!("undo {name}"), move |ctx: &TestContext| {
            ctx.compensated.borrow_mut().push(name.to_string());
            Ok(())
        });
        Ok(())
    }
}

struct BestEffortStep {
    name: &'static str,
}

impl Step for BestEffortStep {
    type Context = TestContext;

    fn name(&self) -> &str {
        self.name
    }

    fn criticality(&self) -> Criticality {
        Criticality::Warning
    }

    fn execute(
        &self,
        _ctx: &Self::Context,
        _compensations: &mut CompensationStack<Self::Context>,
    ) -> Result<(), StepError> {
        Err(StepError::new("cleanup target missing"))
    }
}

struct RecordingGate {
    prompts: RefCell<Vec<String>>,
    answer: bool,
}

impl ConfirmationGate for RecordingGate {
    fn confirm(&self, prompt: &str) -> bool {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.answer
    }
}

#[test]
fn start_records_follow_configured_order() {
    let ctx = TestContext::default();
    let pipeline = PipelineBuilder::new("test")
        .preflight(SimpleStep { name: "pre" })
        .step(SimpleStep { name: "one" })
        .step(SimpleStep { name: "two" })
        .step(SimpleStep { name: "three" })
        .postflight(SimpleStep { name: "post" })
        .build();

    let report = pipeline.run(&ctx, &AssumeYes, AuditLog::in_memory());

    assert_eq!(report.log.started_steps(), pipeline.step_names());
    assert_eq!(*ctx.executed.borrow(), pipeline.step_names());
}

#[test]
fn each_step_attempt_logged_exactly_once() {
    let ctx = TestContext::default();
    let pipeline = PipelineBuilder::new("test")
        .step(SimpleStep { name: "one" })
        .step(BestEffortStep { name: "two" })
        .step(SimpleStep { name: "three" })
        .build();

    let report = pipeline.run(&ctx, &AssumeYes, AuditLog::in_memory());

    let starts = report.log.started_steps();
    assert_eq!(starts, vec!["one", "two", "three"]);
    let completions = report
        .log
        .records()
        .iter()
        .filter(|r| r.event == AuditEvent::StepCompleted)
        .count();
    assert_eq!(completions, 2);
}

#[test]
fn warning_failure_continues_without_rollback() {
    let ctx = TestContext::default();
    let pipeline = PipelineBuilder::new("reset")
        .step(SimpleStep { name: "first" })
        .step(BestEffortStep {
            name: "remove_cni_config",
        })
        .step(SimpleStep { name: "after" })
        .build();

    let report = pipeline.run(&ctx, &AssumeYes, AuditLog::in_memory());

    assert!(matches!(report.outcome, RunOutcome::Completed));
    assert_eq!(*ctx.executed.borrow(), vec!["first", "after"]);
    assert!(ctx.compensated.borrow().is_empty());
    assert_eq!(report.discarded_compensations, 2);
    assert_eq!(report.completed_steps, vec!["first", "after"]);

    let warning = report
        .log
        .records()
        .iter()
        .find(|r| r.event == AuditEvent::StepWarning)
        .expect("warning record");
    assert_eq!(warning.level, AuditLevel::Error);
    assert!(warning.message.starts_with("Warning:"));
    assert_eq!(
        report.log.warnings(),
        vec!["step 'remove_cni_config' failed: cleanup target missing"]
    );
}

#[test]
fn declined_gate_executes_nothing() {
    let ctx = TestContext::default();
    let gate = RecordingGate {
        prompts: RefCell::new(Vec::new()),
        answer: false,
    };
    let pipeline = PipelineBuilder::new("reset")
        .confirm_with("Tear down Kubernetes?")
        .watch_service("kubelet")
        .preflight(SimpleStep { name: "pre" })
        .step(SimpleStep { name: "one" })
        .build();

    let report = pipeline.run(&ctx, &gate, AuditLog::in_memory());

    assert!(matches!(report.outcome, RunOutcome::Declined));
    assert!(report.outcome.is_success());
    assert!(ctx.executed.borrow().is_empty());
    assert_eq!(*ctx.probes.borrow(), 0);
    assert!(report.log.started_steps().is_empty());
    assert_eq!(*gate.prompts.borrow(), vec!["Tear down Kubernetes?"]);
}

#[test]
fn accepted_gate_runs_pipeline() {
    let ctx = TestContext::default();
    let pipeline = PipelineBuilder::new("reset")
        .confirm_with("Tear down Kubernetes?")
        .step(SimpleStep { name: "one" })
        .build();

    let declined = pipeline.run(&ctx, &AssumeNo, AuditLog::in_memory());
    let accepted = pipeline.run(&ctx, &AssumeYes, AuditLog::in_memory());

    assert!(matches!(declined.outcome, RunOutcome::Declined));
    assert!(matches!(accepted.outcome, RunOutcome::Completed));
    assert_eq!(*ctx.executed.borrow(), vec!["one"]);
}

#[test]
fn closure_steps_share_the_contract() {
    let ctx = TestContext::default();
    let pipeline = PipelineBuilder::new("test")
        .step(FnStep::new(
            "closure",
            |ctx: &TestContext, stack: &mut CompensationStack<TestContext>| {
                ctx.executed.borrow_mut().push("closure".to_string());
                stack.push("undo closure", |ctx: &TestContext| {
                    ctx.compensated.borrow_mut().push("closure".to_string());
                    Ok(())
                });
                Ok(())
            },
        ))
        .step(
            FnStep::new(
                "optional",
                |_ctx: &TestContext, _stack: &mut CompensationStack<TestContext>| {
                    Err(StepError::new("not available"))
                },
            )
            .with_criticality(Criticality::Warning),
        )
        .step(FnStep::new(
            "fatal",
            |_ctx: &TestContext, _stack: &mut CompensationStack<TestContext>| {
                Err(StepError::new("hard failure"))
            },
        ))
        .build();

    let report = pipeline.run(&ctx, &AssumeYes, AuditLog::in_memory());

    assert!(matches!(
        report.outcome,
        RunOutcome::Aborted { ref step, .. } if step == "fatal"
    ));
    assert_eq!(*ctx.compensated.borrow(), vec!["closure"]);
}

#[test]
fn audit_file_persists_records_and_warnings() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("logs/kubestrap-reset-test.log");
    let ctx = TestContext::default();
    let pipeline = PipelineBuilder::new("reset")
        .step(SimpleStep { name: "one" })
        .step(BestEffortStep {
            name: "flush_iptables",
        })
        .build();

    let report = pipeline.run(&ctx, &AssumeYes, AuditLog::create(&path)?);
    assert_eq!(report.log.path(), Some(path.as_path()));

    let contents = fs::read_to_string(&path)?;
    assert_eq!(contents.lines().count(), report.log.records().len());
    assert!(contents.contains("[INFO] Starting step 'one'"));
    assert!(contents.contains("[ERROR] Warning: step 'flush_iptables' failed"));

    let warnings = scan_warnings(&path)?;
    assert_eq!(
        warnings,
        vec!["step 'flush_iptables' failed: cleanup target missing"]
    );
    Ok(())
}

#[test]
fn fatal_tool_output_with_warning_text_stays_out_of_warnings() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("kubestrap-install-master-test.log");
    let ctx = TestContext::default();
    let pipeline = PipelineBuilder::new("install-master")
        .step(SimpleStep { name: "one" })
        .step(FnStep::new(
            "install_cni",
            |_ctx: &TestContext, _stack: &mut CompensationStack<TestContext>| {
                Err(StepError::new(
                    "kubectl apply failed: Warning: policy/v1beta1 PodDisruptionBudget is \
                     deprecated\nerror: unable to recognize \"calico.yaml\"",
                ))
            },
        ))
        .build();

    let report = pipeline.run(&ctx, &AssumeYes, AuditLog::create(&path)?);

    assert!(matches!(
        report.outcome,
        RunOutcome::Aborted { ref step, .. } if step == "install_cni"
    ));
    let contents = fs::read_to_string(&path)?;
    assert_eq!(contents.lines().count(), report.log.records().len());
    assert!(contents.contains("is deprecated | error: unable to recognize"));
    assert!(scan_warnings(&path)?.is_empty());
    assert!(report.log.warnings().is_empty());
    Ok(())
}

#[test]
fn audit_file_is_appended_not_truncated() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("audit.log");

    let mut first = AuditLog::create(&path)?;
    first.info("first run");
    drop(first);
    let mut second = AuditLog::create(&path)?;
    second.warning("second run");
    drop(second);

    let contents = fs::read_to_string(&path)?;
    let lines: Vec<_> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("[INFO] first run"));
    assert!(lines[1].ends_with("[WARN] second run"));
    Ok(())
}
