use tracing::debug;

use crate::audit::AuditLog;
use crate::compensation::CompensationStack;
use crate::error::StepError;
use crate::gate::ConfirmationGate;
use crate::rollback::{RollbackController, RollbackReport};
use crate::service::{ServiceControl, ServiceSnapshot};
use crate::step::{Criticality, Step};

pub(crate) type BoxedStep<Ctx> = Box<dyn Step<Context = Ctx>>;

/// How a pipeline run ended.
#[derive(Debug)]
#[non_exhaustive]
pub enum RunOutcome {
    /// Every step ran; no fatal failure.
    Completed,
    /// A fatal step failed and rollback ran to completion.
    Aborted {
        step: String,
        error: StepError,
        rollback: RollbackReport,
    },
    /// The confirmation gate said no. Nothing was executed.
    Declined,
}

impl RunOutcome {
    /// `true` unless the run was aborted.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Aborted { .. })
    }
}

/// Mutable state owned by the runner for the duration of one run.
pub struct PipelineRunState<Ctx> {
    pub completed_steps: Vec<String>,
    pub stack: CompensationStack<Ctx>,
    pub log: AuditLog,
    pub is_master: bool,
    pub initial_services: ServiceSnapshot,
}

impl<Ctx> PipelineRunState<Ctx> {
    fn new(log: AuditLog, is_master: bool) -> Self {
        Self {
            completed_steps: Vec::new(),
            stack: CompensationStack::new(),
            log,
            is_master,
            initial_services: ServiceSnapshot::new(),
        }
    }

    fn finish(mut self, outcome: RunOutcome) -> RunReport {
        let discarded_compensations = self.stack.discard();
        RunReport {
            outcome,
            completed_steps: self.completed_steps,
            initial_services: self.initial_services,
            is_master: self.is_master,
            discarded_compensations,
            log: self.log,
        }
    }
}

/// Everything a finished run leaves behind.
#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Steps that succeeded, in execution order.
    pub completed_steps: Vec<String>,
    pub initial_services: ServiceSnapshot,
    pub is_master: bool,
    /// Compensations dropped unapplied because the run did not roll back.
    pub discarded_compensations: usize,
    pub log: AuditLog,
}

/// An ordered list of steps with preflight checks and postflight verification.
///
/// Build one with [`PipelineBuilder`].
pub struct Pipeline<Ctx> {
    pub(crate) kind: String,
    pub(crate) is_master: bool,
    pub(crate) confirmation: Option<String>,
    pub(crate) watched_services: Vec<String>,
    pub(crate) preflight: Vec<BoxedStep<Ctx>>,
    pub(crate) steps: Vec<BoxedStep<Ctx>>,
    pub(crate) postflight: Vec<BoxedStep<Ctx>>,
}

impl<Ctx> Pipeline<Ctx>
where
    Ctx: ServiceControl,
{
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Names of every step in execution order, hooks included.
    #[must_use]
    pub fn step_names(&self) -> Vec<&str> {
        self.preflight
            .iter()
            .chain(&self.steps)
            .chain(&self.postflight)
            .map(|s| s.name())
            .collect()
    }

    /// Ask `gate` for permission to run. Pipelines without a prompt are
    /// always allowed.
    ///
    /// Pair with [`Pipeline::run_confirmed`] to ask before any setup work.
    pub fn confirm<G>(&self, gate: &G) -> bool
    where
        G: ConfirmationGate + ?Sized,
    {
        match &self.confirmation {
            Some(prompt) => gate.confirm(prompt),
            None => true,
        }
    }

    /// Run the pipeline to completion, abort, or refusal.
    ///
    /// The confirmation gate is only consulted when the pipeline was built
    /// with a prompt. See [`Pipeline::run_confirmed`] for the rest.
    pub fn run<G>(&self, ctx: &Ctx, gate: &G, log: AuditLog) -> RunReport
    where
        G: ConfirmationGate + ?Sized,
    {
        if !self.confirm(gate) {
            let mut state: PipelineRunState<Ctx> = PipelineRunState::new(log, self.is_master);
            state.log.info(format!(
                "{} declined at confirmation prompt; no changes were made",
                self.kind
            ));
            return state.finish(RunOutcome::Declined);
        }
        self.run_confirmed(ctx, log)
    }

    /// Run the pipeline without consulting a gate.
    ///
    /// Service state is captured before the first step. Preflight, main and
    /// postflight steps then run in order under the same criticality rules;
    /// the first fatal failure rolls back everything registered so far.
    pub fn run_confirmed(&self, ctx: &Ctx, log: AuditLog) -> RunReport {
        let mut state = PipelineRunState::new(log, self.is_master);

        state.log.info(format!(
            "Starting {} pipeline with {} step(s)",
            self.kind,
            self.preflight.len() + self.steps.len() + self.postflight.len()
        ));
        state.initial_services = ServiceSnapshot::capture(ctx, self.watched_services.as_slice());
        for (service, service_state) in state.initial_services.iter() {
            debug!(service, state = %service_state, "captured initial service state");
        }

        let phases = [
            ("preflight", &self.preflight),
            ("install", &self.steps),
            ("postflight", &self.postflight),
        ];
        for (phase, steps) in phases {
            debug!(phase, count = steps.len(), "entering phase");
            for step in steps {
                if let Err(error) = run_step(step.as_ref(), ctx, &mut state) {
                    let rollback = RollbackController::new().rollback(
                        ctx,
                        &mut state.stack,
                        &state.initial_services,
                        &mut state.log,
                    );
                    let outcome = RunOutcome::Aborted {
                        step: step.name().to_string(),
                        error,
                        rollback,
                    };
                    return state.finish(outcome);
                }
            }
        }

        let pending = state.stack.len();
        state.log.info(format!(
            "{} pipeline completed; {pending} rollback action(s) discarded",
            self.kind
        ));
        state.finish(RunOutcome::Completed)
    }
}

fn run_step<Ctx>(
    step: &dyn Step<Context = Ctx>,
    ctx: &Ctx,
    state: &mut PipelineRunState<Ctx>,
) -> Result<(), StepError> {
    let name = step.name();
    state.log.step_started(name);

    match step.execute(ctx, &mut state.stack) {
        Ok(()) => {
            state.log.step_completed(name);
            state.completed_steps.push(name.to_string());
            Ok(())
        }
        Err(error) => match step.criticality() {
            Criticality::Warning => {
                state.log.step_warning(name, &error.full_message());
                Ok(())
            }
            Criticality::Fatal => {
                state.log.step_failed(name, &error.full_message());
                Err(error)
            }
        },
    }
}
