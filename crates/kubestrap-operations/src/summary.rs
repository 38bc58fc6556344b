use std::borrow::Borrow;
use std::path::{Path, PathBuf};

use chrono::Local;
use kubestrap_saga::{AuditLog, ConfirmationGate, Pipeline, RunOutcome, RunReport, scan_warnings};
use tracing::{info, warn};

use crate::context::HostContext;
use crate::error::{OperationError, Result};

/// How a run ended, reduced to what the operator needs to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Completed {
        join_command: Option<String>,
    },
    Aborted {
        step: String,
        message: String,
        applied: usize,
        failed: usize,
        failures: Vec<String>,
        restored_services: Vec<String>,
    },
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub kind: String,
    pub status: RunStatus,
    pub completed_steps: Vec<String>,
    /// Entries carrying the `Warning:` prefix, in log order.
    pub warnings: Vec<String>,
    pub log_path: Option<PathBuf>,
}

impl RunSummary {
    /// Summarize a finished run. Warnings are read back from the audit file
    /// when there is one.
    #[must_use]
    pub fn from_report(kind: &str, report: &RunReport, join_command: Option<String>) -> Self {
        let status = match &report.outcome {
            RunOutcome::Aborted {
                step,
                error,
                rollback,
            } => RunStatus::Aborted {
                step: step.clone(),
                message: error.full_message(),
                applied: rollback.applied_count(),
                failed: rollback.failed_count(),
                failures: rollback
                    .compensations
                    .iter()
                    .filter_map(|r| {
                        r.outcome
                            .as_ref()
                            .err()
                            .map(|e| format!("{}: {}", r.description, e.full_message()))
                    })
                    .collect(),
                restored_services: rollback
                    .restored_services
                    .iter()
                    .filter(|r| r.outcome.is_ok())
                    .map(|r| r.service.clone())
                    .collect(),
            },
            RunOutcome::Declined => RunStatus::Declined,
            _ => RunStatus::Completed { join_command },
        };

        Self {
            kind: kind.to_string(),
            status,
            completed_steps: report.completed_steps.clone(),
            warnings: collect_warnings(&report.log),
            log_path: report.log.path().map(Path::to_path_buf),
        }
    }

    /// Summary of a run refused at the confirmation prompt. Nothing ran and
    /// no audit file was opened.
    #[must_use]
    pub fn declined(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            status: RunStatus::Declined,
            completed_steps: Vec::new(),
            warnings: Vec::new(),
            log_path: None,
        }
    }

    /// `false` only for an aborted run.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self.status, RunStatus::Aborted { .. })
    }
}

fn collect_warnings(log: &AuditLog) -> Vec<String> {
    let in_memory = || -> Vec<String> {
        log.warnings().into_iter().map(str::to_string).collect()
    };
    match log.path() {
        Some(path) => scan_warnings(path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "could not read audit log back");
            in_memory()
        }),
        None => in_memory(),
    }
}

/// Run `pipeline` with a fresh audit log and summarize the result.
///
/// With `log_dir` the audit trail goes to
/// `<log_dir>/kubestrap-<kind>-<timestamp>.log`; without it the log is kept in
/// memory only.
///
/// # Errors
///
/// Returns an error if the audit file cannot be created. Step failures are
/// reported through [`RunStatus::Aborted`], not as errors.
pub fn run_pipeline<G>(
    pipeline: &Pipeline<HostContext>,
    ctx: &HostContext,
    gate: &G,
    log_dir: Option<&Path>,
) -> Result<RunSummary>
where
    G: ConfirmationGate + ?Sized,
{
    run_gated(pipeline, gate, log_dir, || Ok::<_, OperationError>(ctx))
}

/// Like [`run_pipeline`], but the host context is built by `context` only
/// after the gate agrees. A declined run builds nothing, opens no audit file
/// and touches no directory.
///
/// # Errors
///
/// Returns the error from `context`, or an error if the audit file cannot be
/// created.
pub fn run_gated<G, F, C, E>(
    pipeline: &Pipeline<HostContext>,
    gate: &G,
    log_dir: Option<&Path>,
    context: F,
) -> std::result::Result<RunSummary, E>
where
    G: ConfirmationGate + ?Sized,
    F: FnOnce() -> std::result::Result<C, E>,
    C: Borrow<HostContext>,
    E: From<OperationError>,
{
    if !pipeline.confirm(gate) {
        info!(kind = pipeline.kind(), "declined at confirmation prompt; no changes were made");
        return Ok(RunSummary::declined(pipeline.kind()));
    }

    let built = context()?;
    let ctx: &HostContext = built.borrow();
    let log = open_audit_log(pipeline.kind(), log_dir)?;
    let report = pipeline.run_confirmed(ctx, log);
    Ok(RunSummary::from_report(pipeline.kind(), &report, ctx.join_command()))
}

fn open_audit_log(kind: &str, log_dir: Option<&Path>) -> Result<AuditLog> {
    let Some(dir) = log_dir else {
        return Ok(AuditLog::in_memory());
    };
    let path = AuditLog::path_for(dir, kind, Local::now());
    info!(path = %path.display(), "writing audit log");
    AuditLog::create(&path).map_err(|source| OperationError::AuditLog { path, source })
}
