//! Step pipeline with reverse-order compensation.
//!
//! A [`Pipeline`] runs an ordered list of [`Step`]s against a shared context.
//! Each step that mutates the host registers [`CompensatingAction`]s on a
//! [`CompensationStack`]. When a fatal step fails, the [`RollbackController`]
//! applies every registered action in reverse order, then restarts services
//! that were running before the pipeline started. Everything is recorded in
//! an [`AuditLog`].

mod audit;
mod builder;
mod compensation;
mod error;
mod gate;
mod pipeline;
mod rollback;
mod service;
mod step;

pub use audit::{AuditEvent, AuditLevel, AuditLog, AuditRecord, WARNING_PREFIX, scan_warnings};
pub use builder::{Empty, HasSteps, PipelineBuilder};
pub use compensation::{ActionResult, CompensatingAction, CompensationStack};
pub use error::{ActionError, StepError};
pub use gate::{AssumeNo, AssumeYes, ConfirmationGate};
pub use pipeline::{Pipeline, PipelineRunState, RunOutcome, RunReport};
pub use rollback::{RollbackController, RollbackPhase, RollbackReport, ServiceRestore};
pub use service::{ServiceControl, ServiceSnapshot, ServiceState};
pub use step::{Criticality, FnStep, Step};
