use std::fmt;

use crate::compensation::CompensationStack;
use crate::error::StepError;

/// How a step failure affects the rest of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Criticality {
    /// Failure aborts the pipeline and triggers rollback.
    #[default]
    Fatal,
    /// Failure is logged with a `Warning:` prefix and the pipeline continues.
    Warning,
}

impl fmt::Display for Criticality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fatal => write!(f, "fatal"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A unit of pipeline work.
///
/// A step performs one logically-related group of host mutations. On success
/// it pushes the compensations for what it changed onto the stack before
/// returning, in the order the mutations happened, so that draining undoes the
/// most recent mutation first. Steps that change nothing push nothing.
///
/// # Type Parameters
///
/// - `Context`: shared dependencies (executors, configuration) closed over by
///   every step of a pipeline
pub trait Step {
    /// Shared context providing dependencies.
    type Context;

    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Whether a failure of this step aborts the pipeline.
    ///
    /// Defaults to [`Criticality::Fatal`].
    fn criticality(&self) -> Criticality {
        Criticality::Fatal
    }

    /// Execute the step body.
    ///
    /// # Errors
    ///
    /// Returns a [`StepError`] describing why the mutation could not be made.
    fn execute(
        &self,
        ctx: &Self::Context,
        compensations: &mut CompensationStack<Self::Context>,
    ) -> Result<(), StepError>;
}

/// A step built from a closure.
///
/// Handy for small steps that do not warrant their own type.
pub struct FnStep<Ctx, F> {
    name: String,
    criticality: Criticality,
    body: F,
    _ctx: std::marker::PhantomData<fn(&Ctx)>,
}

impl<Ctx, F> FnStep<Ctx, F>
where
    F: Fn(&Ctx, &mut CompensationStack<Ctx>) -> Result<(), StepError>,
{
    pub fn new(name: impl Into<String>, body: F) -> Self {
        Self {
            name: name.into(),
            criticality: Criticality::Fatal,
            body,
            _ctx: std::marker::PhantomData,
        }
    }

    #[must_use]
    pub fn with_criticality(mut self, criticality: Criticality) -> Self {
        self.criticality = criticality;
        self
    }
}

impl<Ctx, F> Step for FnStep<Ctx, F>
where
    F: Fn(&Ctx, &mut CompensationStack<Ctx>) -> Result<(), StepError>,
{
    type Context = Ctx;

    fn name(&self) -> &str {
        &self.name
    }

    fn criticality(&self) -> Criticality {
        self.criticality
    }

    fn execute(
        &self,
        ctx: &Self::Context,
        compensations: &mut CompensationStack<Self::Context>,
    ) -> Result<(), StepError> {
        (self.body)(ctx, compensations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fn_step_defaults_to_fatal() {
        let step = FnStep::new("noop", |_ctx: &(), _stack: &mut CompensationStack<()>| Ok(()));

        assert_eq!(step.name(), "noop");
        assert_eq!(step.criticality(), Criticality::Fatal);
    }

    #[test]
    fn fn_step_pushes_through_the_stack() {
        let step = FnStep::new("write", |_ctx: &(), stack: &mut CompensationStack<()>| {
            stack.push("remove file", |_| Ok(()));
            Ok(())
        })
        .with_criticality(Criticality::Warning);
        let mut stack = CompensationStack::new();

        let result = step.execute(&(), &mut stack);

        assert!(result.is_ok());
        assert_eq!(stack.len(), 1);
        assert_eq!(step.criticality(), Criticality::Warning);
    }

    #[test]
    fn criticality_display() {
        assert_eq!(Criticality::Fatal.to_string(), "fatal");
        assert_eq!(Criticality::Warning.to_string(), "warning");
    }
}
