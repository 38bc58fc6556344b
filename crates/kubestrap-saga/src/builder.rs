use std::marker::PhantomData;

use crate::pipeline::{BoxedStep, Pipeline};
use crate::step::Step;

/// Marker type for a builder with no main steps.
pub struct Empty;

/// Marker type for a builder with at least one main step.
pub struct HasSteps;

/// Type-state builder for pipelines.
///
/// Steps run in the order they are added. Preflight and postflight hooks can
/// be added at any time and always run before and after the main steps.
///
/// A pipeline without main steps cannot be built:
///
/// ```compile_fail
/// use kubestrap_saga::PipelineBuilder;
///
/// // `build()` is only available after `step()`
/// let pipeline = PipelineBuilder::<()>::new("empty").build();
/// ```
pub struct PipelineBuilder<Ctx, State = Empty> {
    kind: String,
    is_master: bool,
    confirmation: Option<String>,
    watched_services: Vec<String>,
    preflight: Vec<BoxedStep<Ctx>>,
    steps: Vec<BoxedStep<Ctx>>,
    postflight: Vec<BoxedStep<Ctx>>,
    _state: PhantomData<State>,
}

impl<Ctx> PipelineBuilder<Ctx, Empty> {
    /// Start a pipeline; `kind` names it in the audit log.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            is_master: false,
            confirmation: None,
            watched_services: Vec::new(),
            preflight: Vec::new(),
            steps: Vec::new(),
            postflight: Vec::new(),
            _state: PhantomData,
        }
    }
}

impl<Ctx, State> PipelineBuilder<Ctx, State> {
    /// Mark the run as provisioning a control-plane node.
    #[must_use]
    pub fn master(mut self, is_master: bool) -> Self {
        self.is_master = is_master;
        self
    }

    /// Ask `prompt` through the confirmation gate before anything runs.
    #[must_use]
    pub fn confirm_with(mut self, prompt: impl Into<String>) -> Self {
        self.confirmation = Some(prompt.into());
        self
    }

    /// Probe `service` before the run and restart it on rollback if it was
    /// active.
    #[must_use]
    pub fn watch_service(mut self, service: impl Into<String>) -> Self {
        self.watched_services.push(service.into());
        self
    }

    #[must_use]
    pub fn preflight<S>(mut self, step: S) -> Self
    where
        S: Step<Context = Ctx> + 'static,
    {
        self.preflight.push(Box::new(step));
        self
    }

    #[must_use]
    pub fn postflight<S>(mut self, step: S) -> Self
    where
        S: Step<Context = Ctx> + 'static,
    {
        self.postflight.push(Box::new(step));
        self
    }

    /// Append a main step.
    #[must_use]
    pub fn step<S>(self, step: S) -> PipelineBuilder<Ctx, HasSteps>
    where
        S: Step<Context = Ctx> + 'static,
    {
        self.push_boxed(Box::new(step))
    }

    /// Append a main step that is only wanted when `condition` holds.
    #[must_use]
    pub fn step_if<S>(self, condition: bool, step: S) -> Self
    where
        S: Step<Context = Ctx> + 'static,
    {
        if condition {
            let mut builder = self;
            builder.steps.push(Box::new(step));
            builder
        } else {
            self
        }
    }

    fn push_boxed(self, step: BoxedStep<Ctx>) -> PipelineBuilder<Ctx, HasSteps> {
        let mut steps = self.steps;
        steps.push(step);
        PipelineBuilder {
            kind: self.kind,
            is_master: self.is_master,
            confirmation: self.confirmation,
            watched_services: self.watched_services,
            preflight: self.preflight,
            steps,
            postflight: self.postflight,
            _state: PhantomData,
        }
    }
}

impl<Ctx> PipelineBuilder<Ctx, HasSteps> {
    #[must_use]
    pub fn build(self) -> Pipeline<Ctx> {
        Pipeline {
            kind: self.kind,
            is_master: self.is_master,
            confirmation: self.confirmation,
            watched_services: self.watched_services,
            preflight: self.preflight,
            steps: self.steps,
            postflight: self.postflight,
        }
    }
}
