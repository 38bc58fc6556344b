use std::fmt;

use crate::error::ActionError;

type ApplyFn<Ctx> = Box<dyn FnOnce(&Ctx) -> Result<(), ActionError>>;

/// A reversal of one host mutation, registered by the step that made it.
///
/// Consumed exactly once: applied during rollback, or dropped unapplied when
/// the pipeline succeeds.
pub struct CompensatingAction<Ctx> {
    description: String,
    apply: ApplyFn<Ctx>,
}

impl<Ctx> CompensatingAction<Ctx> {
    pub fn new<F>(description: impl Into<String>, apply: F) -> Self
    where
        F: FnOnce(&Ctx) -> Result<(), ActionError> + 'static,
    {
        Self {
            description: description.into(),
            apply: Box::new(apply),
        }
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Consume the action and run it.
    ///
    /// # Errors
    ///
    /// Returns the action's own failure.
    pub fn apply(self, ctx: &Ctx) -> Result<(), ActionError> {
        (self.apply)(ctx)
    }
}

impl<Ctx> fmt::Debug for CompensatingAction<Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompensatingAction")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Outcome of applying one compensating action.
#[derive(Debug)]
pub struct ActionResult {
    pub description: String,
    pub outcome: Result<(), ActionError>,
}

impl ActionResult {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// LIFO stack of compensating actions.
///
/// Append-only while the pipeline runs forward; drained only by rollback.
pub struct CompensationStack<Ctx> {
    actions: Vec<CompensatingAction<Ctx>>,
}

impl<Ctx> Default for CompensationStack<Ctx> {
    fn default() -> Self {
        Self {
            actions: Vec::new(),
        }
    }
}

impl<Ctx> fmt::Debug for CompensationStack<Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.actions).finish()
    }
}

impl<Ctx> CompensationStack<Ctx> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a compensation; it will run before everything pushed earlier.
    pub fn push<F>(&mut self, description: impl Into<String>, apply: F)
    where
        F: FnOnce(&Ctx) -> Result<(), ActionError> + 'static,
    {
        self.push_action(CompensatingAction::new(description, apply));
    }

    pub fn push_action(&mut self, action: CompensatingAction<Ctx>) {
        self.actions.push(action);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Descriptions from the top of the stack (next to run) downwards.
    #[must_use]
    pub fn pending(&self) -> Vec<&str> {
        self.actions
            .iter()
            .rev()
            .map(CompensatingAction::description)
            .collect()
    }

    /// Pop and apply every action, most recent first.
    ///
    /// A failing action never stops the ones beneath it. The stack is empty
    /// when this returns.
    pub fn drain_and_apply_all(&mut self, ctx: &Ctx) -> Vec<ActionResult> {
        let mut results = Vec::with_capacity(self.actions.len());
        while let Some(action) = self.actions.pop() {
            let description = action.description.clone();
            let outcome = action.apply(ctx);
            results.push(ActionResult {
                description,
                outcome,
            });
        }
        results
    }

    /// Drop every action without applying it. Returns how many were dropped.
    pub fn discard(&mut self) -> usize {
        let count = self.actions.len();
        self.actions.clear();
        count
    }
}
