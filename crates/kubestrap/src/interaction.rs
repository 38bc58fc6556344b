use dialoguer::Confirm;
use kubestrap_saga::ConfirmationGate;
use tracing::warn;

use crate::environment::non_interactive_reason;

/// Confirmation prompt on the controlling terminal.
///
/// `--yes` always accepts. Without a usable terminal the answer is no.
pub struct TerminalGate {
    assume_yes: bool,
}

impl TerminalGate {
    #[must_use]
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl ConfirmationGate for TerminalGate {
    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        if let Some(reason) = non_interactive_reason() {
            warn!(%reason, "cannot prompt; pass --yes to proceed");
            return false;
        }

        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or_else(|e| {
                warn!(error = %e, "confirmation prompt failed");
                false
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assume_yes_never_prompts() {
        assert!(TerminalGate::new(true).confirm("Tear everything down?"));
    }
}
