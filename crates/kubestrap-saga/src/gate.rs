/// A yes/no decision taken before a destructive pipeline touches the host.
pub trait ConfirmationGate {
    /// Returns `true` to proceed. Anything else ends the run cleanly.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Gate that always proceeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl ConfirmationGate for AssumeYes {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Gate that always declines.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeNo;

impl ConfirmationGate for AssumeNo {
    fn confirm(&self, _prompt: &str) -> bool {
        false
    }
}
