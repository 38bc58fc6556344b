use std::error::Error as StdError;

type BoxedSource = Box<dyn StdError + Send + Sync + 'static>;

/// Failure returned by a step body.
///
/// Whether it aborts the pipeline is decided by the step's declared
/// [`Criticality`](crate::Criticality), not by the error itself.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct StepError {
    message: String,
    #[source]
    source: Option<BoxedSource>,
}

impl StepError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Human-readable message, without the source chain.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Message followed by every cause in the source chain, `: `-separated.
    #[must_use]
    pub fn full_message(&self) -> String {
        chain_message(&self.message, self.source.as_deref())
    }
}

/// Failure of a compensating action during rollback.
///
/// Always recorded, never escalated.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ActionError {
    message: String,
    #[source]
    source: Option<BoxedSource>,
}

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn full_message(&self) -> String {
        chain_message(&self.message, self.source.as_deref())
    }
}

fn chain_message(head: &str, source: Option<&(dyn StdError + Send + Sync + 'static)>) -> String {
    let mut message = head.to_string();
    let mut current = source.map(|s| -> &(dyn StdError + 'static) { s });
    while let Some(cause) = current {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        current = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_error_displays_message_only() {
        let io = std::io::Error::other("disk full");
        let err = StepError::with_source("failed to write config", io);

        assert_eq!(err.to_string(), "failed to write config");
        assert!(StdError::source(&err).is_some());
    }

    #[test]
    fn full_message_walks_source_chain() {
        let io = std::io::Error::other("disk full");
        let err = StepError::with_source("failed to write config", io);

        assert_eq!(err.full_message(), "failed to write config: disk full");
    }

    #[test]
    fn action_error_without_source_has_plain_full_message() {
        let err = ActionError::new("swapon -a failed");

        assert_eq!(err.full_message(), "swapon -a failed");
        assert!(StdError::source(&err).is_none());
    }
}
