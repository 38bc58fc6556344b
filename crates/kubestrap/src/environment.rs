use std::io::IsTerminal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NonInteractiveReason {
    ExplicitDisable,
    CiDetected { env_var: String },
    NoTerminal,
}

impl std::fmt::Display for NonInteractiveReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExplicitDisable => write!(f, "KUBESTRAP_NO_TTY is set"),
            Self::CiDetected { env_var } => write!(f, "CI environment detected ({env_var})"),
            Self::NoTerminal => write!(f, "stdin is not a terminal"),
        }
    }
}

pub fn non_interactive_reason() -> Option<NonInteractiveReason> {
    if std::env::var("KUBESTRAP_NO_TTY").is_ok() {
        return Some(NonInteractiveReason::ExplicitDisable);
    }

    if let Some(env_var) = detect_ci_env_var() {
        return Some(NonInteractiveReason::CiDetected { env_var });
    }

    if !std::io::stdin().is_terminal() {
        return Some(NonInteractiveReason::NoTerminal);
    }

    None
}

fn detect_ci_env_var() -> Option<String> {
    const CI_ENV_VARS: &[&str] = &[
        "CI",
        "GITHUB_ACTIONS",
        "GITLAB_CI",
        "JENKINS_URL",
        "BUILDKITE",
        "TF_BUILD",
    ];

    CI_ENV_VARS
        .iter()
        .find(|var| std::env::var(var).is_ok())
        .map(|var| (*var).to_string())
}
