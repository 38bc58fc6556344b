use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid configuration")]
    Config(#[from] kubestrap_operations::ConfigError),

    #[error("host setup failed")]
    Host(#[from] kubestrap_host::HostError),

    #[error("could not start pipeline")]
    Operation(#[from] kubestrap_operations::OperationError),
}

pub type Result<T> = std::result::Result<T, CliError>;
