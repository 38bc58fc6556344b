use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HostError {
    #[error("failed to spawn '{program}'")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with {}: {stderr}", exit_status(*code))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("required tool '{0}' not found on PATH")]
    MissingTool(String),

    #[error("failed to read '{path}'")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write '{path}'")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove '{path}'")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no supported package manager found (tried apt-get, dnf, yum)")]
    NoPackageManager,

    #[error("unexpected output from '{command}': {detail}")]
    UnexpectedOutput { command: String, detail: String },
}

pub type Result<T> = std::result::Result<T, HostError>;

fn exit_status(code: Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| format!("status {c}"))
}
