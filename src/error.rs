use std::io;

use thiserror::Error;

/// Errors returned by the process supervisor
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The current operating system has no known way to invoke the command
    #[error("unsupported platform `{os}`: don't know how to invoke `{command}`")]
    UnsupportedPlatform { os: String, command: String },

    /// A job is already active under this supervisor
    #[error("a job is already running")]
    AlreadyRunning,

    /// The previous job finished and the supervisor has not been reset
    #[error("the previous job has finished; reset the supervisor before starting another")]
    Finished,

    /// The operating system refused to start the process
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// Collecting the exit status or killing the process failed
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Errors produced while building the training configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// One or more values failed validation
    #[error("invalid training configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),

    /// An encoding label that is not known to the decoder
    #[error("unknown encoding label `{0}`")]
    UnknownEncoding(String),
}
