use diffi_git::GitError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PollError {
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("Resolution task failed: {0}")]
    TaskFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}
