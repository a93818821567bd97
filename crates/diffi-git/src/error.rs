use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Error code reported by libgit2, or `Unknown` when the failure did not come
/// from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeCode {
    Code(git2::ErrorCode),
    Unknown,
}

/// A store failure with its original code preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError {
    pub code: NativeCode,
    pub message: String,
}

impl NativeError {
    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            code: NativeCode::Unknown,
            message: message.into(),
        }
    }
}

impl From<git2::Error> for NativeError {
    fn from(err: git2::Error) -> Self {
        Self {
            code: NativeCode::Code(err.code()),
            message: err.message().to_string(),
        }
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            NativeCode::Code(code) => write!(f, "{} ({:?})", self.message, code),
            NativeCode::Unknown => write!(f, "{}", self.message),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GitError {
    #[error("Not a git repository: {}", .0.display())]
    NotARepository(PathBuf),

    #[error("Repository unavailable: {0}")]
    RepositoryUnavailable(NativeError),

    #[error("Cannot resolve revision '{revspec}': {error}")]
    UnresolvableReference { revspec: String, error: NativeError },

    #[error("Object lookup failed: {0}")]
    ObjectLookupFailed(NativeError),

    #[error("Diff computation failed: {0}")]
    DiffComputationFailed(NativeError),

    #[error("Status computation failed: {0}")]
    StatusComputationFailed(NativeError),

    /// Filesystem failure outside libgit2. The resolvers here never raise it;
    /// it lets callers that do their own file I/O around a resolution (a
    /// poller resolver reading the files it reports, say) stay in `GitError`
    /// through `?`.
    #[error("IO error: {0}")]
    Io(String),
}

impl GitError {
    /// The underlying libgit2 code, if the store reported one.
    pub fn native_code(&self) -> NativeCode {
        match self {
            GitError::RepositoryUnavailable(e)
            | GitError::UnresolvableReference { error: e, .. }
            | GitError::ObjectLookupFailed(e)
            | GitError::DiffComputationFailed(e)
            | GitError::StatusComputationFailed(e) => e.code,
            GitError::NotARepository(_) => NativeCode::Code(git2::ErrorCode::NotFound),
            GitError::Io(_) => NativeCode::Unknown,
        }
    }
}

impl From<std::io::Error> for GitError {
    fn from(err: std::io::Error) -> Self {
        GitError::Io(err.to_string())
    }
}
