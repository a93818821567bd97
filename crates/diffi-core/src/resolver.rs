use std::path::Path;

use diffi_git::{resolve_working_tree_changes, FileChange, GitError};

/// A blocking change computation the poller runs on every tick.
pub trait ChangeResolver: Send + Sync {
    fn resolve(&self, repo: &Path) -> Result<Vec<FileChange>, GitError>;
}

impl<F> ChangeResolver for F
where
    F: Fn(&Path) -> Result<Vec<FileChange>, GitError> + Send + Sync,
{
    fn resolve(&self, repo: &Path) -> Result<Vec<FileChange>, GitError> {
        self(repo)
    }
}

/// Working tree changes against HEAD, plus untracked files.
#[derive(Debug, Clone)]
pub struct WorkingTreeResolver {
    include_untracked: bool,
    images_only: bool,
}

impl Default for WorkingTreeResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkingTreeResolver {
    pub fn new() -> Self {
        Self {
            include_untracked: true,
            images_only: false,
        }
    }

    pub fn with_untracked(mut self, include: bool) -> Self {
        self.include_untracked = include;
        self
    }

    /// Keep only paths with an image extension
    pub fn images_only(mut self, enabled: bool) -> Self {
        self.images_only = enabled;
        self
    }
}

impl ChangeResolver for WorkingTreeResolver {
    fn resolve(&self, repo: &Path) -> Result<Vec<FileChange>, GitError> {
        let mut changes = resolve_working_tree_changes(repo, self.include_untracked)?;
        if self.images_only {
            changes.retain(FileChange::is_image);
        }
        Ok(changes)
    }
}
