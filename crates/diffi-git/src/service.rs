//! One-shot operations that open the repository, resolve, and close it again.

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use crate::diff::{ChangeStatus, FileChange};
use crate::error::GitError;
use crate::repo::Repo;

/// Changes between two revisions of the repository at `path`.
pub fn resolve_diff(path: &Path, from: &str, to: &str) -> Result<Vec<FileChange>, GitError> {
    let repo = Repo::open(path)?;
    let result = repo.diff_trees(from, to);
    repo.close();
    result
}

/// Changes between HEAD and the index plus working directory.
pub fn resolve_working_tree_diff(path: &Path) -> Result<Vec<FileChange>, GitError> {
    let repo = Repo::open(path)?;
    let result = repo.diff_working_tree();
    repo.close();
    result
}

pub fn resolve_status(
    path: &Path,
    include_untracked: bool,
    include_ignored: bool,
) -> Result<Vec<FileChange>, GitError> {
    let repo = Repo::open(path)?;
    let result = repo.status(include_untracked, include_ignored);
    repo.close();
    result
}

/// Working tree diff followed by untracked files that the diff did not list.
///
/// This is what a watcher shows: tracked edits in path order, then new files
/// nobody has staged yet.
pub fn resolve_working_tree_changes(
    path: &Path,
    include_untracked: bool,
) -> Result<Vec<FileChange>, GitError> {
    let repo = Repo::open(path)?;
    let result = working_tree_changes(&repo, include_untracked);
    repo.close();
    result
}

fn working_tree_changes(
    repo: &Repo,
    include_untracked: bool,
) -> Result<Vec<FileChange>, GitError> {
    let mut changes = repo.diff_working_tree()?;

    if include_untracked {
        let seen: HashSet<String> = changes.iter().map(|c| c.path().to_string()).collect();
        let untracked: Vec<FileChange> = repo
            .status(true, false)?
            .into_iter()
            .filter(|c| c.status() == ChangeStatus::Untracked && !seen.contains(c.path()))
            .collect();

        debug!(
            tracked = changes.len(),
            untracked = untracked.len(),
            "Merged untracked files"
        );
        changes.extend(untracked);
    }

    Ok(changes)
}

/// Content of `file` at `revspec`.
pub fn show_file(path: &Path, revspec: &str, file: &str) -> Result<Vec<u8>, GitError> {
    let repo = Repo::open(path)?;
    let result = repo.blob_at(revspec, file);
    repo.close();
    result
}
