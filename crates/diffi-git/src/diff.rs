use std::hash::{Hash, Hasher};
use std::path::Path;

use git2::{Delta, Diff, Tree};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GitError;
use crate::repo::Repo;

const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "tiff", "tif", "webp", "ico", "svg",
];

/// Normalized classification of a changed path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Unmodified,
    Added,
    Deleted,
    Modified,
    Renamed,
    Copied,
    Ignored,
    Untracked,
    Typechange,
    Unreadable,
    Conflicted,
    Unknown,
}

impl ChangeStatus {
    /// Single-character code as printed by `git diff --name-status`.
    pub fn code(self) -> char {
        match self {
            ChangeStatus::Unmodified => ' ',
            ChangeStatus::Added => 'A',
            ChangeStatus::Deleted => 'D',
            ChangeStatus::Modified => 'M',
            ChangeStatus::Renamed => 'R',
            ChangeStatus::Copied => 'C',
            ChangeStatus::Ignored => '!',
            ChangeStatus::Untracked | ChangeStatus::Unknown => '?',
            ChangeStatus::Typechange => 'T',
            ChangeStatus::Unreadable => 'X',
            ChangeStatus::Conflicted => 'U',
        }
    }

    /// Inverse of [`ChangeStatus::code`]. `?` reads back as untracked; any
    /// unrecognized character is `Unknown`.
    pub fn from_code(code: char) -> Self {
        match code {
            ' ' => ChangeStatus::Unmodified,
            'A' => ChangeStatus::Added,
            'D' => ChangeStatus::Deleted,
            'M' => ChangeStatus::Modified,
            'R' => ChangeStatus::Renamed,
            'C' => ChangeStatus::Copied,
            '!' => ChangeStatus::Ignored,
            '?' => ChangeStatus::Untracked,
            'T' => ChangeStatus::Typechange,
            'X' => ChangeStatus::Unreadable,
            'U' => ChangeStatus::Conflicted,
            _ => ChangeStatus::Unknown,
        }
    }
}

impl From<Delta> for ChangeStatus {
    fn from(delta: Delta) -> Self {
        match delta {
            Delta::Unmodified => ChangeStatus::Unmodified,
            Delta::Added => ChangeStatus::Added,
            Delta::Deleted => ChangeStatus::Deleted,
            Delta::Modified => ChangeStatus::Modified,
            Delta::Renamed => ChangeStatus::Renamed,
            Delta::Copied => ChangeStatus::Copied,
            Delta::Ignored => ChangeStatus::Ignored,
            Delta::Untracked => ChangeStatus::Untracked,
            Delta::Typechange => ChangeStatus::Typechange,
            Delta::Unreadable => ChangeStatus::Unreadable,
            Delta::Conflicted => ChangeStatus::Conflicted,
        }
    }
}

/// One changed path. Two changes are equal when they name the same path.
///
/// Only built through [`FileChange::new`], so the path is never empty.
#[derive(Debug, Clone, Serialize)]
pub struct FileChange {
    status: ChangeStatus,
    path: String,
}

impl FileChange {
    /// Returns `None` for an empty path.
    pub fn new(status: ChangeStatus, path: impl Into<String>) -> Option<Self> {
        let path = path.into();
        if path.is_empty() {
            return None;
        }
        Some(Self { status, path })
    }

    pub(crate) fn from_path(status: ChangeStatus, path: &Path) -> Option<Self> {
        Self::new(status, path.to_string_lossy().into_owned())
    }

    pub fn status(&self) -> ChangeStatus {
        self.status
    }

    /// New path when the change has one, else the old path.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_image(&self) -> bool {
        Path::new(&self.path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }
}

impl PartialEq for FileChange {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for FileChange {}

impl Hash for FileChange {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl Repo {
    /// Changes between the trees of two revisions, in path order.
    pub fn diff_trees(&self, from: &str, to: &str) -> Result<Vec<FileChange>, GitError> {
        let old_tree = self.revision_tree(from)?;
        let new_tree = self.revision_tree(to)?;

        let changes = self.diff_tree_to_tree(&old_tree, &new_tree)?;
        debug!(from, to, changes = changes.len(), "Resolved tree diff");

        Ok(changes)
    }

    /// Changes between HEAD and the index plus working directory.
    ///
    /// A path that is staged and then edited again shows up once, with its
    /// working-tree state. An unborn HEAD is treated as the empty tree.
    pub fn diff_working_tree(&self) -> Result<Vec<FileChange>, GitError> {
        let head_tree = self.head_tree()?;

        let diff = self
            .inner()
            .diff_tree_to_workdir_with_index(head_tree.as_ref(), None)
            .map_err(|e| GitError::DiffComputationFailed(e.into()))?;

        let changes = collect_changes(&diff);
        debug!(changes = changes.len(), "Resolved working tree diff");

        Ok(changes)
    }

    fn diff_tree_to_tree(
        &self,
        old_tree: &Tree<'_>,
        new_tree: &Tree<'_>,
    ) -> Result<Vec<FileChange>, GitError> {
        let diff = self
            .inner()
            .diff_tree_to_tree(Some(old_tree), Some(new_tree), None)
            .map_err(|e| GitError::DiffComputationFailed(e.into()))?;

        Ok(collect_changes(&diff))
    }
}

fn collect_changes(diff: &Diff<'_>) -> Vec<FileChange> {
    diff.deltas()
        .filter_map(|delta| {
            let path = delta.new_file().path()?;
            FileChange::from_path(delta.status().into(), path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_DELTAS: [Delta; 11] = [
        Delta::Unmodified,
        Delta::Added,
        Delta::Deleted,
        Delta::Modified,
        Delta::Renamed,
        Delta::Copied,
        Delta::Ignored,
        Delta::Untracked,
        Delta::Typechange,
        Delta::Unreadable,
        Delta::Conflicted,
    ];

    #[test]
    fn test_delta_mapping_is_deterministic() {
        for delta in ALL_DELTAS {
            let first = ChangeStatus::from(delta);
            let second = ChangeStatus::from(delta);
            assert_eq!(first, second);
            assert_ne!(first, ChangeStatus::Unknown);
        }
    }

    #[test]
    fn test_delta_mapping_is_injective() {
        let mut seen: Vec<ChangeStatus> = ALL_DELTAS.iter().map(|d| (*d).into()).collect();
        seen.sort_by_key(|s| *s as u8);
        seen.dedup();
        assert_eq!(seen.len(), ALL_DELTAS.len());
    }

    #[test]
    fn test_codes_read_back() {
        for delta in ALL_DELTAS {
            let status = ChangeStatus::from(delta);
            assert_eq!(ChangeStatus::from_code(status.code()), status);
        }
        assert_eq!(ChangeStatus::from_code('Z'), ChangeStatus::Unknown);
        assert_eq!(ChangeStatus::Unknown.code(), '?');
    }

    #[test]
    fn test_empty_path_is_rejected() {
        assert!(FileChange::new(ChangeStatus::Added, "").is_none());
    }

    #[test]
    fn test_accessors_return_constructed_values() {
        let change = FileChange::new(ChangeStatus::Deleted, "assets/old.png").unwrap();
        assert_eq!(change.status(), ChangeStatus::Deleted);
        assert_eq!(change.path(), "assets/old.png");
    }

    #[test]
    fn test_serializes_status_and_path() {
        let change = FileChange::new(ChangeStatus::Untracked, "new.png").unwrap();
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["status"], "untracked");
        assert_eq!(json["path"], "new.png");
    }

    #[test]
    fn test_equality_is_by_path() {
        let a = FileChange::new(ChangeStatus::Added, "a.png").unwrap();
        let b = FileChange::new(ChangeStatus::Modified, "a.png").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_is_image() {
        let change = |p: &str| FileChange::new(ChangeStatus::Modified, p).unwrap();
        assert!(change("assets/logo.PNG").is_image());
        assert!(change("icon.svg").is_image());
        assert!(!change("README.md").is_image());
        assert!(!change("Makefile").is_image());
    }
}
