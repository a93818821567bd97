use git2::{Status, StatusEntry, StatusOptions, StatusShow};
use tracing::debug;

use crate::diff::{ChangeStatus, FileChange};
use crate::error::GitError;
use crate::repo::Repo;

struct StatusRule {
    flag: Status,
    status: ChangeStatus,
}

/// Evaluated top to bottom; the first rule whose flag is set wins.
/// Working-tree flags come before index flags.
const STATUS_RULES: &[StatusRule] = &[
    StatusRule {
        flag: Status::CONFLICTED,
        status: ChangeStatus::Conflicted,
    },
    StatusRule {
        flag: Status::WT_NEW,
        status: ChangeStatus::Untracked,
    },
    StatusRule {
        flag: Status::IGNORED,
        status: ChangeStatus::Ignored,
    },
    StatusRule {
        flag: Status::WT_MODIFIED,
        status: ChangeStatus::Modified,
    },
    StatusRule {
        flag: Status::WT_DELETED,
        status: ChangeStatus::Deleted,
    },
    StatusRule {
        flag: Status::WT_TYPECHANGE,
        status: ChangeStatus::Modified,
    },
    StatusRule {
        flag: Status::INDEX_MODIFIED,
        status: ChangeStatus::Modified,
    },
    StatusRule {
        flag: Status::INDEX_DELETED,
        status: ChangeStatus::Deleted,
    },
    StatusRule {
        flag: Status::INDEX_NEW,
        status: ChangeStatus::Added,
    },
    StatusRule {
        flag: Status::INDEX_TYPECHANGE,
        status: ChangeStatus::Modified,
    },
];

/// Collapse the status flags of one path into a single classification.
/// Combinations no rule covers count as modified.
pub(crate) fn classify(flags: Status) -> ChangeStatus {
    STATUS_RULES
        .iter()
        .find(|rule| flags.intersects(rule.flag))
        .map(|rule| rule.status)
        .unwrap_or(ChangeStatus::Modified)
}

/// Workdir side first, then the index side, then the entry's own path.
fn entry_path(entry: &StatusEntry<'_>) -> Option<String> {
    let workdir = entry
        .index_to_workdir()
        .and_then(|d| d.new_file().path().or_else(|| d.old_file().path()))
        .map(|p| p.to_string_lossy().into_owned());

    workdir
        .or_else(|| {
            entry
                .head_to_index()
                .and_then(|d| d.new_file().path().or_else(|| d.old_file().path()))
                .map(|p| p.to_string_lossy().into_owned())
        })
        .or_else(|| entry.path().map(String::from))
}

impl Repo {
    /// One entry per affected path from the combined index and working tree
    /// scan, in path order.
    pub fn status(
        &self,
        include_untracked: bool,
        include_ignored: bool,
    ) -> Result<Vec<FileChange>, GitError> {
        let mut opts = StatusOptions::new();
        opts.show(StatusShow::IndexAndWorkdir)
            .include_untracked(include_untracked)
            .recurse_untracked_dirs(include_untracked)
            .include_ignored(include_ignored);

        let statuses = self
            .inner()
            .statuses(Some(&mut opts))
            .map_err(|e| GitError::StatusComputationFailed(e.into()))?;

        let changes: Vec<FileChange> = statuses
            .iter()
            .filter_map(|entry| {
                let path = entry_path(&entry)?;
                FileChange::new(classify(entry.status()), path)
            })
            .collect();

        debug!(
            entries = statuses.len(),
            changes = changes.len(),
            include_untracked,
            include_ignored,
            "Resolved status"
        );

        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staged_then_edited_is_modified() {
        assert_eq!(
            classify(Status::INDEX_MODIFIED | Status::WT_MODIFIED),
            ChangeStatus::Modified
        );
        assert_eq!(
            classify(Status::INDEX_NEW | Status::WT_MODIFIED),
            ChangeStatus::Modified
        );
    }

    #[test]
    fn test_single_flags() {
        assert_eq!(classify(Status::WT_NEW), ChangeStatus::Untracked);
        assert_eq!(classify(Status::WT_MODIFIED), ChangeStatus::Modified);
        assert_eq!(classify(Status::WT_DELETED), ChangeStatus::Deleted);
        assert_eq!(classify(Status::INDEX_NEW), ChangeStatus::Added);
        assert_eq!(classify(Status::INDEX_MODIFIED), ChangeStatus::Modified);
        assert_eq!(classify(Status::INDEX_DELETED), ChangeStatus::Deleted);
        assert_eq!(classify(Status::IGNORED), ChangeStatus::Ignored);
        assert_eq!(classify(Status::CONFLICTED), ChangeStatus::Conflicted);
    }

    #[test]
    fn test_typechange_counts_as_modified() {
        assert_eq!(classify(Status::WT_TYPECHANGE), ChangeStatus::Modified);
        assert_eq!(classify(Status::INDEX_TYPECHANGE), ChangeStatus::Modified);
    }

    #[test]
    fn test_workdir_wins_over_index() {
        // added in the index, then removed from disk
        assert_eq!(
            classify(Status::INDEX_NEW | Status::WT_DELETED),
            ChangeStatus::Deleted
        );
        assert_eq!(
            classify(Status::INDEX_MODIFIED | Status::WT_DELETED),
            ChangeStatus::Deleted
        );
        assert_eq!(
            classify(Status::INDEX_DELETED | Status::WT_NEW),
            ChangeStatus::Untracked
        );
    }

    #[test]
    fn test_unmatched_flags_default_to_modified() {
        assert_eq!(classify(Status::INDEX_RENAMED), ChangeStatus::Modified);
        assert_eq!(classify(Status::empty()), ChangeStatus::Modified);
    }
}
