//! Rendering of change lists on stdout.

use std::io::Write;

use anyhow::Result;
use colored::Colorize;

use diffi_git::{ChangeStatus, FileChange};

/// Print changes as `git diff --name-status` lines, or as a JSON array.
pub fn print_changes(changes: &[FileChange], json: bool) -> Result<()> {
    let mut stdout = std::io::stdout().lock();

    if json {
        writeln!(stdout, "{}", serde_json::to_string(changes)?)?;
        return Ok(());
    }

    for change in changes {
        writeln!(stdout, "{}\t{}", styled_code(change.status()), change.path())?;
    }
    Ok(())
}

fn styled_code(status: ChangeStatus) -> String {
    let code = status.code().to_string();
    match status {
        ChangeStatus::Added | ChangeStatus::Untracked => code.green().to_string(),
        ChangeStatus::Deleted => code.red().to_string(),
        ChangeStatus::Conflicted | ChangeStatus::Unreadable => code.bright_red().bold().to_string(),
        ChangeStatus::Ignored => code.dimmed().to_string(),
        _ => code.yellow().to_string(),
    }
}

/// Status and path of every change. [`FileChange`] equality only looks at
/// the path, so this is what the watcher compares between polls.
pub fn fingerprint(changes: &[FileChange]) -> Vec<(ChangeStatus, String)> {
    changes
        .iter()
        .map(|change| (change.status(), change.path().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(status: ChangeStatus, path: &str) -> FileChange {
        FileChange::new(status, path).unwrap()
    }

    #[test]
    fn test_fingerprint_sees_status_changes() {
        let before = vec![change(ChangeStatus::Added, "logo.png")];
        let after = vec![change(ChangeStatus::Modified, "logo.png")];

        assert_eq!(before, after);
        assert_ne!(fingerprint(&before), fingerprint(&after));
    }

    #[test]
    fn test_fingerprint_keeps_order() {
        let changes = vec![
            change(ChangeStatus::Modified, "b.png"),
            change(ChangeStatus::Untracked, "a.png"),
        ];

        assert_eq!(
            fingerprint(&changes),
            vec![
                (ChangeStatus::Modified, "b.png".to_string()),
                (ChangeStatus::Untracked, "a.png".to_string()),
            ]
        );
    }
}
