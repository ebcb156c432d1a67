//! Working-repository sync: stage, conditionally commit, push.
//!
//! A clean tree is a legitimate "nothing to do" outcome, not an error.
//! The version-control CLI sits behind [`RepoClient`] for the same
//! reason the registry does: the policy is testable against a fake.

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::utils::command;

/// Operations bedrockup needs from the version-control tooling.
pub trait RepoClient {
    fn stage_all(&self) -> Result<()>;
    fn has_staged_changes(&self) -> Result<bool>;
    fn commit(&self, message: &str) -> Result<()>;
    fn push(&self) -> Result<()>;
}

/// [`RepoClient`] backed by the local `git` CLI.
pub struct GitClient;

impl RepoClient for GitClient {
    fn stage_all(&self) -> Result<()> {
        command::run("git", &["add", "-A"], "git add")
            .map_err(|e| Error::git_command_failed(e.to_string()))?;
        Ok(())
    }

    fn has_staged_changes(&self) -> Result<bool> {
        let status = command::run("git", &["status", "--porcelain=v1"], "git status")
            .map_err(|e| Error::git_command_failed(e.to_string()))?;
        Ok(has_staged_entries(&status))
    }

    fn commit(&self, message: &str) -> Result<()> {
        command::run("git", &["commit", "-m", message], "git commit")
            .map_err(|e| Error::git_command_failed(e.to_string()))?;
        Ok(())
    }

    fn push(&self) -> Result<()> {
        command::run("git", &["push"], "git push")
            .map_err(|e| Error::git_command_failed(e.to_string()))?;
        Ok(())
    }
}

/// Staged entries have a non-space, non-`?` character in the first
/// status column.
pub fn has_staged_entries(porcelain_status: &str) -> bool {
    porcelain_status.lines().any(|line| {
        let first_char = line.chars().next().unwrap_or(' ');
        first_char != ' ' && first_char != '?'
    })
}

/// Commit message derived from the run timestamp.
pub fn commit_message(at: DateTime<Local>) -> String {
    format!("Auto-build-{}", at.format("%Y-%m-%d_%H-%M-%S"))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub committed: bool,
    pub pushed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
}

/// Stage everything; commit and push only when something is staged.
pub fn sync(repo: &dyn RepoClient) -> Result<SyncReport> {
    repo.stage_all()?;

    if !repo.has_staged_changes()? {
        log_status!("sync", "No staged changes; skipping commit and push");
        return Ok(SyncReport {
            committed: false,
            pushed: false,
            commit_message: None,
        });
    }

    let message = commit_message(Local::now());
    log_status!("sync", "Committing: {}", message);
    repo.commit(&message)?;
    repo.push()?;

    Ok(SyncReport {
        committed: true,
        pushed: true,
        commit_message: Some(message),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::cell::RefCell;

    #[test]
    fn staged_entries_detected_in_first_column() {
        assert!(has_staged_entries("M  src/main.rs"));
        assert!(has_staged_entries("A  new-file.txt"));
        assert!(has_staged_entries("D  gone.txt"));
        assert!(has_staged_entries("MM both-changed.rs"));
    }

    #[test]
    fn unstaged_and_untracked_are_not_staged() {
        assert!(!has_staged_entries(" M src/main.rs"));
        assert!(!has_staged_entries("?? scratch.txt"));
        assert!(!has_staged_entries(""));
        assert!(!has_staged_entries(" M a.rs\n?? b.rs"));
    }

    #[test]
    fn commit_message_uses_timestamp_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 30).unwrap();
        assert_eq!(commit_message(at), "Auto-build-2024-03-09_14-05-30");
    }

    #[derive(Default)]
    struct FakeRepo {
        calls: RefCell<Vec<String>>,
        staged: bool,
        fail_push: bool,
    }

    impl RepoClient for FakeRepo {
        fn stage_all(&self) -> Result<()> {
            self.calls.borrow_mut().push("stage_all".to_string());
            Ok(())
        }

        fn has_staged_changes(&self) -> Result<bool> {
            self.calls.borrow_mut().push("has_staged".to_string());
            Ok(self.staged)
        }

        fn commit(&self, message: &str) -> Result<()> {
            self.calls.borrow_mut().push(format!("commit:{}", message));
            Ok(())
        }

        fn push(&self) -> Result<()> {
            self.calls.borrow_mut().push("push".to_string());
            if self.fail_push {
                return Err(Error::git_command_failed("push rejected"));
            }
            Ok(())
        }
    }

    #[test]
    fn clean_tree_skips_commit_and_push() {
        let repo = FakeRepo::default();
        let report = sync(&repo).unwrap();
        assert!(!report.committed);
        assert!(!report.pushed);
        assert_eq!(repo.calls.borrow().as_slice(), ["stage_all", "has_staged"]);
    }

    #[test]
    fn staged_changes_are_committed_and_pushed() {
        let repo = FakeRepo {
            staged: true,
            ..Default::default()
        };
        let report = sync(&repo).unwrap();
        assert!(report.committed);
        assert!(report.pushed);
        let calls = repo.calls.borrow();
        assert!(calls[2].starts_with("commit:Auto-build-"));
        assert_eq!(calls[3], "push");
    }

    #[test]
    fn push_failure_surfaces_as_error() {
        let repo = FakeRepo {
            staged: true,
            fail_push: true,
            ..Default::default()
        };
        assert!(sync(&repo).is_err());
    }
}
