//! Best-effort git history for the conversation directory.
//!
//! Every command runs with a timeout and is killed on expiry. Failures are
//! logged at debug level and otherwise ignored: history is an enrichment
//! and never blocks rendered output.

use crate::format::truncate_chars;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Message of the first commit in a new history.
pub const INIT_MESSAGE: &str = "Init conversation history";

/// Git repository rooted at the conversation directory.
#[derive(Debug, Clone)]
pub struct GitRepo {
    dir: PathBuf,
    timeout: Duration,
}

impl GitRepo {
    pub fn new(dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            dir: dir.into(),
            timeout,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_repo(&self) -> bool {
        self.dir.join(".git").exists()
    }

    /// `git init` plus an empty initial commit, unless already a repository.
    pub fn init(&self) {
        if self.is_repo() {
            return;
        }
        self.run(&["init"]);
        self.run(&["add", "-A"]);
        self.run(&["commit", "--allow-empty", "-m", INIT_MESSAGE]);
    }

    /// Stage everything and commit if anything changed.
    ///
    /// Returns true when a commit was made.
    pub fn commit_all(&self, message: &str) -> bool {
        if self.run(&["add", "-A"]).is_none() {
            return false;
        }

        // `diff --cached --quiet` exits 1 when there are staged changes
        match self.run(&["diff", "--cached", "--quiet"]) {
            Some(status) if !status.success() => {}
            _ => return false,
        }

        self.run(&["commit", "-m", message])
            .is_some_and(|status| status.success())
    }

    /// Commit after a session update.
    pub fn commit_update(&self, session_id: &str, summary: &str) -> bool {
        self.commit_all(&update_message(session_id, summary))
    }

    fn run(&self, args: &[&str]) -> Option<ExitStatus> {
        let mut child = match Command::new("git")
            .args(args)
            .current_dir(&self.dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                tracing::debug!(?args, error = %e, "Failed to spawn git");
                return None;
            }
        };

        match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => {
                if !status.success() {
                    tracing::debug!(?args, %status, "git exited with failure");
                }
                Some(status)
            }
            Ok(None) => {
                tracing::debug!(?args, timeout = ?self.timeout, "git timed out");
                let _ = child.kill();
                let _ = child.wait();
                None
            }
            Err(e) => {
                tracing::debug!(?args, error = %e, "Failed to wait for git");
                let _ = child.kill();
                let _ = child.wait();
                None
            }
        }
    }
}

/// `Update <id8>: <summary[..60]>`
pub fn update_message(session_id: &str, summary: &str) -> String {
    format!(
        "Update {}: {}",
        crate::format::short_id(session_id),
        truncate_chars(summary, 60)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|s| s.success())
    }

    #[test]
    fn test_update_message() {
        let summary = "x".repeat(80);
        let message = update_message("0123456789abcdef", &summary);
        assert_eq!(message, format!("Update 01234567: {}", "x".repeat(60)));
    }

    #[test]
    fn test_failures_are_swallowed() {
        let dir = TempDir::new().unwrap();
        let missing = GitRepo::new(dir.path().join("missing"), Duration::from_secs(5));

        assert!(!missing.commit_update("abc", "nothing here"));
        assert!(!missing.is_repo());
    }

    #[test]
    fn test_init_creates_repository() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let repo = GitRepo::new(dir.path(), Duration::from_secs(5));

        repo.init();
        assert!(repo.is_repo());

        // Second init is a no-op
        repo.init();
        assert!(repo.is_repo());
    }
}
