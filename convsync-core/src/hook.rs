//! Hook input resolution
//!
//! The assistant runs the hook with a JSON object on stdin. Every field is
//! optional and each has a fallback:
//!
//! | Field | Fallback |
//! |-------|----------|
//! | `cwd` | project owning the installed binary, then the process cwd |
//! | `transcript_path` | search `<claude_projects>/**/<session_id>.jsonl` |
//! | `session_id` | stem of the transcript file |

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Stdin payload of a hook invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HookInput {
    pub cwd: Option<String>,
    pub transcript_path: Option<String>,
    pub session_id: Option<String>,
}

/// Everything needed to sync one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookTarget {
    pub project_root: PathBuf,
    pub transcript: PathBuf,
    pub session_id: String,
}

impl HookInput {
    /// Parse hook input; empty or invalid input yields an empty input.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::default();
        }
        serde_json::from_str(raw).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Ignoring unparseable hook input");
            Self::default()
        })
    }

    pub fn read_from(mut reader: impl Read) -> Self {
        let mut raw = String::new();
        match reader.read_to_string(&mut raw) {
            Ok(_) => Self::parse(&raw),
            Err(e) => {
                tracing::debug!(error = %e, "Failed to read hook input");
                Self::default()
            }
        }
    }

    fn field(value: &Option<String>) -> Option<&str> {
        value.as_deref().filter(|s| !s.is_empty())
    }

    /// Directory whose conversation history is updated.
    pub fn project_root(&self) -> PathBuf {
        if let Some(cwd) = Self::field(&self.cwd).map(PathBuf::from) {
            if cwd.is_dir() {
                return cwd;
            }
        }

        if let Some(root) = std::env::current_exe()
            .ok()
            .and_then(|exe| install_project_root(&exe))
        {
            return root;
        }

        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }

    /// The session log: the given path if it exists, otherwise a search by
    /// session id under `claude_projects`.
    pub fn find_transcript(&self, claude_projects: &Path) -> Option<PathBuf> {
        if let Some(path) = Self::field(&self.transcript_path).map(PathBuf::from) {
            if path.exists() {
                return Some(path);
            }
        }

        let session_id = Self::field(&self.session_id)?;
        search_transcript(claude_projects, session_id)
    }

    /// Session id from the input, or the transcript file stem.
    pub fn session_id_for(&self, transcript: &Path) -> String {
        Self::field(&self.session_id)
            .map(str::to_string)
            .or_else(|| {
                transcript
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
            })
            .unwrap_or_default()
    }

    /// Resolve project, transcript and session id.
    pub fn resolve(&self, claude_projects: &Path) -> Result<HookTarget> {
        let transcript = self.find_transcript(claude_projects).ok_or_else(|| {
            Error::TranscriptNotFound(
                Self::field(&self.session_id)
                    .unwrap_or("<unknown>")
                    .to_string(),
            )
        })?;

        Ok(HookTarget {
            project_root: self.project_root(),
            session_id: self.session_id_for(&transcript),
            transcript,
        })
    }
}

/// `<project>/.claude/hooks/<binary>` → `<project>`
fn install_project_root(exe: &Path) -> Option<PathBuf> {
    let hooks = exe.parent()?;
    let claude = hooks.parent()?;
    if claude.file_name()? != ".claude" {
        return None;
    }
    claude.parent().map(Path::to_path_buf)
}

fn search_transcript(root: &Path, session_id: &str) -> Option<PathBuf> {
    if !root.is_dir() {
        return None;
    }

    let pattern = format!(
        "{}/**/{}.jsonl",
        glob::Pattern::escape(&root.to_string_lossy()),
        glob::Pattern::escape(session_id)
    );

    match glob::glob(&pattern) {
        Ok(paths) => paths.flatten().next(),
        Err(e) => {
            tracing::debug!(%pattern, error = %e, "Invalid transcript search pattern");
            None
        }
    }
}

/// Completion signal printed on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookOutput {
    pub suppress_output: bool,
}

impl HookOutput {
    pub fn suppress() -> Self {
        Self {
            suppress_output: true,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"suppressOutput":true}"#.to_string())
    }
}
