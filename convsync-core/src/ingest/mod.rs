//! Ingestion of session logs
//!
//! Every invocation re-derives the active branch from the complete log:
//!
//! ```text
//! ┌──────────────┐   ┌────────────┐   ┌──────────┐   ┌──────────────┐
//! │  JSONL log   │──►│  record.rs │──►│ forest.rs│──►│  branch.rs   │
//! │ (append-only)│   │  (Entry)   │   │ (arena)  │   │ (per root)   │
//! └──────────────┘   └────────────┘   └──────────┘   └──────────────┘
//!                                           │                │
//!                                           ▼                ▼
//!                                     orphan parents    messages, leaf,
//!                                                       first/last ts
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use convsync_core::ingest::extract_active_branch;
//! use std::path::Path;
//!
//! let branch = extract_active_branch(Path::new("session.jsonl"))?;
//! println!("{} messages, leaf {:?}", branch.messages.len(), branch.active_leaf);
//! # Ok::<(), convsync_core::Error>(())
//! ```

mod branch;
mod forest;
mod record;

pub use branch::{resolve_branches, Branch};
pub use forest::{Ancestors, Forest};
pub use record::{human_first_line, parse_entry, record_id};

use crate::error::{Error, Result};
use crate::types::{ActiveBranch, Entry};
use std::path::Path;

/// Read a log and resolve its active branch across all roots.
pub fn extract_active_branch(path: &Path) -> Result<ActiveBranch> {
    let bytes = std::fs::read(path).map_err(|e| Error::file(path, e))?;
    let branch = extract_from_bytes(&bytes);

    tracing::debug!(
        path = %path.display(),
        file_size = branch.file_size,
        messages = branch.messages.len(),
        orphans = branch.orphan_parents.len(),
        warnings = branch.warnings.len(),
        "Extracted active branch"
    );

    Ok(branch)
}

/// Resolve the active branch of an in-memory log.
pub fn extract_from_bytes(bytes: &[u8]) -> ActiveBranch {
    let (entries, warnings) = parse_entries(bytes);
    let forest = Forest::build(entries);

    let mut result = ActiveBranch {
        file_size: bytes.len() as u64,
        orphan_parents: forest.orphan_parents(),
        warnings,
        ..Default::default()
    };

    for branch in resolve_branches(&forest) {
        result.messages.extend(branch.messages());

        for ts in branch.timestamps() {
            if result.first_timestamp.is_none() {
                result.first_timestamp = Some(ts.to_string());
            }
            result.last_timestamp = Some(ts.to_string());
        }

        result.active_leaf = Some(branch.leaf.id.clone());
    }

    result
}

/// Parse every line, skipping blank lines, records without an id and
/// malformed lines (the latter reported as warnings).
fn parse_entries(bytes: &[u8]) -> (Vec<Entry>, Vec<String>) {
    let mut entries = Vec::new();
    let mut warnings = Vec::new();

    for (index, raw_line) in bytes.split(|b| *b == b'\n').enumerate() {
        let line = String::from_utf8_lossy(raw_line);
        match parse_entry(&line, index) {
            Ok(Some(entry)) => entries.push(entry),
            Ok(None) => {}
            Err(e) => {
                warnings.push(format!("Line {}: JSON parse error: {}", index + 1, e));
            }
        }
    }

    (entries, warnings)
}

/// First line of the first human message in physical log order,
/// truncated to `max_chars`.
pub fn first_human_line(path: &Path, max_chars: usize) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    bytes
        .split(|b| *b == b'\n')
        .find_map(|raw| human_first_line(&String::from_utf8_lossy(raw)))
        .map(|line| crate::format::truncate_chars(&line, max_chars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    const LINEAR: &str = r#"{"type":"file-history-snapshot","messageId":"m0","snapshot":{}}
{"uuid":"u1","parentUuid":null,"type":"user","timestamp":"2025-11-25T09:00:00Z","message":{"role":"user","content":"Hello"}}
{"uuid":"a1","parentUuid":"u1","type":"assistant","timestamp":"2025-11-25T09:00:03Z","message":{"role":"assistant","content":[{"type":"text","text":"Hi!"}]}}
"#;

    #[test]
    fn test_extract_linear_log() {
        let branch = extract_from_bytes(LINEAR.as_bytes());

        assert_eq!(branch.messages.len(), 2);
        assert_eq!(branch.messages[0].role, Role::Human);
        assert_eq!(branch.messages[0].text, "Hello");
        assert_eq!(branch.messages[0].time.as_deref(), Some("2025-11-25 09:00:00"));
        assert_eq!(branch.messages[1].text, "Hi!");
        assert_eq!(branch.active_leaf.as_deref(), Some("a1"));
        assert_eq!(branch.first_timestamp.as_deref(), Some("2025-11-25T09:00:00Z"));
        assert_eq!(branch.last_timestamp.as_deref(), Some("2025-11-25T09:00:03Z"));
        assert_eq!(branch.file_size, LINEAR.len() as u64);
        assert!(branch.orphan_parents.is_empty());
        assert!(branch.warnings.is_empty());
    }

    #[test]
    fn test_extract_skips_malformed_lines() {
        let raw = format!("{}{{\"uuid\":\"broken\n", LINEAR);
        let branch = extract_from_bytes(raw.as_bytes());

        assert_eq!(branch.messages.len(), 2);
        assert_eq!(branch.warnings.len(), 1);
        assert!(branch.warnings[0].starts_with("Line 4:"));
    }

    #[test]
    fn test_extract_empty_log() {
        let branch = extract_from_bytes(b"");
        assert!(branch.messages.is_empty());
        assert_eq!(branch.active_leaf, None);
        assert_eq!(branch.first_timestamp, None);
        assert_eq!(branch.last_timestamp, None);
        assert_eq!(branch.file_size, 0);
    }

    #[test]
    fn test_extract_textless_log_keeps_leaf() {
        let raw = r#"{"uuid":"u1","type":"user","message":{"content":[{"type":"tool_result","content":"x"}]}}
{"uuid":"s1","parentUuid":"u1","type":"system"}
"#;
        let branch = extract_from_bytes(raw.as_bytes());
        assert!(branch.is_silent());
        assert_eq!(branch.active_leaf.as_deref(), Some("s1"));
    }

    #[test]
    fn test_extract_reports_orphans() {
        let raw = r#"{"uuid":"u9","parentUuid":"from-previous-session","type":"user","message":{"content":"continue"}}
"#;
        let branch = extract_from_bytes(raw.as_bytes());
        assert_eq!(branch.orphan_parents, vec!["from-previous-session".to_string()]);
        assert_eq!(branch.messages.len(), 1);
    }

    #[test]
    fn test_extract_keeps_record_with_numeric_timestamp() {
        let raw = r#"{"uuid":"u1","type":"user","timestamp":"2025-11-25T09:00:00Z","message":{"content":"Hello"}}
{"uuid":"m","parentUuid":"u1","type":"assistant","timestamp":1732525200,"message":{"content":[{"type":"text","text":"middle"}]}}
{"uuid":"a2","parentUuid":"m","type":"assistant","timestamp":"2025-11-25T09:00:09Z","message":{"content":[{"type":"text","text":"after"}]}}
"#;
        let branch = extract_from_bytes(raw.as_bytes());

        let texts: Vec<&str> = branch.messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello", "middle", "after"]);
        assert_eq!(branch.messages[1].time, None);
        assert!(branch.orphan_parents.is_empty());
        assert!(branch.warnings.is_empty());
        assert_eq!(branch.last_timestamp.as_deref(), Some("2025-11-25T09:00:09Z"));
    }

    #[test]
    fn test_extract_is_idempotent() {
        assert_eq!(
            extract_from_bytes(LINEAR.as_bytes()),
            extract_from_bytes(LINEAR.as_bytes())
        );
    }

    #[test]
    fn test_first_human_line_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.jsonl");
        std::fs::write(
            &path,
            "{\"uuid\":\"a0\",\"type\":\"assistant\",\"message\":{\"content\":\"first?\"}}\nnot json\n{\"uuid\":\"u1\",\"type\":\"user\",\"message\":{\"content\":\"Refactor the chain detector\\nsecond line\"}}\n",
        )
        .unwrap();

        assert_eq!(
            first_human_line(&path, 8),
            Some("Refactor".to_string())
        );
        assert_eq!(
            first_human_line(&path, 100),
            Some("Refactor the chain detector".to_string())
        );
        assert_eq!(first_human_line(&dir.path().join("missing.jsonl"), 100), None);
    }
}
