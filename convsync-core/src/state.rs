//! Per-session sync state
//!
//! The state is a cache: it decides whether a log needs re-rendering and
//! carries the orphan list into chain detection. Chain detection itself
//! always re-scans the logs. Unreadable or corrupt state reads as absent.

use crate::error::{Error, Result};
use crate::types::ActiveBranch;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What was derived from a log the last time it was processed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    /// Byte length of the log when processed
    pub file_size: u64,
    /// Active leaf of the last root
    pub leaf_uuid: Option<String>,
    /// First raw timestamp on the active branches
    pub first_ts: Option<String>,
    /// Last raw timestamp on the active branches
    pub last_ts: Option<String>,
    /// Parent ids that live in some other log
    pub orphan_parents: Vec<String>,
    /// Messages rendered; absent in state written before counts were kept
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_count: Option<usize>,
}

impl SessionState {
    pub fn from_branch(branch: &ActiveBranch) -> Self {
        Self {
            file_size: branch.file_size,
            leaf_uuid: branch.active_leaf.clone(),
            first_ts: branch.first_timestamp.clone(),
            last_ts: branch.last_timestamp.clone(),
            orphan_parents: branch.orphan_parents.clone(),
            message_count: Some(branch.messages.len()),
        }
    }

    /// Processed and produced something to show.
    pub fn has_messages(&self) -> bool {
        match self.message_count {
            Some(count) => count > 0,
            None => self.leaf_uuid.is_some(),
        }
    }
}

/// Get/put access to session state, keyed by session id.
pub trait StateStore {
    /// Stored state, or `None` when missing or unreadable.
    fn get(&self, session_id: &str) -> Option<SessionState>;

    fn put(&self, session_id: &str, state: &SessionState) -> Result<()>;

    /// Every readable state, sorted by session id.
    fn list(&self) -> Vec<(String, SessionState)>;
}

/// State stored as `<dir>/<session_id>.json`.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    dir: PathBuf,
}

impl JsonStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", session_id))
    }

    fn read(path: &Path) -> Option<SessionState> {
        let content = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(state) => Some(state),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Ignoring corrupt state");
                None
            }
        }
    }
}

impl StateStore for JsonStateStore {
    fn get(&self, session_id: &str) -> Option<SessionState> {
        Self::read(&self.path_for(session_id))
    }

    fn put(&self, session_id: &str, state: &SessionState) -> Result<()> {
        let path = self.path_for(session_id);
        let json = serde_json::to_string(state)?;
        std::fs::write(&path, json).map_err(|e| Error::file(&path, e))
    }

    fn list(&self) -> Vec<(String, SessionState)> {
        let Ok(read_dir) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        let mut states: Vec<(String, SessionState)> = read_dir
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| {
                let session_id = path.file_stem()?.to_str()?.to_string();
                Self::read(&path).map(|state| (session_id, state))
            })
            .collect();

        states.sort_by(|a, b| a.0.cmp(&b.0));
        states
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> SessionState {
        SessionState {
            file_size: 42,
            leaf_uuid: Some("leaf".to_string()),
            first_ts: Some("2025-11-25T09:00:00Z".to_string()),
            last_ts: Some("2025-11-25T09:05:00Z".to_string()),
            orphan_parents: vec!["elsewhere".to_string()],
            message_count: Some(3),
        }
    }

    #[test]
    fn test_put_then_get() {
        let dir = TempDir::new().unwrap();
        let store = JsonStateStore::new(dir.path());

        store.put("s1", &sample()).unwrap();
        assert_eq!(store.get("s1"), Some(sample()));
        assert_eq!(store.get("s2"), None);
    }

    #[test]
    fn test_corrupt_state_reads_as_absent() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        let store = JsonStateStore::new(dir.path());

        assert_eq!(store.get("bad"), None);
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_list_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        let store = JsonStateStore::new(dir.path());
        store.put("zz", &sample()).unwrap();
        store.put("aa", &SessionState::default()).unwrap();
        std::fs::write(dir.path().join("readme.txt"), "x").unwrap();

        let ids: Vec<String> = store.list().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["aa", "zz"]);
    }

    #[test]
    fn test_reads_state_without_message_count() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("old.json"),
            r#"{"file_size": 10, "leaf_uuid": "x", "first_ts": null, "last_ts": null, "orphan_parents": []}"#,
        )
        .unwrap();
        let store = JsonStateStore::new(dir.path());

        let state = store.get("old").unwrap();
        assert_eq!(state.file_size, 10);
        assert_eq!(state.message_count, None);
        assert!(state.has_messages());
    }

    #[test]
    fn test_has_messages() {
        let mut state = sample();
        assert!(state.has_messages());
        state.message_count = Some(0);
        assert!(!state.has_messages());
        assert!(!SessionState::default().has_messages());
    }
}
