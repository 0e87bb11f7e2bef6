//! Cross-log continuation (session chaining)
//!
//! Continuing a session starts a new log whose first entries point their
//! `parentUuid` at entries of the previous log. Those references show up as
//! orphan parents of the new log. Detection is a two-phase batch join:
//!
//! 1. Index every pending orphan id → the sessions that cite it.
//! 2. Scan each log once (ascending session id), and on a hit record
//!    "requesting session continues the scanned session".
//!
//! The resulting `later → earlier` map is then folded into ordered chains.

use crate::ingest::record_id;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

/// `session → the session it continues`
pub type Continuations = BTreeMap<String, String>;

/// One session log on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLog {
    pub session_id: String,
    pub path: PathBuf,
}

impl SessionLog {
    /// Session id is the file stem (`<session-id>.jsonl`).
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let session_id = path.file_stem()?.to_str()?.to_string();
        Some(Self { session_id, path })
    }
}

/// List `*.jsonl` logs directly inside `dir`, sorted by session id.
pub fn discover_logs(dir: &Path) -> crate::error::Result<Vec<SessionLog>> {
    let pattern = dir.join("*.jsonl");
    let mut logs: Vec<SessionLog> = glob::glob(&pattern.to_string_lossy())?
        .flatten()
        .filter_map(SessionLog::from_path)
        .collect();
    logs.sort_by(|a, b| a.session_id.cmp(&b.session_id));
    Ok(logs)
}

/// Resolve orphan parent ids to the logs that own them.
///
/// `pending` maps each session to the orphan ids it could not resolve
/// internally. Logs that are unreadable or empty are skipped; a session
/// whose orphans are never found stays unlinked. When a session's orphans
/// resolve into several logs, the last log in scan order wins.
pub fn detect_continuations(
    pending: &BTreeMap<String, Vec<String>>,
    logs: &[SessionLog],
) -> Continuations {
    let mut requesters: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    for (session_id, orphans) in pending {
        for orphan in orphans {
            requesters
                .entry(orphan.as_str())
                .or_default()
                .insert(session_id.as_str());
        }
    }

    let mut continues = Continuations::new();
    if requesters.is_empty() {
        return continues;
    }

    let mut remaining: HashSet<&str> = requesters.keys().copied().collect();

    let mut ordered: Vec<&SessionLog> = logs.iter().collect();
    ordered.sort_by(|a, b| a.session_id.cmp(&b.session_id));

    for log in ordered {
        if remaining.is_empty() {
            break;
        }

        let bytes = match std::fs::read(&log.path) {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(path = %log.path.display(), error = %e, "Skipping unreadable log");
                continue;
            }
        };

        for raw_line in bytes.split(|b| *b == b'\n') {
            let Some(id) = record_id(&String::from_utf8_lossy(raw_line)) else {
                continue;
            };
            if !remaining.remove(id.as_str()) {
                continue;
            }

            for requester in &requesters[id.as_str()] {
                if *requester == log.session_id {
                    continue;
                }
                continues.insert(requester.to_string(), log.session_id.clone());
            }
        }
    }

    tracing::debug!(
        links = continues.len(),
        unresolved = remaining.len(),
        "Detected session continuations"
    );

    continues
}

/// Sessions linked by continuation, earliest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chain {
    sessions: Vec<String>,
}

impl Chain {
    /// `None` for an empty session list; a chain always has a head.
    pub fn new(sessions: Vec<String>) -> Option<Self> {
        if sessions.is_empty() {
            None
        } else {
            Some(Self { sessions })
        }
    }

    pub fn head(&self) -> &str {
        self.sessions.first().map_or("", String::as_str)
    }

    pub fn sessions(&self) -> &[String] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// More than one session.
    pub fn is_linked(&self) -> bool {
        self.sessions.len() > 1
    }
}

/// Fold continuation links into ordered chains.
///
/// Heads are sessions that continue nothing; they are visited in ascending
/// id order. If two sessions continue the same predecessor, the smaller id
/// stays in the chain and the other starts a chain of its own, so every
/// session appears in exactly one chain.
pub fn build_chains(continues: &Continuations) -> Vec<Chain> {
    let mut all_sessions: BTreeSet<&str> = BTreeSet::new();
    let mut continued_by: BTreeMap<&str, &str> = BTreeMap::new();

    for (session, previous) in continues {
        all_sessions.insert(session.as_str());
        all_sessions.insert(previous.as_str());
        continued_by.entry(previous.as_str()).or_insert(session.as_str());
    }

    let is_head = |session: &str| match continues.get(session) {
        None => true,
        Some(previous) => continued_by.get(previous.as_str()) != Some(&session),
    };

    let mut chains = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for head in all_sessions.iter().copied().filter(|s| is_head(*s)) {
        if !seen.insert(head) {
            continue;
        }
        let mut sessions = vec![head.to_string()];
        let mut current = head;
        while let Some(next) = continued_by.get(current).copied() {
            if !seen.insert(next) {
                break;
            }
            sessions.push(next.to_string());
            current = next;
        }
        chains.extend(Chain::new(sessions));
    }

    chains
}

/// Sessions that belong to a chain of two or more.
pub fn linked_sessions(chains: &[Chain]) -> HashSet<&str> {
    chains
        .iter()
        .filter(|c| c.is_linked())
        .flat_map(|c| c.sessions().iter().map(String::as_str))
        .collect()
}
