//! Sync coordination for one project
//!
//! The coordinator ties the pieces together:
//! - Extracting the active branch of a log when its size changed
//! - Writing the rendered part and the session state
//! - Detecting chains and regenerating `sessions/` and `index.md`
//! - Backfilling historical logs on the first run
//! - Committing the result to the conversation history
//!
//! ## Usage
//!
//! ```rust,no_run
//! use convsync_core::sync::SyncCoordinator;
//! use convsync_core::Config;
//! use std::path::Path;
//!
//! let config = Config::load()?;
//! let coordinator = SyncCoordinator::open(Path::new("/path/to/project"), &config)?;
//! let report = coordinator.update(Path::new("/path/to/session.jsonl"), "session-id", false)?;
//! println!("updated: {}", report.session.is_updated());
//! # Ok::<(), convsync_core::Error>(())
//! ```

use crate::chain::{build_chains, detect_continuations, discover_logs, linked_sessions, Chain};
use crate::config::{Config, OutputConfig};
use crate::error::{Error, Result};
use crate::format::{format_timestamp_opt, now, TimePrecision};
use crate::ingest::{extract_active_branch, first_human_line};
use crate::render::{self, ChainPart, SessionSummary, NO_SUMMARY};
use crate::state::{JsonStateStore, SessionState, StateStore};
use crate::vcs::GitRepo;
use crate::workspace::ConversationDir;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Counters for a batch of session syncs.
#[derive(Debug, Default)]
pub struct SyncResult {
    /// Sessions re-rendered
    pub sessions_updated: usize,
    /// Sessions whose log size had not changed
    pub sessions_unchanged: usize,
    /// Sessions processed that had nothing to show
    pub sessions_without_messages: usize,
    /// Errors encountered (log path → error message)
    pub errors: Vec<(PathBuf, String)>,
    /// Warnings from parsing
    pub warnings: Vec<String>,
}

impl SyncResult {
    fn record(&mut self, session: &SessionSyncResult) {
        match &session.skip_reason {
            None => self.sessions_updated += 1,
            Some(SkipReason::Unchanged { .. }) => self.sessions_unchanged += 1,
            Some(SkipReason::NoMessages) => self.sessions_without_messages += 1,
        }
        self.warnings.extend(session.warnings.iter().cloned());
    }
}

/// Result of syncing a single log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSyncResult {
    pub session_id: String,
    /// Messages on the active branches
    pub messages: usize,
    /// Warnings from parsing
    pub warnings: Vec<String>,
    /// Reason nothing was rendered (if skipped)
    pub skip_reason: Option<SkipReason>,
}

impl SessionSyncResult {
    pub fn is_updated(&self) -> bool {
        self.skip_reason.is_none()
    }
}

/// Reason a log produced no new rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Log size equals the recorded size
    Unchanged { file_size: u64 },
    /// Processed, but no human or assistant text on the active branches
    NoMessages,
}

/// Outcome of one hook-driven update.
#[derive(Debug)]
pub struct UpdateReport {
    /// Backfill counters, when a backfill ran
    pub backfill: Option<SyncResult>,
    pub session: SessionSyncResult,
    /// A commit was made for this session
    pub committed: bool,
}

/// Syncs logs into one project's conversation directory.
pub struct SyncCoordinator<S: StateStore = JsonStateStore> {
    conv: ConversationDir,
    store: S,
    output: OutputConfig,
    git: Option<GitRepo>,
    first_run: bool,
}

impl SyncCoordinator<JsonStateStore> {
    /// Set up the conversation directory of `project_root`.
    ///
    /// A project whose state dir did not exist yet counts as a first run.
    pub fn open(project_root: &Path, config: &Config) -> Result<Self> {
        let conv = ConversationDir::new(project_root, &config.output.dir_name);
        let first_run = !conv.is_initialized();
        conv.ensure_setup()?;

        let git = config.git.enabled.then(|| {
            let repo = GitRepo::new(conv.root(), Duration::from_secs(config.git.timeout_secs));
            repo.init();
            repo
        });

        tracing::debug!(
            dir = %conv.root().display(),
            first_run,
            git = git.is_some(),
            "Opened conversation directory"
        );

        let store = conv.state_store();
        Ok(Self {
            conv,
            store,
            output: config.output.clone(),
            git,
            first_run,
        })
    }
}

impl<S: StateStore> SyncCoordinator<S> {
    /// Coordinator over an already set-up directory and a custom store.
    pub fn with_store(conv: ConversationDir, store: S, output: OutputConfig) -> Self {
        Self {
            conv,
            store,
            output,
            git: None,
            first_run: false,
        }
    }

    pub fn conversation_dir(&self) -> &ConversationDir {
        &self.conv
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_first_run(&self) -> bool {
        self.first_run
    }

    /// Sync the triggering log, then rebuild and commit if it changed.
    ///
    /// Backfills the log's directory first on a first run or when
    /// `force_backfill` is set.
    pub fn update(&self, log: &Path, session_id: &str, force_backfill: bool) -> Result<UpdateReport> {
        let log_dir = parent_dir(log);

        let backfill = if self.first_run || force_backfill {
            Some(self.backfill(&log_dir)?)
        } else {
            None
        };

        let session = self.sync_session(log, session_id)?;
        let mut committed = false;

        if session.is_updated() {
            self.rebuild_index(&log_dir)?;
            if let (Some(git), Some(summary)) = (
                &self.git,
                first_human_line(log, self.output.summary_chars),
            ) {
                committed = git.commit_update(session_id, &summary);
            }
        }

        tracing::info!(
            session_id,
            updated = session.is_updated(),
            messages = session.messages,
            committed,
            "Session synced"
        );

        Ok(UpdateReport {
            backfill,
            session,
            committed,
        })
    }

    /// Re-render one log if its size changed since the last sync.
    pub fn sync_session(&self, log: &Path, session_id: &str) -> Result<SessionSyncResult> {
        let file_size = std::fs::metadata(log)
            .map_err(|e| Error::file(log, e))?
            .len();

        let previous = self.store.get(session_id);
        if previous.as_ref().is_some_and(|p| p.file_size == file_size) {
            tracing::debug!(session_id, file_size, "Log unchanged, skipping");
            return Ok(SessionSyncResult {
                session_id: session_id.to_string(),
                messages: 0,
                warnings: Vec::new(),
                skip_reason: Some(SkipReason::Unchanged { file_size }),
            });
        }

        let branch = extract_active_branch(log)?;
        for warning in &branch.warnings {
            tracing::warn!(session_id, "{}", warning);
        }

        let state = SessionState::from_branch(&branch);
        let skip_reason = if branch.is_silent() {
            Some(SkipReason::NoMessages)
        } else {
            self.conv
                .write_part(session_id, &render::format_messages(&branch.messages))?;
            None
        };
        self.store.put(session_id, &state)?;

        Ok(SessionSyncResult {
            session_id: session_id.to_string(),
            messages: branch.messages.len(),
            warnings: branch.warnings,
            skip_reason,
        })
    }

    /// Date and summary line for every session that has messages.
    pub fn collect_summaries(&self, log_dir: &Path) -> BTreeMap<String, SessionSummary> {
        self.store
            .list()
            .into_iter()
            .filter(|(_, state)| state.has_messages())
            .map(|(session_id, state)| {
                let date = format_timestamp_opt(state.first_ts.as_deref(), TimePrecision::Minutes)
                    .unwrap_or_else(|| now(TimePrecision::Minutes));
                let log = log_dir.join(format!("{}.jsonl", session_id));
                let summary = first_human_line(&log, self.output.summary_chars)
                    .unwrap_or_else(|| NO_SUMMARY.to_string());
                (session_id, SessionSummary { date, summary })
            })
            .collect()
    }

    /// Chains over every session in the store, resolved against the logs
    /// in `log_dir`.
    pub fn detect_chains(&self, log_dir: &Path) -> Result<Vec<Chain>> {
        let pending: BTreeMap<String, Vec<String>> = self
            .store
            .list()
            .into_iter()
            .filter(|(_, state)| !state.orphan_parents.is_empty())
            .map(|(session_id, state)| (session_id, state.orphan_parents))
            .collect();

        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let logs = discover_logs(log_dir)?;
        Ok(build_chains(&detect_continuations(&pending, &logs)))
    }

    /// Regenerate `sessions/` and `index.md`.
    ///
    /// Returns false when no session has anything to show.
    pub fn rebuild_index(&self, log_dir: &Path) -> Result<bool> {
        let summaries = self.collect_summaries(log_dir);
        if summaries.is_empty() {
            return Ok(false);
        }

        let chains = self.detect_chains(log_dir)?;
        self.write_session_docs(&chains)?;
        self.conv.write_index(&render::render_index(
            &chains,
            &summaries,
            self.output.chain_title_chars,
        ))?;

        tracing::debug!(
            sessions = summaries.len(),
            chains = chains.iter().filter(|c| c.is_linked()).count(),
            "Rebuilt index"
        );
        Ok(true)
    }

    fn write_session_docs(&self, chains: &[Chain]) -> Result<()> {
        self.conv.clear_sessions()?;
        let linked: HashSet<&str> = linked_sessions(chains);

        for chain in chains.iter().filter(|c| c.is_linked()) {
            let states: Vec<Option<SessionState>> =
                chain.sessions().iter().map(|id| self.store.get(id)).collect();
            let parts: Vec<ChainPart<'_>> = chain
                .sessions()
                .iter()
                .zip(&states)
                .map(|(id, state)| ChainPart {
                    session_id: id,
                    first_ts: state.as_ref().and_then(|s| s.first_ts.as_deref()),
                    body: self.conv.read_part(id),
                })
                .collect();

            self.conv
                .write_session_doc(&render::chain_file_name(chain), &render::render_chain(chain, &parts))?;
        }

        for session_id in self.conv.part_ids() {
            if linked.contains(session_id.as_str()) {
                continue;
            }
            let Some(body) = self.conv.read_part(&session_id) else {
                continue;
            };
            let state = self.store.get(&session_id);
            let doc = render::render_session(
                &session_id,
                state.as_ref().and_then(|s| s.first_ts.as_deref()),
                &body,
            );
            self.conv
                .write_session_doc(&format!("{}.md", session_id), &doc)?;
        }

        Ok(())
    }

    /// Sync every non-empty log in `log_dir`, then rebuild and commit once.
    pub fn backfill(&self, log_dir: &Path) -> Result<SyncResult> {
        let mut result = SyncResult::default();

        for log in discover_logs(log_dir)? {
            if self.output.skip_agent_logs && log.session_id.starts_with("agent-") {
                continue;
            }
            if std::fs::metadata(&log.path).map_or(true, |m| m.len() == 0) {
                continue;
            }

            match self.sync_session(&log.path, &log.session_id) {
                Ok(session) => result.record(&session),
                Err(e) => {
                    tracing::warn!(path = %log.path.display(), error = %e, "Backfill failed for log");
                    result.errors.push((log.path.clone(), e.to_string()));
                }
            }
        }

        if result.sessions_updated > 0 {
            self.rebuild_index(log_dir)?;
            if let Some(git) = &self.git {
                git.commit_update(
                    "backfill",
                    &format!("Backfill {} historical sessions", result.sessions_updated),
                );
            }
        }

        tracing::info!(
            updated = result.sessions_updated,
            unchanged = result.sessions_unchanged,
            errors = result.errors.len(),
            "Backfill complete"
        );

        Ok(result)
    }
}

fn parent_dir(log: &Path) -> PathBuf {
    log.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LOG_A: &str = concat!(
        r#"{"uuid":"a1","parentUuid":null,"type":"user","timestamp":"2025-11-25T09:00:00Z","message":{"content":"Start the parser work"}}"#,
        "\n",
        r#"{"uuid":"a2","parentUuid":"a1","type":"assistant","timestamp":"2025-11-25T09:00:05Z","message":{"content":[{"type":"text","text":"On it."}]}}"#,
        "\n"
    );

    const LOG_B: &str = concat!(
        r#"{"uuid":"b1","parentUuid":"a2","type":"user","timestamp":"2025-11-26T10:00:00Z","message":{"content":"Continue where we left off"}}"#,
        "\n",
        r#"{"uuid":"b2","parentUuid":"b1","type":"assistant","timestamp":"2025-11-26T10:00:04Z","message":{"content":"Resuming."}}"#,
        "\n"
    );

    struct Fixture {
        _tmp: TempDir,
        logs: PathBuf,
        coordinator: SyncCoordinator,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let logs = tmp.path().join("logs");
        std::fs::create_dir_all(&logs).unwrap();
        let project = tmp.path().join("project");
        std::fs::create_dir_all(&project).unwrap();

        let mut config = Config::default();
        config.git.enabled = false;
        let coordinator = SyncCoordinator::open(&project, &config).unwrap();

        Fixture {
            _tmp: tmp,
            logs,
            coordinator,
        }
    }

    fn write_log(dir: &Path, session: &str, body: &str) -> PathBuf {
        let path = dir.join(format!("{}.jsonl", session));
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_sync_session_writes_part_and_state() {
        let f = fixture();
        let log = write_log(&f.logs, "aaaa", LOG_A);

        let result = f.coordinator.sync_session(&log, "aaaa").unwrap();
        assert!(result.is_updated());
        assert_eq!(result.messages, 2);

        let conv = f.coordinator.conversation_dir();
        let part = conv.read_part("aaaa").unwrap();
        assert!(part.starts_with("## User [2025-11-25 09:00:00]\n\nStart the parser work\n"));

        let state = f.coordinator.store().get("aaaa").unwrap();
        assert_eq!(state.file_size, LOG_A.len() as u64);
        assert_eq!(state.leaf_uuid.as_deref(), Some("a2"));
        assert_eq!(state.message_count, Some(2));
    }

    #[test]
    fn test_sync_session_skips_unchanged_size() {
        let f = fixture();
        let log = write_log(&f.logs, "aaaa", LOG_A);

        f.coordinator.sync_session(&log, "aaaa").unwrap();
        let second = f.coordinator.sync_session(&log, "aaaa").unwrap();
        assert_eq!(
            second.skip_reason,
            Some(SkipReason::Unchanged {
                file_size: LOG_A.len() as u64
            })
        );

        // One more byte forces a full re-render
        std::fs::write(&log, format!("{}\n", LOG_A)).unwrap();
        let third = f.coordinator.sync_session(&log, "aaaa").unwrap();
        assert!(third.is_updated());
    }

    #[test]
    fn test_sync_session_without_messages_records_leaf() {
        let f = fixture();
        let log = write_log(
            &f.logs,
            "quiet",
            "{\"uuid\":\"q1\",\"type\":\"user\",\"message\":{\"content\":[{\"type\":\"tool_result\"}]}}\n",
        );

        let result = f.coordinator.sync_session(&log, "quiet").unwrap();
        assert_eq!(result.skip_reason, Some(SkipReason::NoMessages));
        assert_eq!(f.coordinator.conversation_dir().read_part("quiet"), None);

        let state = f.coordinator.store().get("quiet").unwrap();
        assert_eq!(state.leaf_uuid.as_deref(), Some("q1"));
        assert!(!state.has_messages());
        assert!(f.coordinator.collect_summaries(&f.logs).is_empty());
    }

    #[test]
    fn test_rebuild_index_links_continuation() {
        let f = fixture();
        let a = write_log(&f.logs, "aaaa1111-x", LOG_A);
        let b = write_log(&f.logs, "bbbb2222-y", LOG_B);
        f.coordinator.sync_session(&a, "aaaa1111-x").unwrap();
        f.coordinator.sync_session(&b, "bbbb2222-y").unwrap();

        assert!(f.coordinator.rebuild_index(&f.logs).unwrap());

        let conv = f.coordinator.conversation_dir();
        let index = std::fs::read_to_string(conv.index_path()).unwrap();
        assert!(index.contains("## Chain: Start the parser work\n"));
        assert!(index.contains("- **aaaa1111-x** (2025-11-25 09:00) — Start the parser work\n"));
        assert!(index.contains("- **bbbb2222-y** (2025-11-26 10:00) → continues aaaa1111\n"));

        let chain_doc =
            std::fs::read_to_string(conv.sessions_dir().join("chain-aaaa1111.md")).unwrap();
        assert!(chain_doc.contains("sessions: 2\n"));
        assert!(chain_doc.contains("# Session aaaa1111 (2025-11-25 09:00)"));
        assert!(chain_doc.contains("# Session bbbb2222 (2025-11-26 10:00)"));
        assert!(!conv.sessions_dir().join("aaaa1111-x.md").exists());
    }

    #[test]
    fn test_rebuild_index_with_nothing_to_show() {
        let f = fixture();
        assert!(!f.coordinator.rebuild_index(&f.logs).unwrap());
    }

    #[test]
    fn test_backfill_skips_agent_and_empty_logs() {
        let f = fixture();
        write_log(&f.logs, "aaaa", LOG_A);
        write_log(&f.logs, "agent-1234", LOG_B);
        write_log(&f.logs, "empty", "");

        let result = f.coordinator.backfill(&f.logs).unwrap();
        assert_eq!(result.sessions_updated, 1);
        assert!(result.errors.is_empty());

        let conv = f.coordinator.conversation_dir();
        assert_eq!(conv.part_ids(), vec!["aaaa"]);
        assert!(conv.sessions_dir().join("aaaa.md").exists());
    }

    #[test]
    fn test_update_backfills_on_first_run() {
        let f = fixture();
        assert!(f.coordinator.is_first_run());
        write_log(&f.logs, "aaaa", LOG_A);
        let b = write_log(&f.logs, "bbbb", LOG_B);

        let report = f.coordinator.update(&b, "bbbb", false).unwrap();

        let backfill = report.backfill.unwrap();
        assert_eq!(backfill.sessions_updated, 2);
        // Already synced by the backfill
        assert!(!report.session.is_updated());
        assert!(!report.committed);
    }
}
