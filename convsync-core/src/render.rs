//! Markdown rendering of sessions, chains and the index.
//!
//! All output is plain, grep-friendly markdown. Rendering is pure: callers
//! gather part files, state and summaries, these functions only build text.

use crate::chain::{linked_sessions, Chain};
use crate::format::{format_timestamp, short_id, truncate_chars, TimePrecision};
use crate::types::Message;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Heading written to a fresh or rebuilt index.
pub const INDEX_HEADER: &str = "# Conversation Index\n\n";

/// Summary used when a session has no human text.
pub const NO_SUMMARY: &str = "[no summary]";

/// One line of the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// `YYYY-MM-DD HH:MM`
    pub date: String,
    /// First human line, or [`NO_SUMMARY`]
    pub summary: String,
}

/// A member of a chain document.
#[derive(Debug, Clone)]
pub struct ChainPart<'a> {
    pub session_id: &'a str,
    /// Raw first timestamp from state
    pub first_ts: Option<&'a str>,
    /// Rendered messages; members without one are left out
    pub body: Option<String>,
}

/// Render messages as `## Role [time]` blocks.
pub fn format_messages(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|msg| {
            let time = msg
                .time
                .as_deref()
                .map(|t| format!(" [{}]", t))
                .unwrap_or_default();
            format!("## {}{}\n\n{}\n", msg.role, time, msg.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Document for a session that belongs to no multi-session chain.
pub fn render_session(session_id: &str, first_ts: Option<&str>, body: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "---\nsession_id: {}", session_id);
    if let Some(ts) = first_ts.filter(|ts| !ts.is_empty()) {
        let _ = writeln!(out, "started: {}", format_timestamp(ts, TimePrecision::Seconds));
    }
    out.push_str("---\n\n");
    out.push_str(body);
    out
}

/// Document concatenating every member of a chain, earliest first.
pub fn render_chain(chain: &Chain, parts: &[ChainPart<'_>]) -> String {
    let mut out = String::new();

    let ids: Vec<String> = chain
        .sessions()
        .iter()
        .map(|id| serde_json::Value::String(id.clone()).to_string())
        .collect();
    let _ = writeln!(out, "---\nchain: [{}]", ids.join(", "));
    let _ = writeln!(out, "sessions: {}", chain.len());
    if let Some(ts) = parts
        .iter()
        .filter_map(|p| p.first_ts)
        .find(|ts| !ts.is_empty())
    {
        let _ = writeln!(out, "started: {}", format_timestamp(ts, TimePrecision::Seconds));
    }
    out.push_str("---\n\n");

    let mut first = true;
    for part in parts {
        let Some(body) = &part.body else {
            continue;
        };
        if !first {
            out.push_str("\n---\n\n");
        }
        first = false;

        let date = part
            .first_ts
            .filter(|ts| !ts.is_empty())
            .map(|ts| format_timestamp(ts, TimePrecision::Minutes))
            .unwrap_or_default();
        let _ = writeln!(out, "# Session {} ({})\n", short_id(part.session_id), date);
        out.push_str(body);
    }

    out
}

/// File name of a chain document inside `sessions/`.
pub fn chain_file_name(chain: &Chain) -> String {
    format!("chain-{}.md", short_id(chain.head()))
}

/// The index: multi-session chains first, then standalone sessions.
///
/// Only sessions present in `summaries` are listed.
pub fn render_index(
    chains: &[Chain],
    summaries: &BTreeMap<String, SessionSummary>,
    chain_title_chars: usize,
) -> String {
    let mut out = String::from(INDEX_HEADER);
    let linked = linked_sessions(chains);

    for chain in chains.iter().filter(|c| c.is_linked()) {
        let title = match summaries.get(chain.head()) {
            Some(head) => truncate_chars(&head.summary, chain_title_chars),
            None => short_id(chain.head()),
        };
        let _ = writeln!(out, "## Chain: {}", title);

        for (i, session_id) in chain.sessions().iter().enumerate() {
            let Some(entry) = summaries.get(session_id) else {
                continue;
            };
            if i == 0 {
                let _ = writeln!(out, "- **{}** ({}) — {}", session_id, entry.date, entry.summary);
            } else {
                let previous = &chain.sessions()[i - 1];
                let _ = writeln!(
                    out,
                    "- **{}** ({}) → continues {}",
                    session_id,
                    entry.date,
                    short_id(previous)
                );
            }
        }
        out.push('\n');
    }

    let standalone: Vec<(&String, &SessionSummary)> = summaries
        .iter()
        .filter(|(id, _)| !linked.contains(id.as_str()))
        .collect();

    if !standalone.is_empty() && !linked.is_empty() {
        out.push_str("## Standalone\n");
    }
    for (session_id, entry) in standalone {
        let _ = writeln!(out, "- **{}** ({}) — {}", session_id, entry.date, entry.summary);
    }

    out
}
