//! Core domain types for convsync
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Log** | One append-only JSONL transcript of a single session |
//! | **Entry** | One parsed record carrying an id and an optional parent id |
//! | **Root** | An entry whose parent is absent from its own log |
//! | **Leaf** | An entry with no children |
//! | **Side branch** | An entry marked `isSidechain`; exploratory, not the main line |
//! | **Active branch** | The root-to-leaf path that survived rewinds |
//! | **Orphan parent** | A parent id cited in a log but not present in it |
//! | **Chain** | Logs linked by continuation, ordered earliest first |
//!
//! Transcripts call the human side "user"; these types say [`EntryKind::Human`]
//! and [`Role::Human`] and only render the word "User" in output headings.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================
// Entries
// ============================================

/// What produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Typed by a person (`"type": "user"`)
    Human,
    /// Produced by the assistant (`"type": "assistant"`)
    Assistant,
    /// System records, progress, attachments and anything unrecognized
    Other,
}

impl EntryKind {
    /// Map a transcript `type` field to a kind.
    pub fn from_record_type(record_type: Option<&str>) -> Self {
        match record_type {
            Some("user") => EntryKind::Human,
            Some("assistant") => EntryKind::Assistant,
            _ => EntryKind::Other,
        }
    }

    /// Role for kinds that carry display text.
    pub fn role(self) -> Option<Role> {
        match self {
            EntryKind::Human => Some(Role::Human),
            EntryKind::Assistant => Some(Role::Assistant),
            EntryKind::Other => None,
        }
    }
}

/// One conversational record from a log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Unique id within the log (`uuid`)
    pub id: String,
    /// Logical predecessor (`parentUuid`), `None` for a root
    pub parent_id: Option<String>,
    pub kind: EntryKind,
    /// Marked as speculative/abandoned exploration
    pub is_side_branch: bool,
    /// Raw ISO-8601 timestamp as written in the log
    pub timestamp: Option<String>,
    /// Physical position in the log; the only reliable recency signal
    pub sequence_index: usize,
    /// Extracted display text, parts joined by a blank line
    pub text: Option<String>,
}

// ============================================
// Messages
// ============================================

/// Author of a rendered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Human,
    Assistant,
}

impl Role {
    /// Heading label used in rendered transcripts.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Human => "User",
            Role::Assistant => "Assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A display message on the active branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    /// Display time (`YYYY-MM-DD HH:MM:SS`), absent when the entry had none
    pub time: Option<String>,
}

// ============================================
// Extraction result
// ============================================

/// Everything derived from one pass over a log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveBranch {
    /// Messages of every root's active branch, roots in log order
    pub messages: Vec<Message>,
    /// Raw byte length of the log when it was read
    pub file_size: u64,
    /// Active leaf of the last root processed
    pub active_leaf: Option<String>,
    /// First raw timestamp seen along the processed branches
    pub first_timestamp: Option<String>,
    /// Last raw timestamp seen along the processed branches
    pub last_timestamp: Option<String>,
    /// Parent ids cited by non-side-branch entries but absent from the log
    pub orphan_parents: Vec<String>,
    /// Non-fatal problems encountered while reading (skipped lines)
    pub warnings: Vec<String>,
}

impl ActiveBranch {
    /// True when the log produced a leaf but no displayable text.
    pub fn is_silent(&self) -> bool {
        self.messages.is_empty()
    }
}
