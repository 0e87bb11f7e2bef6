//! Claude Code JSONL records
//!
//! Turns one physical line from `~/.claude/projects/[encoded-path]/*.jsonl`
//! into an [`Entry`].
//!
//! # Error Handling
//!
//! - **Malformed JSON lines**: returned as `Err` so the caller can record a
//!   warning and move on to the next line.
//! - **Records without `uuid`**: bookkeeping records (file-history-snapshot,
//!   summary, queue-operation). Dropped silently, not an error.
//! - **Unknown content blocks**: tool_use, tool_result, thinking, image and
//!   anything unrecognized contribute no text.

use crate::types::{Entry, EntryKind};
use serde::de::{DeserializeOwned, Deserializer, IgnoredAny};
use serde::Deserialize;

// ============================================
// Raw JSONL record types (serde deserialization)
// ============================================

/// The fields of a transcript line that the active-branch walk needs.
///
/// Every field is optional; unknown fields are ignored. A field of an
/// unexpected shape reads as absent instead of dropping the whole record.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawRecord {
    uuid: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    parent_uuid: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    record_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    is_sidechain: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    message: Option<RawMessage>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawMessage {
    content: Option<RawContent>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawContent {
    Text(String),
    Blocks(Vec<RawBlock>),
    // Numbers, objects and other shapes carry no text
    Other(IgnoredAny),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawBlock {
    Bare(String),
    Typed(ContentBlock),
    Other(IgnoredAny),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text {
        #[serde(default)]
        text: String,
    },
    // Catch-all for tool_use, tool_result, thinking, image, ...
    #[serde(other)]
    Unknown,
}

/// Only the id of a record; used when scanning other logs for continuations.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct IdOnly {
    uuid: Option<String>,
}

impl RawContent {
    /// Display text: a plain string verbatim, or the non-empty trimmed text
    /// blocks joined by a blank line.
    fn text(&self) -> Option<String> {
        match self {
            RawContent::Text(text) => Some(text.clone()),
            RawContent::Blocks(blocks) => {
                let parts: Vec<&str> = blocks
                    .iter()
                    .filter_map(|block| match block {
                        RawBlock::Bare(text) if !text.is_empty() => Some(text.as_str()),
                        RawBlock::Typed(ContentBlock::Text { text }) => {
                            Some(text.trim()).filter(|t| !t.is_empty())
                        }
                        _ => None,
                    })
                    .collect();

                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join("\n\n"))
                }
            }
            RawContent::Other(_) => None,
        }
    }

    /// First non-empty line of the first piece of human text.
    fn first_line(&self) -> Option<String> {
        let first = match self {
            RawContent::Text(text) => text.trim().to_string(),
            RawContent::Blocks(blocks) => blocks
                .iter()
                .find_map(|block| match block {
                    RawBlock::Typed(ContentBlock::Text { text }) if !text.trim().is_empty() => {
                        Some(text.trim().to_string())
                    }
                    _ => None,
                })
                .unwrap_or_default(),
            RawContent::Other(_) => String::new(),
        };

        first
            .lines()
            .next()
            .map(str::to_string)
            .filter(|line| !line.is_empty())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Parse one log line into an entry.
///
/// Returns `Ok(None)` for blank lines and records without an id.
pub fn parse_entry(line: &str, sequence_index: usize) -> serde_json::Result<Option<Entry>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let record: RawRecord = serde_json::from_str(line)?;

    let Some(id) = non_empty(record.uuid) else {
        return Ok(None);
    };

    let kind = EntryKind::from_record_type(record.record_type.as_deref());
    let text = match kind {
        EntryKind::Human | EntryKind::Assistant => record
            .message
            .and_then(|m| m.content)
            .and_then(|content| content.text()),
        EntryKind::Other => None,
    };

    Ok(Some(Entry {
        id,
        parent_id: non_empty(record.parent_uuid),
        kind,
        is_side_branch: record.is_sidechain.unwrap_or(false),
        timestamp: non_empty(record.timestamp),
        sequence_index,
        text,
    }))
}

/// Id of a record, if the line parses and carries one.
pub fn record_id(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    serde_json::from_str::<IdOnly>(line)
        .ok()
        .and_then(|r| non_empty(r.uuid))
}

/// First line of text if this record is a human message with text.
pub fn human_first_line(line: &str) -> Option<String> {
    let record: RawRecord = serde_json::from_str(line.trim()).ok()?;
    if EntryKind::from_record_type(record.record_type.as_deref()) != EntryKind::Human {
        return None;
    }
    record.message?.content?.first_line()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Entry {
        parse_entry(line, 7)
            .expect("line should parse")
            .expect("line should carry an entry")
    }

    #[test]
    fn test_parse_string_content() {
        let entry = parse(
            r#"{"uuid":"u1","parentUuid":null,"type":"user","timestamp":"2025-11-25T09:00:00Z","message":{"role":"user","content":"  Hello there  "}}"#,
        );

        assert_eq!(entry.id, "u1");
        assert_eq!(entry.parent_id, None);
        assert_eq!(entry.kind, EntryKind::Human);
        assert!(!entry.is_side_branch);
        assert_eq!(entry.timestamp.as_deref(), Some("2025-11-25T09:00:00Z"));
        assert_eq!(entry.sequence_index, 7);
        assert_eq!(entry.text.as_deref(), Some("  Hello there  "));
    }

    #[test]
    fn test_parse_blocks_joins_text_only() {
        let entry = parse(
            r#"{"uuid":"a1","parentUuid":"u1","type":"assistant","message":{"content":[{"type":"thinking","thinking":"hmm"},{"type":"text","text":" first "},{"type":"tool_use","id":"t1","name":"Read","input":{}},{"type":"text","text":"   "},{"type":"text","text":"second"}]}}"#,
        );

        assert_eq!(entry.kind, EntryKind::Assistant);
        assert_eq!(entry.parent_id.as_deref(), Some("u1"));
        assert_eq!(entry.text.as_deref(), Some("first\n\nsecond"));
    }

    #[test]
    fn test_parse_odd_field_types_keep_the_entry() {
        let entry = parse(
            r#"{"uuid":"m","parentUuid":"u1","type":"assistant","timestamp":1732525200,"isSidechain":"no","message":{"content":[{"type":"text","text":"middle"}]}}"#,
        );

        assert_eq!(entry.id, "m");
        assert_eq!(entry.parent_id.as_deref(), Some("u1"));
        assert_eq!(entry.timestamp, None);
        assert!(!entry.is_side_branch);
        assert_eq!(entry.text.as_deref(), Some("middle"));
    }

    #[test]
    fn test_parse_unrecognized_content_shapes_have_no_text() {
        let numeric = parse(r#"{"uuid":"n1","type":"user","message":{"content":42}}"#);
        assert_eq!(numeric.text, None);

        let mixed = parse(
            r#"{"uuid":"n2","type":"assistant","message":{"content":[7,{"type":"text","text":"kept"},null]}}"#,
        );
        assert_eq!(mixed.text.as_deref(), Some("kept"));
    }

    #[test]
    fn test_parse_tool_result_only_has_no_text() {
        let entry = parse(
            r#"{"uuid":"u2","parentUuid":"a1","type":"user","message":{"content":[{"type":"tool_result","tool_use_id":"t1","content":"ok"}]}}"#,
        );
        assert_eq!(entry.kind, EntryKind::Human);
        assert_eq!(entry.text, None);
    }

    #[test]
    fn test_parse_bare_string_blocks() {
        let entry = parse(
            r#"{"uuid":"u3","type":"user","message":{"content":["plain",{"text":"no type"},{"type":"text","text":"typed"}]}}"#,
        );
        assert_eq!(entry.text.as_deref(), Some("plain\n\ntyped"));
    }

    #[test]
    fn test_other_kinds_carry_no_text() {
        let entry = parse(
            r#"{"uuid":"s1","parentUuid":"a1","type":"system","subtype":"compact_boundary","message":{"content":"ignored"}}"#,
        );
        assert_eq!(entry.kind, EntryKind::Other);
        assert_eq!(entry.text, None);
    }

    #[test]
    fn test_sidechain_flag_and_empty_parent() {
        let entry = parse(r#"{"uuid":"x","parentUuid":"","isSidechain":true,"type":"user"}"#);
        assert!(entry.is_side_branch);
        assert_eq!(entry.parent_id, None);
        assert_eq!(entry.text, None);
    }

    #[test]
    fn test_records_without_id_are_dropped() {
        let line = r#"{"type":"file-history-snapshot","messageId":"m1","snapshot":{}}"#;
        assert!(parse_entry(line, 0).unwrap().is_none());
        assert!(parse_entry(r#"{"uuid":"","type":"user"}"#, 0).unwrap().is_none());
        assert!(parse_entry("   ", 0).unwrap().is_none());
    }

    #[test]
    fn test_malformed_line_is_error() {
        assert!(parse_entry(r#"{"uuid":"u1","type":"#, 0).is_err());
    }

    #[test]
    fn test_record_id() {
        assert_eq!(
            record_id(r#"{"uuid":"abc","type":"user"}"#),
            Some("abc".to_string())
        );
        assert_eq!(record_id(r#"{"type":"summary"}"#), None);
        assert_eq!(record_id("not json"), None);
    }

    #[test]
    fn test_human_first_line() {
        assert_eq!(
            human_first_line(
                r#"{"uuid":"u1","type":"user","message":{"content":"\n  Fix the parser\nplease"}}"#
            ),
            Some("Fix the parser".to_string())
        );
        assert_eq!(
            human_first_line(
                r#"{"uuid":"u1","type":"user","message":{"content":[{"type":"tool_result","content":"x"},{"type":"text","text":"Block line\nmore"}]}}"#
            ),
            Some("Block line".to_string())
        );
        assert_eq!(
            human_first_line(r#"{"uuid":"a1","type":"assistant","message":{"content":"hi"}}"#),
            None
        );
        assert_eq!(
            human_first_line(r#"{"uuid":"u1","type":"user","message":{"content":"   "}}"#),
            None
        );
    }
}
