//! Active-branch resolution
//!
//! A rewind leaves the abandoned branch in the log and grows a new sibling
//! branch from an earlier node. The abandoned leaf stops advancing in log
//! order while the surviving one keeps growing, so within each tree the
//! leaf with the greatest `sequence_index` ends the active branch.
//!
//! Compaction starts a new tree in the same log. Each tree contributes its
//! own active branch, and the branches are concatenated in the order their
//! roots first appeared.

use super::forest::Forest;
use crate::format::{format_timestamp, TimePrecision};
use crate::types::{Entry, Message};
use std::collections::HashMap;

/// The active root-to-leaf path of one tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch<'a> {
    pub root: &'a Entry,
    pub leaf: &'a Entry,
    /// Entries from root to leaf, chronological
    pub path: Vec<&'a Entry>,
}

impl<'a> Branch<'a> {
    /// Display messages for the entries on this branch that carry text.
    pub fn messages(&self) -> impl Iterator<Item = Message> + '_ {
        self.path.iter().filter_map(|entry| {
            let role = entry.kind.role()?;
            let text = entry.text.clone()?;
            Some(Message {
                role,
                text,
                time: entry
                    .timestamp
                    .as_deref()
                    .map(|ts| format_timestamp(ts, TimePrecision::Seconds)),
            })
        })
    }

    /// Raw timestamps along the branch, chronological.
    pub fn timestamps(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.path
            .iter()
            .copied()
            .filter_map(|entry| entry.timestamp.as_deref())
    }
}

/// Active branch of every tree in the forest, roots in log order.
pub fn resolve_branches(forest: &Forest) -> Vec<Branch<'_>> {
    // root id -> (root, most recently appended leaf)
    let mut active: HashMap<&str, (&Entry, &Entry)> = HashMap::new();

    for leaf in forest.candidate_leaves() {
        let Some(root) = forest.root_of(&leaf.id) else {
            continue;
        };

        active
            .entry(root.id.as_str())
            .and_modify(|(_, best)| {
                if leaf.sequence_index > best.sequence_index {
                    *best = leaf;
                }
            })
            .or_insert((root, leaf));
    }

    let mut roots: Vec<(&Entry, &Entry)> = active.into_values().collect();
    roots.sort_by_key(|(root, _)| root.sequence_index);

    roots
        .into_iter()
        .map(|(root, leaf)| {
            let mut path: Vec<&Entry> = forest.ancestors(&leaf.id).collect();
            path.reverse();
            tracing::trace!(
                root = %root.id,
                leaf = %leaf.id,
                depth = path.len(),
                "Resolved active branch"
            );
            Branch { root, leaf, path }
        })
        .collect()
}
