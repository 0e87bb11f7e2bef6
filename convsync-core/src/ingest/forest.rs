//! Parent-linked entries of one log, held as an arena.
//!
//! A log may hold several disconnected trees (compaction boundaries) and
//! parent references into other logs (session continuation). Nothing here
//! assumes the links are acyclic: every upward walk carries a visited set.

use crate::types::Entry;
use std::collections::{HashMap, HashSet};

/// id → entry map plus the derived id → children adjacency.
#[derive(Debug, Default)]
pub struct Forest {
    entries: HashMap<String, Entry>,
    children: HashMap<String, Vec<String>>,
    /// Ids in order of first appearance
    order: Vec<String>,
}

impl Forest {
    /// Assemble entries given in log order.
    ///
    /// Duplicate ids: the last occurrence's fields win, while the first
    /// occurrence keeps its place in `order` and in its parent's child list.
    pub fn build(entries: impl IntoIterator<Item = Entry>) -> Self {
        let mut forest = Forest::default();

        for entry in entries {
            if let Some(parent) = &entry.parent_id {
                let siblings = forest.children.entry(parent.clone()).or_default();
                if !siblings.contains(&entry.id) {
                    siblings.push(entry.id.clone());
                }
            }

            if !forest.entries.contains_key(&entry.id) {
                forest.order.push(entry.id.clone());
            }
            forest.entries.insert(entry.id.clone(), entry);
        }

        forest
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Entries in order of first appearance.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> + '_ {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    /// Child ids of `id`, in log order.
    pub fn children(&self, id: &str) -> &[String] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_leaf(&self, id: &str) -> bool {
        self.children(id).is_empty()
    }

    /// Leaves eligible to end an active branch.
    ///
    /// Side-branch leaves are excluded unless the whole forest has no other
    /// leaf, so a log made only of side branches still yields output.
    pub fn candidate_leaves(&self) -> Vec<&Entry> {
        let leaves: Vec<&Entry> = self.iter().filter(|e| self.is_leaf(&e.id)).collect();

        let main_line: Vec<&Entry> = leaves
            .iter()
            .copied()
            .filter(|e| !e.is_side_branch)
            .collect();

        if main_line.is_empty() {
            leaves
        } else {
            main_line
        }
    }

    /// Walk parent links from `id` upward (inclusive), stopping at a missing
    /// parent or the first revisited node.
    pub fn ancestors(&self, id: &str) -> Ancestors<'_> {
        Ancestors {
            forest: self,
            next_id: self.entries.get_key_value(id).map(|(key, _)| key.as_str()),
            visited: HashSet::new(),
        }
    }

    /// Terminal node of the upward walk from `id`.
    ///
    /// For a cyclic chain this is the last node visited before the walk
    /// would revisit one.
    pub fn root_of(&self, id: &str) -> Option<&Entry> {
        self.ancestors(id).last()
    }

    /// Parent ids cited by main-line entries that are absent from this log,
    /// deduplicated, in order of first citation.
    pub fn orphan_parents(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.iter()
            .filter(|e| !e.is_side_branch)
            .filter_map(|e| e.parent_id.as_deref())
            .filter(|parent| !self.contains(parent))
            .filter(|parent| seen.insert(*parent))
            .map(str::to_string)
            .collect()
    }
}

/// Iterator over an entry and its ancestors.
pub struct Ancestors<'a> {
    forest: &'a Forest,
    next_id: Option<&'a str>,
    visited: HashSet<&'a str>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next_id.take()?;
        let entry = self.forest.entries.get(id)?;
        if !self.visited.insert(entry.id.as_str()) {
            return None;
        }
        self.next_id = entry.parent_id.as_deref();
        Some(entry)
    }
}
