//! # Identifier Remapping
//!
//! After the remote store acknowledges a temporary node, its id changes everywhere it
//! appears: the node itself, edge endpoints, and handle ids that embed the node id.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{Edge, GraphBuffer, NodeId};

/// `temporary id -> canonical id`, accumulated during a save.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdMapping(BTreeMap<NodeId, NodeId>);

impl IdMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, temporary: NodeId, canonical: NodeId) {
        self.0.insert(temporary, canonical);
    }

    pub fn get(&self, id: &NodeId) -> Option<&NodeId> {
        self.0.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &NodeId)> {
        self.0.iter()
    }

    /// Rewrites node ids, edge endpoints and handles of `buffer` in place.
    pub fn apply_to_buffer(&self, buffer: &mut GraphBuffer) {
        for node in &mut buffer.nodes {
            if let Some(canonical) = self.get(&node.id) {
                node.id = canonical.clone();
            }
        }
        self.apply_to_edges(&mut buffer.edges);
    }

    /// Rewrites edge endpoints and handles. Returns how many edges changed.
    pub fn apply_to_edges(&self, edges: &mut [Edge]) -> usize {
        if self.is_empty() {
            return 0;
        }
        let mut changed = 0;
        for edge in edges {
            let before = edge.clone();
            if let Some(canonical) = self.get(&edge.source) {
                edge.source = canonical.clone();
            }
            if let Some(canonical) = self.get(&edge.target) {
                edge.target = canonical.clone();
            }
            if let Some(handle) = edge.source_handle.as_mut() {
                *handle = self.rewrite_handle(handle);
            }
            if let Some(handle) = edge.target_handle.as_mut() {
                *handle = self.rewrite_handle(handle);
            }
            if *edge != before {
                changed += 1;
            }
        }
        changed
    }

    /// Replaces every whole-token occurrence of a mapped id inside `handle`.
    ///
    /// Longer ids are replaced first and matches must sit on id boundaries, so
    /// `temp_1` never rewrites part of `temp_10`.
    pub fn rewrite_handle(&self, handle: &str) -> String {
        let mut pairs: Vec<_> = self.0.iter().collect();
        pairs.sort_by_key(|(temp, _)| std::cmp::Reverse(temp.as_str().len()));

        let mut out = handle.to_string();
        for (temp, canonical) in pairs {
            out = replace_token(&out, temp.as_str(), canonical.as_str());
        }
        out
    }
}

impl FromIterator<(NodeId, NodeId)> for IdMapping {
    fn from_iter<I: IntoIterator<Item = (NodeId, NodeId)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn replace_token(haystack: &str, needle: &str, replacement: &str) -> String {
    if needle.is_empty() {
        return haystack.to_string();
    }
    let mut out = String::with_capacity(haystack.len());
    let mut rest = haystack;
    while let Some(idx) = rest.find(needle) {
        let before_ok = rest[..idx]
            .chars()
            .next_back()
            .map_or(out.chars().next_back().is_none_or(|c| !is_id_char(c)), |c| {
                !is_id_char(c)
            });
        let after = &rest[idx + needle.len()..];
        let after_ok = after.chars().next().is_none_or(|c| !is_id_char(c));

        out.push_str(&rest[..idx]);
        if before_ok && after_ok {
            out.push_str(replacement);
        } else {
            out.push_str(needle);
        }
        rest = after;
    }
    out.push_str(rest);
    out
}
