//! # Connection Validator
//!
//! Pure rule evaluation over a borrowed (nodes, edges) snapshot. A validator holds
//! nothing beyond that snapshot, so hosts build a fresh one whenever the graph changes.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::{ConnectionType, Edge, Node, NodeId};
use crate::rules::{self, ConnectionRule, Resolved, TypeMatcher, DEFAULT_RULES};

/// An edge the user is trying to draw.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub bidirectional: bool,
}

impl CandidateEdge {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            bidirectional: false,
        }
    }

    pub fn bidirectional(mut self, bidirectional: bool) -> Self {
        self.bidirectional = bidirectional;
        self
    }
}

/// Flattened validation outcome for UI consumers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_type: Option<ConnectionType>,
    #[serde(default)]
    pub max_connections_reached: bool,
}

impl From<Result<ConnectionType, ValidationError>> for ValidationReport {
    fn from(result: Result<ConnectionType, ValidationError>) -> Self {
        match result {
            Ok(ty) => Self {
                is_valid: true,
                suggested_type: Some(ty),
                ..Self::default()
            },
            Err(e) => Self {
                is_valid: false,
                reason: Some(e.to_string()),
                suggested_type: None,
                max_connections_reached: e.max_connections_reached(),
            },
        }
    }
}

/// A valid target for a "suggested connections" affordance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSuggestion {
    pub target: NodeId,
    pub suggested_type: ConnectionType,
}

pub struct ConnectionValidator<'a> {
    nodes: &'a [Node],
    edges: &'a [Edge],
    rules: &'a [ConnectionRule],
}

impl<'a> ConnectionValidator<'a> {
    pub fn new(nodes: &'a [Node], edges: &'a [Edge]) -> Self {
        Self::with_rules(nodes, edges, DEFAULT_RULES)
    }

    pub fn with_rules(nodes: &'a [Node], edges: &'a [Edge], rules: &'a [ConnectionRule]) -> Self {
        Self {
            nodes,
            edges,
            rules,
        }
    }

    fn node(&self, id: &NodeId) -> Result<&'a Node, ValidationError> {
        self.nodes
            .iter()
            .find(|n| &n.id == id)
            .ok_or_else(|| ValidationError::UnknownNode(id.clone()))
    }

    /// The rule that would govern `candidate`, if both endpoints exist.
    pub fn rule_for(&self, candidate: &CandidateEdge) -> Result<&'a ConnectionRule, ValidationError> {
        self.resolve(candidate).map(|resolved| resolved.rule)
    }

    fn resolve(&self, candidate: &CandidateEdge) -> Result<Resolved<'a>, ValidationError> {
        let source = self.node(&candidate.source)?;
        let target = self.node(&candidate.target)?;
        Ok(rules::resolve_oriented(
            self.rules,
            source.kind,
            target.kind,
            candidate.bidirectional,
        ))
    }

    /// Checks `candidate` against the rule table.
    ///
    /// On success returns the rule's default type for the UI to prefill.
    pub fn validate(&self, candidate: &CandidateEdge) -> Result<ConnectionType, ValidationError> {
        if candidate.source == candidate.target {
            return Err(ValidationError::SelfLoop);
        }

        let resolved = self.resolve(candidate)?;
        let rule = resolved.rule;

        let exists = self.edges.iter().any(|e| {
            (e.source == candidate.source && e.target == candidate.target)
                || (rule.bidirectional
                    && e.source == candidate.target
                    && e.target == candidate.source)
        });
        if exists {
            return Err(ValidationError::AlreadyConnected);
        }

        if let Some(max) = rule.max_connections
            && self.count_governed(&candidate.source, rule, resolved.far_end()) >= max
        {
            return Err(ValidationError::MaxConnectionsReached { max });
        }

        Ok(rule.default_type)
    }

    /// Same as [`validate`](Self::validate), flattened for UI consumption.
    pub fn check(&self, candidate: &CandidateEdge) -> ValidationReport {
        self.validate(candidate).into()
    }

    /// Every other node that `node` could validly connect to, with the suggested type.
    pub fn suggest_connections(&self, node: &NodeId) -> Vec<ConnectionSuggestion> {
        self.nodes
            .iter()
            .filter(|n| &n.id != node)
            .filter_map(|n| {
                let candidate = CandidateEdge::new(node.clone(), n.id.clone());
                self.validate(&candidate)
                    .ok()
                    .map(|suggested_type| ConnectionSuggestion {
                        target: n.id.clone(),
                        suggested_type,
                    })
            })
            .collect()
    }

    /// Edges incident to `source` whose far end matches `far_end`.
    ///
    /// Only outgoing edges count unless the rule is bidirectional.
    fn count_governed(&self, source: &NodeId, rule: &ConnectionRule, far_end: &TypeMatcher) -> usize {
        self.edges
            .iter()
            .filter_map(|e| {
                if &e.source == source {
                    Some(&e.target)
                } else if rule.bidirectional && &e.target == source {
                    Some(&e.source)
                } else {
                    None
                }
            })
            .filter(|far| {
                self.nodes
                    .iter()
                    .find(|n| &n.id == *far)
                    .is_some_and(|n| far_end.matches(n.kind))
            })
            .count()
    }
}
