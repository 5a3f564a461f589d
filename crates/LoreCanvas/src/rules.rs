//! # Connection Rules
//!
//! Declarative, ordered policies describing whether, how often, and under which
//! default type two node kinds may be linked. Rules are static; nothing mutates
//! them at runtime.

use crate::model::{ConnectionType, NodeKind};

/// Matches a node kind, or any kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeMatcher {
    Any,
    Kind(NodeKind),
}

impl TypeMatcher {
    pub fn matches(&self, kind: NodeKind) -> bool {
        match self {
            TypeMatcher::Any => true,
            TypeMatcher::Kind(k) => *k == kind,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, TypeMatcher::Any)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionRule {
    pub source: TypeMatcher,
    pub target: TypeMatcher,
    pub max_connections: Option<usize>,
    /// Existence and cardinality checks consider both directions.
    pub bidirectional: bool,
    pub default_type: ConnectionType,
    pub description: &'static str,
}

impl ConnectionRule {
    const fn pair(source: NodeKind, target: NodeKind, default_type: ConnectionType) -> Self {
        Self {
            source: TypeMatcher::Kind(source),
            target: TypeMatcher::Kind(target),
            max_connections: None,
            bidirectional: false,
            default_type,
            description: "",
        }
    }

    const fn max(mut self, max: usize) -> Self {
        self.max_connections = Some(max);
        self
    }

    const fn both_ways(mut self) -> Self {
        self.bidirectional = true;
        self
    }

    const fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// A rule that applies from any source kind into `target`.
    const fn any_to(target: NodeKind, default_type: ConnectionType) -> Self {
        Self {
            source: TypeMatcher::Any,
            target: TypeMatcher::Kind(target),
            max_connections: None,
            bidirectional: false,
            default_type,
            description: "",
        }
    }

    /// A rule that applies from `source` into any target kind.
    const fn kind_to_any(source: NodeKind, default_type: ConnectionType) -> Self {
        Self {
            source: TypeMatcher::Kind(source),
            target: TypeMatcher::Any,
            max_connections: None,
            bidirectional: false,
            default_type,
            description: "",
        }
    }

    fn is_exact(&self) -> bool {
        !self.source.is_any() && !self.target.is_any()
    }
}

use ConnectionType as T;
use NodeKind::*;

/// The built-in rule table, in lookup order.
pub static DEFAULT_RULES: &[ConnectionRule] = &[
    ConnectionRule::pair(Character, Character, T::Friendship)
        .both_ways()
        .describe("Characters relate to each other"),
    ConnectionRule::pair(Character, Faction, T::Membership)
        .max(3)
        .describe("A character belongs to at most three factions"),
    ConnectionRule::pair(Character, City, T::Residence)
        .max(1)
        .describe("A character resides in one city"),
    ConnectionRule::pair(Character, Event, T::Participation)
        .describe("Characters take part in events"),
    ConnectionRule::pair(Faction, Faction, T::Alliance)
        .both_ways()
        .describe("Factions ally with or oppose each other"),
    ConnectionRule::pair(Faction, City, T::Control).describe("Factions control cities"),
    ConnectionRule::pair(Faction, Event, T::Participation)
        .describe("Factions take part in events"),
    ConnectionRule::pair(City, City, T::Trade).describe("Cities trade with each other"),
    ConnectionRule::pair(City, Location, T::Location).describe("Cities contain locations"),
    ConnectionRule::pair(Event, Location, T::Location)
        .max(1)
        .describe("An event happens in one place"),
    ConnectionRule::pair(Event, Event, T::Custom).describe("Events chain into each other"),
    ConnectionRule::any_to(Location, T::Location).describe("Anything can be placed at a location"),
    ConnectionRule::kind_to_any(Character, T::Custom).describe("Characters may link to anything"),
];

/// Applied when nothing in the table matches.
pub static FALLBACK_RULE: ConnectionRule = ConnectionRule {
    source: TypeMatcher::Any,
    target: TypeMatcher::Any,
    max_connections: None,
    bidirectional: false,
    default_type: ConnectionType::Custom,
    description: "Free-form connection",
};

/// A resolved rule and the orientation it was found in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolved<'r> {
    pub rule: &'r ConnectionRule,
    /// The rule matched `target -> source`: its `source` matcher describes the
    /// candidate's target.
    pub reversed: bool,
}

impl Resolved<'_> {
    /// Matcher for the far end of edges counted at the candidate's source.
    pub fn far_end(&self) -> &TypeMatcher {
        if self.reversed {
            &self.rule.source
        } else {
            &self.rule.target
        }
    }
}

/// Resolves the rule governing `source -> target`.
///
/// Order: exact pair, then (for bidirectional candidates) the reversed exact pair,
/// then a wildcard-target rule for the source, then a wildcard-source rule for the
/// target, then [`FALLBACK_RULE`].
pub fn resolve<'r>(
    rules: &'r [ConnectionRule],
    source: NodeKind,
    target: NodeKind,
    bidirectional: bool,
) -> &'r ConnectionRule {
    resolve_oriented(rules, source, target, bidirectional).rule
}

/// Like [`resolve`], also reporting whether the reversed exact pair matched.
pub fn resolve_oriented<'r>(
    rules: &'r [ConnectionRule],
    source: NodeKind,
    target: NodeKind,
    bidirectional: bool,
) -> Resolved<'r> {
    let exact = |s: NodeKind, t: NodeKind| {
        rules
            .iter()
            .find(|r| r.is_exact() && r.source.matches(s) && r.target.matches(t))
    };

    if let Some(rule) = exact(source, target) {
        return Resolved { rule, reversed: false };
    }
    if bidirectional && let Some(rule) = exact(target, source) {
        return Resolved { rule, reversed: true };
    }

    let rule = rules
        .iter()
        .find(|r| r.target.is_any() && !r.source.is_any() && r.source.matches(source))
        .or_else(|| {
            rules
                .iter()
                .find(|r| r.target.is_any() && !r.source.is_any() && r.source.matches(source))
        })
        .or_else(|| {
            rules
                .iter()
                .find(|r| r.source.is_any() && !r.target.is_any() && r.target.matches(target))
        })
        .unwrap_or_else(|| fallback_for(rules));
    Resolved { rule, reversed: false }
}

fn fallback_for(rules: &[ConnectionRule]) -> &ConnectionRule {
    rules
        .iter()
        .find(|r| r.source.is_any() && r.target.is_any())
        .unwrap_or(&FALLBACK_RULE)
}
