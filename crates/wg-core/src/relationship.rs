use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

/// The kind of a directed relationship between two entities.
///
/// Serialized as a plain string so it can key JSON objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RelationKind {
    /// The source is aware of the target.
    Knows,
    /// The source is fond of the target.
    Likes,
    /// The source dislikes the target.
    Dislikes,
    /// The source owns the target.
    Owns,
    /// The source follows the target around.
    Follows,
    /// The source guards the target.
    Guards,
    /// The source (a key) works the target's lock.
    Unlocks,
    /// A host-defined relation.
    Custom(String),
}

impl RelationKind {
    /// Parse a relation name. Unknown names become `Custom`.
    pub fn parse(s: &str) -> Self {
        match s {
            "knows" => Self::Knows,
            "likes" => Self::Likes,
            "dislikes" => Self::Dislikes,
            "owns" => Self::Owns,
            "follows" => Self::Follows,
            "guards" => Self::Guards,
            "unlocks" => Self::Unlocks,
            other => Self::Custom(other.to_string()),
        }
    }

    /// The name as written in documents.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Knows => "knows",
            Self::Likes => "likes",
            Self::Dislikes => "dislikes",
            Self::Owns => "owns",
            Self::Follows => "follows",
            Self::Guards => "guards",
            Self::Unlocks => "unlocks",
            Self::Custom(s) => s.as_str(),
        }
    }
}

impl From<String> for RelationKind {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<&str> for RelationKind {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<RelationKind> for String {
    fn from(kind: RelationKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Directed, typed edges stored as `from -> kind -> {to}`.
///
/// Holds IDs only; the graph never checks existence. Reverse edges are
/// never implied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationshipGraph {
    edges: BTreeMap<EntityId, BTreeMap<RelationKind, BTreeSet<EntityId>>>,
}

impl RelationshipGraph {
    /// An empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `from -kind-> to`. Returns false if it was already present.
    pub fn add(&mut self, from: &EntityId, to: &EntityId, kind: RelationKind) -> bool {
        self.edges
            .entry(from.clone())
            .or_default()
            .entry(kind)
            .or_default()
            .insert(to.clone())
    }

    /// Drop `from -kind-> to`. Returns whether it existed.
    pub fn remove(&mut self, from: &EntityId, to: &EntityId, kind: &RelationKind) -> bool {
        let Some(by_kind) = self.edges.get_mut(from) else {
            return false;
        };
        let Some(targets) = by_kind.get_mut(kind) else {
            return false;
        };
        let removed = targets.remove(to);
        if targets.is_empty() {
            by_kind.remove(kind);
        }
        if by_kind.is_empty() {
            self.edges.remove(from);
        }
        removed
    }

    /// Whether `from -kind-> to` is recorded.
    pub fn contains(&self, from: &EntityId, to: &EntityId, kind: &RelationKind) -> bool {
        self.targets(from, kind).any(|id| id == to)
    }

    /// Every `to` with `from -kind-> to`, in ID order.
    pub fn targets<'g>(
        &'g self,
        from: &EntityId,
        kind: &RelationKind,
    ) -> impl Iterator<Item = &'g EntityId> + use<'g> {
        self.edges
            .get(from)
            .and_then(|by_kind| by_kind.get(kind))
            .into_iter()
            .flatten()
    }

    /// All outgoing edges of `from`, grouped by kind.
    pub fn outgoing(&self, from: &EntityId) -> Option<&BTreeMap<RelationKind, BTreeSet<EntityId>>> {
        self.edges.get(from)
    }

    /// Drop every edge that starts or ends at `id`.
    pub fn remove_entity(&mut self, id: &EntityId) {
        self.edges.remove(id);
        for by_kind in self.edges.values_mut() {
            for targets in by_kind.values_mut() {
                targets.remove(id);
            }
            by_kind.retain(|_, targets| !targets.is_empty());
        }
        self.edges.retain(|_, by_kind| !by_kind.is_empty());
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.edges
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeSet::len)
            .sum()
    }

    /// True if there are no edges.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Every edge as `(from, kind, to)`.
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &RelationKind, &EntityId)> {
        self.edges.iter().flat_map(|(from, by_kind)| {
            by_kind
                .iter()
                .flat_map(move |(kind, targets)| targets.iter().map(move |to| (from, kind, to)))
        })
    }
}
