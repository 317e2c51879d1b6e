use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

/// Options for [`crate::World::get_all_contents`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentsOptions {
    /// Descend past direct children.
    pub recursive: bool,
    /// Deepest level to include (direct children are level 1). Falls back to
    /// the world's configured `max_depth`.
    pub max_depth: Option<usize>,
}

impl ContentsOptions {
    /// Every descendant down to the configured depth limit.
    pub fn recursive() -> Self {
        Self {
            recursive: true,
            max_depth: None,
        }
    }

    /// Cap the levels returned.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }
}

/// The persisted form of a [`SpatialIndex`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialData {
    /// Child to parent.
    #[serde(default)]
    pub parent_map: BTreeMap<EntityId, EntityId>,
    /// Parent to children, in insertion order.
    #[serde(default)]
    pub child_map: BTreeMap<EntityId, Vec<EntityId>>,
}

/// The containment forest over entity IDs.
///
/// Stores IDs only; whether those IDs exist, and whether a move is allowed,
/// is decided by [`crate::World`]. The two maps are always kept mirror
/// images of each other.
#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    parent_of: HashMap<EntityId, EntityId>,
    children_of: HashMap<EntityId, Vec<EntityId>>,
}

impl SpatialIndex {
    /// An empty forest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `child` under `parent`, detaching it from any previous parent.
    pub fn add_child(&mut self, parent: &EntityId, child: &EntityId) {
        self.detach(child);
        self.parent_of.insert(child.clone(), parent.clone());
        let siblings = self.children_of.entry(parent.clone()).or_default();
        if !siblings.contains(child) {
            siblings.push(child.clone());
        }
    }

    /// Make `child` top-level. Returns its former parent.
    pub fn detach(&mut self, child: &EntityId) -> Option<EntityId> {
        let parent = self.parent_of.remove(child)?;
        if let Some(siblings) = self.children_of.get_mut(&parent) {
            siblings.retain(|id| id != child);
            if siblings.is_empty() {
                self.children_of.remove(&parent);
            }
        }
        Some(parent)
    }

    /// Drop `id` from the forest. Its children become top-level; their IDs
    /// are returned.
    pub fn remove(&mut self, id: &EntityId) -> Vec<EntityId> {
        self.detach(id);
        let orphans = self.children_of.remove(id).unwrap_or_default();
        for orphan in &orphans {
            self.parent_of.remove(orphan);
        }
        orphans
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.parent_of.clear();
        self.children_of.clear();
    }

    /// The direct parent of `id`.
    pub fn parent(&self, id: &EntityId) -> Option<&EntityId> {
        self.parent_of.get(id)
    }

    /// The direct children of `id`, in insertion order.
    pub fn children(&self, id: &EntityId) -> &[EntityId] {
        self.children_of.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Parent chain of `id`, nearest first, at most `limit` long.
    ///
    /// Stops early if the chain revisits an entity, so a corrupted index can
    /// never loop forever.
    pub fn ancestors(&self, id: &EntityId, limit: usize) -> Vec<EntityId> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut current = id;
        while chain.len() < limit {
            let Some(parent) = self.parent_of.get(current) else {
                break;
            };
            if !seen.insert(parent) {
                break;
            }
            chain.push(parent.clone());
            current = parent;
        }
        chain
    }

    /// Whether `ancestor` appears anywhere on `id`'s parent chain.
    pub fn has_ancestor(&self, id: &EntityId, ancestor: &EntityId) -> bool {
        let mut seen = HashSet::from([id]);
        let mut current = id;
        while let Some(parent) = self.parent_of.get(current) {
            if parent == ancestor {
                return true;
            }
            if !seen.insert(parent) {
                return false;
            }
            current = parent;
        }
        false
    }

    /// Number of ancestors above `id`.
    pub fn depth(&self, id: &EntityId) -> usize {
        self.ancestors(id, usize::MAX).len()
    }

    /// Levels of nesting below `id` (0 for an entity with no contents).
    pub fn height(&self, id: &EntityId) -> usize {
        self.descendants_with_depth(id, usize::MAX)
            .into_iter()
            .map(|(_, depth)| depth)
            .max()
            .unwrap_or(0)
    }

    /// Breadth-first descendants of `id` down to `max_depth` levels.
    pub fn descendants(&self, id: &EntityId, max_depth: usize) -> Vec<EntityId> {
        self.descendants_with_depth(id, max_depth)
            .into_iter()
            .map(|(id, _)| id)
            .collect()
    }

    fn descendants_with_depth(&self, id: &EntityId, max_depth: usize) -> Vec<(EntityId, usize)> {
        let mut found = Vec::new();
        let mut seen = HashSet::from([id.clone()]);
        let mut queue = VecDeque::from([(id.clone(), 0usize)]);

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for child in self.children(&current) {
                if seen.insert(child.clone()) {
                    found.push((child.clone(), depth + 1));
                    queue.push_back((child.clone(), depth + 1));
                }
            }
        }
        found
    }

    /// Every ID that appears in the index, as parent or child.
    pub fn ids(&self) -> HashSet<&EntityId> {
        self.parent_of
            .iter()
            .flat_map(|(child, parent)| [child, parent])
            .chain(self.children_of.keys())
            .collect()
    }

    /// Describe every place where the two maps disagree, or where the parent
    /// chain loops or exceeds `max_depth`.
    pub fn check(&self, max_depth: usize) -> Vec<String> {
        let mut problems = Vec::new();

        for (child, parent) in &self.parent_of {
            if !self.children(parent).contains(child) {
                problems.push(format!("{child} points to parent {parent}, which does not list it"));
            }
        }
        for (parent, children) in &self.children_of {
            let mut seen = HashSet::new();
            for child in children {
                if !seen.insert(child) {
                    problems.push(format!("{parent} lists child {child} twice"));
                }
                if self.parent_of.get(child) != Some(parent) {
                    problems.push(format!("{parent} lists child {child}, which points elsewhere"));
                }
            }
        }
        let mut ids: Vec<&EntityId> = self.parent_of.keys().collect();
        ids.sort();
        for id in ids {
            if self.has_ancestor(id, id) {
                problems.push(format!("{id} is its own ancestor"));
            } else if self.depth(id) > max_depth {
                problems.push(format!("{id} is nested deeper than {max_depth}"));
            }
        }
        problems
    }

    /// Snapshot both maps with deterministic ordering.
    pub fn to_data(&self) -> SpatialData {
        SpatialData {
            parent_map: self
                .parent_of
                .iter()
                .map(|(child, parent)| (child.clone(), parent.clone()))
                .collect(),
            child_map: self
                .children_of
                .iter()
                .map(|(parent, children)| (parent.clone(), children.clone()))
                .collect(),
        }
    }

    /// Rebuild from persisted maps.
    ///
    /// The parent map is authoritative. Children keep the order given in the
    /// child map; children missing from it are appended, and entries that
    /// contradict the parent map are dropped.
    pub fn from_data(data: &SpatialData) -> Self {
        let mut index = Self::new();
        for (parent, children) in &data.child_map {
            for child in children {
                if data.parent_map.get(child) == Some(parent) {
                    index.add_child(parent, child);
                }
            }
        }
        for (child, parent) in &data.parent_map {
            if index.parent(child) != Some(parent) {
                index.add_child(parent, child);
            }
        }
        index
    }
}
