use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::entity::{Entity, EntityId};
use crate::error::{WgError, WgResult};
use crate::ids::{ID_SPACE, IdAllocator};
use crate::relationship::RelationshipGraph;
use crate::spatial::{SpatialData, SpatialIndex};
use crate::world::World;

/// One entry of the document's entity list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Must equal `entity.id`.
    pub id: EntityId,
    /// The entity itself.
    pub entity: Entity,
}

/// The persisted form of a whole [`World`].
///
/// Event registrations and history are runtime-only and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldDocument {
    /// Every entity, in ID order.
    pub entities: Vec<EntityRecord>,
    /// Global state bag.
    #[serde(default)]
    pub state: BTreeMap<String, Value>,
    /// Containment maps.
    #[serde(default)]
    pub spatial_index: SpatialData,
    /// Relationship edges.
    #[serde(default)]
    pub relationships: RelationshipGraph,
    /// The player, if one is set.
    #[serde(default)]
    pub player_id: Option<EntityId>,
    /// ID allocator counters. Absent in legacy documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_counters: Option<BTreeMap<String, u32>>,
    /// Capability slots.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub capabilities: BTreeMap<String, Value>,
}

impl WorldDocument {
    /// Snapshot `world`.
    pub fn capture(world: &World) -> Self {
        Self {
            entities: world
                .entities
                .values()
                .map(|entity| EntityRecord {
                    id: entity.id.clone(),
                    entity: entity.clone(),
                })
                .collect(),
            state: world.state.clone(),
            spatial_index: world.spatial.to_data(),
            relationships: world.relationships.clone(),
            player_id: world.player.clone(),
            id_counters: Some(world.ids.counters().clone()),
            capabilities: world.capabilities.clone(),
        }
    }

    /// Parse a document from JSON.
    pub fn from_json(json: &str) -> WgResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> WgResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// World state rebuilt from a document, ready to be swapped in.
struct Restored {
    entities: BTreeMap<EntityId, Entity>,
    ids: IdAllocator,
    spatial: SpatialIndex,
    relationships: RelationshipGraph,
    player: Option<EntityId>,
}

fn restore(document: &WorldDocument, max_depth: usize) -> WgResult<Restored> {
    let mut entities = BTreeMap::new();
    for record in &document.entities {
        if record.id != record.entity.id {
            return Err(WgError::InvalidDocument(format!(
                "record {} holds entity {}",
                record.id, record.entity.id
            )));
        }
        if entities
            .insert(record.id.clone(), record.entity.clone())
            .is_some()
        {
            return Err(WgError::InvalidDocument(format!(
                "entity {} appears twice",
                record.id
            )));
        }
    }

    if let Some(player) = &document.player_id {
        if !entities.contains_key(player) {
            return Err(WgError::PlayerNotFound(player.clone()));
        }
    }

    let known = |id: &EntityId| entities.contains_key(id);

    let mut spatial_data = document.spatial_index.clone();
    let before = spatial_data.parent_map.len();
    spatial_data
        .parent_map
        .retain(|child, parent| known(child) && known(parent));
    spatial_data.child_map.retain(|parent, _| known(parent));
    for children in spatial_data.child_map.values_mut() {
        children.retain(&known);
    }
    let pruned = before - spatial_data.parent_map.len();
    if pruned > 0 {
        warn!(pruned, "dropped containment entries for unknown entities");
    }
    let spatial = SpatialIndex::from_data(&spatial_data);
    let problems = spatial.check(max_depth);
    if !problems.is_empty() {
        return Err(WgError::InvalidDocument(problems.join("; ")));
    }

    let mut relationships = RelationshipGraph::new();
    let mut dangling = BTreeSet::new();
    for (from, kind, to) in document.relationships.iter() {
        if known(from) && known(to) {
            relationships.add(from, to, kind.clone());
        } else {
            dangling.insert((from.clone(), to.clone()));
        }
    }
    if !dangling.is_empty() {
        warn!(
            dropped = dangling.len(),
            "dropped relationships to unknown entities"
        );
    }

    let mut ids = match &document.id_counters {
        Some(counters) => {
            if let Some((prefix, n)) = counters.iter().find(|(_, n)| **n >= ID_SPACE) {
                return Err(WgError::InvalidDocument(format!(
                    "id counter {prefix} is out of range: {n}"
                )));
            }
            IdAllocator::from_counters(counters.clone())
        }
        None => {
            warn!("document has no id counters, rebuilding them from entity ids");
            IdAllocator::new()
        }
    };
    for id in entities.keys() {
        ids.observe(id);
    }

    Ok(Restored {
        spatial,
        relationships,
        player: document.player_id.clone(),
        ids,
        entities,
    })
}

impl World {
    /// Snapshot the world as a document.
    pub fn to_document(&self) -> WorldDocument {
        WorldDocument::capture(self)
    }

    /// Serialize the world to pretty-printed JSON.
    pub fn to_json(&self) -> WgResult<String> {
        self.to_document().to_json()
    }

    /// Replace the world's contents with `document`.
    ///
    /// Either everything loads or nothing changes. Containment entries and
    /// relationships naming unknown entities are dropped. Event handlers,
    /// validators and previewers survive; the event history does not.
    pub fn load_document(&mut self, document: &WorldDocument) -> WgResult<()> {
        let restored = restore(document, self.config.max_depth)?;
        self.entities = restored.entities;
        self.ids = restored.ids;
        self.spatial = restored.spatial;
        self.relationships = restored.relationships;
        self.player = restored.player;
        self.state = document.state.clone();
        self.capabilities = document.capabilities.clone();
        self.events.clear_history();
        debug!(entities = self.entities.len(), "loaded world document");
        Ok(())
    }

    /// Replace the world's contents with the document in `json`.
    pub fn load_json(&mut self, json: &str) -> WgResult<()> {
        let document = WorldDocument::from_json(json)?;
        self.load_document(&document)
    }

    /// Build a fresh world from a document.
    pub fn from_document(document: &WorldDocument) -> WgResult<Self> {
        let mut world = World::new();
        world.load_document(document)?;
        Ok(world)
    }
}
