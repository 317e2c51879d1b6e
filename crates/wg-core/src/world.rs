use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::WorldConfig;
use crate::entity::{Entity, EntityId, EntityKind};
use crate::error::{WgError, WgResult};
use crate::event::{ChangeDescription, EventLog, WorldEvent};
use crate::ids::IdAllocator;
use crate::query::QueryBuilder;
use crate::relationship::{RelationKind, RelationshipGraph};
use crate::spatial::{ContentsOptions, SpatialIndex};
use crate::traits::TraitKind;
use crate::visibility::VisibilityResolver;

/// Room to neighboring room, with the door passed through if there is one.
type Adjacency = HashMap<EntityId, Vec<(EntityId, Option<EntityId>)>>;

/// One breadth-first hop: the previous room and the door between.
type Step<'a> = (&'a EntityId, Option<&'a EntityId>);

/// The world graph engine. Owns every entity, the containment forest, the
/// relationship graph, global state, and the event log.
#[derive(Debug, Clone)]
pub struct World {
    pub(crate) config: WorldConfig,
    pub(crate) entities: BTreeMap<EntityId, Entity>,
    pub(crate) ids: IdAllocator,
    pub(crate) spatial: SpatialIndex,
    pub(crate) relationships: RelationshipGraph,
    pub(crate) state: BTreeMap<String, Value>,
    pub(crate) capabilities: BTreeMap<String, Value>,
    pub(crate) player: Option<EntityId>,
    pub(crate) events: EventLog,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// An empty world with the default configuration.
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    /// An empty world with the given configuration.
    pub fn with_config(config: WorldConfig) -> Self {
        Self {
            config,
            entities: BTreeMap::new(),
            ids: IdAllocator::new(),
            spatial: SpatialIndex::new(),
            relationships: RelationshipGraph::new(),
            state: BTreeMap::new(),
            capabilities: BTreeMap::new(),
            player: None,
            events: EventLog::new(),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Reset to an empty world, dropping event registrations too.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.ids = IdAllocator::new();
        self.spatial.clear();
        self.relationships = RelationshipGraph::new();
        self.state.clear();
        self.capabilities.clear();
        self.player = None;
        self.events.clear();
    }

    // -----------------------------------------------------------------------
    // Entity store
    // -----------------------------------------------------------------------

    /// Create an entity and return its freshly allocated ID.
    ///
    /// Display names may repeat; IDs never do.
    pub fn create_entity(
        &mut self,
        name: impl Into<String>,
        kind: impl Into<EntityKind>,
    ) -> WgResult<EntityId> {
        let kind = kind.into();
        let mut id = self.ids.allocate(&kind)?;
        // Loaded documents may already hold IDs the counters never issued.
        while self.entities.contains_key(&id) {
            id = self.ids.allocate(&kind)?;
        }
        let entity = Entity::new(id.clone(), kind, name);
        debug!(id = %id, name = entity.name(), "created entity");
        self.entities.insert(id.clone(), entity);
        Ok(id)
    }

    /// Get an entity by ID.
    pub fn get_entity(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Get a mutable reference to an entity by ID.
    pub fn get_entity_mut(&mut self, id: &EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// Whether the entity exists.
    pub fn has_entity(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// All entities, ordered by ID.
    pub fn all_entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Apply `mutate` to an entity.
    ///
    /// A missing entity is an error in strict mode and a no-op otherwise.
    /// The entity's ID cannot be changed this way.
    pub fn update_entity(
        &mut self,
        id: &EntityId,
        mutate: impl FnOnce(&mut Entity),
    ) -> WgResult<()> {
        match self.entities.get_mut(id) {
            Some(entity) => {
                mutate(entity);
                entity.id = id.clone();
                Ok(())
            }
            None if self.config.strict_mode => {
                warn!(id = %id, "update of unknown entity rejected");
                Err(WgError::UnknownEntity(id.clone()))
            }
            None => Ok(()),
        }
    }

    /// Delete an entity. Its contents become top-level rather than being
    /// deleted with it, and every relationship touching it is dropped.
    pub fn remove_entity(&mut self, id: &EntityId) -> bool {
        if self.entities.remove(id).is_none() {
            return false;
        }
        let orphans = self.spatial.remove(id);
        self.relationships.remove_entity(id);
        if self.player.as_ref() == Some(id) {
            self.player = None;
        }
        debug!(id = %id, orphaned = orphans.len(), "removed entity");
        true
    }

    /// Entities whose name matches `name`, ignoring case.
    pub fn find_by_name(&self, name: &str) -> Vec<&Entity> {
        let name_lower = name.to_lowercase();
        self.entities
            .values()
            .filter(|e| e.name().to_lowercase() == name_lower)
            .collect()
    }

    /// Entities tagged with `kind`.
    pub fn entities_by_kind(&self, kind: &EntityKind) -> Vec<&Entity> {
        self.entities.values().filter(|e| e.kind == *kind).collect()
    }

    /// Entities carrying a trait of type `kind`.
    pub fn find_by_trait(&self, kind: TraitKind) -> Vec<&Entity> {
        self.entities.values().filter(|e| e.has(kind)).collect()
    }

    /// The entity's name, or its ID when it has none or does not exist.
    pub fn entity_name(&self, id: &EntityId) -> String {
        match self.entities.get(id) {
            Some(e) if !e.name().is_empty() => e.name().to_string(),
            _ => id.to_string(),
        }
    }

    /// Number of entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Count entities by kind.
    pub fn entity_counts_by_kind(&self) -> BTreeMap<EntityKind, usize> {
        let mut counts = BTreeMap::new();
        for entity in self.entities.values() {
            *counts.entry(entity.kind.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Start building a query.
    pub fn query(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(self)
    }

    // -----------------------------------------------------------------------
    // Containment
    // -----------------------------------------------------------------------

    /// The underlying containment forest.
    pub fn spatial_index(&self) -> &SpatialIndex {
        &self.spatial
    }

    /// Move `id` under `destination`, or to the top level for `None`.
    ///
    /// Returns false, changing nothing, when [`World::can_move_entity`] does.
    pub fn move_entity(&mut self, id: &EntityId, destination: Option<&EntityId>) -> bool {
        if !self.can_move_entity(id, destination) {
            debug!(id = %id, destination = ?destination, "move rejected");
            return false;
        }
        match destination {
            Some(parent) => self.spatial.add_child(parent, id),
            None => {
                self.spatial.detach(id);
            }
        }
        debug!(id = %id, destination = ?destination, "moved entity");
        true
    }

    /// Whether [`World::move_entity`] would succeed: both entities exist, the
    /// destination can hold contents, no cycle results, and the moved subtree
    /// stays within `max_depth`.
    pub fn can_move_entity(&self, id: &EntityId, destination: Option<&EntityId>) -> bool {
        if !self.has_entity(id) {
            return false;
        }
        let Some(destination) = destination else {
            return true;
        };
        let Some(target) = self.entities.get(destination) else {
            return false;
        };
        if !holds_contents(target) || self.would_create_loop(id, destination) {
            return false;
        }
        let deepest = self.spatial.depth(destination) + 1 + self.spatial.height(id);
        deepest <= self.config.max_depth
    }

    /// Whether putting `id` under `new_parent` would close a loop: the new
    /// parent is `id` itself or already inside it.
    pub fn would_create_loop(&self, id: &EntityId, new_parent: &EntityId) -> bool {
        id == new_parent || self.spatial.has_ancestor(new_parent, id)
    }

    /// The direct parent of `id`.
    pub fn get_location(&self, id: &EntityId) -> Option<&EntityId> {
        self.spatial.parent(id)
    }

    /// Direct contents of `id`.
    pub fn get_contents(&self, id: &EntityId) -> Vec<&Entity> {
        self.spatial
            .children(id)
            .iter()
            .filter_map(|child| self.entities.get(child))
            .collect()
    }

    /// Contents of `id`, breadth-first. Levels past the depth cap are left
    /// out silently.
    pub fn get_all_contents(&self, id: &EntityId, options: ContentsOptions) -> Vec<&Entity> {
        if !options.recursive {
            return self.get_contents(id);
        }
        let max_depth = options.max_depth.unwrap_or(self.config.max_depth);
        self.spatial
            .descendants(id, max_depth)
            .iter()
            .filter_map(|child| self.entities.get(child))
            .collect()
    }

    /// The nearest room above `id`. A room is never its own containing room.
    pub fn get_containing_room(&self, id: &EntityId) -> Option<&Entity> {
        self.spatial
            .ancestors(id, usize::MAX)
            .iter()
            .filter_map(|ancestor| self.entities.get(ancestor))
            .find(|e| e.is_room())
    }

    /// Own weight plus the weight of everything inside, at any depth.
    pub fn get_total_weight(&self, id: &EntityId) -> f64 {
        let Some(entity) = self.entities.get(id) else {
            return 0.0;
        };
        let contents: f64 = self
            .spatial
            .descendants(id, usize::MAX)
            .iter()
            .filter_map(|child| self.entities.get(child))
            .map(Entity::weight)
            .sum();
        entity.weight() + contents
    }

    /// Breadth-first search from room to room, returning the doors passed
    /// through in order.
    ///
    /// Identical rooms give an empty path, as do rooms joined only by doorless
    /// exits. `None` means the destination cannot be reached.
    pub fn find_path(&self, from: &EntityId, to: &EntityId) -> Option<Vec<EntityId>> {
        if !self.has_entity(from) || !self.has_entity(to) {
            return None;
        }
        if from == to {
            return Some(Vec::new());
        }

        let adjacency = self.room_adjacency();
        // Each reached room maps to the room it was reached from and the door used.
        let mut visited: HashMap<&EntityId, Option<Step<'_>>> = HashMap::new();
        let mut queue = VecDeque::new();
        visited.insert(from, None);
        queue.push_back(from);

        while let Some(current) = queue.pop_front() {
            if current == to {
                let mut doors = Vec::new();
                let mut node = to;
                while let Some(&Some((prev, via))) = visited.get(node) {
                    if let Some(door) = via {
                        doors.push(door.clone());
                    }
                    node = prev;
                }
                doors.reverse();
                return Some(doors);
            }

            for (next, via) in adjacency.get(current).into_iter().flatten() {
                if !visited.contains_key(next) {
                    visited.insert(next, Some((current, via.as_ref())));
                    queue.push_back(next);
                }
            }
        }
        None
    }

    /// Room-to-room edges from door traits and doorless room exits, in ID
    /// order so the search breaks ties the same way every time.
    fn room_adjacency(&self) -> Adjacency {
        let mut adjacency = Adjacency::new();
        for entity in self.entities.values() {
            if let Some(door) = entity.traits.door() {
                adjacency
                    .entry(door.room1.clone())
                    .or_default()
                    .push((door.room2.clone(), Some(entity.id.clone())));
                if !door.one_way {
                    adjacency
                        .entry(door.room2.clone())
                        .or_default()
                        .push((door.room1.clone(), Some(entity.id.clone())));
                }
            }
            if let Some(room) = entity.traits.room() {
                for exit in room.exits.values() {
                    adjacency
                        .entry(entity.id.clone())
                        .or_default()
                        .push((exit.destination.clone(), exit.via.clone()));
                }
            }
        }
        adjacency
    }

    /// Problems with the containment forest: inconsistent maps, loops,
    /// excessive depth, and IDs that name no entity. Empty when healthy.
    pub fn check_integrity(&self) -> Vec<String> {
        let mut problems = self.spatial.check(self.config.max_depth);
        let mut dangling: Vec<&EntityId> = self
            .spatial
            .ids()
            .into_iter()
            .filter(|id| !self.entities.contains_key(*id))
            .collect();
        dangling.sort();
        for id in dangling {
            problems.push(format!("{id} is in the containment index but not in the world"));
        }
        if let Some(player) = &self.player {
            if !self.entities.contains_key(player) {
                problems.push(format!("player {player} does not exist"));
            }
        }
        problems
    }

    // -----------------------------------------------------------------------
    // Visibility
    // -----------------------------------------------------------------------

    /// A resolver for perception and scope queries.
    pub fn visibility(&self) -> VisibilityResolver<'_> {
        VisibilityResolver::new(self)
    }

    /// Whether `observer` can currently see `target`.
    pub fn can_see(&self, observer: &EntityId, target: &EntityId) -> bool {
        self.visibility().can_see(observer, target)
    }

    /// Everything `observer` can currently see.
    pub fn get_visible(&self, observer: &EntityId) -> Vec<&Entity> {
        self.visibility().visible(observer)
    }

    /// Everything `observer` knows to be around, seen or not.
    pub fn get_in_scope(&self, observer: &EntityId) -> Vec<&Entity> {
        self.visibility().in_scope(observer)
    }

    /// Whether `observer` can physically touch `target`.
    pub fn can_reach(&self, observer: &EntityId, target: &EntityId) -> bool {
        self.visibility().can_reach(observer, target)
    }

    // -----------------------------------------------------------------------
    // Relationships
    // -----------------------------------------------------------------------

    /// Record `from -kind-> to`.
    ///
    /// In strict mode both ends must exist. Otherwise a dangling edge is kept
    /// but ignored by queries until the missing entity appears.
    pub fn add_relationship(
        &mut self,
        from: &EntityId,
        to: &EntityId,
        kind: impl Into<RelationKind>,
    ) -> WgResult<()> {
        let kind = kind.into();
        if self.config.strict_mode {
            for id in [from, to] {
                if !self.has_entity(id) {
                    warn!(from = %from, to = %to, kind = %kind, "relationship to unknown entity rejected");
                    return Err(WgError::UnknownEntity(id.clone()));
                }
            }
        }
        debug!(from = %from, to = %to, kind = %kind, "added relationship");
        self.relationships.add(from, to, kind);
        Ok(())
    }

    /// Drop `from -kind-> to`. Returns whether it existed.
    pub fn remove_relationship(
        &mut self,
        from: &EntityId,
        to: &EntityId,
        kind: impl Into<RelationKind>,
    ) -> bool {
        let kind = kind.into();
        let removed = self.relationships.remove(from, to, &kind);
        if removed {
            debug!(from = %from, to = %to, kind = %kind, "removed relationship");
        }
        removed
    }

    /// Whether `from -kind-> to` holds between two existing entities.
    pub fn are_related(&self, from: &EntityId, to: &EntityId, kind: impl Into<RelationKind>) -> bool {
        self.has_entity(from)
            && self.has_entity(to)
            && self.relationships.contains(from, to, &kind.into())
    }

    /// Existing entities `to` with `from -kind-> to`.
    pub fn get_related(&self, from: &EntityId, kind: impl Into<RelationKind>) -> Vec<EntityId> {
        if !self.has_entity(from) {
            return Vec::new();
        }
        self.relationships
            .targets(from, &kind.into())
            .filter(|to| self.has_entity(to))
            .cloned()
            .collect()
    }

    /// Every outgoing relation of `from`, grouped by kind.
    pub fn get_relationships(&self, from: &EntityId) -> BTreeMap<RelationKind, Vec<EntityId>> {
        if !self.has_entity(from) {
            return BTreeMap::new();
        }
        self.relationships
            .outgoing(from)
            .into_iter()
            .flatten()
            .map(|(kind, targets)| {
                let live: Vec<EntityId> = targets
                    .iter()
                    .filter(|to| self.has_entity(to))
                    .cloned()
                    .collect();
                (kind.clone(), live)
            })
            .filter(|(_, targets)| !targets.is_empty())
            .collect()
    }

    /// The raw relationship graph, dangling edges included.
    pub fn relationships(&self) -> &RelationshipGraph {
        &self.relationships
    }

    // -----------------------------------------------------------------------
    // Player
    // -----------------------------------------------------------------------

    /// Make `id` the player.
    pub fn set_player(&mut self, id: &EntityId) -> WgResult<()> {
        if !self.has_entity(id) {
            return Err(WgError::PlayerNotFound(id.clone()));
        }
        self.player = Some(id.clone());
        Ok(())
    }

    /// The player's ID, if set.
    pub fn player_id(&self) -> Option<&EntityId> {
        self.player.as_ref()
    }

    /// The player entity, if set.
    pub fn get_player(&self) -> Option<&Entity> {
        self.player.as_ref().and_then(|id| self.entities.get(id))
    }

    // -----------------------------------------------------------------------
    // Global state and capabilities
    // -----------------------------------------------------------------------

    /// The whole global state bag.
    pub fn state(&self) -> &BTreeMap<String, Value> {
        &self.state
    }

    /// Replace the whole global state bag.
    pub fn set_state(&mut self, state: BTreeMap<String, Value>) {
        self.state = state;
    }

    /// One global state value.
    pub fn get_state_value(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }

    /// Set one global state value, returning the previous one.
    pub fn set_state_value(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.state.insert(key.into(), value.into())
    }

    /// Remove one global state value.
    pub fn remove_state_value(&mut self, key: &str) -> Option<Value> {
        self.state.remove(key)
    }

    /// Create a capability slot holding `initial`.
    pub fn register_capability(&mut self, name: impl Into<String>, initial: Value) -> WgResult<()> {
        let name = name.into();
        if self.capabilities.contains_key(&name) {
            return Err(WgError::CapabilityExists(name));
        }
        debug!(capability = %name, "registered capability");
        self.capabilities.insert(name, initial);
        Ok(())
    }

    /// Whether a capability slot exists.
    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    /// The data in a capability slot.
    pub fn get_capability(&self, name: &str) -> Option<&Value> {
        self.capabilities.get(name)
    }

    /// Update a capability slot. Object patches are merged field by field
    /// into object slots; anything else replaces the slot outright.
    pub fn update_capability(&mut self, name: &str, patch: Value) -> WgResult<()> {
        let slot = self
            .capabilities
            .get_mut(name)
            .ok_or_else(|| WgError::UnknownCapability(name.to_string()))?;
        match (slot, patch) {
            (Value::Object(existing), Value::Object(fields)) => existing.extend(fields),
            (slot, patch) => *slot = patch,
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Register the handler for `event_type`, replacing any earlier one.
    pub fn register_event_handler(
        &mut self,
        event_type: impl Into<String>,
        handler: impl Fn(&WorldEvent, &mut World) -> WgResult<()> + 'static,
    ) {
        self.events.set_handler(event_type, Rc::new(handler));
    }

    /// Register the validator for `event_type`, replacing any earlier one.
    pub fn register_event_validator(
        &mut self,
        event_type: impl Into<String>,
        validator: impl Fn(&WorldEvent, &World) -> bool + 'static,
    ) {
        self.events.set_validator(event_type, Rc::new(validator));
    }

    /// Register the previewer for `event_type`, replacing any earlier one.
    pub fn register_event_previewer(
        &mut self,
        event_type: impl Into<String>,
        previewer: impl Fn(&WorldEvent, &World) -> Vec<ChangeDescription> + 'static,
    ) {
        self.events.set_previewer(event_type, Rc::new(previewer));
    }

    /// Whether `event` passes its validator. Types without one always pass.
    pub fn can_apply_event(&self, event: &WorldEvent) -> bool {
        self.events
            .validator(&event.event_type)
            .is_none_or(|validate| validate(event, self))
    }

    /// Validate, run the handler if one is registered, then record `event`.
    ///
    /// A handler error leaves the event unrecorded.
    pub fn apply_event(&mut self, event: WorldEvent) -> WgResult<()> {
        if !self.can_apply_event(&event) {
            warn!(event_type = %event.event_type, id = %event.id, "event failed validation");
            return Err(WgError::EventValidationFailed {
                event_type: event.event_type,
            });
        }
        if let Some(handle) = self.events.handler(&event.event_type) {
            handle(&event, self)?;
        }
        debug!(event_type = %event.event_type, id = %event.id, "applied event");
        self.events.record(event);
        Ok(())
    }

    /// What `event` would change, according to its previewer.
    pub fn preview_event(&self, event: &WorldEvent) -> Vec<ChangeDescription> {
        self.events
            .previewer(&event.event_type)
            .map(|preview| preview(event, self))
            .unwrap_or_default()
    }

    /// Apply a recorded sequence in order, stopping at the first failure.
    /// Returns how many were applied.
    pub fn replay(&mut self, events: impl IntoIterator<Item = WorldEvent>) -> WgResult<usize> {
        let mut applied = 0;
        for event in events {
            self.apply_event(event)?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Applied events, oldest first.
    pub fn applied_events(&self) -> &[WorldEvent] {
        self.events.history()
    }

    /// Applied events stamped strictly after `timestamp`.
    pub fn events_since(&self, timestamp: i64) -> Vec<&WorldEvent> {
        self.events.since(timestamp)
    }

    /// Forget applied events. Registrations stay.
    pub fn clear_event_history(&mut self) {
        self.events.clear_history();
    }
}

/// Rooms and anything with a container-like trait accept contents.
fn holds_contents(entity: &Entity) -> bool {
    entity.is_room() || entity.traits.kinds().any(TraitKind::holds_contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{ContainerTrait, DoorTrait, Exit, RoomTrait, SupporterTrait};
    use serde_json::json;

    fn test_world() -> World {
        World::new()
    }

    fn container(world: &mut World, name: &str) -> EntityId {
        let id = world.create_entity(name, "container").unwrap();
        world
            .update_entity(&id, |e| {
                e.add(ContainerTrait::default());
            })
            .unwrap();
        id
    }

    #[test]
    fn create_entity_allocates_prefixed_ids() {
        let mut world = test_world();
        let room = world.create_entity("Hall", "room").unwrap();
        let torch = world.create_entity("Torch", "item").unwrap();
        assert_eq!(room.as_str(), "r01");
        assert_eq!(torch.as_str(), "i01");
        assert_eq!(world.get_entity(&torch).unwrap().name(), "Torch");
    }

    #[test]
    fn duplicate_names_get_distinct_ids() {
        let mut world = test_world();
        let a = world.create_entity("Torch", "item").unwrap();
        let b = world.create_entity("Torch", "item").unwrap();
        assert_ne!(a, b);
        assert_eq!(world.find_by_name("torch").len(), 2);
        assert!(world.has_entity(&a));
        assert!(world.has_entity(&b));
    }

    #[test]
    fn update_unknown_entity_depends_on_mode() {
        let mut world = test_world();
        assert!(world.update_entity(&EntityId::from("i99"), |_| {}).is_ok());

        let mut strict = World::with_config(WorldConfig::default().with_strict_mode(true));
        let err = strict.update_entity(&EntityId::from("i99"), |_| {}).unwrap_err();
        assert!(matches!(err, WgError::UnknownEntity(_)));
    }

    #[test]
    fn update_entity_cannot_change_id() {
        let mut world = test_world();
        let id = world.create_entity("Coin", "item").unwrap();
        world
            .update_entity(&id, |e| {
                e.id = EntityId::from("zzz");
                e.set_attribute("weight", 1_i64);
            })
            .unwrap();
        let coin = world.get_entity(&id).unwrap();
        assert_eq!(coin.id, id);
        assert_eq!(coin.weight(), 1.0);
    }

    #[test]
    fn remove_entity_orphans_contents() {
        let mut world = test_world();
        let room = world.create_entity("Hall", "room").unwrap();
        let bag = container(&mut world, "Bag");
        let coin = world.create_entity("Coin", "item").unwrap();
        assert!(world.move_entity(&bag, Some(&room)));
        assert!(world.move_entity(&coin, Some(&bag)));

        assert!(world.remove_entity(&bag));
        assert!(!world.remove_entity(&bag));
        assert!(world.has_entity(&coin));
        assert!(world.get_location(&coin).is_none());
        assert!(world.get_contents(&room).is_empty());
        assert!(world.check_integrity().is_empty());
    }

    #[test]
    fn move_and_unparent() {
        let mut world = test_world();
        let room = world.create_entity("Hall", "room").unwrap();
        let coin = world.create_entity("Coin", "item").unwrap();
        assert!(world.move_entity(&coin, Some(&room)));
        assert_eq!(world.get_location(&coin), Some(&room));
        assert!(world.move_entity(&coin, None));
        assert!(world.get_location(&coin).is_none());
    }

    #[test]
    fn non_container_destination_rejected() {
        let mut world = test_world();
        let coin = world.create_entity("Coin", "item").unwrap();
        let pebble = world.create_entity("Pebble", "item").unwrap();
        assert!(!world.can_move_entity(&pebble, Some(&coin)));
        assert!(!world.move_entity(&pebble, Some(&coin)));
        assert!(world.get_location(&pebble).is_none());
    }

    #[test]
    fn supporter_accepts_contents() {
        let mut world = test_world();
        let table = world.create_entity("Table", "supporter").unwrap();
        world
            .update_entity(&table, |e| {
                e.add(SupporterTrait::default());
            })
            .unwrap();
        let cup = world.create_entity("Cup", "item").unwrap();
        assert!(world.move_entity(&cup, Some(&table)));
    }

    #[test]
    fn missing_entities_rejected() {
        let mut world = test_world();
        let room = world.create_entity("Hall", "room").unwrap();
        let ghost = EntityId::from("i42");
        assert!(!world.can_move_entity(&ghost, Some(&room)));
        assert!(!world.can_move_entity(&room, Some(&ghost)));
        assert!(!world.move_entity(&ghost, None));
    }

    #[test]
    fn loops_rejected() {
        let mut world = test_world();
        let a = container(&mut world, "A");
        let b = container(&mut world, "B");
        let c = container(&mut world, "C");
        assert!(world.move_entity(&b, Some(&a)));
        assert!(world.move_entity(&c, Some(&b)));

        assert!(world.would_create_loop(&a, &c));
        assert!(world.would_create_loop(&a, &a));
        assert!(!world.would_create_loop(&c, &a));
        assert!(!world.move_entity(&a, Some(&c)));
        assert!(!world.move_entity(&a, Some(&a)));
        assert!(world.get_location(&a).is_none());
        assert_eq!(world.get_location(&c), Some(&b));
    }

    #[test]
    fn depth_limit_enforced() {
        let mut world = World::with_config(WorldConfig::default().with_max_depth(2));
        let a = container(&mut world, "A");
        let b = container(&mut world, "B");
        let c = container(&mut world, "C");
        let d = container(&mut world, "D");
        assert!(world.move_entity(&b, Some(&a)));
        assert!(world.move_entity(&c, Some(&b)));
        assert!(!world.move_entity(&d, Some(&c)));

        // Moving a subtree counts its own height too.
        assert!(world.move_entity(&d, Some(&a)));
        let e = container(&mut world, "E");
        assert!(world.move_entity(&e, Some(&d)));
        let top = container(&mut world, "Top");
        assert!(!world.move_entity(&a, Some(&top)));
    }

    #[test]
    fn all_contents_recursive_with_cap() {
        let mut world = test_world();
        let room = world.create_entity("Hall", "room").unwrap();
        let chest = container(&mut world, "Chest");
        let pouch = container(&mut world, "Pouch");
        let gem = world.create_entity("Gem", "item").unwrap();
        world.move_entity(&chest, Some(&room));
        world.move_entity(&pouch, Some(&chest));
        world.move_entity(&gem, Some(&pouch));

        let direct = world.get_all_contents(&room, ContentsOptions::default());
        assert_eq!(direct.len(), 1);
        let all = world.get_all_contents(&room, ContentsOptions::recursive());
        assert_eq!(all.len(), 3);
        let capped = world.get_all_contents(&room, ContentsOptions::recursive().with_max_depth(2));
        let names: Vec<&str> = capped.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["Chest", "Pouch"]);
    }

    #[test]
    fn containing_room_skips_self() {
        let mut world = test_world();
        let room = world.create_entity("Hall", "room").unwrap();
        let chest = container(&mut world, "Chest");
        let gem = world.create_entity("Gem", "item").unwrap();
        world.move_entity(&chest, Some(&room));
        world.move_entity(&gem, Some(&chest));

        assert_eq!(world.get_containing_room(&gem).map(|r| &r.id), Some(&room));
        assert!(world.get_containing_room(&room).is_none());
        let loose = world.create_entity("Feather", "item").unwrap();
        assert!(world.get_containing_room(&loose).is_none());
    }

    #[test]
    fn total_weight_sums_nested_contents() {
        let mut world = test_world();
        let chest = container(&mut world, "Chest");
        let pouch = container(&mut world, "Pouch");
        let gem = world.create_entity("Gem", "item").unwrap();
        for (id, weight) in [(&chest, 10.0), (&pouch, 0.5), (&gem, 2.0)] {
            world
                .update_entity(id, |e| {
                    e.set_attribute("weight", weight);
                })
                .unwrap();
        }
        world.move_entity(&pouch, Some(&chest));
        world.move_entity(&gem, Some(&pouch));
        assert!((world.get_total_weight(&chest) - 12.5).abs() < f64::EPSILON);
        assert!((world.get_total_weight(&gem) - 2.0).abs() < f64::EPSILON);
        assert_eq!(world.get_total_weight(&EntityId::from("c99")), 0.0);
    }

    fn three_rooms() -> (World, EntityId, EntityId, EntityId, EntityId) {
        let mut world = test_world();
        let hall = world.create_entity("Hall", "room").unwrap();
        let kitchen = world.create_entity("Kitchen", "room").unwrap();
        let cellar = world.create_entity("Cellar", "room").unwrap();
        let door = world.create_entity("Oak door", "door").unwrap();
        let hatch = world.create_entity("Hatch", "door").unwrap();
        world
            .update_entity(&door, |e| {
                e.add(DoorTrait::between(hall.clone(), kitchen.clone()));
            })
            .unwrap();
        world
            .update_entity(&hatch, |e| {
                e.add(DoorTrait::between(kitchen.clone(), cellar.clone()));
            })
            .unwrap();
        (world, hall, kitchen, cellar, door)
    }

    #[test]
    fn find_path_lists_doors() {
        let (world, hall, kitchen, cellar, door) = three_rooms();
        assert_eq!(world.find_path(&hall, &hall), Some(vec![]));
        assert_eq!(world.find_path(&hall, &kitchen), Some(vec![door.clone()]));
        let path = world.find_path(&cellar, &hall).unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[1], door);
    }

    #[test]
    fn find_path_unreachable() {
        let (mut world, hall, _, _, _) = three_rooms();
        let attic = world.create_entity("Attic", "room").unwrap();
        assert!(world.find_path(&hall, &attic).is_none());
        assert!(world.find_path(&hall, &EntityId::from("r99")).is_none());
    }

    #[test]
    fn find_path_respects_one_way_doors() {
        let mut world = test_world();
        let top = world.create_entity("Top", "room").unwrap();
        let bottom = world.create_entity("Bottom", "room").unwrap();
        let chute = world.create_entity("Chute", "door").unwrap();
        world
            .update_entity(&chute, |e| {
                e.add(DoorTrait {
                    one_way: true,
                    ..DoorTrait::between(top.clone(), bottom.clone())
                });
            })
            .unwrap();
        assert_eq!(world.find_path(&top, &bottom), Some(vec![chute]));
        assert!(world.find_path(&bottom, &top).is_none());
    }

    #[test]
    fn doorless_exits_are_adjacent_with_empty_path() {
        let mut world = test_world();
        let lawn = world.create_entity("Lawn", "room").unwrap();
        let garden = world.create_entity("Garden", "room").unwrap();
        world
            .update_entity(&lawn, |e| {
                let mut room = RoomTrait::default();
                room.exits.insert(
                    "north".to_string(),
                    Exit {
                        destination: garden.clone(),
                        via: None,
                    },
                );
                e.add(room);
            })
            .unwrap();
        assert_eq!(world.find_path(&lawn, &garden), Some(vec![]));
    }

    #[test]
    fn relationships_directed_and_typed() {
        let mut world = test_world();
        let alice = world.create_entity("Alice", "actor").unwrap();
        let bob = world.create_entity("Bob", "actor").unwrap();
        world.add_relationship(&alice, &bob, RelationKind::Likes).unwrap();
        world.add_relationship(&alice, &bob, "mentors").unwrap();

        assert!(world.are_related(&alice, &bob, RelationKind::Likes));
        assert!(!world.are_related(&bob, &alice, RelationKind::Likes));
        assert_eq!(world.get_related(&alice, "mentors"), vec![bob.clone()]);
        assert_eq!(world.get_relationships(&alice).len(), 2);

        assert!(world.remove_relationship(&alice, &bob, RelationKind::Likes));
        assert!(!world.are_related(&alice, &bob, RelationKind::Likes));
    }

    #[test]
    fn dangling_relationships_depend_on_mode() {
        let mut world = test_world();
        let alice = world.create_entity("Alice", "actor").unwrap();
        let ghost = EntityId::from("a99");
        world.add_relationship(&alice, &ghost, RelationKind::Knows).unwrap();
        assert_eq!(world.relationships().len(), 1);
        assert!(world.get_related(&alice, RelationKind::Knows).is_empty());
        assert!(!world.are_related(&alice, &ghost, RelationKind::Knows));

        let mut strict = World::with_config(WorldConfig::default().with_strict_mode(true));
        let alice = strict.create_entity("Alice", "actor").unwrap();
        let err = strict
            .add_relationship(&alice, &ghost, RelationKind::Knows)
            .unwrap_err();
        assert!(matches!(err, WgError::UnknownEntity(ref id) if *id == ghost));
        assert!(strict.relationships().is_empty());
    }

    #[test]
    fn removing_entity_drops_its_relationships() {
        let mut world = test_world();
        let alice = world.create_entity("Alice", "actor").unwrap();
        let bob = world.create_entity("Bob", "actor").unwrap();
        world.add_relationship(&alice, &bob, RelationKind::Follows).unwrap();
        world.add_relationship(&bob, &alice, RelationKind::Guards).unwrap();
        world.remove_entity(&bob);
        assert!(world.relationships().is_empty());
    }

    #[test]
    fn player_must_exist() {
        let mut world = test_world();
        let err = world.set_player(&EntityId::from("a01")).unwrap_err();
        assert!(matches!(err, WgError::PlayerNotFound(_)));
        let me = world.create_entity("You", "actor").unwrap();
        world.set_player(&me).unwrap();
        assert_eq!(world.get_player().map(|p| p.name()), Some("You"));
        world.remove_entity(&me);
        assert!(world.player_id().is_none());
    }

    #[test]
    fn state_bag() {
        let mut world = test_world();
        world.set_state_value("turn", 3);
        world.set_state_value("flags", json!({"bell_rung": true}));
        assert_eq!(world.get_state_value("turn"), Some(&json!(3)));
        assert_eq!(world.remove_state_value("turn"), Some(json!(3)));
        assert_eq!(world.state().len(), 1);
    }

    #[test]
    fn capabilities_register_and_merge() {
        let mut world = test_world();
        world
            .register_capability("scoring", json!({"score": 0, "max": 50}))
            .unwrap();
        assert!(matches!(
            world.register_capability("scoring", json!({})),
            Err(WgError::CapabilityExists(_))
        ));
        world
            .update_capability("scoring", json!({"score": 10}))
            .unwrap();
        assert_eq!(
            world.get_capability("scoring"),
            Some(&json!({"score": 10, "max": 50}))
        );
        world.update_capability("scoring", json!(7)).unwrap();
        assert_eq!(world.get_capability("scoring"), Some(&json!(7)));
        assert!(matches!(
            world.update_capability("saves", json!({})),
            Err(WgError::UnknownCapability(_))
        ));
    }

    #[test]
    fn apply_event_runs_handler_and_records() {
        let mut world = test_world();
        let room = world.create_entity("Hall", "room").unwrap();
        let coin = world.create_entity("Coin", "item").unwrap();
        world.register_event_handler("dropped", |event, world| {
            if let (Some(item), Some(place)) = (event.entity("item"), event.entity("place")) {
                let (item, place) = (item.clone(), place.clone());
                world.move_entity(&item, Some(&place));
            }
            Ok(())
        });

        let event = WorldEvent::new("dropped")
            .with_entity("item", coin.clone())
            .with_entity("place", room.clone());
        world.apply_event(event).unwrap();
        assert_eq!(world.get_location(&coin), Some(&room));
        assert_eq!(world.applied_events().len(), 1);
    }

    #[test]
    fn events_without_handler_are_still_recorded() {
        let mut world = test_world();
        world.apply_event(WorldEvent::new("waited")).unwrap();
        assert_eq!(world.applied_events()[0].event_type, "waited");
    }

    #[test]
    fn validator_blocks_event() {
        let mut world = test_world();
        world.register_event_validator("opened", |event, _| event.data.contains_key("force"));
        let rejected = WorldEvent::new("opened");
        assert!(!world.can_apply_event(&rejected));
        let err = world.apply_event(rejected).unwrap_err();
        assert!(matches!(err, WgError::EventValidationFailed { ref event_type } if event_type == "opened"));
        assert!(world.applied_events().is_empty());

        let accepted = WorldEvent::new("opened").with_data("force", 3);
        assert!(world.can_apply_event(&accepted));
        world.apply_event(accepted).unwrap();
    }

    #[test]
    fn handler_error_leaves_event_unrecorded() {
        let mut world = World::with_config(WorldConfig::default().with_strict_mode(true));
        world.register_event_handler("renamed", |event, world| {
            let target = event.entity("target").cloned().unwrap_or(EntityId::from("x00"));
            world.update_entity(&target, |e| {
                e.set_attribute("name", "renamed");
            })
        });
        assert!(world.apply_event(WorldEvent::new("renamed")).is_err());
        assert!(world.applied_events().is_empty());
    }

    #[test]
    fn preview_does_not_mutate() {
        let mut world = test_world();
        let chest = container(&mut world, "Chest");
        world.register_event_previewer("opened", |event, _| {
            event
                .entity("target")
                .map(|id| {
                    vec![
                        ChangeDescription::new(crate::event::ChangeKind::Update, id.clone())
                            .with_field("is_open", false, true),
                    ]
                })
                .unwrap_or_default()
        });
        let event = WorldEvent::new("opened").with_entity("target", chest.clone());
        let changes = world.preview_event(&event);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].entity, chest);
        assert!(world.applied_events().is_empty());
        assert!(world.preview_event(&WorldEvent::new("unknown")).is_empty());
    }

    #[test]
    fn events_since_and_clear() {
        let mut world = test_world();
        world.apply_event(WorldEvent::new("a").at(100)).unwrap();
        world.apply_event(WorldEvent::new("b").at(200)).unwrap();
        assert_eq!(world.events_since(100).len(), 1);
        assert_eq!(world.events_since(99).len(), 2);
        world.clear_event_history();
        assert!(world.applied_events().is_empty());
    }

    #[test]
    fn replay_reapplies_history_in_order() {
        let mut source = test_world();
        source.apply_event(WorldEvent::new("a").at(1)).unwrap();
        source.apply_event(WorldEvent::new("b").at(2)).unwrap();
        let history = source.applied_events().to_vec();

        let mut target = test_world();
        target.register_event_handler("a", |_, world| {
            world.set_state_value("seen_a", true);
            Ok(())
        });
        assert_eq!(target.replay(history).unwrap(), 2);
        assert_eq!(target.get_state_value("seen_a"), Some(&json!(true)));
        assert_eq!(target.applied_events()[1].event_type, "b");
    }

    #[test]
    fn worlds_do_not_share_registries() {
        let mut first = test_world();
        let second = test_world();
        first.register_event_validator("x", |_, _| false);
        assert!(!first.can_apply_event(&WorldEvent::new("x")));
        assert!(second.can_apply_event(&WorldEvent::new("x")));
    }

    #[test]
    fn clear_resets_everything() {
        let mut world = test_world();
        let hall = world.create_entity("Hall", "room").unwrap();
        let you = world.create_entity("You", "actor").unwrap();
        world.move_entity(&you, Some(&hall));
        world.set_player(&you).unwrap();
        world.set_state_value("turn", 3);
        world.register_event_validator("x", |_, _| false);
        world.apply_event(WorldEvent::new("y")).unwrap();
        world.clear();
        assert_eq!(world.entity_count(), 0);
        assert!(world.player_id().is_none());
        assert!(world.get_state_value("turn").is_none());
        assert!(world.spatial_index().ids().is_empty());
        assert!(world.applied_events().is_empty());
        assert!(world.can_apply_event(&WorldEvent::new("x")));
        assert_eq!(world.create_entity("Hall", "room").unwrap().as_str(), "r01");
    }

    #[test]
    fn clear_keeps_config() {
        let mut world = World::with_config(WorldConfig::default().with_strict_mode(true));
        world.clear();
        assert!(world.config().strict_mode);
    }
}
