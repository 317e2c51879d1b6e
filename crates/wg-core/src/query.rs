use crate::entity::{AttributeValue, Entity, EntityId, EntityKind};
use crate::traits::TraitKind;
use crate::world::World;

/// A builder for filtering and searching entities in a world.
pub struct QueryBuilder<'w> {
    world: &'w World,
    kind_filter: Option<EntityKind>,
    trait_filters: Vec<TraitKind>,
    attribute_filters: Vec<(String, Option<AttributeValue>)>,
    name_contains: Option<String>,
    within: Option<EntityId>,
    limit: Option<usize>,
    offset: usize,
}

impl<'w> QueryBuilder<'w> {
    /// A query over every entity in `world`.
    pub fn new(world: &'w World) -> Self {
        Self {
            world,
            kind_filter: None,
            trait_filters: Vec::new(),
            attribute_filters: Vec::new(),
            name_contains: None,
            within: None,
            limit: None,
            offset: 0,
        }
    }

    /// Filter by entity kind.
    pub fn kind(mut self, kind: impl Into<EntityKind>) -> Self {
        self.kind_filter = Some(kind.into());
        self
    }

    /// Filter to entities carrying a trait. Repeat to require several.
    pub fn with_trait(mut self, kind: TraitKind) -> Self {
        self.trait_filters.push(kind);
        self
    }

    /// Filter to entities that have the attribute at all.
    pub fn has_attribute(mut self, key: impl Into<String>) -> Self {
        self.attribute_filters.push((key.into(), None));
        self
    }

    /// Filter to entities whose attribute equals `value`.
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attribute_filters.push((key.into(), Some(value.into())));
        self
    }

    /// Filter to entities whose name contains the given substring (case-insensitive).
    pub fn name_contains(mut self, s: impl Into<String>) -> Self {
        self.name_contains = Some(s.into().to_lowercase());
        self
    }

    /// Filter to entities somewhere inside `ancestor`.
    pub fn within(mut self, ancestor: EntityId) -> Self {
        self.within = Some(ancestor);
        self
    }

    /// Limit the number of results.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Skip the first N results.
    pub fn offset(mut self, n: usize) -> Self {
        self.offset = n;
        self
    }

    /// Execute the query and return matching entities in ID order.
    pub fn execute(self) -> Vec<&'w Entity> {
        let matching = self.world.all_entities().filter(|e| self.matches(e));
        let page = matching.skip(self.offset);
        match self.limit {
            Some(limit) => page.take(limit).collect(),
            None => page.collect(),
        }
    }

    /// Count matching entities without collecting them.
    pub fn count(self) -> usize {
        self.world
            .all_entities()
            .filter(|e| self.matches(e))
            .count()
    }

    fn matches(&self, entity: &Entity) -> bool {
        if let Some(ref kind) = self.kind_filter {
            if entity.kind != *kind {
                return false;
            }
        }

        if !self.trait_filters.iter().all(|kind| entity.has(*kind)) {
            return false;
        }

        for (key, expected) in &self.attribute_filters {
            match (entity.attribute(key), expected) {
                (None, _) => return false,
                (Some(actual), Some(expected)) if actual != expected => return false,
                _ => {}
            }
        }

        if let Some(ref s) = self.name_contains {
            if !entity.name().to_lowercase().contains(s) {
                return false;
            }
        }

        if let Some(ref ancestor) = self.within {
            if !self.world.spatial_index().has_ancestor(&entity.id, ancestor) {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{ContainerTrait, LightSourceTrait};

    fn test_world() -> World {
        let mut world = World::new();
        let hall = world.create_entity("Great Hall", "room").unwrap();
        let chest = world.create_entity("Oak Chest", "container").unwrap();
        let lamp = world.create_entity("Brass Lamp", "item").unwrap();
        let gem = world.create_entity("Gem", "item").unwrap();
        world.create_entity("Lantern", "item").unwrap();

        world
            .update_entity(&chest, |e| {
                e.add(ContainerTrait::default());
            })
            .unwrap();
        world
            .update_entity(&lamp, |e| {
                e.add(LightSourceTrait::default());
                e.set_attribute("weight", 2_i64);
            })
            .unwrap();
        world
            .update_entity(&gem, |e| {
                e.set_attribute("weight", 1_i64);
            })
            .unwrap();
        world.move_entity(&chest, Some(&hall));
        world.move_entity(&gem, Some(&chest));
        world.move_entity(&lamp, Some(&hall));
        world
    }

    #[test]
    fn query_by_kind() {
        let world = test_world();
        let results = world.query().kind(EntityKind::Item).execute();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn query_by_trait() {
        let world = test_world();
        let results = world.query().with_trait(TraitKind::LightSource).execute();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name(), "Brass Lamp");
    }

    #[test]
    fn query_by_attribute() {
        let world = test_world();
        assert_eq!(world.query().has_attribute("weight").count(), 2);
        let heavy = world.query().attribute("weight", 2_i64).execute();
        assert_eq!(heavy.len(), 1);
        assert_eq!(heavy[0].name(), "Brass Lamp");
    }

    #[test]
    fn query_by_name_contains() {
        let world = test_world();
        let results = world.query().name_contains("LAN").execute();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name(), "Lantern");
    }

    #[test]
    fn query_within_ancestor() {
        let world = test_world();
        let hall = EntityId::from("r01");
        let names: Vec<&str> = world
            .query()
            .within(hall)
            .execute()
            .iter()
            .map(|e| e.name())
            .collect();
        assert_eq!(names, vec!["Oak Chest", "Brass Lamp", "Gem"]);
    }

    #[test]
    fn query_with_limit_and_offset() {
        let world = test_world();
        let all = world.query().execute();
        assert_eq!(all.len(), 5);

        let limited = world.query().limit(2).execute();
        assert_eq!(limited.len(), 2);

        let offset = world.query().offset(1).limit(1).execute();
        assert_eq!(offset.len(), 1);
        assert_eq!(offset[0].id, all[1].id);
    }

    #[test]
    fn query_count() {
        let world = test_world();
        assert_eq!(world.query().kind(EntityKind::Item).count(), 3);
    }
}
