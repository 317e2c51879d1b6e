use std::collections::HashSet;

use tracing::trace;

use crate::entity::{Entity, EntityId};
use crate::traits::TraitKind;
use crate::world::World;

// ---------------------------------------------------------------------------
// Trait strategies
// ---------------------------------------------------------------------------

/// How one trait type bears on perception. Traits are plain data, so the
/// resolver consults this table instead of asking the traits themselves.
struct PerceptionRule {
    kind: TraitKind,
    blocks_sight: fn(&Entity) -> bool,
    emits_light: fn(&Entity) -> bool,
    hides: fn(&Entity) -> bool,
}

const RULES: [PerceptionRule; 3] = [
    PerceptionRule {
        kind: TraitKind::Container,
        blocks_sight: container_blocks_sight,
        emits_light: never,
        hides: never,
    },
    PerceptionRule {
        kind: TraitKind::LightSource,
        blocks_sight: never,
        emits_light: light_source_emits,
        hides: never,
    },
    PerceptionRule {
        kind: TraitKind::Scenery,
        blocks_sight: never,
        emits_light: never,
        hides: scenery_hides,
    },
];

fn never(_: &Entity) -> bool {
    false
}

fn container_blocks_sight(entity: &Entity) -> bool {
    is_closed(entity) && !entity.traits.container().is_some_and(|c| c.transparent)
}

fn light_source_emits(entity: &Entity) -> bool {
    match entity.traits.light_source().and_then(|l| l.is_lit) {
        Some(lit) => lit,
        None => entity.traits.switchable().is_some_and(|s| s.is_on),
    }
}

fn scenery_hides(entity: &Entity) -> bool {
    entity.traits.scenery().is_some_and(|s| !s.visible)
}

fn any_rule(entity: &Entity, pick: impl Fn(&PerceptionRule) -> fn(&Entity) -> bool) -> bool {
    RULES
        .iter()
        .any(|rule| entity.has(rule.kind) && pick(rule)(entity))
}

/// A container whose contents cannot be seen from outside.
pub fn blocks_sight(entity: &Entity) -> bool {
    any_rule(entity, |rule| rule.blocks_sight)
}

/// An entity currently giving off light.
pub fn emits_light(entity: &Entity) -> bool {
    any_rule(entity, |rule| rule.emits_light)
}

/// Scenery flagged invisible. Hides its whole subtree.
pub fn is_hidden(entity: &Entity) -> bool {
    any_rule(entity, |rule| rule.hides)
}

/// A container that is shut. Containers without an Openable trait are
/// always open; supporters are never closed.
pub fn is_closed(entity: &Entity) -> bool {
    entity.has(TraitKind::Container) && entity.traits.openable().is_some_and(|o| !o.is_open)
}

/// Whether `item` is being worn by `wearer`.
pub fn is_worn_by(item: &Entity, wearer: &EntityId) -> bool {
    item.traits
        .wearable()
        .is_some_and(|w| w.worn && w.worn_by.as_ref().is_none_or(|by| by == wearer))
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Everything reached by one sight traversal.
struct SightWalk<'w> {
    seen: Vec<&'w Entity>,
    light_found: bool,
}

/// Answers perception and scope questions against a borrowed world.
///
/// Visibility and light share one traversal: a lamp only lights the room if
/// the walk that decides what is visible reaches it.
pub struct VisibilityResolver<'w> {
    world: &'w World,
}

impl<'w> VisibilityResolver<'w> {
    /// A resolver over `world`.
    pub fn new(world: &'w World) -> Self {
        Self { world }
    }

    /// The entity the observer sees from: the nearest room or closed opaque
    /// container above it, else the top of its containment chain.
    pub fn sight_root(&self, observer: &EntityId) -> Option<&'w Entity> {
        let start = self.world.get_entity(observer)?;
        let mut root = start;
        for ancestor in self.world.spatial_index().ancestors(observer, usize::MAX) {
            let Some(entity) = self.world.get_entity(&ancestor) else {
                break;
            };
            root = entity;
            if entity.is_room() || blocks_sight(entity) {
                break;
            }
        }
        Some(root)
    }

    /// Whether the observer's surroundings are lit.
    pub fn is_lit(&self, observer: &EntityId) -> bool {
        let Some(root) = self.sight_root(observer) else {
            return false;
        };
        self.root_is_lit(root, &self.walk(root))
    }

    fn root_is_lit(&self, root: &Entity, walk: &SightWalk<'_>) -> bool {
        let ambient = root.is_room() && !root.traits.room().is_some_and(|r| r.dark);
        ambient || walk.light_found
    }

    /// Everything the observer can currently see, the observer excluded.
    pub fn visible(&self, observer: &EntityId) -> Vec<&'w Entity> {
        let Some(root) = self.sight_root(observer) else {
            return Vec::new();
        };
        let walk = self.walk(root);
        let lit = self.root_is_lit(root, &walk);
        trace!(observer = %observer, root = %root.id, lit, "resolving visibility");

        if lit {
            return walk.seen.into_iter().filter(|e| e.id != *observer).collect();
        }

        let mut visible = Vec::new();
        if root.id != *observer {
            visible.push(root);
        }
        visible.extend(
            self.world
                .spatial_index()
                .children(observer)
                .iter()
                .filter_map(|id| self.world.get_entity(id))
                .filter(|e| !is_hidden(e)),
        );
        visible
    }

    /// Whether the observer can see `target`. Everything can see itself.
    pub fn can_see(&self, observer: &EntityId, target: &EntityId) -> bool {
        if !self.world.has_entity(observer) {
            return false;
        }
        observer == target || self.visible(observer).iter().any(|e| e.id == *target)
    }

    /// The entities an observer knows about: its room and everything in it
    /// regardless of light or closed containers, plus everything it carries.
    /// Hidden scenery stays out of scope wherever it sits.
    pub fn in_scope(&self, observer: &EntityId) -> Vec<&'w Entity> {
        if !self.world.has_entity(observer) {
            return Vec::new();
        }
        let base = match self.world.get_containing_room(observer) {
            Some(room) => Some(room),
            None => self
                .world
                .spatial_index()
                .ancestors(observer, usize::MAX)
                .last()
                .and_then(|top| self.world.get_entity(top)),
        };

        let mut seen = HashSet::from([observer.clone()]);
        let mut scope = Vec::new();
        if let Some(base) = base {
            seen.insert(base.id.clone());
            scope.push(base);
            self.collect_scope(&base.id, 0, &mut seen, &mut scope);
        }
        self.collect_scope(observer, 0, &mut seen, &mut scope);
        scope
    }

    fn collect_scope(
        &self,
        parent: &EntityId,
        depth: usize,
        seen: &mut HashSet<EntityId>,
        scope: &mut Vec<&'w Entity>,
    ) {
        if depth >= self.world.config().max_depth {
            return;
        }
        for child in self.world.spatial_index().children(parent) {
            let Some(entity) = self.world.get_entity(child) else {
                continue;
            };
            if is_hidden(entity) || !seen.insert(child.clone()) {
                continue;
            }
            scope.push(entity);
            self.collect_scope(child, depth + 1, seen, scope);
        }
    }

    /// Whether the observer can touch `target`.
    ///
    /// Things carried are reachable in the dark. Anything else must be
    /// visible. Either way, no closed container may stand between the
    /// observer and the target; transparency does not help here.
    pub fn can_reach(&self, observer: &EntityId, target: &EntityId) -> bool {
        if !self.world.has_entity(observer) || !self.world.has_entity(target) {
            return false;
        }
        if observer == target {
            return true;
        }
        let spatial = self.world.spatial_index();
        if spatial.has_ancestor(target, observer) {
            return self.path_is_open(target, observer);
        }
        let Some(root) = self.sight_root(observer) else {
            return false;
        };
        self.can_see(observer, target) && self.path_is_open(target, &root.id)
    }

    /// No closed container strictly between `target` and `top`.
    fn path_is_open(&self, target: &EntityId, top: &EntityId) -> bool {
        for ancestor in self.world.spatial_index().ancestors(target, usize::MAX) {
            if ancestor == *top {
                return true;
            }
            if self.world.get_entity(&ancestor).is_some_and(is_closed) {
                return false;
            }
        }
        true
    }

    /// Depth-first from `root`, in child order. The root's own contents are
    /// always walked; deeper down, a blocking container is seen but its
    /// contents are not, except for what is worn.
    fn walk(&self, root: &'w Entity) -> SightWalk<'w> {
        let mut walk = SightWalk {
            seen: vec![root],
            light_found: emits_light(root),
        };
        self.walk_children(root, 0, &mut walk);
        walk
    }

    fn walk_children(&self, parent: &'w Entity, depth: usize, walk: &mut SightWalk<'w>) {
        if depth >= self.world.config().max_depth {
            return;
        }
        let spatial = self.world.spatial_index();
        for child_id in spatial.children(&parent.id) {
            let Some(child) = self.world.get_entity(child_id) else {
                continue;
            };
            if is_hidden(child) {
                continue;
            }
            walk.seen.push(child);
            walk.light_found |= emits_light(child);

            if !blocks_sight(child) {
                self.walk_children(child, depth + 1, walk);
                continue;
            }
            for worn_id in spatial.children(child_id) {
                let Some(worn) = self.world.get_entity(worn_id) else {
                    continue;
                };
                if is_worn_by(worn, child_id) && !is_hidden(worn) {
                    walk.seen.push(worn);
                    walk.light_found |= emits_light(worn);
                    self.walk_children(worn, depth + 2, walk);
                }
            }
        }
    }
}
