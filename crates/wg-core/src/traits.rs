use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

/// The discriminant of every trait variant; the key under which a trait is
/// stored on its entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraitKind {
    /// See [`ContainerTrait`].
    Container,
    /// See [`OpenableTrait`].
    Openable,
    /// See [`LockableTrait`].
    Lockable,
    /// See [`SupporterTrait`].
    Supporter,
    /// See [`SceneryTrait`].
    Scenery,
    /// See [`WearableTrait`].
    Wearable,
    /// See [`DoorTrait`].
    Door,
    /// See [`RoomTrait`].
    Room,
    /// See [`ActorTrait`].
    Actor,
    /// See [`LightSourceTrait`].
    LightSource,
    /// See [`SwitchableTrait`].
    Switchable,
    /// See [`EdibleTrait`].
    Edible,
    /// See [`ReadableTrait`].
    Readable,
}

impl TraitKind {
    /// Whether an entity with this trait accepts other entities as contents.
    pub fn holds_contents(self) -> bool {
        matches!(
            self,
            Self::Container | Self::Supporter | Self::Room | Self::Actor
        )
    }

    /// The snake_case tag used in documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::Openable => "openable",
            Self::Lockable => "lockable",
            Self::Supporter => "supporter",
            Self::Scenery => "scenery",
            Self::Wearable => "wearable",
            Self::Door => "door",
            Self::Room => "room",
            Self::Actor => "actor",
            Self::LightSource => "light_source",
            Self::Switchable => "switchable",
            Self::Edible => "edible",
            Self::Readable => "readable",
        }
    }
}

impl fmt::Display for TraitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Containment
// ---------------------------------------------------------------------------

/// Holds things inside it. Gated by [`OpenableTrait`] unless transparent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerTrait {
    /// Contents can be seen through the walls even when closed.
    pub transparent: bool,
    /// Actors can get inside.
    pub enterable: bool,
}

/// A surface. Things on it are never hidden by it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupporterTrait {
    /// Actors can get onto it.
    pub enterable: bool,
}

/// Can be opened and closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenableTrait {
    /// Currently open.
    pub is_open: bool,
    /// Can be closed again once open.
    pub can_close: bool,
}

impl Default for OpenableTrait {
    fn default() -> Self {
        Self {
            is_open: false,
            can_close: true,
        }
    }
}

/// Can be locked with an optional key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockableTrait {
    /// Currently locked.
    pub is_locked: bool,
    /// The entity that works the lock, if any.
    pub key_id: Option<EntityId>,
}

// ---------------------------------------------------------------------------
// Presentation
// ---------------------------------------------------------------------------

/// Fixed in place; optionally hidden from sight altogether.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneryTrait {
    /// When false, the entity and everything under it cannot be seen.
    pub visible: bool,
}

impl Default for SceneryTrait {
    fn default() -> Self {
        Self { visible: true }
    }
}

/// Can be worn by an actor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WearableTrait {
    /// Currently worn.
    pub worn: bool,
    /// The wearer. When unset, the holder is assumed to be the wearer.
    pub worn_by: Option<EntityId>,
    /// Where on the body it goes.
    pub body_part: Option<String>,
}

/// Readable text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadableTrait {
    /// The text shown when read.
    pub text: String,
}

/// Can be eaten or drunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdibleTrait {
    /// Nutrition per portion.
    pub nutrition: u32,
    /// Portions remaining.
    pub portions: u32,
    /// Drunk rather than eaten.
    pub is_drink: bool,
}

impl Default for EdibleTrait {
    fn default() -> Self {
        Self {
            nutrition: 1,
            portions: 1,
            is_drink: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Topology
// ---------------------------------------------------------------------------

/// A location. Holds contents without needing a container trait.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomTrait {
    /// Needs a light source to see anything.
    pub dark: bool,
    /// The player has been here.
    pub visited: bool,
    /// Exits keyed by direction.
    pub exits: BTreeMap<String, Exit>,
}

/// One way out of a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exit {
    /// The room reached.
    pub destination: EntityId,
    /// The door passed through, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<EntityId>,
}

/// Connects two rooms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoorTrait {
    /// One side of the door.
    pub room1: EntityId,
    /// The other side of the door.
    pub room2: EntityId,
    /// Passable only from `room1` to `room2`.
    #[serde(default)]
    pub one_way: bool,
}

impl DoorTrait {
    /// A two-way door between `room1` and `room2`.
    pub fn between(room1: EntityId, room2: EntityId) -> Self {
        Self {
            room1,
            room2,
            one_way: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Actors and devices
// ---------------------------------------------------------------------------

/// A person or creature. Carries things without a container trait.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorTrait {
    /// This actor is the player character.
    pub is_player: bool,
}

/// Gives off light when lit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightSourceTrait {
    /// Relative brightness.
    pub brightness: u8,
    /// Explicit lit state. When unset, a [`SwitchableTrait`] decides.
    pub is_lit: Option<bool>,
}

/// Can be switched on and off.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchableTrait {
    /// Currently on.
    pub is_on: bool,
}

// ---------------------------------------------------------------------------
// The tagged union
// ---------------------------------------------------------------------------

/// A typed data component. Carries no behavior of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trait {
    /// Holds contents inside.
    Container(ContainerTrait),
    /// Opens and closes.
    Openable(OpenableTrait),
    /// Locks.
    Lockable(LockableTrait),
    /// Holds contents on top.
    Supporter(SupporterTrait),
    /// Fixed in place.
    Scenery(SceneryTrait),
    /// Can be worn.
    Wearable(WearableTrait),
    /// Joins two rooms.
    Door(DoorTrait),
    /// Is a location.
    Room(RoomTrait),
    /// Is a person or creature.
    Actor(ActorTrait),
    /// Gives off light.
    LightSource(LightSourceTrait),
    /// Switches on and off.
    Switchable(SwitchableTrait),
    /// Can be eaten.
    Edible(EdibleTrait),
    /// Can be read.
    Readable(ReadableTrait),
}

impl Trait {
    /// The discriminant of this trait.
    pub fn kind(&self) -> TraitKind {
        match self {
            Self::Container(_) => TraitKind::Container,
            Self::Openable(_) => TraitKind::Openable,
            Self::Lockable(_) => TraitKind::Lockable,
            Self::Supporter(_) => TraitKind::Supporter,
            Self::Scenery(_) => TraitKind::Scenery,
            Self::Wearable(_) => TraitKind::Wearable,
            Self::Door(_) => TraitKind::Door,
            Self::Room(_) => TraitKind::Room,
            Self::Actor(_) => TraitKind::Actor,
            Self::LightSource(_) => TraitKind::LightSource,
            Self::Switchable(_) => TraitKind::Switchable,
            Self::Edible(_) => TraitKind::Edible,
            Self::Readable(_) => TraitKind::Readable,
        }
    }
}

/// Generates `From<Record> for Trait` plus typed accessors on [`TraitSet`].
macro_rules! trait_variants {
    ($($variant:ident($record:ident) => $get:ident, $get_mut:ident;)*) => {
        $(
            impl From<$record> for Trait {
                fn from(data: $record) -> Self {
                    Self::$variant(data)
                }
            }
        )*

        impl TraitSet {
            $(
                #[doc = concat!("The attached [`", stringify!($record), "`], if any.")]
                pub fn $get(&self) -> Option<&$record> {
                    match self.by_kind.get(&TraitKind::$variant) {
                        Some(Trait::$variant(data)) => Some(data),
                        _ => None,
                    }
                }

                #[doc = concat!("Mutable access to the attached [`", stringify!($record), "`].")]
                pub fn $get_mut(&mut self) -> Option<&mut $record> {
                    match self.by_kind.get_mut(&TraitKind::$variant) {
                        Some(Trait::$variant(data)) => Some(data),
                        _ => None,
                    }
                }
            )*
        }
    };
}

trait_variants! {
    Container(ContainerTrait) => container, container_mut;
    Openable(OpenableTrait) => openable, openable_mut;
    Lockable(LockableTrait) => lockable, lockable_mut;
    Supporter(SupporterTrait) => supporter, supporter_mut;
    Scenery(SceneryTrait) => scenery, scenery_mut;
    Wearable(WearableTrait) => wearable, wearable_mut;
    Door(DoorTrait) => door, door_mut;
    Room(RoomTrait) => room, room_mut;
    Actor(ActorTrait) => actor, actor_mut;
    LightSource(LightSourceTrait) => light_source, light_source_mut;
    Switchable(SwitchableTrait) => switchable, switchable_mut;
    Edible(EdibleTrait) => edible, edible_mut;
    Readable(ReadableTrait) => readable, readable_mut;
}

/// The traits attached to one entity, keyed by their own discriminant.
///
/// Serialized as a plain list; the key is always recomputed from each
/// trait's `type`, so a stored key can never disagree with its trait.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Trait>", into = "Vec<Trait>")]
pub struct TraitSet {
    by_kind: BTreeMap<TraitKind, Trait>,
}

impl TraitSet {
    /// Attach a trait, returning any trait of the same type it replaced.
    pub fn insert(&mut self, data: Trait) -> Option<Trait> {
        self.by_kind.insert(data.kind(), data)
    }

    /// Detach the trait of the given type.
    pub fn remove(&mut self, kind: TraitKind) -> Option<Trait> {
        self.by_kind.remove(&kind)
    }

    /// The trait of the given type.
    pub fn get(&self, kind: TraitKind) -> Option<&Trait> {
        self.by_kind.get(&kind)
    }

    /// Whether a trait of the given type is attached.
    pub fn contains(&self, kind: TraitKind) -> bool {
        self.by_kind.contains_key(&kind)
    }

    /// Attached trait types in a stable order.
    pub fn kinds(&self) -> impl Iterator<Item = TraitKind> + '_ {
        self.by_kind.keys().copied()
    }

    /// Attached traits in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = &Trait> {
        self.by_kind.values()
    }

    /// Number of attached traits.
    pub fn len(&self) -> usize {
        self.by_kind.len()
    }

    /// True if no traits are attached.
    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }
}

impl From<Vec<Trait>> for TraitSet {
    fn from(traits: Vec<Trait>) -> Self {
        let mut set = Self::default();
        for data in traits {
            set.insert(data);
        }
        set
    }
}

impl From<TraitSet> for Vec<Trait> {
    fn from(set: TraitSet) -> Self {
        set.by_kind.into_values().collect()
    }
}
