use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::traits::{Trait, TraitKind, TraitSet};

/// Unique identifier for every entity in the world.
///
/// Allocated IDs are a type prefix followed by a two-digit base-36 suffix
/// (`r01`, `i0a`, `azz`). IDs loaded from documents may take any form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Wrap an existing ID string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw ID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split an allocated ID into its prefix and numeric suffix.
    ///
    /// Returns `None` when the ID does not end in two base-36 digits after a
    /// non-empty prefix.
    pub fn split_suffix(&self) -> Option<(&str, u32)> {
        let id = self.0.as_str();
        if id.len() < 3 || !id.is_ascii() {
            return None;
        }
        let (prefix, suffix) = id.split_at(id.len() - 2);
        if !suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
        {
            return None;
        }
        u32::from_str_radix(suffix, 36)
            .ok()
            .map(|n| (prefix, n))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The type tag of an entity. Extensible via `Custom(String)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityKind {
    /// A location the player can be in.
    Room,
    /// A passage joining two rooms.
    Door,
    /// A portable object.
    Item,
    /// The player or an NPC.
    Actor,
    /// Something that holds other things inside it.
    Container,
    /// A surface things can be put on.
    Supporter,
    /// Fixed background objects.
    Scenery,
    /// A doorless way out of a room.
    Exit,
    /// Anything without a more specific tag.
    Object,
    /// A host-defined type not covered by the built-in tags.
    Custom(String),
}

impl EntityKind {
    /// Parse a type tag. Unknown tags become `Custom`.
    pub fn parse(s: &str) -> Self {
        match s {
            "room" => Self::Room,
            "door" => Self::Door,
            "item" => Self::Item,
            "actor" => Self::Actor,
            "container" => Self::Container,
            "supporter" => Self::Supporter,
            "scenery" => Self::Scenery,
            "exit" => Self::Exit,
            "object" => Self::Object,
            other => Self::Custom(other.to_string()),
        }
    }

    /// The ID prefix used when allocating IDs for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Room => "r",
            Self::Door => "d",
            Self::Item => "i",
            Self::Actor => "a",
            Self::Container => "c",
            Self::Supporter => "s",
            Self::Scenery => "y",
            Self::Exit => "e",
            Self::Object | Self::Custom(_) => "o",
        }
    }

    /// The tag as written in documents.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Room => "room",
            Self::Door => "door",
            Self::Item => "item",
            Self::Actor => "actor",
            Self::Container => "container",
            Self::Supporter => "supporter",
            Self::Scenery => "scenery",
            Self::Exit => "exit",
            Self::Object => "object",
            Self::Custom(s) => s.as_str(),
        }
    }
}

impl From<String> for EntityKind {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<&str> for EntityKind {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<EntityKind> for String {
    fn from(kind: EntityKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A free-form attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// A boolean flag.
    Boolean(bool),
    /// A 64-bit signed integer.
    Integer(i64),
    /// A 64-bit float.
    Float(f64),
    /// A text value.
    String(String),
    /// An ordered list of values.
    List(Vec<AttributeValue>),
    /// A string-keyed map of values.
    Map(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    /// The value as text, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The value as a number, if it is an integer or float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// The value as a flag, if it is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Self::Map(_) => write!(f, "{{...}}"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<f64> for AttributeValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

/// Core entity record. Every simulated thing is an Entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier for this entity.
    pub id: EntityId,
    /// The type tag of this entity.
    #[serde(rename = "type")]
    pub kind: EntityKind,
    /// Free-form attributes: name, weight, description, ad-hoc flags.
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
    /// Typed data components, at most one per trait type.
    #[serde(default)]
    pub traits: TraitSet,
}

impl Entity {
    /// Create an entity with the given ID and a `name` attribute.
    pub fn new(id: EntityId, kind: EntityKind, name: impl Into<String>) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert("name".to_string(), AttributeValue::String(name.into()));
        Self {
            id,
            kind,
            attributes,
            traits: TraitSet::default(),
        }
    }

    /// Display name, or an empty string if the entity has none.
    pub fn name(&self) -> &str {
        self.attributes
            .get("name")
            .and_then(AttributeValue::as_str)
            .unwrap_or_default()
    }

    /// The numeric `weight` attribute, defaulting to zero.
    pub fn weight(&self) -> f64 {
        self.attributes
            .get("weight")
            .and_then(AttributeValue::as_f64)
            .unwrap_or(0.0)
    }

    /// Look up an attribute.
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// Set an attribute, returning the previous value.
    pub fn set_attribute(
        &mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Option<AttributeValue> {
        self.attributes.insert(key.into(), value.into())
    }

    /// Remove an attribute, returning its value.
    pub fn remove_attribute(&mut self, key: &str) -> Option<AttributeValue> {
        self.attributes.remove(key)
    }

    /// Whether a trait of the given type is attached.
    pub fn has(&self, kind: TraitKind) -> bool {
        self.traits.contains(kind)
    }

    /// The trait of the given type, if attached.
    pub fn get(&self, kind: TraitKind) -> Option<&Trait> {
        self.traits.get(kind)
    }

    /// Attach a trait, replacing and returning any trait of the same type.
    pub fn add(&mut self, data: impl Into<Trait>) -> Option<Trait> {
        self.traits.insert(data.into())
    }

    /// Builder form of [`Entity::add`].
    pub fn with(mut self, data: impl Into<Trait>) -> Self {
        self.add(data);
        self
    }

    /// Detach the trait of the given type.
    pub fn remove(&mut self, kind: TraitKind) -> Option<Trait> {
        self.traits.remove(kind)
    }

    /// Rooms are entities tagged `room` or carrying a Room trait.
    pub fn is_room(&self) -> bool {
        self.kind == EntityKind::Room || self.has(TraitKind::Room)
    }
}
