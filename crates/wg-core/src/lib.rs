//! Core world graph for parser-driven interactive fiction.
//!
//! A [`World`] owns every simulated entity, the containment forest that says
//! what is inside what, the typed relationships between entities, and a
//! replayable log of applied events. Perception questions (what can this
//! actor see, reach, or refer to) are answered by the [`VisibilityResolver`].
//! Verbs, parsing, and NPC behavior live outside this crate and drive the
//! world through its public API.

/// Engine configuration.
pub mod config;
/// Entity types, identifiers, and attribute values.
pub mod entity;
/// Error types used throughout the crate.
pub mod error;
/// Events, validators, previewers, and the applied-event history.
pub mod event;
/// Type-prefixed ID allocation.
pub mod ids;
/// Saving and loading whole worlds as JSON documents.
pub mod persistence;
/// Query builder for filtering and searching entities.
pub mod query;
/// Directed, typed relationships between entities.
pub mod relationship;
/// The containment forest.
pub mod spatial;
/// Typed trait records attached to entities.
pub mod traits;
/// Visibility, light, scope, and reach.
pub mod visibility;
/// The central world model.
pub mod world;

/// Re-export configuration.
pub use config::WorldConfig;
/// Re-export core entity types.
pub use entity::{AttributeValue, Entity, EntityId, EntityKind};
/// Re-export error types.
pub use error::{WgError, WgResult};
/// Re-export event types.
pub use event::{ChangeDescription, ChangeKind, WorldEvent};
/// Re-export persistence types.
pub use persistence::{EntityRecord, WorldDocument};
/// Re-export relationship types.
pub use relationship::{RelationKind, RelationshipGraph};
/// Re-export containment types.
pub use spatial::ContentsOptions;
/// Re-export trait types.
pub use traits::{Trait, TraitKind};
/// Re-export the visibility resolver.
pub use visibility::VisibilityResolver;
/// Re-export the world model.
pub use world::World;
