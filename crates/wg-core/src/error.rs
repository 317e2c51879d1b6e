use crate::entity::EntityId;

/// Alias for `Result<T, WgError>`.
pub type WgResult<T> = Result<T, WgError>;

/// Hard failures raised by the world graph.
///
/// Routine in-fiction outcomes (an invalid move, a dark room, a dangling
/// relationship in default mode) are reported through booleans and empty
/// results instead; these variants indicate misuse of the API.
#[derive(Debug, thiserror::Error)]
pub enum WgError {
    /// Every two-digit base-36 suffix for this ID prefix has been handed out.
    #[error("id space exhausted for prefix \"{prefix}\"")]
    IdOverflow {
        /// The exhausted type prefix.
        prefix: String,
    },

    /// The entity ID does not exist (strict mode only).
    #[error("unknown entity: {0}")]
    UnknownEntity(EntityId),

    /// A registered validator rejected the event.
    #[error("event validation failed for \"{event_type}\"")]
    EventValidationFailed {
        /// The type of the rejected event.
        event_type: String,
    },

    /// The player was set to an entity that does not exist.
    #[error("player entity not found: {0}")]
    PlayerNotFound(EntityId),

    /// A capability with this name is already registered.
    #[error("capability already registered: \"{0}\"")]
    CapabilityExists(String),

    /// No capability with this name is registered.
    #[error("capability not registered: \"{0}\"")]
    UnknownCapability(String),

    /// The persisted document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The persisted document decoded but is internally inconsistent.
    #[error("invalid world document: {0}")]
    InvalidDocument(String),
}
