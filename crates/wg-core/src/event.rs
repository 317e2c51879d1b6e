use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::entity::EntityId;
use crate::error::WgResult;
use crate::world::World;

/// Applies an event's effects to the world.
pub type EventHandler = Rc<dyn Fn(&WorldEvent, &mut World) -> WgResult<()>>;
/// Decides whether an event may be applied.
pub type EventValidator = Rc<dyn Fn(&WorldEvent, &World) -> bool>;
/// Describes what an event would change without changing anything.
pub type EventPreviewer = Rc<dyn Fn(&WorldEvent, &World) -> Vec<ChangeDescription>>;

/// An immutable fact describing an intended or applied state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldEvent {
    /// Unique identifier for this event.
    pub id: String,
    /// The event type, used to look up handlers.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Participating entities keyed by role (`actor`, `target`, ...).
    #[serde(default)]
    pub entities: BTreeMap<String, EntityId>,
    /// Free-form payload.
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
}

impl WorldEvent {
    /// A new event of `event_type`, stamped now with a fresh ID.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_type: event_type.into(),
            timestamp: Utc::now().timestamp_millis(),
            entities: BTreeMap::new(),
            data: BTreeMap::new(),
        }
    }

    /// Attach an entity under `role`.
    pub fn with_entity(mut self, role: impl Into<String>, id: EntityId) -> Self {
        self.entities.insert(role.into(), id);
        self
    }

    /// Attach a payload field.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Override the timestamp.
    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The entity playing `role`.
    pub fn entity(&self, role: &str) -> Option<&EntityId> {
        self.entities.get(role)
    }
}

/// What sort of change a [`ChangeDescription`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// An entity would be created.
    Create,
    /// An entity would be removed.
    Delete,
    /// An entity would change location.
    Move,
    /// An attribute or trait field would change.
    Update,
    /// A relationship would be added.
    Relate,
    /// A relationship would be removed.
    Unrelate,
}

/// One change an event would make, as reported by a previewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeDescription {
    /// The sort of change.
    pub kind: ChangeKind,
    /// The entity affected.
    pub entity: EntityId,
    /// The field affected, for updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Value before the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    /// Value after the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
}

impl ChangeDescription {
    /// A change of `kind` to `entity` with no field detail.
    pub fn new(kind: ChangeKind, entity: EntityId) -> Self {
        Self {
            kind,
            entity,
            field: None,
            old_value: None,
            new_value: None,
        }
    }

    /// Name the field and its before/after values.
    pub fn with_field(
        mut self,
        field: impl Into<String>,
        old_value: impl Into<Value>,
        new_value: impl Into<Value>,
    ) -> Self {
        self.field = Some(field.into());
        self.old_value = Some(old_value.into());
        self.new_value = Some(new_value.into());
        self
    }
}

/// Per-world event registries plus the ordered history of applied events.
///
/// Each event type has at most one handler, one validator and one previewer;
/// registering again replaces the earlier function.
#[derive(Clone, Default)]
pub struct EventLog {
    handlers: HashMap<String, EventHandler>,
    validators: HashMap<String, EventValidator>,
    previewers: HashMap<String, EventPreviewer>,
    history: Vec<WorldEvent>,
}

impl EventLog {
    /// Empty registries and history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for `event_type`.
    pub fn set_handler(&mut self, event_type: impl Into<String>, handler: EventHandler) {
        self.handlers.insert(event_type.into(), handler);
    }

    /// Register the validator for `event_type`.
    pub fn set_validator(&mut self, event_type: impl Into<String>, validator: EventValidator) {
        self.validators.insert(event_type.into(), validator);
    }

    /// Register the previewer for `event_type`.
    pub fn set_previewer(&mut self, event_type: impl Into<String>, previewer: EventPreviewer) {
        self.previewers.insert(event_type.into(), previewer);
    }

    /// The handler for `event_type`.
    pub fn handler(&self, event_type: &str) -> Option<EventHandler> {
        self.handlers.get(event_type).cloned()
    }

    /// The validator for `event_type`.
    pub fn validator(&self, event_type: &str) -> Option<EventValidator> {
        self.validators.get(event_type).cloned()
    }

    /// The previewer for `event_type`.
    pub fn previewer(&self, event_type: &str) -> Option<EventPreviewer> {
        self.previewers.get(event_type).cloned()
    }

    /// Append an applied event.
    pub fn record(&mut self, event: WorldEvent) {
        self.history.push(event);
    }

    /// Applied events, oldest first.
    pub fn history(&self) -> &[WorldEvent] {
        &self.history
    }

    /// Applied events with a timestamp strictly after `timestamp`.
    pub fn since(&self, timestamp: i64) -> Vec<&WorldEvent> {
        self.history
            .iter()
            .filter(|e| e.timestamp > timestamp)
            .collect()
    }

    /// Forget the history. Registrations stay.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Forget the history and every registration.
    pub fn clear(&mut self) {
        self.handlers.clear();
        self.validators.clear();
        self.previewers.clear();
        self.history.clear();
    }
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut handlers: Vec<&String> = self.handlers.keys().collect();
        handlers.sort();
        f.debug_struct("EventLog")
            .field("handlers", &handlers)
            .field("validators", &self.validators.len())
            .field("previewers", &self.previewers.len())
            .field("history", &self.history.len())
            .finish()
    }
}
