pub mod check;
pub mod demo;
pub mod look;
pub mod path;
pub mod stats;
pub mod tree;

use std::fs;
use std::path::Path;

use tracing::debug;
use wg_core::{Entity, EntityId, World};

/// Read and load a world document.
fn load_world(file: &Path) -> Result<World, String> {
    let json = fs::read_to_string(file)
        .map_err(|e| format!("cannot read '{}': {e}", file.display()))?;
    let mut world = World::new();
    world
        .load_json(&json)
        .map_err(|e| format!("cannot load '{}': {e}", file.display()))?;
    debug!(file = %file.display(), entities = world.entity_count(), "world loaded");
    Ok(world)
}

/// Look an entity up by ID, falling back to a case-insensitive name match.
fn resolve<'w>(world: &'w World, key: &str) -> Result<&'w Entity, String> {
    if let Some(entity) = world.get_entity(&EntityId::from(key)) {
        return Ok(entity);
    }
    match world.find_by_name(key).as_slice() {
        [] => Err(format!("entity not found: \"{key}\"")),
        [entity] => Ok(*entity),
        matches => {
            let ids: Vec<String> = matches.iter().map(|e| e.id.to_string()).collect();
            Err(format!(
                "\"{key}\" is ambiguous, use one of: {}",
                ids.join(", ")
            ))
        }
    }
}
