use std::path::Path;

use wg_core::visibility::{emits_light, is_hidden};
use wg_core::{Entity, EntityId, TraitKind, World};

pub fn run(file: &Path, root: Option<&str>) -> Result<(), String> {
    let world = super::load_world(file)?;

    let output = match root {
        Some(key) => {
            let entity = super::resolve(&world, key)?;
            render_tree(&world, Some(&entity.id))
        }
        None => render_tree(&world, None),
    };

    if output.is_empty() {
        println!("  No entities found.");
    } else {
        print!("{output}");
    }
    Ok(())
}

/// Render the containment tree, one entity per line, two spaces per level.
/// Without a root, every top-level entity starts its own tree.
pub fn render_tree(world: &World, root: Option<&EntityId>) -> String {
    let roots: Vec<&EntityId> = match root {
        Some(id) => vec![id],
        None => world
            .all_entities()
            .filter(|e| world.get_location(&e.id).is_none())
            .map(|e| &e.id)
            .collect(),
    };

    let mut out = String::new();
    for id in roots {
        render_node(world, id, 0, &mut out);
    }
    out
}

fn render_node(world: &World, id: &EntityId, depth: usize, out: &mut String) {
    let Some(entity) = world.get_entity(id) else {
        return;
    };

    let mut line = format!(
        "{}{} ({}, {})",
        "  ".repeat(depth),
        entity.name(),
        entity.id,
        entity.kind
    );
    let notes = state_notes(entity);
    if !notes.is_empty() {
        line.push_str(&format!(" [{}]", notes.join(", ")));
    }
    out.push_str(&line);
    out.push('\n');

    for child in world.get_contents(id) {
        render_node(world, &child.id, depth + 1, out);
    }
}

fn state_notes(entity: &Entity) -> Vec<&'static str> {
    let mut notes = Vec::new();
    if entity.traits.room().is_some_and(|r| r.dark) {
        notes.push("dark");
    }
    if let Some(openable) = entity.traits.openable() {
        notes.push(if openable.is_open { "open" } else { "closed" });
    }
    if entity.traits.lockable().is_some_and(|l| l.is_locked) {
        notes.push("locked");
    }
    if entity.has(TraitKind::LightSource) {
        notes.push(if emits_light(entity) { "lit" } else { "unlit" });
    }
    if entity.traits.wearable().is_some_and(|w| w.worn) {
        notes.push("worn");
    }
    if is_hidden(entity) {
        notes.push("hidden");
    }
    notes
}
