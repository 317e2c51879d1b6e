use std::fs;
use std::path::Path;

use wg_core::traits::{
    ActorTrait, ContainerTrait, DoorTrait, LightSourceTrait, LockableTrait, OpenableTrait,
    RoomTrait, SwitchableTrait,
};
use wg_core::{RelationKind, WgResult, World};

pub fn run(path: &Path) -> Result<(), String> {
    if path.exists() {
        return Err(format!("file '{}' already exists", path.display()));
    }

    let world = build_demo().map_err(|e| e.to_string())?;
    let json = world.to_json().map_err(|e| e.to_string())?;
    fs::write(path, json).map_err(|e| format!("cannot write '{}': {e}", path.display()))?;

    let file = path.display();
    println!("Created demo world in {file}");
    println!("  {} entities", world.entity_count());
    println!();
    println!("Get started:");
    println!("  wg tree -f {file}           # What is where");
    println!("  wg look yourself -f {file}  # What the player sees");
    println!("  wg path Hall Cellar -f {file}");

    Ok(())
}

/// A lit hall over a dark cellar, a closed chest holding a gem, an unlit lamp,
/// and the player.
pub fn build_demo() -> WgResult<World> {
    let mut world = World::new();

    let hall = world.create_entity("Hall", "room")?;
    world.update_entity(&hall, |e| {
        e.add(RoomTrait::default());
        e.set_attribute("description", "A draughty hall with a trapdoor in the floor.");
    })?;

    let cellar = world.create_entity("Cellar", "room")?;
    world.update_entity(&cellar, |e| {
        e.add(RoomTrait {
            dark: true,
            ..Default::default()
        });
    })?;

    let trapdoor = world.create_entity("trapdoor", "door")?;
    world.update_entity(&trapdoor, |e| {
        e.add(DoorTrait::between(hall.clone(), cellar.clone()));
        e.add(OpenableTrait {
            is_open: true,
            ..Default::default()
        });
    })?;

    let player = world.create_entity("yourself", "actor")?;
    world.update_entity(&player, |e| {
        e.add(ActorTrait { is_player: true });
    })?;
    world.move_entity(&player, Some(&hall));
    world.set_player(&player)?;

    let chest = world.create_entity("oak chest", "container")?;
    world.update_entity(&chest, |e| {
        e.add(ContainerTrait::default());
        e.add(OpenableTrait::default());
        e.add(LockableTrait::default());
        e.set_attribute("weight", 20_i64);
    })?;
    world.move_entity(&chest, Some(&hall));

    let gem = world.create_entity("gem", "item")?;
    world.update_entity(&gem, |e| {
        e.set_attribute("weight", 0.5);
    })?;
    world.move_entity(&gem, Some(&chest));

    let lamp = world.create_entity("brass lamp", "item")?;
    world.update_entity(&lamp, |e| {
        e.add(LightSourceTrait {
            brightness: 3,
            is_lit: None,
        });
        e.add(SwitchableTrait::default());
        e.set_attribute("weight", 2_i64);
    })?;
    world.move_entity(&lamp, Some(&hall));

    let barrel = world.create_entity("barrel", "item")?;
    world.move_entity(&barrel, Some(&cellar));

    world.add_relationship(&player, &lamp, RelationKind::Owns)?;
    world.set_state_value("turn", 0);

    Ok(world)
}
