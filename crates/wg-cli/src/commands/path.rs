use std::path::Path;

pub fn run(file: &Path, from: &str, to: &str) -> Result<(), String> {
    let world = super::load_world(file)?;
    let from = super::resolve(&world, from)?;
    let to = super::resolve(&world, to)?;

    match world.find_path(&from.id, &to.id) {
        None => println!("  There is no path from {} to {}.", from.name(), to.name()),
        Some(_) if from.id == to.id => println!("  Already in {}.", from.name()),
        Some(doors) if doors.is_empty() => {
            println!("  {} leads straight to {}.", from.name(), to.name());
        }
        Some(doors) => {
            println!("  {} to {}:", from.name(), to.name());
            for (i, door) in doors.iter().enumerate() {
                println!("  {}. {} [{}]", i + 1, world.entity_name(door), door);
            }
        }
    }

    Ok(())
}
