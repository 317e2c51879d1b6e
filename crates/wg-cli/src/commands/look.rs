use std::collections::HashSet;
use std::path::Path;

use colored::Colorize;

pub fn run(file: &Path, observer: &str) -> Result<(), String> {
    let world = super::load_world(file)?;
    let observer = super::resolve(&world, observer)?;

    let lit = world.visibility().is_lit(&observer.id);
    let light = if lit { "lit".yellow() } else { "dark".dimmed() };
    let place = world
        .get_containing_room(&observer.id)
        .map(|room| room.name().to_string())
        .unwrap_or_else(|| "nowhere".to_string());
    println!(
        "  {} [{}] in {} ({light})",
        observer.name().bold(),
        observer.id,
        place
    );
    println!();

    let visible = world.get_visible(&observer.id);
    println!("  {}", "Visible:".bold());
    if visible.is_empty() {
        println!("    (nothing)");
    }
    for entity in &visible {
        let reach = if world.can_reach(&observer.id, &entity.id) {
            ""
        } else {
            " (out of reach)"
        };
        println!("    {} [{}]{}", entity.name(), entity.id, reach.dimmed());
    }

    let seen: HashSet<_> = visible.iter().map(|e| &e.id).collect();
    let unseen: Vec<_> = world
        .get_in_scope(&observer.id)
        .into_iter()
        .filter(|e| !seen.contains(&e.id))
        .collect();
    if !unseen.is_empty() {
        println!();
        println!("  {}", "Known but not visible:".bold());
        for entity in unseen {
            println!("    {}", format!("{} [{}]", entity.name(), entity.id).dimmed());
        }
    }

    Ok(())
}
