use std::path::Path;

use comfy_table::{ContentArrangement, Table};

pub fn run(file: &Path) -> Result<(), String> {
    let world = super::load_world(file)?;

    let counts = world.entity_counts_by_kind();
    if counts.is_empty() {
        println!("  No entities found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Kind", "Count"]);
    for (kind, count) in &counts {
        table.add_row(vec![kind.to_string(), count.to_string()]);
    }

    let top_level = world
        .all_entities()
        .filter(|e| world.get_location(&e.id).is_none())
        .count();
    let player = world
        .get_player()
        .map(|p| format!("{} [{}]", p.name(), p.id))
        .unwrap_or_else(|| "none".to_string());

    println!("{table}");
    println!();
    println!(
        "  {} entities, {} relationships, {} top-level",
        world.entity_count(),
        world.relationships().len(),
        top_level
    );
    println!("  player: {player}");

    Ok(())
}
