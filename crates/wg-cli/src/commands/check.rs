use std::path::Path;

use colored::Colorize;

pub fn run(file: &Path) -> Result<(), String> {
    let world = super::load_world(file)?;

    let problems = world.check_integrity();
    if !problems.is_empty() {
        for problem in &problems {
            eprintln!("  {} {problem}", "problem:".red().bold());
        }
        return Err(format!("{} integrity problem(s) found", problems.len()));
    }

    println!("  All checks passed for '{}'.", file.display());
    println!(
        "  {} entities, {} relationships",
        world.entity_count(),
        world.relationships().len()
    );

    Ok(())
}
