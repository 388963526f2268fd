//! Project initialization: `hyphae init`.

use anyhow::Result;
use std::path::Path;

pub fn cmd_init(project_dir: &Path) -> Result<()> {
    use hyphae::init::init_project;

    let result = init_project(project_dir)?;

    if result.created {
        println!("Initialized hyphae project at {}", result.hyphae_dir.display());
        println!();
        println!("Created directory structure:");
        println!("  .hyphae/");
        println!("  ├── hyphae.toml   # Agent, retry and run settings");
        println!("  ├── agents/       # Optional <phase>.md prompt overrides");
        println!("  └── missions/     # One directory per mission");
        println!();
        println!("Optionally add .hyphae/CONTRACT.md with rules every phase must follow.");
        println!();
        println!("Next steps:");
        println!("  1. Run `hyphae create <id> --objective \"...\"` to start a mission");
        println!("  2. Run `hyphae run <id>` to drive it through its phases");
    } else {
        println!(
            "Hyphae project already initialized at {}",
            result.hyphae_dir.display()
        );
        println!("Directory structure verified.");
    }

    Ok(())
}
