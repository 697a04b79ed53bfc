use crate::core::config::data::path_display;
use crate::core::persona::PersonaStore;
use std::error::Error;
use std::path::Path;

pub fn list_personas(personas_path: &Path) -> Result<(), Box<dyn Error>> {
    let store = PersonaStore::load_from_path(personas_path)?;

    println!(
        "Available personas (from {}):\n",
        path_display(personas_path)
    );

    if store.is_empty() {
        println!("  No personas found.");
        println!("\n💡 Add [[personas]] entries with id, display_name and introduction.");
    } else {
        for persona in store.list() {
            println!("  • {} ({})", persona.display_name, persona.id);
        }
        println!("\n💡 Chat as a persona with:");
        println!("   agora say --persona <id> <prompt>");
    }

    Ok(())
}
