//! `mysa context`: show which grounding document is in use.

use std::path::Path;

use mysa_config::AppConfig;
use mysa_context::ContextProvider;

pub async fn run(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load_with_overrides(config_path)
        .map_err(|e| format!("Failed to load config: {e}"))?;
    let context = ContextProvider::new(mysa_context::source_for(&config.context.source)?)
        .with_persona_name(&config.persona.name);

    let document = context.load().await;
    let fallback = context.peek_cache().is_none();

    println!("  Source:    {}", context.location());
    println!("  Size:      {} bytes, {} lines", document.len(), document.lines().count());
    if fallback {
        println!("  Status:    unavailable, using the built-in fallback document");
    } else {
        println!("  Status:    loaded");
    }

    let headings: Vec<&str> = document
        .lines()
        .filter(|line| line.starts_with("## "))
        .map(|line| line.trim_start_matches("## "))
        .collect();
    if !headings.is_empty() {
        println!("  Sections:  {}", headings.join(", "));
    }

    Ok(())
}
