//! `mysa doctor`: diagnose configuration and credentials.

use std::path::Path;

use mysa_config::credential::describe_key;
use mysa_config::{AppConfig, CredentialSource};
use mysa_context::ContextProvider;

pub async fn run(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Mysa Doctor - System Diagnostics");
    println!("================================\n");

    let mut issues = 0;

    if config_path.exists() {
        println!("  [ok]   Config file: {}", config_path.display());
    } else {
        println!("  [info] No config file at {}, using defaults", config_path.display());
    }

    let config = match AppConfig::load_with_overrides(config_path) {
        Ok(config) => {
            println!("  [ok]   Config valid");
            config
        }
        Err(e) => {
            println!("  [fail] Config invalid: {e}");
            println!("\n  1 issue found. Fix the config file and run doctor again.");
            return Ok(());
        }
    };

    println!(
        "  [ok]   Provider: {:?}, model {}",
        config.provider.kind, config.provider.model
    );

    let credential = config.credential_source();
    match credential.api_key() {
        Some(key) => {
            let origin = credential.active_var().unwrap_or("config file");
            println!("  [ok]   API key from {origin}: {}", describe_key(&key));
        }
        None => {
            println!(
                "  [warn] No usable API key. Set one of {} or api_key in the config file",
                credential.vars().join(", ")
            );
            issues += 1;
        }
    }

    let source = mysa_context::source_for(&config.context.source)?;
    let context = ContextProvider::new(source).with_persona_name(&config.persona.name);
    let document = context.load().await;
    if context.peek_cache().is_some() {
        println!(
            "  [ok]   Grounding document: {} ({} bytes)",
            context.location(),
            document.len()
        );
    } else {
        println!(
            "  [warn] Grounding document {} unavailable, fallback in use",
            context.location()
        );
        issues += 1;
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
