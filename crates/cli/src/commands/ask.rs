//! `mysa ask`: one question, one answer.

use std::path::Path;

use mysa_context::ContextProvider;
use mysa_core::{ConversationMode, RequestParams};
use mysa_orchestrator::Orchestrator;

use crate::app::App;

pub async fn run(
    config_path: &Path,
    message: &str,
    mode: ConversationMode,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::load(config_path)?;

    eprint!("  Thinking...");
    let result = answer(&app.orchestrator, &app.context, message, mode).await;
    eprint!("\r              \r");

    let answer = result?;
    println!("{answer}");
    Ok(())
}

/// Ask once. A failed turn comes back as the classified error so `main`
/// exits non-zero.
async fn answer(
    orchestrator: &Orchestrator,
    context: &ContextProvider,
    message: &str,
    mode: ConversationMode,
) -> Result<String, Box<dyn std::error::Error>> {
    let document = context.load().await;
    let params = RequestParams::new(mode, Vec::new(), message, document)?;

    match orchestrator.respond(&params).await {
        Ok(answer) => Ok(answer),
        Err(err) => {
            eprintln!("  [{}] {}", err.kind, err.message);
            Err(err.into())
        }
    }
}
