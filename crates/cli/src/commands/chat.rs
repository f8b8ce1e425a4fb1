//! `mysa chat`: interactive conversation.

use std::io::Write;
use std::path::Path;

use mysa_core::ConversationMode;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::app::App;
use crate::session::{ChatSession, Reply};

pub async fn run(config_path: &Path, mode: ConversationMode) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::load(config_path)?;
    let persona = &app.config.persona;
    let mut session = ChatSession::new(&persona.name, &persona.city, mode);
    let document = app.context.load().await;

    println!();
    println!("  {} - your guide to {}", persona.name, persona.city);
    println!();
    println!("  Model:     {}", app.config.provider.model);
    println!("  Mode:      {}", session.mode());
    if app.context.peek_cache().is_some() {
        println!("  Context:   {}", app.context.location());
    } else {
        println!("  Context:   {} unavailable, using built-in fallback", app.context.location());
    }
    println!();
    println!("  Commands:  /mode <food|festival|walks>, /retry, exit");
    println!();
    if let Some(greeting) = session.messages().first() {
        print_assistant(&persona.name, &greeting.content);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        match input {
            "" => continue,
            "exit" | "quit" => break,
            "/retry" => {
                if !session.can_retry() {
                    println!("  Nothing to retry.");
                    continue;
                }
                eprint!("  ...");
                if let Some(reply) = session.retry(&app.orchestrator).await {
                    eprint!("\r     \r");
                    print_reply(&persona.name, &reply);
                }
            }
            _ if input.starts_with("/mode") => {
                let requested = input.trim_start_matches("/mode").trim();
                match requested.parse::<ConversationMode>() {
                    Ok(mode) => {
                        session.set_mode(mode);
                        println!("  Switched to {mode} mode.");
                    }
                    Err(e) => println!("  {e}"),
                }
            }
            _ => {
                eprint!("  ...");
                let reply = session.send(input, &app.orchestrator, &document).await?;
                eprint!("\r     \r");
                print_reply(&persona.name, &reply);
            }
        }
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn print_reply(name: &str, reply: &Reply) {
    print_assistant(name, &reply.text);
    if reply.error.as_ref().is_some_and(|e| e.retryable) {
        println!("  (type /retry to try again)");
        println!();
    }
}

fn print_assistant(name: &str, text: &str) {
    println!();
    for line in text.lines() {
        println!("  {name} > {line}");
    }
    println!();
}
