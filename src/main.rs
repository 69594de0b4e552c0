//! Attache - personal AI assistant CLI
//!
//! Reads one line of input per turn and routes it through the agent core:
//! free text goes to the completion service with recent conversation
//! context, structured commands go to the mail and calendar services.

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use attache::config::Config;
use attache::core::{Agent, MemoryStore};
use attache::providers::{GmailClient, GoogleCalendarClient, OpenAiClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "attache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;

    let memory = MemoryStore::new(&config.memory_file, config.max_turns);
    let completion = Arc::new(OpenAiClient::new(
        config.openai_api_base.clone(),
        config.openai_api_key.clone(),
        config.model.clone(),
    ));
    let email = Arc::new(GmailClient::new(
        config.gmail_api_base.clone(),
        config.gmail_token.clone(),
    ));
    let calendar = Arc::new(GoogleCalendarClient::new(
        config.calendar_api_base.clone(),
        config.calendar_token.clone(),
        config.timezone,
    ));
    let agent = Agent::new(config, memory, completion, email, calendar);

    println!("Attache ready. Type 'exit' to quit.");
    println!("Available commands:");
    println!("- list emails");
    println!("- send email|to@example.com|Subject|Message");
    println!("- list events");
    println!("- add event|Summary|YYYY-MM-DD|HH:MM");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        tokio::select! {
            _ = signal::ctrl_c() => {
                println!("\nGoodbye!");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    // stdin closed
                    println!("Goodbye!");
                    break;
                };
                let input = line.trim().to_string();
                if input.is_empty() {
                    continue;
                }
                if input.eq_ignore_ascii_case("exit") {
                    println!("Goodbye!");
                    break;
                }

                // An interrupt during a collaborator call terminates the
                // loop without recording the in-flight input.
                tokio::select! {
                    _ = signal::ctrl_c() => {
                        println!("\nGoodbye!");
                        break;
                    }
                    reply = agent.handle_input(&input) => {
                        println!("Agent: {reply}");
                    }
                }
            }
        }
    }

    Ok(())
}
