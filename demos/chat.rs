//! Text chat example.
//!
//! Connects in text mode (no audio devices are opened) and relays lines from
//! stdin to the agent, printing the streamed reply as it arrives.
//!
//! Run with: cargo run --example chat

use std::io::Write;

use agent_stream::{AgentStream, Mode, SessionEvent};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agent_stream=warn".into()),
        )
        .init();

    let session = AgentStream::builder()
        .base_url("http://localhost:8000")
        .mode(Mode::Text)
        .on_event(|event| match event {
            SessionEvent::TextDelta { text } => {
                print!("{text}");
                let _ = std::io::stdout().flush();
            }
            SessionEvent::TurnComplete { .. } => println!("\n"),
            SessionEvent::AgentError { message } => eprintln!("\n[agent error: {message}]"),
            _ => {}
        })
        .start()
        .await?;

    println!("Type a message and press Enter (empty line to quit).");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            break;
        }
        if let Err(e) = session.send_text(&line).await {
            eprintln!("send failed: {e}");
        }
    }

    session.stop().await;
    Ok(())
}
