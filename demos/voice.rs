//! Voice conversation example.
//!
//! Captures microphone audio, streams it to a local agent service, and plays
//! the agent's synthesized replies through the speakers until Ctrl-C.
//!
//! Run with: cargo run --example voice

use agent_stream::{AgentStream, Mode, SessionEvent};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agent_stream=info".into()),
        )
        .init();

    println!("Available input devices:");
    for name in agent_stream::list_input_devices() {
        println!("  - {name}");
    }
    if let Some(default) = agent_stream::default_input_device_name() {
        println!("Using default: {default}");
    }

    let session = AgentStream::builder()
        .base_url("http://localhost:8000")
        .mode(Mode::Audio)
        .on_event(|event| match event {
            SessionEvent::Connected => println!("[connected]"),
            SessionEvent::Disconnected { reason } => println!("[disconnected: {reason}]"),
            SessionEvent::Reconnecting { delay } => println!("[reconnecting in {delay:?}]"),
            SessionEvent::TurnComplete { interrupted: true } => println!("[interrupted]"),
            SessionEvent::TurnComplete { interrupted: false } => println!("[turn complete]"),
            SessionEvent::AgentError { message } => eprintln!("[agent error: {message}]"),
            _ => {}
        })
        .start()
        .await?;

    println!("Speak into the microphone. Press Ctrl-C to stop.");
    tokio::signal::ctrl_c().await?;

    let stats = session.stats();
    println!(
        "\nSent {} frames ({} samples captured, {} dropped), {} reconnects",
        stats.frames_sent, stats.samples_captured, stats.samples_dropped, stats.reconnects
    );

    session.stop().await;
    Ok(())
}
