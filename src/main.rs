use anyhow::{Context, Result};
use clap::Parser;
use realtime_tutor::config::{Config, CredentialSource};
use realtime_tutor::{
    ConversationMessage, CredentialProvider, DirectCredentialProvider, HttpCredentialProvider,
    MessageSink, SessionManager, SessionState, ToolRegistry, TransportConfig,
    WebSocketSessionFactory,
};
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(version, about = "Practice a conversation with a realtime language tutor")]
struct Cli {
    /// Read typed turns from stdin instead of waiting silently for audio events.
    #[arg(long)]
    text: bool,
}

fn print_message(message: &ConversationMessage) {
    println!();
    println!("you  > {}", message.user_phonetic_text());
    println!("       {}", message.user_english_text());
    println!("       pronunciation: {}", message.pronunciation_rating());
    println!("tutor> {}", message.ai_phonetic_text());
    println!("       {}", message.ai_english_text());
    for suggestion in message.suggestion_pairs() {
        println!("  try: {} ({})", suggestion.phonetic, suggestion.translation);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    let args = Cli::parse();

    // --- 3. Wire the pieces ---
    let credentials: Arc<dyn CredentialProvider> = match config.credentials {
        CredentialSource::Endpoint(endpoint) => Arc::new(HttpCredentialProvider::new(&endpoint)),
        CredentialSource::ApiKey(api_key) => Arc::new(DirectCredentialProvider::new(
            &config.api_base,
            api_key,
            &config.model,
        )),
    };
    let factory = Arc::new(WebSocketSessionFactory::new(TransportConfig::new(
        &config.base_url,
        &config.model,
    )));

    let sink = Arc::new(MessageSink::new());
    let registry = Arc::new(ToolRegistry::for_tutor(sink.clone(), &config.agent.language));
    let manager = SessionManager::new(config.agent, credentials, factory);
    manager.initialize(registry).await;

    // --- 4. Print the transcript as it grows ---
    let mut appended = sink.subscribe();
    let printer_sink = sink.clone();
    let printer = tokio::spawn(async move {
        let mut printed = 0;
        while appended.changed().await.is_ok() {
            let snapshot = printer_sink.snapshot();
            for message in &snapshot[printed..] {
                print_message(message);
            }
            printed = snapshot.len();
        }
    });

    // --- 5. Connect and run until interrupted ---
    if manager.connect().await != SessionState::Connected {
        tracing::error!("could not start the tutoring session");
        manager.teardown().await;
        printer.abort();
        return Ok(());
    }
    tracing::info!("Connected. Press Ctrl+C to stop.");

    let mut states = manager.subscribe();
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = states.changed() => {
                if changed.is_err() || *states.borrow_and_update() != SessionState::Connected {
                    tracing::warn!("session is no longer connected, stopping");
                    break;
                }
            }
            line = lines.next_line(), if args.text => match line {
                Ok(Some(line)) if !line.trim().is_empty() => {
                    if let Err(e) = manager.send_text(line.trim()).await {
                        tracing::error!("failed to send turn: {}", e);
                    }
                }
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("failed to read stdin: {}", e);
                    break;
                }
            },
        }
    }

    manager.teardown().await;
    printer.abort();
    tracing::info!(messages = sink.len(), "session ended");
    Ok(())
}
