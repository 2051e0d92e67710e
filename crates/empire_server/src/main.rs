//! Hex Empires - Session Host
//!
//! Usage: `empire_server [config.ron] [scenario.ron]`

use empire_core::scenario::{ring_galaxy, Scenario};
use empire_server::{ServerConfig, SessionEvent, SessionManager};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Hex Empires session host");

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    let scenario = match args.next() {
        Some(path) => Scenario::load(path)?,
        None => ring_galaxy(6, u32::from(config.max_players.clamp(2, 6))),
    };
    tracing::info!("Listening on port {}", config.port);

    let mut manager = SessionManager::new(config);
    let handle = manager.create_session(&scenario)?;
    let mut events = handle.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(SessionEvent::CycleCompleted { cycle, checksum, game_over, .. }) => {
                    tracing::info!(cycle, checksum = %checksum.as_str(), "Broadcast cycle");
                    if game_over {
                        break;
                    }
                }
                Ok(SessionEvent::Aborted { .. }) => break,
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Event stream lagging");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    manager.shutdown().await;
    tracing::info!("Session host stopped");
    Ok(())
}
