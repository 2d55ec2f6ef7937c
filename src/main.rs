use std::sync::Arc;

use tracing::{error, info};

use chatrelay::bridge::InMemoryBus;
use chatrelay::chat::RoomRegistry;
use chatrelay::server::{RelayHandler, RelayServer};
use chatrelay::Config;

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };

    // Initialize logging
    if let Err(e) = chatrelay::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        chatrelay::logging::init_console_only(&config.logging.level);
    }

    info!("chatrelay - real-time chat relay");

    let bus = Arc::new(InMemoryBus::new());
    let registry = Arc::new(RoomRegistry::with_history_capacity(
        bus,
        config.relay.history_capacity,
    ));
    let handler = Arc::new(RelayHandler::new(
        registry,
        &config.server,
        &config.relay,
    ));

    let server = match RelayServer::bind(&config.server).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to bind {}:{}: {}", config.server.host, config.server.port, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server
        .run(move |stream, addr| {
            let handler = Arc::clone(&handler);
            async move { handler.handle(stream, addr).await }
        })
        .await
    {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
