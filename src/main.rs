use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{info, Level};

use alleycat_server::config::ServerConfig;
use alleycat_server::game::map::TileMap;
use alleycat_server::net::heartbeat::{self, HeartbeatRegistry};
use alleycat_server::net::http::{self, AppState};
use alleycat_server::room::registry::RoomRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    info!("Alleycat Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = ServerConfig::load_or_default();
    if let Err(err) = config.validate() {
        anyhow::bail!("invalid configuration: {err}");
    }
    info!(
        "Configuration loaded: {}:{}, max_rooms={}",
        config.bind_address, config.port, config.max_rooms
    );

    // Initialize shared state: the map oracle, the room registry with its
    // permanent default room, and the reaper that drops emptied rooms
    let map = Arc::new(TileMap::standard());
    let (reap_tx, mut reap_rx) = mpsc::unbounded_channel();
    let registry = Arc::new(RwLock::new(RoomRegistry::new(
        map,
        reap_tx,
        config.max_rooms,
    )));

    let reaper_registry = Arc::clone(&registry);
    tokio::spawn(async move {
        while let Some(room_id) = reap_rx.recv().await {
            reaper_registry.write().await.remove(&room_id);
        }
    });

    // Liveness probing over all open sockets
    let heartbeat = HeartbeatRegistry::new();
    tokio::spawn(heartbeat::run(
        Arc::clone(&heartbeat),
        config.heartbeat_interval,
    ));

    let app = http::router(AppState {
        registry,
        heartbeat,
    });

    let listener = tokio::net::TcpListener::bind((config.bind_address, config.port)).await?;
    info!("listening on {}", listener.local_addr()?);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
            info!("Shutdown signal received");
        })
        .await?;

    info!("Server stopped");
    Ok(())
}
