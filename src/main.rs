/**
 * Realtime Gateway Entry Point
 *
 * This is the main entry point for the PageSpace realtime gateway.
 * It loads configuration from the environment, initializes the Axum
 * server, and serves until shutdown.
 */

use pagespace_realtime::config::RealtimeConfig;
use pagespace_realtime::server::create_app;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    tracing::info!("[Startup] Gateway initialization started");

    // Configuration errors here are fatal: a gateway with a missing or
    // weak broadcast secret must not start.
    let config = match RealtimeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("[Startup] Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;
    let app = create_app(config).await?;

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("[Startup] Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
