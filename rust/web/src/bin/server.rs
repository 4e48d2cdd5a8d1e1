//! Four-in-a-row game server
//!
//! Usage: cargo run -p fourinrow_web --bin fourinrow-server -- --port 8080
//!
//! Gameplay settings come from `FOURINROW_CONFIG` and `FOURINROW_*`
//! variables; `DATABASE_URL` enables match history.

use clap::Parser;
use fourinrow_web::logging::{init_logging, LogFormat};
use fourinrow_web::{settings, ServerConfig, WebServer};

#[derive(Debug, Parser)]
#[command(name = "fourinrow-server", about = "Four-in-a-row matchmaking and game server")]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    /// Port to bind to
    #[arg(long, short, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(LogFormat::from_env())?;

    let resolved = settings::load_with_sources()?;
    tracing::info!(
        settings = ?resolved.settings,
        sources = ?resolved.sources,
        "settings loaded"
    );

    let config = ServerConfig::new(args.host, args.port, resolved.settings);
    let handle = WebServer::new(config)?.start().await?;
    tracing::info!("server running at http://{}", handle.address());

    tokio::signal::ctrl_c().await?;

    tracing::info!("shutting down");
    handle.shutdown().await?;
    Ok(())
}
