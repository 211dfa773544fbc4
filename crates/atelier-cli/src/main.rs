use anyhow::Result;
use atelier_cli::cli::cli;

#[tokio::main]
async fn main() -> Result<()> {
    // A .env next to the invocation is the usual home of BFL_API_KEY.
    let _ = dotenvy::dotenv();

    if let Err(e) = atelier_cli::logging::setup_logging() {
        eprintln!("Warning: failed to initialize logging: {}", e);
    }

    cli().await
}
