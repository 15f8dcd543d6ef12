use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

use game_core::{Advisory, CannedAdvisory, HttpAdvisory, PuzzleLibrary, SessionFeeds, SessionService};
use game_server::{config::Config, create_routes};
use game_store::MemoryStore;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting Crossword Rival server...");

    let config = Config::new();

    let store = Arc::new(MemoryStore::new());
    let service = SessionService::new(store.clone());
    let feeds = SessionFeeds::new(store);

    let library = match &config.puzzles_directory {
        Some(dir) => {
            info!("Loading puzzles from directory: {}", dir);
            match PuzzleLibrary::from_dir(Path::new(dir)) {
                Ok(library) => {
                    info!("Loaded {} puzzles from directory", library.len());
                    Arc::new(library)
                }
                Err(e) => {
                    tracing::error!("Failed to load puzzles from directory '{}': {}", dir, e);
                    tracing::error!(
                        "Set PUZZLES_DIRECTORY to a directory of puzzle .json files, or unset it to use the built-in set."
                    );
                    std::process::exit(1);
                }
            }
        }
        None => Arc::new(PuzzleLibrary::builtin()),
    };

    let advisory: Arc<dyn Advisory> = match &config.advisory_url {
        Some(url) => {
            info!("Using text advisory at {}", url);
            Arc::new(HttpAdvisory::new(url.clone()))
        }
        None => {
            info!("No text advisory configured; the ai will use canned lines");
            Arc::new(CannedAdvisory)
        }
    };

    let routes = create_routes(
        service,
        feeds,
        library,
        advisory,
        config.runner_policy(),
    );

    info!("Server starting on {}:{}", config.host, config.port);

    let addr = (
        config.host.parse::<std::net::IpAddr>().expect("Invalid HOST"),
        config.port,
    );

    let (addr, server) = warp::serve(routes).bind_with_graceful_shutdown(addr, async {
        // Wait for SIGINT (Ctrl+C) or SIGTERM
        #[cfg(unix)]
        {
            let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt()).unwrap();
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate()).unwrap();

            tokio::select! {
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully...");
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            signal::ctrl_c().await.expect("Failed to listen for ctrl+c");
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    });

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;
    info!("Server shutdown complete.");
}
