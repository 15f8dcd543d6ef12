use serde::Deserialize;
use std::sync::Arc;
use warp::Filter;

use game_core::{Advisory, PuzzleLibrary, RunnerPolicy, SessionFeeds, SessionService};
use game_store::DocumentStore;

#[derive(Deserialize)]
struct CreateSessionRequest {
    puzzle_id: Option<String>,
}

pub mod config;
pub mod websocket;

pub fn create_routes<S: DocumentStore>(
    service: SessionService<S>,
    feeds: SessionFeeds<S>,
    library: Arc<PuzzleLibrary>,
    advisory: Arc<dyn Advisory>,
    policy: RunnerPolicy,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    // Clone for filters
    let service_filter = warp::any().map({
        let service = service.clone();
        move || service.clone()
    });

    let feeds_filter = warp::any().map({
        let feeds = feeds.clone();
        move || feeds.clone()
    });

    let library_filter = warp::any().map({
        let library = library.clone();
        move || library.clone()
    });

    let advisory_filter = warp::any().map({
        let advisory = advisory.clone();
        move || advisory.clone()
    });

    let policy_filter = warp::any().map({
        let policy = policy.clone();
        move || policy.clone()
    });

    // WebSocket endpoint carrying the session protocol
    let websocket = warp::path("ws")
        .and(warp::ws())
        .and(service_filter.clone())
        .and(feeds_filter.clone())
        .and(library_filter.clone())
        .and(advisory_filter.clone())
        .and(policy_filter.clone())
        .map(
            |ws: warp::ws::Ws, service, feeds, library, advisory, policy| {
                ws.on_upgrade(move |socket| {
                    websocket::handle_connection(socket, service, feeds, library, advisory, policy)
                })
            },
        );

    // Health check endpoint
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", warp::http::StatusCode::OK));

    // Session creation endpoint
    let create_session = warp::path("sessions")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(service_filter.clone())
        .and(library_filter.clone())
        .and_then(handle_create_session);

    // Session lookup endpoint - safe for polling clients
    let fetch_session = warp::path!("sessions" / String)
        .and(warp::get())
        .and(service_filter.clone())
        .and_then(handle_fetch_session);

    // CORS configuration
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET", "POST"]);

    websocket
        .or(health)
        .or(create_session)
        .or(fetch_session)
        .with(cors)
        .with(warp::log("crossword_rival"))
}

async fn handle_create_session<S: DocumentStore>(
    request: CreateSessionRequest,
    service: SessionService<S>,
    library: Arc<PuzzleLibrary>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let puzzle = match request.puzzle_id {
        Some(id) => match library.get(&id) {
            Some(puzzle) => puzzle,
            None => {
                return Ok(warp::reply::with_status(
                    warp::reply::json(&serde_json::json!({
                        "error": "Unknown puzzle ID"
                    })),
                    warp::http::StatusCode::BAD_REQUEST,
                ));
            }
        },
        None => match library.random_id().and_then(|id| library.get(id)) {
            Some(puzzle) => puzzle,
            None => {
                tracing::error!("Session creation requested but no puzzles are loaded");
                return Ok(warp::reply::with_status(
                    warp::reply::json(&serde_json::json!({
                        "error": "No puzzles available"
                    })),
                    warp::http::StatusCode::INTERNAL_SERVER_ERROR,
                ));
            }
        },
    };
    let total = puzzle.total_words();

    let session_id = match service.create_session(&puzzle.id).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!("Failed to create session: {}", e);
            return Ok(warp::reply::with_status(
                warp::reply::json(&serde_json::json!({
                    "error": "Failed to create session"
                })),
                warp::http::StatusCode::INTERNAL_SERVER_ERROR,
            ));
        }
    };

    if let Err(e) = service.set_total_words(&session_id, total).await {
        tracing::error!("Failed to record word total for {}: {}", session_id, e);
        return Ok(warp::reply::with_status(
            warp::reply::json(&serde_json::json!({
                "error": "Failed to create session"
            })),
            warp::http::StatusCode::INTERNAL_SERVER_ERROR,
        ));
    }

    match service.fetch_session(&session_id).await {
        Ok(Some(session)) => Ok(warp::reply::with_status(
            warp::reply::json(&session),
            warp::http::StatusCode::CREATED,
        )),
        Ok(None) => Ok(warp::reply::with_status(
            warp::reply::json(&serde_json::json!({
                "error": "Session not found"
            })),
            warp::http::StatusCode::NOT_FOUND,
        )),
        Err(e) => {
            tracing::error!("Failed to read back session {}: {}", session_id, e);
            Ok(warp::reply::with_status(
                warp::reply::json(&serde_json::json!({
                    "error": "Failed to create session"
                })),
                warp::http::StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}

async fn handle_fetch_session<S: DocumentStore>(
    session_id: String,
    service: SessionService<S>,
) -> Result<impl warp::Reply, warp::Rejection> {
    match service.fetch_session(&session_id).await {
        Ok(Some(session)) => Ok(warp::reply::with_status(
            warp::reply::json(&session),
            warp::http::StatusCode::OK,
        )),
        Ok(None) => Ok(warp::reply::with_status(
            warp::reply::json(&serde_json::json!({
                "error": "Session not found"
            })),
            warp::http::StatusCode::NOT_FOUND,
        )),
        Err(e) => {
            tracing::error!("Failed to fetch session {}: {}", session_id, e);
            Ok(warp::reply::with_status(
                warp::reply::json(&serde_json::json!({
                    "error": "Failed to fetch session"
                })),
                warp::http::StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}
