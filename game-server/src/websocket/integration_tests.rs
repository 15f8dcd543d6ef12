use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use warp::Filter;
use warp::test::{WsClient, ws};

use crate::create_routes;
use game_core::{CannedAdvisory, PuzzleLibrary, RunnerPolicy, SessionFeeds, SessionService};
use game_store::MemoryStore;
use game_types::{ActorKind, ClientMessage, Puzzle, ServerMessage, Session, SessionStatus};

fn build_app(
    policy: RunnerPolicy,
) -> (
    impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone,
    SessionService<MemoryStore>,
) {
    let store = Arc::new(MemoryStore::new());
    let service = SessionService::new(store.clone());
    let feeds = SessionFeeds::new(store);
    let library = Arc::new(PuzzleLibrary::builtin());

    let routes = create_routes(
        service.clone(),
        feeds,
        library,
        Arc::new(CannedAdvisory),
        policy,
    );
    (routes, service)
}

/// An ai that never solves anything, for tests that script the player side.
fn passive_app() -> (
    impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone,
    SessionService<MemoryStore>,
) {
    build_app(RunnerPolicy {
        min_interval: Duration::from_millis(50),
        max_interval: Duration::from_millis(100),
        success_rate: 0.0,
        rng_seed: Some(5),
    })
}

/// An ai that solves on every fast tick, for end-to-end actor tests.
fn driven_app() -> (
    impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone,
    SessionService<MemoryStore>,
) {
    build_app(RunnerPolicy {
        min_interval: Duration::from_millis(1),
        max_interval: Duration::from_millis(2),
        success_rate: 1.0,
        rng_seed: Some(5),
    })
}

async fn send_client_message(ws: &mut WsClient, message: &ClientMessage) {
    ws.send_text(serde_json::to_string(message).expect("Should serialize"))
        .await;
}

async fn recv_server_message(ws: &mut WsClient) -> ServerMessage {
    let msg = timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("Timeout waiting for server message")
        .expect("WebSocket closed")
        .expect("WebSocket error");
    assert!(msg.is_text());
    serde_json::from_str(msg.to_str().unwrap()).expect("Should be valid ServerMessage")
}

/// Performs the join handshake and consumes the three seed messages.
async fn join_session(ws: &mut WsClient, session_id: &str, client_id: &str) -> (Session, Puzzle) {
    send_client_message(
        ws,
        &ClientMessage::Join {
            session_id: session_id.to_string(),
            client_id: client_id.to_string(),
        },
    )
    .await;

    let joined = recv_server_message(ws).await;
    let ServerMessage::Joined { session, puzzle } = joined else {
        panic!("Expected Joined message, got: {:?}", joined);
    };

    let words = recv_server_message(ws).await;
    assert!(matches!(words, ServerMessage::SolvedWords { .. }));
    let chat = recv_server_message(ws).await;
    assert!(matches!(chat, ServerMessage::ChatHistory { .. }));

    (session, puzzle)
}

#[tokio::test]
async fn test_join_handshake_delivers_initial_state() {
    let (app, service) = passive_app();
    let session_id = service.create_session("puzzle_1").await.unwrap();

    let mut ws = ws()
        .path("/ws")
        .handshake(app)
        .await
        .expect("WebSocket handshake failed");

    let (session, puzzle) = join_session(&mut ws, &session_id, "client-a").await;
    assert_eq!(session.id, session_id);
    assert_eq!(session.puzzle_id, "puzzle_1");
    assert_eq!(session.total_words, Some(5));
    assert_eq!(puzzle.id, "puzzle_1");
    assert_eq!(puzzle.words.len(), 5);
}

#[tokio::test]
async fn test_join_missing_session_reports_gone() {
    let (app, _service) = passive_app();

    let mut ws = ws()
        .path("/ws")
        .handshake(app)
        .await
        .expect("WebSocket handshake failed");

    send_client_message(
        &mut ws,
        &ClientMessage::Join {
            session_id: "no-such-session".to_string(),
            client_id: "client-a".to_string(),
        },
    )
    .await;

    let reply = recv_server_message(&mut ws).await;
    assert!(matches!(reply, ServerMessage::SessionGone));
}

#[tokio::test]
async fn test_message_before_join_is_rejected() {
    let (app, _service) = passive_app();

    let mut ws = ws()
        .path("/ws")
        .handshake(app)
        .await
        .expect("WebSocket handshake failed");

    send_client_message(
        &mut ws,
        &ClientMessage::SubmitSolve {
            word_id: "A1".to_string(),
            answer: "CAT".to_string(),
        },
    )
    .await;

    let reply = recv_server_message(&mut ws).await;
    assert!(matches!(
        reply,
        ServerMessage::Error { ref message } if message.contains("Join a session first")
    ));
}

#[tokio::test]
async fn test_invalid_json_after_join_keeps_connection() {
    let (app, service) = passive_app();
    let session_id = service.create_session("puzzle_1").await.unwrap();

    let mut ws = ws()
        .path("/ws")
        .handshake(app)
        .await
        .expect("WebSocket handshake failed");
    join_session(&mut ws, &session_id, "client-a").await;

    ws.send_text("invalid json").await;
    let reply = recv_server_message(&mut ws).await;
    assert!(matches!(
        reply,
        ServerMessage::Error { ref message } if message.contains("Invalid JSON message")
    ));

    // The link is still usable.
    send_client_message(
        &mut ws,
        &ClientMessage::SendChat {
            message: "still here".to_string(),
        },
    )
    .await;
    let reply = recv_server_message(&mut ws).await;
    assert!(matches!(
        reply,
        ServerMessage::ChatHistory { ref messages } if messages.len() == 1
    ));
}

#[tokio::test]
async fn test_solve_flow_reaches_all_subscribers() {
    let (app, service) = passive_app();
    let session_id = service.create_session("puzzle_1").await.unwrap();

    let mut ws1 = ws()
        .path("/ws")
        .handshake(app.clone())
        .await
        .expect("WebSocket handshake failed");
    let mut ws2 = ws()
        .path("/ws")
        .handshake(app)
        .await
        .expect("WebSocket handshake failed");

    join_session(&mut ws1, &session_id, "client-a").await;
    join_session(&mut ws2, &session_id, "client-b").await;

    send_client_message(
        &mut ws1,
        &ClientMessage::SubmitSolve {
            word_id: "A1".to_string(),
            answer: "cat".to_string(),
        },
    )
    .await;

    // The submitter hears the verdict first, then the feed updates.
    let verdict = recv_server_message(&mut ws1).await;
    assert!(matches!(
        verdict,
        ServerMessage::SolveResult { ref word_id, accepted: true } if word_id == "A1"
    ));

    let mut saw_session = false;
    let mut saw_words = false;
    for _ in 0..2 {
        match recv_server_message(&mut ws1).await {
            ServerMessage::SessionUpdate { session } => {
                assert_eq!(session.player_score, 1);
                assert_eq!(session.solved_count, 1);
                saw_session = true;
            }
            ServerMessage::SolvedWords { words } => {
                assert_eq!(words.len(), 1);
                assert_eq!(words[0].word_id, "A1");
                assert_eq!(words[0].solved_by, ActorKind::Player);
                saw_words = true;
            }
            other => panic!("Unexpected message: {:?}", other),
        }
    }
    assert!(saw_session && saw_words);

    // The other subscriber sees the same updates.
    let mut saw_session = false;
    let mut saw_words = false;
    for _ in 0..2 {
        match recv_server_message(&mut ws2).await {
            ServerMessage::SessionUpdate { session } => {
                assert_eq!(session.player_score, 1);
                saw_session = true;
            }
            ServerMessage::SolvedWords { words } => {
                assert_eq!(words.len(), 1);
                saw_words = true;
            }
            other => panic!("Unexpected message: {:?}", other),
        }
    }
    assert!(saw_session && saw_words);
}

#[tokio::test]
async fn test_wrong_guess_returns_rejection_only() {
    let (app, service) = passive_app();
    let session_id = service.create_session("puzzle_1").await.unwrap();

    let mut ws = ws()
        .path("/ws")
        .handshake(app)
        .await
        .expect("WebSocket handshake failed");
    join_session(&mut ws, &session_id, "client-a").await;

    send_client_message(
        &mut ws,
        &ClientMessage::SubmitSolve {
            word_id: "A1".to_string(),
            answer: "DOG".to_string(),
        },
    )
    .await;
    let reply = recv_server_message(&mut ws).await;
    assert!(matches!(
        reply,
        ServerMessage::SolveResult { ref word_id, accepted: false } if word_id == "A1"
    ));

    // A correct retry still goes through.
    send_client_message(
        &mut ws,
        &ClientMessage::SubmitSolve {
            word_id: "A1".to_string(),
            answer: "CAT".to_string(),
        },
    )
    .await;
    let reply = recv_server_message(&mut ws).await;
    assert!(matches!(
        reply,
        ServerMessage::SolveResult { accepted: true, .. }
    ));
}

#[tokio::test]
async fn test_chat_flow_broadcasts_to_both_clients() {
    let (app, service) = passive_app();
    let session_id = service.create_session("puzzle_3").await.unwrap();

    let mut ws1 = ws()
        .path("/ws")
        .handshake(app.clone())
        .await
        .expect("WebSocket handshake failed");
    let mut ws2 = ws()
        .path("/ws")
        .handshake(app)
        .await
        .expect("WebSocket handshake failed");

    join_session(&mut ws1, &session_id, "client-a").await;
    join_session(&mut ws2, &session_id, "client-b").await;

    send_client_message(
        &mut ws1,
        &ClientMessage::SendChat {
            message: "good luck".to_string(),
        },
    )
    .await;

    for ws in [&mut ws1, &mut ws2] {
        let reply = recv_server_message(ws).await;
        let ServerMessage::ChatHistory { messages } = reply else {
            panic!("Expected ChatHistory, got: {:?}", reply);
        };
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message, "good luck");
        assert_eq!(messages[0].sender, ActorKind::Player);
    }
}

#[tokio::test]
async fn test_leave_closes_the_connection() {
    let (app, service) = passive_app();
    let session_id = service.create_session("puzzle_1").await.unwrap();

    let mut ws = ws()
        .path("/ws")
        .handshake(app)
        .await
        .expect("WebSocket handshake failed");
    join_session(&mut ws, &session_id, "client-a").await;

    send_client_message(&mut ws, &ClientMessage::Leave).await;

    // The server closes its side; the next read ends the stream.
    let next = timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("Timeout waiting for close");
    match next {
        None | Some(Err(_)) => {}
        Some(Ok(msg)) => assert!(msg.is_close(), "Expected close frame, got: {:?}", msg),
    }
}

#[tokio::test]
async fn test_automated_actor_plays_to_completion() {
    let (app, service) = driven_app();
    let session_id = service.create_session("puzzle_2").await.unwrap();

    let mut ws = ws()
        .path("/ws")
        .handshake(app)
        .await
        .expect("WebSocket handshake failed");
    join_session(&mut ws, &session_id, "client-a").await;

    // The joined client's runner owns the ai and plays the board out; the
    // client just watches the feeds until the session completes.
    let mut final_session = None;
    let mut announcements = 0;
    for _ in 0..100 {
        match recv_server_message(&mut ws).await {
            ServerMessage::SessionUpdate { session } => {
                assert_eq!(
                    session.player_score + session.ai_score,
                    session.solved_count
                );
                if session.status == SessionStatus::Completed {
                    final_session = Some(session);
                    break;
                }
            }
            ServerMessage::ChatHistory { messages } => {
                announcements = messages.len();
            }
            ServerMessage::SolvedWords { words } => {
                assert!(words.len() <= 4);
            }
            other => panic!("Unexpected message: {:?}", other),
        }
    }

    let session = final_session.expect("session should complete");
    assert_eq!(session.ai_score, 4);
    assert_eq!(session.winner, Some(ActorKind::Ai));
    assert_eq!(session.owner_id.as_deref(), Some("client-a"));

    // The chat feed may still owe us its latest snapshot.
    for _ in 0..10 {
        if announcements > 0 {
            break;
        }
        if let ServerMessage::ChatHistory { messages } = recv_server_message(&mut ws).await {
            announcements = messages.len();
        }
    }
    assert!(announcements > 0, "the ai should have announced its solves");
}
