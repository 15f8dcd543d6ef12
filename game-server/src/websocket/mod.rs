use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use warp::ws::{Message, WebSocket};

use game_core::{Advisory, AiRunner, PuzzleLibrary, RunnerPolicy, SessionFeeds, SessionService};
use game_store::DocumentStore;
use game_types::{ClientMessage, ServerMessage};

pub mod handlers;
pub mod rate_limiter;

#[cfg(test)]
pub mod integration_tests;

use handlers::{LinkFlow, SessionLink};
use rate_limiter::RateLimiter;

/// Drives one client connection through the session protocol: a join
/// handshake, an initial state dump, then a loop that relays client commands
/// into the store and store change feeds back out to the client. Every
/// joining client also offers to drive the session's ai; the claim
/// transaction picks the owner and the rest stand down on their own.
pub async fn handle_connection<S: DocumentStore>(
    websocket: WebSocket,
    service: SessionService<S>,
    feeds: SessionFeeds<S>,
    library: Arc<PuzzleLibrary>,
    advisory: Arc<dyn Advisory>,
    policy: RunnerPolicy,
) {
    let (mut ws_sender, mut ws_receiver) = websocket.split();

    let (session_id, client_id) = match await_join(&mut ws_receiver).await {
        Ok(Some(join)) => join,
        Ok(None) => return,
        Err(reason) => {
            send_direct(&mut ws_sender, &ServerMessage::Error { message: reason }).await;
            return;
        }
    };
    info!("Client {} joining session {}", client_id, session_id);

    let initial = match service.fetch_session(&session_id).await {
        Ok(Some(session)) => session,
        Ok(None) => {
            send_direct(&mut ws_sender, &ServerMessage::SessionGone).await;
            return;
        }
        Err(e) => {
            error!("Session lookup failed for {}: {}", session_id, e);
            return;
        }
    };
    let Some(puzzle) = library.get(&initial.puzzle_id).cloned() else {
        error!(
            "Session {} references unknown puzzle {}",
            session_id, initial.puzzle_id
        );
        send_direct(
            &mut ws_sender,
            &ServerMessage::Error {
                message: format!("Unknown puzzle {}", initial.puzzle_id),
            },
        )
        .await;
        return;
    };
    // Completion detection needs the word total on record; setting it again
    // is a no-op.
    if let Err(e) = service
        .set_total_words(&session_id, puzzle.total_words())
        .await
    {
        error!("Recording word total for {} failed: {}", session_id, e);
        send_direct(&mut ws_sender, &ServerMessage::SessionGone).await;
        return;
    }
    // Claim before subscribing so the initial snapshot already names the
    // owner instead of a follow-up update.
    match service.claim_ai_ownership(&session_id, &client_id).await {
        Ok(true) => info!("Client {} drives the ai for session {}", client_id, session_id),
        Ok(false) => {}
        Err(e) => warn!("Ai ownership claim failed for {}: {}", session_id, e),
    }

    let mut session_watch = feeds.session(&session_id).await;
    let mut solved_watch = feeds.solved_words(&session_id).await;
    let mut chat_watch = feeds.chat(&session_id).await;

    let Some(Some(session)) = session_watch.next().await else {
        send_direct(&mut ws_sender, &ServerMessage::SessionGone).await;
        return;
    };
    let words = solved_watch.next().await.unwrap_or_default();
    let messages = chat_watch.next().await.unwrap_or_default();

    let (outbound, mut outbound_rx) = mpsc::unbounded_channel();
    let link = SessionLink::new(
        session_id.clone(),
        client_id.clone(),
        puzzle.clone(),
        service.clone(),
        outbound.clone(),
    );

    // Seed the client with current state before streaming changes.
    for message in [
        ServerMessage::Joined { session, puzzle },
        ServerMessage::SolvedWords { words },
        ServerMessage::ChatHistory { messages },
    ] {
        if outbound.send(message).is_err() {
            return;
        }
    }
    drop(outbound);

    let runner = AiRunner::new(
        service.clone(),
        feeds.clone(),
        library.clone(),
        advisory,
        session_id.clone(),
        client_id.clone(),
        policy,
    );
    let runner_task = tokio::spawn({
        let session_id = session_id.clone();
        async move {
            if let Err(e) = runner.run().await {
                warn!("Ai runner for session {} stopped with error: {}", session_id, e);
            }
        }
    });

    // Client commands and store feeds share one loop.
    let incoming = async {
        let mut limiter = RateLimiter::new();
        loop {
            tokio::select! {
                inbound = ws_receiver.next() => match inbound {
                    Some(Ok(msg)) => match handle_message(msg, &mut limiter, &link).await {
                        Ok(LinkFlow::Continue) => {}
                        Ok(LinkFlow::Closed) => break,
                        Err(e) => {
                            error!("Error handling message in session {}: {}", session_id, e);
                            break;
                        }
                    },
                    Some(Err(e)) => {
                        warn!("WebSocket error in session {}: {}", session_id, e);
                        break;
                    }
                    None => break,
                },
                snapshot = session_watch.next() => match snapshot {
                    Some(Some(session)) => {
                        if link.send(ServerMessage::SessionUpdate { session }).is_err() {
                            break;
                        }
                    }
                    Some(None) | None => {
                        let _ = link.send(ServerMessage::SessionGone);
                        break;
                    }
                },
                words = solved_watch.next() => match words {
                    Some(words) => {
                        if link.send(ServerMessage::SolvedWords { words }).is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                messages = chat_watch.next() => match messages {
                    Some(messages) => {
                        if link.send(ServerMessage::ChatHistory { messages }).is_err() {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
    };

    let outgoing = async {
        while let Some(message) = outbound_rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize message: {:?}", e);
                    continue;
                }
            };
            if let Err(e) = ws_sender.send(Message::text(json)).await {
                warn!("Failed to send message in session {}: {:?}", session_id, e);
                break;
            }
        }
    };

    tokio::select! {
        _ = incoming => {},
        _ = outgoing => {},
    }

    runner_task.abort();
    info!("Client {} disconnected from session {}", client_id, session_id);
}

/// The first text frame must be a join; anything else ends the handshake.
/// `Ok(None)` means the socket closed before a join arrived.
async fn await_join(
    receiver: &mut SplitStream<WebSocket>,
) -> Result<Option<(String, String)>, String> {
    while let Some(inbound) = receiver.next().await {
        let msg = inbound.map_err(|e| format!("WebSocket error: {}", e))?;
        if !msg.is_text() {
            continue;
        }
        let text = msg.to_str().map_err(|_| "Invalid text message".to_string())?;
        let message: ClientMessage =
            serde_json::from_str(text).map_err(|e| format!("Invalid JSON message: {}", e))?;
        return match message {
            ClientMessage::Join {
                session_id,
                client_id,
            } => Ok(Some((session_id, client_id))),
            _ => Err("Join a session first".to_string()),
        };
    }
    Ok(None)
}

async fn send_direct(sender: &mut SplitSink<WebSocket, Message>, message: &ServerMessage) {
    if let Ok(json) = serde_json::to_string(message) {
        let _ = sender.send(Message::text(json)).await;
    }
}

async fn handle_message<S: DocumentStore>(
    msg: Message,
    limiter: &mut RateLimiter,
    link: &SessionLink<S>,
) -> Result<LinkFlow, String> {
    if !limiter.allow() {
        return Err("Rate limit exceeded".to_string());
    }

    // Only text frames carry client messages.
    if !msg.is_text() {
        return Ok(LinkFlow::Continue);
    }
    let text = msg.to_str().map_err(|_| "Invalid text message".to_string())?;

    match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => link.handle_message(message).await,
        Err(e) => {
            link.send(ServerMessage::Error {
                message: format!("Invalid JSON message: {}", e),
            })?;
            Ok(LinkFlow::Continue)
        }
    }
}
