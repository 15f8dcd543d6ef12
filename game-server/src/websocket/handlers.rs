use tokio::sync::mpsc;
use tracing::{debug, info};

use game_core::SessionService;
use game_store::DocumentStore;
use game_types::{ActorKind, ClientMessage, Puzzle, ServerMessage};

/// What the connection loop should do after a handled message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkFlow {
    Continue,
    Closed,
}

/// One client's joined view of a session. Solve attempts are checked against
/// the puzzle here; only correct answers reach the contended solve path, and
/// everything the client hears back flows through the outbound channel.
pub struct SessionLink<S> {
    session_id: String,
    client_id: String,
    puzzle: Puzzle,
    service: SessionService<S>,
    outbound: mpsc::UnboundedSender<ServerMessage>,
}

impl<S: DocumentStore> SessionLink<S> {
    pub fn new(
        session_id: String,
        client_id: String,
        puzzle: Puzzle,
        service: SessionService<S>,
        outbound: mpsc::UnboundedSender<ServerMessage>,
    ) -> Self {
        Self {
            session_id,
            client_id,
            puzzle,
            service,
            outbound,
        }
    }

    pub fn send(&self, message: ServerMessage) -> Result<(), String> {
        self.outbound
            .send(message)
            .map_err(|_| "Connection closed".to_string())
    }

    pub async fn handle_message(&self, message: ClientMessage) -> Result<LinkFlow, String> {
        match message {
            ClientMessage::Join { .. } => {
                self.send(ServerMessage::Error {
                    message: "Already joined a session".to_string(),
                })?;
                Ok(LinkFlow::Continue)
            }
            ClientMessage::SubmitSolve { word_id, answer } => {
                self.handle_submit_solve(word_id, answer).await?;
                Ok(LinkFlow::Continue)
            }
            ClientMessage::SendChat { message } => {
                self.handle_send_chat(message).await?;
                Ok(LinkFlow::Continue)
            }
            ClientMessage::Leave => {
                info!(
                    "Client {} left session {}",
                    self.client_id, self.session_id
                );
                Ok(LinkFlow::Closed)
            }
        }
    }

    async fn handle_submit_solve(&self, word_id: String, answer: String) -> Result<(), String> {
        let Some(word) = self.puzzle.word(&word_id) else {
            return self.send(ServerMessage::Error {
                message: format!("Unknown word {} in puzzle {}", word_id, self.puzzle.id),
            });
        };

        let accepted = if word.matches(&answer) {
            // Store the canonical answer, not the raw guess.
            self.service
                .attempt_solve(&self.session_id, &word_id, &word.answer, ActorKind::Player)
                .await
                .map_err(|e| e.to_string())?
        } else {
            debug!(
                "Client {} guessed {} wrong in session {}",
                self.client_id, word_id, self.session_id
            );
            false
        };

        self.send(ServerMessage::SolveResult { word_id, accepted })
    }

    async fn handle_send_chat(&self, message: String) -> Result<(), String> {
        let message = message.trim();
        if message.is_empty() {
            return self.send(ServerMessage::Error {
                message: "Empty chat message".to_string(),
            });
        }

        // Delivery comes back through the chat feed.
        self.service
            .post_message(&self.session_id, ActorKind::Player, message)
            .await
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use game_core::{PuzzleLibrary, SessionFeeds};
    use game_store::MemoryStore;
    use game_types::SessionStatus;

    use super::*;

    struct LinkSetup {
        link: SessionLink<MemoryStore>,
        service: SessionService<MemoryStore>,
        feeds: SessionFeeds<MemoryStore>,
        session_id: String,
        rx: mpsc::UnboundedReceiver<ServerMessage>,
    }

    async fn create_link() -> LinkSetup {
        let store = Arc::new(MemoryStore::new());
        let service = SessionService::new(store.clone());
        let feeds = SessionFeeds::new(store);
        let library = PuzzleLibrary::builtin();
        let puzzle = library.get("puzzle_1").unwrap().clone();

        let session_id = service.create_session("puzzle_1").await.unwrap();
        service
            .set_total_words(&session_id, puzzle.total_words())
            .await
            .unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        let link = SessionLink::new(
            session_id.clone(),
            "client-a".to_string(),
            puzzle,
            service.clone(),
            tx,
        );
        LinkSetup {
            link,
            service,
            feeds,
            session_id,
            rx,
        }
    }

    #[tokio::test]
    async fn test_correct_answer_is_credited_to_the_player() {
        let mut setup = create_link().await;

        let flow = setup
            .link
            .handle_message(ClientMessage::SubmitSolve {
                word_id: "A1".to_string(),
                answer: "cat".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(flow, LinkFlow::Continue);

        let reply = setup.rx.recv().await.unwrap();
        assert!(matches!(
            reply,
            ServerMessage::SolveResult { ref word_id, accepted: true } if word_id == "A1"
        ));

        let session = setup
            .service
            .fetch_session(&setup.session_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.player_score, 1);
        assert_eq!(session.status, SessionStatus::Active);
    }

    #[tokio::test]
    async fn test_wrong_answer_is_rejected_locally() {
        let mut setup = create_link().await;

        setup
            .link
            .handle_message(ClientMessage::SubmitSolve {
                word_id: "A1".to_string(),
                answer: "DOG".to_string(),
            })
            .await
            .unwrap();

        let reply = setup.rx.recv().await.unwrap();
        assert!(matches!(
            reply,
            ServerMessage::SolveResult { ref word_id, accepted: false } if word_id == "A1"
        ));

        let session = setup
            .service
            .fetch_session(&setup.session_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.solved_count, 0);
    }

    #[tokio::test]
    async fn test_unknown_word_reports_an_error() {
        let mut setup = create_link().await;

        setup
            .link
            .handle_message(ClientMessage::SubmitSolve {
                word_id: "Z9".to_string(),
                answer: "CAT".to_string(),
            })
            .await
            .unwrap();

        let reply = setup.rx.recv().await.unwrap();
        assert!(matches!(
            reply,
            ServerMessage::Error { ref message } if message.contains("Unknown word Z9")
        ));
    }

    #[tokio::test]
    async fn test_chat_message_lands_in_the_feed() {
        let setup = create_link().await;

        setup
            .link
            .handle_message(ClientMessage::SendChat {
                message: "  nice grid  ".to_string(),
            })
            .await
            .unwrap();

        let mut chat = setup.feeds.chat(&setup.session_id).await;
        let messages = chat.next().await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message, "nice grid");
        assert_eq!(messages[0].sender, ActorKind::Player);
    }

    #[tokio::test]
    async fn test_blank_chat_is_refused() {
        let mut setup = create_link().await;

        setup
            .link
            .handle_message(ClientMessage::SendChat {
                message: "   ".to_string(),
            })
            .await
            .unwrap();

        let reply = setup.rx.recv().await.unwrap();
        assert!(matches!(
            reply,
            ServerMessage::Error { ref message } if message.contains("Empty chat message")
        ));

        let mut chat = setup.feeds.chat(&setup.session_id).await;
        assert!(chat.next().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_join_is_rejected() {
        let mut setup = create_link().await;

        let flow = setup
            .link
            .handle_message(ClientMessage::Join {
                session_id: "other".to_string(),
                client_id: "client-a".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(flow, LinkFlow::Continue);

        let reply = setup.rx.recv().await.unwrap();
        assert!(matches!(
            reply,
            ServerMessage::Error { ref message } if message.contains("Already joined")
        ));
    }

    #[tokio::test]
    async fn test_leave_closes_the_link() {
        let setup = create_link().await;

        let flow = setup
            .link
            .handle_message(ClientMessage::Leave)
            .await
            .unwrap();
        assert_eq!(flow, LinkFlow::Closed);
    }
}
