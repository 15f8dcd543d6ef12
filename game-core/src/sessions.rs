use std::sync::Arc;

use chrono::Utc;
use game_store::{DocumentStore, StoreError};
use game_types::{ActorKind, ChatMessage, Session, SessionId, SessionStatus, SolvedWord};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::paths;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(SessionId),

    #[error("session document is corrupt: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// All writes to session state go through here: lobby creation and
/// initialization, the solve transaction, the one-shot ownership claim, and
/// chat appends. Every mutation is a single optimistic transaction, so the
/// scoreboard, the ledger, and completion can never drift apart.
pub struct SessionService<S> {
    store: Arc<S>,
}

impl<S> Clone for SessionService<S> {
    fn clone(&self) -> Self {
        SessionService {
            store: self.store.clone(),
        }
    }
}

fn decode_session(value: Value) -> Result<Session, SessionError> {
    serde_json::from_value(value).map_err(|e| SessionError::Corrupt(e.to_string()))
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Value, SessionError> {
    serde_json::to_value(value).map_err(|e| SessionError::Corrupt(e.to_string()))
}

impl<S: DocumentStore> SessionService<S> {
    pub fn new(store: Arc<S>) -> Self {
        SessionService { store }
    }

    /// Create a fresh session for a puzzle. Scores start at zero and
    /// `total_words` stays unset until `set_total_words`.
    pub async fn create_session(&self, puzzle_id: &str) -> Result<SessionId, SessionError> {
        let session = Session {
            id: Uuid::new_v4().to_string(),
            puzzle_id: puzzle_id.to_string(),
            player_score: 0,
            ai_score: 0,
            solved_count: 0,
            total_words: None,
            status: SessionStatus::Active,
            winner: None,
            owner_id: None,
            created_at: Utc::now().to_rfc3339(),
        };
        let path = paths::session_doc(&session.id);
        let doc = encode(&session)?;

        self.store
            .run_transaction(|tx| tx.set(path.clone(), doc.clone()))
            .await?;

        info!("Session {} created for puzzle {}", session.id, puzzle_id);
        Ok(session.id)
    }

    /// Set the word total once, right after creation. Later calls keep the
    /// original value.
    pub async fn set_total_words(
        &self,
        session_id: &str,
        total_words: u32,
    ) -> Result<(), SessionError> {
        let path = paths::session_doc(session_id);
        self.store
            .run_transaction(|tx| -> Result<(), SessionError> {
                let value = tx
                    .get(&path)
                    .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
                let mut session = decode_session(value)?;
                if session.total_words.is_some() {
                    return Ok(());
                }
                session.total_words = Some(total_words);
                tx.set(path.clone(), encode(&session)?);
                Ok(())
            })
            .await??;
        Ok(())
    }

    pub async fn fetch_session(&self, session_id: &str) -> Result<Option<Session>, SessionError> {
        let path = paths::session_doc(session_id);
        let value = self.store.run_transaction(|tx| tx.get(&path)).await?;
        value.map(decode_session).transpose()
    }

    /// Credit a solved word to an actor, exactly once.
    ///
    /// Returns `Ok(true)` when this call committed the entry. `Ok(false)`
    /// means someone else solved the word first; nothing was written. The
    /// caller must have verified the answer against the puzzle definition;
    /// this only records who committed a word id first.
    ///
    /// The whole solve is one transaction: the ledger entry, both counters,
    /// and (on the last word) completion plus winner, decided from the
    /// post-increment scores. Ties go to the player.
    pub async fn attempt_solve(
        &self,
        session_id: &str,
        word_id: &str,
        answer: &str,
        solved_by: ActorKind,
    ) -> Result<bool, SessionError> {
        let session_path = paths::session_doc(session_id);
        let entry_path = paths::solved_words(session_id).doc(word_id);

        let accepted = self
            .store
            .run_transaction(|tx| -> Result<bool, SessionError> {
                if tx.get(&entry_path).is_some() {
                    // Already credited; stage nothing so this commits as a no-op.
                    return Ok(false);
                }

                let value = tx
                    .get(&session_path)
                    .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
                let mut session = decode_session(value)?;

                let entry = SolvedWord {
                    word_id: word_id.to_string(),
                    answer: answer.to_string(),
                    solved_by,
                    solved_at: tx.timestamp(),
                };

                session.solved_count += 1;
                match solved_by {
                    ActorKind::Player => session.player_score += 1,
                    ActorKind::Ai => session.ai_score += 1,
                }

                if let Some(total) = session.total_words {
                    if session.solved_count >= total {
                        session.status = SessionStatus::Completed;
                        session.winner = Some(if session.player_score >= session.ai_score {
                            ActorKind::Player
                        } else {
                            ActorKind::Ai
                        });
                    }
                }

                tx.set(entry_path.clone(), encode(&entry)?);
                tx.set(session_path.clone(), encode(&session)?);
                Ok(true)
            })
            .await??;

        if accepted {
            info!(
                "Word {} in session {} credited to {:?}",
                word_id, session_id, solved_by
            );
        } else {
            debug!(
                "Word {} in session {} was already solved",
                word_id, session_id
            );
        }
        Ok(accepted)
    }

    /// One-shot claim of the right to drive this session's automated actor.
    /// First committed candidate wins and gets `true`; every later call is a
    /// quiet no-op, as is claiming a session that does not exist.
    pub async fn claim_ai_ownership(
        &self,
        session_id: &str,
        candidate_id: &str,
    ) -> Result<bool, SessionError> {
        let path = paths::session_doc(session_id);
        let claimed = self
            .store
            .run_transaction(|tx| -> Result<bool, SessionError> {
                let Some(value) = tx.get(&path) else {
                    return Ok(false);
                };
                let mut session = decode_session(value)?;
                if session.owner_id.is_some() {
                    return Ok(false);
                }
                session.owner_id = Some(candidate_id.to_string());
                tx.set(path.clone(), encode(&session)?);
                Ok(true)
            })
            .await??;

        if claimed {
            info!(
                "Client {} now drives the ai for session {}",
                candidate_id, session_id
            );
        } else {
            debug!(
                "Ai ownership for session {} already settled, {} stands down",
                session_id, candidate_id
            );
        }
        Ok(claimed)
    }

    /// Append one chat entry. Entries are ordered by their store-assigned
    /// timestamp.
    pub async fn post_message(
        &self,
        session_id: &str,
        sender: ActorKind,
        message: &str,
    ) -> Result<(), SessionError> {
        let path = paths::chat(session_id).doc(Uuid::new_v4().to_string());
        self.store
            .run_transaction(|tx| -> Result<(), SessionError> {
                let entry = ChatMessage {
                    id: path.id().to_string(),
                    sender,
                    message: message.to_string(),
                    sent_at: tx.timestamp(),
                };
                tx.set(path.clone(), encode(&entry)?);
                Ok(())
            })
            .await??;
        Ok(())
    }
}
