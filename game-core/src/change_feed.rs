use std::sync::Arc;

use game_store::{DocumentStore, Subscription};
use game_types::{ChatMessage, Session, SolvedWord};
use serde_json::Value;
use tracing::warn;

use crate::paths;

/// Typed change feeds over one session's documents.
///
/// Each watch is an independent, cancellable stream of full snapshots: the
/// current state arrives on the first poll, later polls resolve with the
/// latest committed state. Intermediate commits between polls coalesce.
pub struct SessionFeeds<S> {
    store: Arc<S>,
}

impl<S> Clone for SessionFeeds<S> {
    fn clone(&self) -> Self {
        SessionFeeds {
            store: self.store.clone(),
        }
    }
}

impl<S: DocumentStore> SessionFeeds<S> {
    pub fn new(store: Arc<S>) -> Self {
        SessionFeeds { store }
    }

    pub async fn session(&self, session_id: &str) -> SessionWatch {
        SessionWatch {
            inner: self
                .store
                .watch_document(&paths::session_doc(session_id))
                .await,
        }
    }

    pub async fn solved_words(&self, session_id: &str) -> SolvedWordsWatch {
        SolvedWordsWatch {
            inner: self
                .store
                .watch_collection(&paths::solved_words(session_id))
                .await,
        }
    }

    pub async fn chat(&self, session_id: &str) -> ChatWatch {
        ChatWatch {
            inner: self.store.watch_collection(&paths::chat(session_id)).await,
        }
    }
}

pub struct SessionWatch {
    inner: Subscription<Option<Value>>,
}

impl SessionWatch {
    /// `None` means the feed is closed; `Some(None)` means the session
    /// document does not exist (or no longer decodes).
    pub async fn next(&mut self) -> Option<Option<Session>> {
        let value = self.inner.next().await?;
        Some(value.and_then(|v| match serde_json::from_value::<Session>(v) {
            Ok(session) => Some(session),
            Err(error) => {
                warn!("Dropping undecodable session snapshot: {}", error);
                None
            }
        }))
    }
}

pub struct SolvedWordsWatch {
    inner: Subscription<Vec<(String, Value)>>,
}

impl SolvedWordsWatch {
    /// Full ledger snapshot ordered by solve time.
    pub async fn next(&mut self) -> Option<Vec<SolvedWord>> {
        let entries = self.inner.next().await?;
        let mut words: Vec<SolvedWord> = entries
            .into_iter()
            .filter_map(|(id, value)| match serde_json::from_value(value) {
                Ok(word) => Some(word),
                Err(error) => {
                    warn!("Skipping undecodable ledger entry {}: {}", id, error);
                    None
                }
            })
            .collect();
        words.sort_by_key(|word| word.solved_at);
        Some(words)
    }
}

pub struct ChatWatch {
    inner: Subscription<Vec<(String, Value)>>,
}

impl ChatWatch {
    /// Full chat snapshot ordered by send time.
    pub async fn next(&mut self) -> Option<Vec<ChatMessage>> {
        let entries = self.inner.next().await?;
        let mut messages: Vec<ChatMessage> = entries
            .into_iter()
            .filter_map(|(id, value)| match serde_json::from_value(value) {
                Ok(message) => Some(message),
                Err(error) => {
                    warn!("Skipping undecodable chat entry {}: {}", id, error);
                    None
                }
            })
            .collect();
        messages.sort_by_key(|message| message.sent_at);
        Some(messages)
    }
}
