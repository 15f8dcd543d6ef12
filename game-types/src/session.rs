use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Session document id, a UUID string doubling as the store document key.
pub type SessionId = String;

/// Store-assigned timestamp in milliseconds since the epoch, strictly
/// increasing across commits within one store.
pub type Timestamp = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ActorKind {
    Player,
    Ai,
}

impl ActorKind {
    pub fn opponent(self) -> Self {
        match self {
            ActorKind::Player => ActorKind::Ai,
            ActorKind::Ai => ActorKind::Player,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum SessionStatus {
    Active,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Session {
    pub id: SessionId,
    pub puzzle_id: String,
    pub player_score: u32,
    pub ai_score: u32,
    pub solved_count: u32,
    pub total_words: Option<u32>,
    pub status: SessionStatus,
    pub winner: Option<ActorKind>,
    pub owner_id: Option<String>,
    pub created_at: String, // ISO 8601 string
}

impl Session {
    pub fn score_of(&self, actor: ActorKind) -> u32 {
        match actor {
            ActorKind::Player => self.player_score,
            ActorKind::Ai => self.ai_score,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }
}

/// One entry in a session's solved-word ledger, keyed by word id.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SolvedWord {
    pub word_id: String,
    pub answer: String,
    pub solved_by: ActorKind,
    pub solved_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ChatMessage {
    pub id: String,
    pub sender: ActorKind,
    pub message: String,
    pub sent_at: Timestamp,
}
