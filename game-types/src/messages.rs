use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{ChatMessage, Puzzle, Session, SolvedWord};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ClientMessage {
    Join { session_id: String, client_id: String },
    SubmitSolve { word_id: String, answer: String },
    SendChat { message: String },
    Leave,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ServerMessage {
    Joined { session: Session, puzzle: Puzzle },
    SessionUpdate { session: Session },
    SessionGone,
    SolvedWords { words: Vec<SolvedWord> },
    ChatHistory { messages: Vec<ChatMessage> },
    SolveResult { word_id: String, accepted: bool },
    Error { message: String },
}
