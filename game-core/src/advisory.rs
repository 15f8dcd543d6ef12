use async_trait::async_trait;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canned announcement lines used whenever the advisory cannot produce one.
pub const CANNED_TAUNTS: [&str; 7] = [
    "Got one.",
    "Claimed it.",
    "That one's mine.",
    "Snatched it.",
    "Edge taken.",
    "Booked it.",
    "Sealed the clue.",
];

pub fn canned_taunt() -> String {
    let mut rng = rand::rng();
    CANNED_TAUNTS
        .choose(&mut rng)
        .unwrap_or(&CANNED_TAUNTS[0])
        .to_string()
}

#[derive(Debug, Error)]
pub enum AdvisoryError {
    #[error("advisory unavailable: {0}")]
    Unavailable(String),

    #[error("advisory returned an unusable reply: {0}")]
    InvalidReply(String),
}

/// Game-state label attached to a taunt request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TauntState {
    WonWord,
    PlayerSolved,
    CloseGame,
    Losing,
    Winning,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TauntContext {
    pub state: TauntState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_score: Option<u32>,
}

/// Best-effort text generation for the automated actor. Guesses are never
/// trusted for correctness; the runner still compares them against the real
/// answer before submitting anything.
#[async_trait]
pub trait Advisory: Send + Sync {
    async fn guess_word(&self, clue: &str, length: usize) -> Result<String, AdvisoryError>;

    async fn taunt(&self, context: &TauntContext) -> Result<String, AdvisoryError>;
}

/// Advisory used when no endpoint is configured: guessing is unavailable
/// (the runner falls back to its success-likelihood policy) and taunts come
/// from the canned pool.
pub struct CannedAdvisory;

#[async_trait]
impl Advisory for CannedAdvisory {
    async fn guess_word(&self, _clue: &str, _length: usize) -> Result<String, AdvisoryError> {
        Err(AdvisoryError::Unavailable(
            "no text advisory configured".to_string(),
        ))
    }

    async fn taunt(&self, _context: &TauntContext) -> Result<String, AdvisoryError> {
        Ok(canned_taunt())
    }
}

#[derive(Debug, Serialize)]
struct GuessRequest<'a> {
    clue: &'a str,
    length: usize,
}

#[derive(Debug, Deserialize)]
struct GuessReply {
    guess: String,
}

#[derive(Debug, Deserialize)]
struct TauntReply {
    taunt: String,
}

/// Advisory backed by an HTTP text-generation endpoint exposing
/// `POST {base}/guess` and `POST {base}/taunt`.
pub struct HttpAdvisory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAdvisory {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpAdvisory {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Advisory for HttpAdvisory {
    async fn guess_word(&self, clue: &str, length: usize) -> Result<String, AdvisoryError> {
        let reply = self
            .client
            .post(format!("{}/guess", self.base_url))
            .json(&GuessRequest { clue, length })
            .send()
            .await
            .map_err(|e| AdvisoryError::Unavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| AdvisoryError::Unavailable(e.to_string()))?
            .json::<GuessReply>()
            .await
            .map_err(|e| AdvisoryError::InvalidReply(e.to_string()))?;

        let guess = normalize_guess(&reply.guess, length);
        if guess.len() != length {
            return Err(AdvisoryError::InvalidReply(format!(
                "guess {:?} does not fit length {}",
                reply.guess, length
            )));
        }
        Ok(guess)
    }

    async fn taunt(&self, context: &TauntContext) -> Result<String, AdvisoryError> {
        let reply = self
            .client
            .post(format!("{}/taunt", self.base_url))
            .json(context)
            .send()
            .await
            .map_err(|e| AdvisoryError::Unavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| AdvisoryError::Unavailable(e.to_string()))?
            .json::<TauntReply>()
            .await
            .map_err(|e| AdvisoryError::InvalidReply(e.to_string()))?;

        let text = sanitize_line(&reply.taunt);
        if text.is_empty() {
            return Err(AdvisoryError::InvalidReply(
                "taunt sanitized to nothing".to_string(),
            ));
        }
        Ok(text)
    }
}

/// Uppercase A-Z only, at most `length` characters.
pub fn normalize_guess(raw: &str, length: usize) -> String {
    raw.trim()
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase())
        .take(length)
        .collect()
}

const LEADING_JUNK: &[char] = &[
    '"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}', '-', '\u{2013}', '\u{2014}',
    '\u{00B7}', '\u{2022}', '\u{203A}', '\u{00BB}',
];

fn is_stripped_emoji(c: char) -> bool {
    matches!(c,
        '\u{1F300}'..='\u{1F6FF}'
            | '\u{1F900}'..='\u{1F9FF}'
            | '\u{1FA70}'..='\u{1FAFF}'
            | '\u{2600}'..='\u{27BF}'
            | '\u{FE0F}')
}

/// One clean line: markdown styling and common emoji stripped, whitespace
/// collapsed, leading quotes and bullets trimmed, capped at 12 words.
pub fn sanitize_line(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .filter(|c| !matches!(c, '*' | '_' | '~' | '`'))
        .filter(|c| !is_stripped_emoji(*c))
        .collect();
    stripped
        .trim_start_matches(LEADING_JUNK)
        .split_whitespace()
        .take(12)
        .collect::<Vec<_>>()
        .join(" ")
}
