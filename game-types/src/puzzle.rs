use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Direction {
    Across,
    Down,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WordDef {
    pub id: String, // unique per word, e.g. "A1", "D2"
    pub number: u32,
    pub row: u32,
    pub col: u32,
    pub direction: Direction,
    pub answer: String, // UPPERCASE
    pub clue: String,
}

impl WordDef {
    /// Answers compare as case-insensitive literal strings.
    pub fn matches(&self, guess: &str) -> bool {
        let guess = guess.trim();
        !guess.is_empty() && self.answer.eq_ignore_ascii_case(guess)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Puzzle {
    pub id: String,
    pub size: u32,
    pub words: Vec<WordDef>,
}

impl Puzzle {
    pub fn word(&self, word_id: &str) -> Option<&WordDef> {
        self.words.iter().find(|w| w.id == word_id)
    }

    pub fn total_words(&self) -> u32 {
        self.words.len() as u32
    }
}
