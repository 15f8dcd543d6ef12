use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use game_types::{Direction, Puzzle, WordDef};
use rand::prelude::*;

/// Immutable puzzle definitions, looked up by id.
pub struct PuzzleLibrary {
    puzzles: HashMap<String, Puzzle>,
}

fn word(
    id: &str,
    number: u32,
    row: u32,
    col: u32,
    direction: Direction,
    answer: &str,
    clue: &str,
) -> WordDef {
    WordDef {
        id: id.to_string(),
        number,
        row,
        col,
        direction,
        answer: answer.to_string(),
        clue: clue.to_string(),
    }
}

impl PuzzleLibrary {
    pub fn from_puzzles(puzzles: Vec<Puzzle>) -> Self {
        PuzzleLibrary {
            puzzles: puzzles.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    /// The built-in puzzle set.
    pub fn builtin() -> Self {
        Self::from_puzzles(vec![
            Puzzle {
                id: "puzzle_1".to_string(),
                size: 10,
                words: vec![
                    word("A1", 1, 0, 0, Direction::Across, "CAT", "Feline pet"),
                    word("D2", 2, 0, 2, Direction::Down, "TREE", "Has leaves"),
                    word("A3", 3, 2, 0, Direction::Across, "NOTE", "Short memo"),
                    word("D4", 4, 1, 5, Direction::Down, "RED", "Primary color"),
                    word("A5", 5, 4, 1, Direction::Across, "RIVER", "Flows to sea"),
                ],
            },
            Puzzle {
                id: "puzzle_2".to_string(),
                size: 10,
                words: vec![
                    word("A1", 1, 0, 0, Direction::Across, "CAR", "Road vehicle"),
                    word("D2", 2, 0, 1, Direction::Down, "AREA", "Region"),
                    word("A3", 3, 3, 0, Direction::Across, "CODE", "What devs write"),
                    word("D4", 4, 0, 7, Direction::Down, "AI", "Smarts for machines"),
                ],
            },
            Puzzle {
                id: "puzzle_3".to_string(),
                size: 10,
                words: vec![
                    word("A1", 1, 1, 1, Direction::Across, "HOUSE", "Place to live"),
                    word("D2", 2, 1, 1, Direction::Down, "HAT", "Headwear"),
                    word("A3", 3, 5, 2, Direction::Across, "GAME", "This app is one"),
                    word("D4", 4, 2, 6, Direction::Down, "NET", "Goal mesh"),
                ],
            },
        ])
    }

    /// Load every `*.json` puzzle file from a directory.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut puzzles = Vec::new();
        let entries = fs::read_dir(dir)
            .with_context(|| format!("reading puzzle directory {}", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("reading puzzle file {}", path.display()))?;
            let puzzle: Puzzle = serde_json::from_str(&raw)
                .with_context(|| format!("parsing puzzle file {}", path.display()))?;
            puzzles.push(puzzle);
        }
        ensure!(!puzzles.is_empty(), "no puzzle files in {}", dir.display());
        Ok(Self::from_puzzles(puzzles))
    }

    pub fn get(&self, puzzle_id: &str) -> Option<&Puzzle> {
        self.puzzles.get(puzzle_id)
    }

    /// A uniformly random puzzle id, for lobby creation without an explicit
    /// choice.
    pub fn random_id(&self) -> Option<&str> {
        let ids: Vec<&String> = self.puzzles.keys().collect();
        ids.choose(&mut rand::rng()).map(|id| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.puzzles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.puzzles.is_empty()
    }
}
