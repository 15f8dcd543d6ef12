use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use game_store::DocumentStore;
use game_types::{ActorKind, Puzzle, Session, WordDef};
use rand::prelude::*;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::advisory::{Advisory, TauntContext, TauntState, canned_taunt};
use crate::change_feed::SessionFeeds;
use crate::puzzles::PuzzleLibrary;
use crate::sessions::{SessionError, SessionService};

/// Tuning for the automated actor: how often it wakes up and how likely a
/// wake-up is to produce a correct answer when no advisory is guessing.
#[derive(Debug, Clone)]
pub struct RunnerPolicy {
    pub min_interval: Duration,
    pub max_interval: Duration,
    pub success_rate: f64,
    pub rng_seed: Option<u64>,
}

impl Default for RunnerPolicy {
    fn default() -> Self {
        RunnerPolicy {
            min_interval: Duration::from_millis(4000),
            max_interval: Duration::from_millis(7000),
            success_rate: 0.7,
            rng_seed: None,
        }
    }
}

impl RunnerPolicy {
    fn jitter(&self, rng: &mut StdRng) -> Duration {
        if self.max_interval <= self.min_interval {
            return self.min_interval;
        }
        rng.random_range(self.min_interval..=self.max_interval)
    }
}

pub(crate) fn announcement_key(text: &str, word_id: &str) -> String {
    format!("{text}|{word_id}")
}

/// The automated opponent for one session.
///
/// The runner claims ownership once, then polls on a jittered timer while it
/// holds ownership and the session is active: pick a random unsolved word,
/// decide whether the ai "got it" (advisory guess or success policy), submit
/// through the solve transaction, and announce accepted solves in chat. It
/// halts when the session completes, disappears, or belongs to someone else.
pub struct AiRunner<S> {
    sessions: SessionService<S>,
    feeds: SessionFeeds<S>,
    library: Arc<PuzzleLibrary>,
    advisory: Arc<dyn Advisory>,
    session_id: String,
    candidate_id: String,
    policy: RunnerPolicy,
}

impl<S: DocumentStore> AiRunner<S> {
    pub fn new(
        sessions: SessionService<S>,
        feeds: SessionFeeds<S>,
        library: Arc<PuzzleLibrary>,
        advisory: Arc<dyn Advisory>,
        session_id: impl Into<String>,
        candidate_id: impl Into<String>,
        policy: RunnerPolicy,
    ) -> Self {
        AiRunner {
            sessions,
            feeds,
            library,
            advisory,
            session_id: session_id.into(),
            candidate_id: candidate_id.into(),
            policy,
        }
    }

    /// Drives the actor until a terminal condition. Dropping the task aborts
    /// cleanly; the timer and subscriptions go with it.
    pub async fn run(self) -> Result<(), SessionError> {
        self.sessions
            .claim_ai_ownership(&self.session_id, &self.candidate_id)
            .await?;

        let mut session_feed = self.feeds.session(&self.session_id).await;
        let mut ledger_feed = self.feeds.solved_words(&self.session_id).await;

        let Some(Some(mut session)) = session_feed.next().await else {
            debug!("Session {} gone before its runner started", self.session_id);
            return Ok(());
        };
        let Some(puzzle) = self.library.get(&session.puzzle_id).cloned() else {
            warn!(
                "Session {} references unknown puzzle {}, runner stopping",
                self.session_id, session.puzzle_id
            );
            return Ok(());
        };
        let mut solved: HashSet<String> = match ledger_feed.next().await {
            Some(words) => words.into_iter().map(|word| word.word_id).collect(),
            None => return Ok(()),
        };

        let mut rng = match self.policy.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut last_announced: Option<String> = None;
        let mut next_tick = Instant::now() + self.policy.jitter(&mut rng);

        loop {
            if !session.is_active() {
                info!("Session {} finished, runner stopping", self.session_id);
                break;
            }
            if session.owner_id.as_deref() != Some(self.candidate_id.as_str()) {
                debug!(
                    "Client {} does not own session {}, runner standing down",
                    self.candidate_id, self.session_id
                );
                break;
            }

            tokio::select! {
                _ = sleep_until(next_tick) => {
                    self.tick(&puzzle, &session, &solved, &mut rng, &mut last_announced)
                        .await?;
                    next_tick = Instant::now() + self.policy.jitter(&mut rng);
                }
                snapshot = session_feed.next() => {
                    match snapshot {
                        Some(Some(updated)) => session = updated,
                        Some(None) | None => {
                            debug!("Session {} gone, runner stopping", self.session_id);
                            break;
                        }
                    }
                }
                words = ledger_feed.next() => {
                    match words {
                        Some(words) => {
                            solved = words.into_iter().map(|word| word.word_id).collect();
                        }
                        None => break,
                    }
                }
            }
        }
        Ok(())
    }

    async fn tick(
        &self,
        puzzle: &Puzzle,
        session: &Session,
        solved: &HashSet<String>,
        rng: &mut StdRng,
        last_announced: &mut Option<String>,
    ) -> Result<(), SessionError> {
        let candidates: Vec<&WordDef> = puzzle
            .words
            .iter()
            .filter(|word| !solved.contains(&word.id))
            .collect();
        let Some(word) = candidates.choose(rng).copied() else {
            return Ok(());
        };

        if !self.decide(word, rng).await {
            debug!("Ai passed on word {} in session {}", word.id, self.session_id);
            return Ok(());
        }

        let accepted = self
            .sessions
            .attempt_solve(&self.session_id, &word.id, &word.answer, ActorKind::Ai)
            .await?;
        if !accepted {
            // Lost the race; the ledger feed will catch this loop up.
            return Ok(());
        }

        self.announce(word, session, last_announced).await
    }

    /// The ai "solves" a word either by asking the advisory for a guess and
    /// checking it against the real answer, or by flipping the configured
    /// success coin when no advisory is guessing.
    async fn decide(&self, word: &WordDef, rng: &mut StdRng) -> bool {
        match self.advisory.guess_word(&word.clue, word.answer.len()).await {
            Ok(guess) => word.matches(&guess),
            Err(error) => {
                debug!("Advisory guess unavailable ({}), using success policy", error);
                rng.random_bool(self.policy.success_rate.clamp(0.0, 1.0))
            }
        }
    }

    /// One chat line per accepted solve, de-duplicated by (text, word id) so
    /// a repeated announcement for the same event is never posted twice.
    async fn announce(
        &self,
        word: &WordDef,
        session: &Session,
        last_announced: &mut Option<String>,
    ) -> Result<(), SessionError> {
        let context = TauntContext {
            state: TauntState::WonWord,
            word: Some(word.answer.clone()),
            player_score: Some(session.player_score),
            ai_score: Some(session.ai_score + 1),
        };
        let text = match self.advisory.taunt(&context).await {
            Ok(text) => text,
            Err(error) => {
                debug!("Advisory taunt unavailable ({}), using canned line", error);
                canned_taunt()
            }
        };

        let key = announcement_key(&text, &word.id);
        if last_announced.as_deref() == Some(key.as_str()) {
            return Ok(());
        }
        self.sessions
            .post_message(&self.session_id, ActorKind::Ai, &text)
            .await?;
        *last_announced = Some(key);
        Ok(())
    }
}
