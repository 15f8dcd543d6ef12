use std::sync::Arc;
use std::time::Duration;

use game_core::{PuzzleLibrary, SessionFeeds, SessionService};
use game_store::MemoryStore;
use game_types::{ActorKind, Session, SessionStatus};

/// Shared handles over one in-memory coordinator.
pub struct TestHarness {
    pub service: SessionService<MemoryStore>,
    pub feeds: SessionFeeds<MemoryStore>,
    pub library: Arc<PuzzleLibrary>,
}

pub fn create_harness() -> TestHarness {
    let store = Arc::new(MemoryStore::new());
    TestHarness {
        service: SessionService::new(store.clone()),
        feeds: SessionFeeds::new(store),
        library: Arc::new(PuzzleLibrary::builtin()),
    }
}

/// Creates a session for a builtin puzzle with its word total already set,
/// the way a joining client does before play starts.
pub async fn create_ready_session(harness: &TestHarness, puzzle_id: &str) -> String {
    let session_id = harness
        .service
        .create_session(puzzle_id)
        .await
        .expect("session creation should succeed");
    let total = harness
        .library
        .get(puzzle_id)
        .expect("builtin puzzle should exist")
        .total_words();
    harness
        .service
        .set_total_words(&session_id, total)
        .await
        .expect("setting the word total should succeed");
    session_id
}

/// Solves the given words in order, attributing each to the given actor.
/// Panics if any solve is rejected; callers use this for uncontended scripts.
pub async fn solve_script(
    harness: &TestHarness,
    session_id: &str,
    moves: &[(ActorKind, &str, &str)],
) {
    for (actor, word_id, answer) in moves {
        let accepted = harness
            .service
            .attempt_solve(session_id, word_id, answer, *actor)
            .await
            .expect("scripted solve should not error");
        assert!(accepted, "scripted solve of {} should be accepted", word_id);
    }
}

/// Asserts the bookkeeping identities that must hold on every snapshot.
pub fn assert_session_invariants(session: &Session) {
    assert_eq!(
        session.player_score + session.ai_score,
        session.solved_count,
        "scores must sum to the solved count"
    );
    if let Some(total) = session.total_words {
        assert!(
            session.solved_count <= total,
            "solved count must never exceed the word total"
        );
    }
    match session.status {
        SessionStatus::Active => assert!(
            session.winner.is_none(),
            "an active session must not have a winner"
        ),
        SessionStatus::Completed => assert!(
            session.winner.is_some(),
            "a completed session must have a winner"
        ),
    }
}

/// Fetches the session and asserts it reached the expected final tallies.
pub async fn assert_final_state(
    harness: &TestHarness,
    session_id: &str,
    player_score: u32,
    ai_score: u32,
    winner: ActorKind,
) {
    let session = harness
        .service
        .fetch_session(session_id)
        .await
        .expect("fetch should succeed")
        .expect("session should exist");
    assert_session_invariants(&session);
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.player_score, player_score);
    assert_eq!(session.ai_score, ai_score);
    assert_eq!(session.winner, Some(winner));
}

/// Awaits a future with a test-sized timeout so a regression hangs loudly
/// instead of silently.
pub async fn within<T>(fut: impl std::future::Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("operation should finish well within the test timeout")
}
