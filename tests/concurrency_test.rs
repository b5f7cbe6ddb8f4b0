//! Tests for concurrent access to a shared session.

use std::sync::{Arc, Barrier};
use std::thread;

use chrono::{TimeDelta, Utc};
use codemaster::{
    Code, GameConfig, GuessOutcome, MemoryArchiver, Phase, Session, SessionRegistry, Winner,
};

const SECRET: &str = "Q7Q7";

fn active_session(players: u32, archiver: Arc<MemoryArchiver>) -> Arc<Session> {
    let now = Utc::now();
    let session = Session::with_secret(
        1,
        Code::parse(SECRET, 4).unwrap(),
        Arc::new(GameConfig::default()),
        archiver,
        now,
    )
    .unwrap();
    for _ in 0..players {
        session.admit_at(now).unwrap();
    }
    session.status_at(now + TimeDelta::seconds(30));
    assert_eq!(session.phase(), Phase::Active);
    Arc::new(session)
}

#[test]
fn test_simultaneous_winning_guesses_crown_one_winner() {
    for _ in 0..50 {
        let archiver = Arc::new(MemoryArchiver::new());
        let session = active_session(4, archiver.clone());
        let barrier = Arc::new(Barrier::new(4));
        let at = Utc::now() + TimeDelta::seconds(40);

        let handles: Vec<_> = (1..=4)
            .map(|player_id| {
                let session = Arc::clone(&session);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    session.submit_guess_at(player_id, SECRET, at).unwrap()
                })
            })
            .collect();

        let outcomes: Vec<GuessOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let winners: Vec<_> = outcomes
            .iter()
            .filter(|o| matches!(o, GuessOutcome::Won { .. }))
            .collect();
        assert_eq!(winners.len(), 1, "outcomes: {outcomes:?}");

        let Some(Winner::Player(winner)) = session.ending().map(|e| *e.winner()) else {
            panic!("session should have a winner");
        };
        for outcome in &outcomes {
            if !matches!(outcome, GuessOutcome::Won { .. }) {
                assert_eq!(*outcome, GuessOutcome::GameOver { winner });
            }
        }
        assert_eq!(archiver.summaries().len(), 1);
    }
}

#[test]
fn test_concurrent_guesses_never_exceed_attempt_budget() {
    let archiver = Arc::new(MemoryArchiver::new());
    let session = active_session(2, archiver.clone());
    let at = Utc::now() + TimeDelta::seconds(40);

    // Eight threads hammer player 1 with wrong guesses.
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let session = Arc::clone(&session);
            thread::spawn(move || {
                (0..5)
                    .map(|_| session.submit_guess_at(1, "ZZZZ", at))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();

    let counted = results
        .iter()
        .filter(|r| matches!(r, Ok(GuessOutcome::Accepted(_)) | Ok(GuessOutcome::Lost { .. })))
        .count();
    assert_eq!(counted, 10);
    assert_eq!(session.players()[0].attempts_used(), &10);
    // Player 2 still has attempts, so the game goes on.
    assert_eq!(session.phase(), Phase::Active);
    assert!(archiver.summaries().is_empty());
}

#[test]
fn test_concurrent_joins_fill_sessions_in_order() {
    let registry = SessionRegistry::new(GameConfig::default(), Arc::new(MemoryArchiver::new()));
    let barrier = Arc::new(Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let registry = registry.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.join_open_session().unwrap()
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(registry.len(), 4);
    for id in 1..=4 {
        assert_eq!(registry.get(id).unwrap().players().len(), 4);
    }
    assert_eq!(registry.open_session_id(), None);
}
