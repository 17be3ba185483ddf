//! Scoring rules driven through the public engine API.

use std::time::{Duration, Instant};

use five_pin_lane::scoring::{
    BallOutcome, GameSetup, GameStore, Rejection, ScoringEngine, SessionMode, SessionPhase, FRAME_COUNT, LAST_FRAME,
};
use five_pin_lane::PinState;

fn pins(pattern: &str) -> PinState {
    PinState::from_pattern(pattern).unwrap()
}

fn single(session: SessionMode) -> (ScoringEngine, Instant) {
    let now = Instant::now();
    let engine = ScoringEngine::with_names(GameSetup::new(3, session), ["Ana"], now);
    (engine, now)
}

/// Deterministic stream of 5-pin patterns.
fn patterns(seed: u64, count: usize) -> Vec<PinState> {
    let mut state = seed;
    (0..count)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let bits = (state >> 33) as u8 & 0b11111;
            let pattern: String = (0..5).map(|i| if bits & (1 << i) != 0 { '1' } else { '0' }).collect();
            pins(&pattern)
        })
        .collect()
}

#[test]
fn test_tenth_frame_three_strikes() {
    let (mut engine, now) = single(SessionMode::Games { total: 1 });
    for _ in 0..9 {
        engine.process_ball_at(PinState::all_down(), now);
    }
    assert_eq!(engine.roster()[0].current_frame, LAST_FRAME);

    engine.process_ball_at(PinState::all_down(), now);
    engine.process_ball_at(PinState::all_down(), now);
    assert_eq!(engine.roster()[0].current_frame, LAST_FRAME);
    assert!(!engine.roster()[0].is_finished());

    engine.process_ball_at(PinState::all_down(), now);
    let bowler = &engine.roster()[0];
    assert_eq!(bowler.current_frame, FRAME_COUNT);
    assert_eq!(bowler.frames[LAST_FRAME].raw_score(), 45);
    assert_eq!(bowler.total_score, 450);
}

#[test]
fn test_expired_session_leaves_saved_game_alone() {
    let dir = tempfile::tempdir().unwrap();
    let store = GameStore::new(dir.path());
    let (engine, now) = single(SessionMode::Time { minutes: 1 });
    let mut engine = engine.with_store(store.clone());

    for _ in 0..12 {
        engine.process_ball_at(PinState::all_down(), now + Duration::from_secs(61));
    }
    assert_eq!(engine.session().phase(), SessionPhase::Expired);

    let saved = std::fs::read_to_string(store.current_path()).unwrap();
    let outcome = engine.process_ball_at(pins("00100"), now + Duration::from_secs(62));
    assert_eq!(outcome, BallOutcome::Rejected(Rejection::SessionExpired));
    assert_eq!(std::fs::read_to_string(store.current_path()).unwrap(), saved);
}

#[test]
fn test_totals_are_stable_when_recomputed() {
    let (mut engine, now) = single(SessionMode::Games { total: 1 });
    for reported in patterns(7, 40) {
        engine.process_ball_at(reported, now);
    }

    let mut bowler = engine.roster()[0].clone();
    let totals = bowler.frame_totals;
    let total = bowler.total_score;
    bowler.refresh_totals();
    bowler.refresh_totals();
    assert_eq!(bowler.frame_totals, totals);
    assert_eq!(bowler.total_score, total);
}

#[test]
fn test_pins_down_only_accumulate_within_a_frame() {
    let (mut engine, now) = single(SessionMode::Games { total: 1 });
    for reported in patterns(42, 60) {
        let BallOutcome::Recorded(record) = engine.process_ball_at(reported, now) else {
            continue;
        };
        let throw = record.throw;
        assert_eq!(throw.pins_after.union(throw.pins_before), throw.pins_after);
        assert_eq!(throw.pins_after.union(reported), throw.pins_after);
        assert!(throw.score <= 15);
    }
    assert!(engine.roster()[0].is_finished());
}

#[test]
fn test_recovered_game_continues_where_it_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let store = GameStore::new(dir.path());
    let (engine, now) = single(SessionMode::Games { total: 1 });
    let mut engine = engine.with_store(store.clone());
    engine.process_ball_at(PinState::all_down(), now);
    engine.process_ball_at(pins("00100"), now);
    drop(engine);

    let snapshot = store.load_current().unwrap().unwrap();
    let engine = ScoringEngine::recover(GameSetup::new(3, SessionMode::Games { total: 1 }), snapshot, now);
    let bowler = &engine.roster()[0];
    assert_eq!(bowler.current_frame, 1);
    assert_eq!(bowler.current_ball, 1);
    assert_eq!(bowler.pins, pins("00100"));
}
