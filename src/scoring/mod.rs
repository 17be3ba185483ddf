/// 5-pin scoring: frames, symbols, sessions and the scoring engine
pub mod best_ball;
pub mod bowler;
pub mod engine;
pub mod frame;
pub mod league;
pub mod modifiers;
pub mod persistence;
pub mod session;
pub mod symbols;

pub(crate) const LOG_TARGET: &str = "five_pin_lane::game";

pub use best_ball::Candidate;
pub use bowler::{Bowler, BowlerId};
pub use engine::{
    BallOutcome, ClickTarget, GameNotice, GameSetup, GameType, RackAction, Rejection, ScoringEngine, ThrowRecord,
};
pub use frame::{Frame, Slot, Throw, FRAME_COUNT, LAST_FRAME};
pub use league::{LeagueProfile, MoveMode, TotalFormat, TurnPolicy};
pub use modifiers::{ExtensionState, ModifierConfig, ModifierEvent, RuleModifier};
pub use persistence::{CompletedGame, FinalScore, GameSnapshot, GameStore};
pub use session::{Session, SessionExtension, SessionMode, SessionPhase, SessionTick};
pub use symbols::{classify, Combination, Symbol};
