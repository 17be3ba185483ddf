use serde::{Deserialize, Serialize};

use super::frame::{fill_bonuses, running_totals, Frame, Slot, Throw, FRAME_COUNT, LAST_FRAME, SLOTS_PER_FRAME};
use super::league::LeagueProfile;
use super::modifiers::ExtensionState;
use crate::error::ScoringError;
use crate::machine::PinState;

/// Stable identity of a roster entry, independent of rotation order.
pub type BowlerId = u32;

/// One rotation entry: a single bowler, or a best-ball pair sharing a scoresheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bowler {
    pub id: BowlerId,
    pub name: String,

    /// Best-ball team members, in throwing order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,

    pub frames: [Frame; FRAME_COUNT],
    pub frame_totals: [Option<u32>; FRAME_COUNT],
    pub total_score: u32,

    /// `FRAME_COUNT` once the game is finished
    pub current_frame: usize,
    pub current_ball: usize,

    /// Pins down on the current rack
    pub pins: PinState,

    #[serde(default)]
    pub extension: ExtensionState,

    #[serde(default)]
    pub league: LeagueProfile,

    /// Frames played since the last paired-lane move
    #[serde(default)]
    pub frames_this_turn: u32,

    /// Team mode: done with this turn, waiting for the rest of the team
    #[serde(default)]
    pub waiting_for_swap: bool,
}

impl Bowler {
    pub fn new(id: BowlerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            members: Vec::new(),
            frames: [Frame::default(); FRAME_COUNT],
            frame_totals: [None; FRAME_COUNT],
            total_score: 0,
            current_frame: 0,
            current_ball: 0,
            pins: PinState::all_standing(),
            extension: ExtensionState::default(),
            league: LeagueProfile::default(),
            frames_this_turn: 0,
            waiting_for_swap: false,
        }
    }

    pub fn pair(id: BowlerId, name: impl Into<String>, first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            members: vec![first.into(), second.into()],
            ..Self::new(id, name)
        }
    }

    pub fn with_league(mut self, league: LeagueProfile) -> Self {
        self.league = league;
        self
    }

    pub fn is_finished(&self) -> bool {
        self.current_frame >= FRAME_COUNT
    }

    pub fn is_tenth(&self) -> bool {
        self.current_frame == LAST_FRAME
    }

    pub fn is_pair(&self) -> bool {
        self.members.len() >= 2
    }

    /// Frame being bowled, `None` once finished.
    pub fn frame(&self) -> Option<&Frame> {
        self.frames.get(self.current_frame)
    }

    /// Write a throw into the next slot of the current frame and move the rack on.
    pub fn record(&mut self, throw: Throw) -> Result<(), ScoringError> {
        if self.is_finished() {
            return Err(ScoringError::BowlerFinished(self.name.clone()));
        }
        if self.current_ball >= SLOTS_PER_FRAME {
            return Err(ScoringError::BowlerFinished(self.name.clone()));
        }
        self.frames[self.current_frame].slots[self.current_ball] = Slot::Thrown(throw);
        self.pins = throw.pins_after;
        self.current_ball += 1;
        Ok(())
    }

    /// Fresh rack, same frame (10th frame marks).
    pub fn respot(&mut self) {
        self.pins = PinState::all_standing();
    }

    pub fn advance_frame(&mut self) {
        self.current_frame += 1;
        self.current_ball = 0;
        self.frames_this_turn += 1;
        self.respot();
    }

    /// Back-fill bonuses and recompute running totals.
    pub fn refresh_totals(&mut self) {
        fill_bonuses(&mut self.frames);
        self.frame_totals = running_totals(&self.frames);
        self.total_score = self.frame_totals.iter().flatten().last().copied().unwrap_or(0);
    }

    /// Most recent frame with a known total.
    pub fn last_scored_frame(&self) -> Option<usize> {
        self.frame_totals.iter().rposition(Option::is_some)
    }

    pub fn reset_for_new_game(&mut self) {
        self.frames = [Frame::default(); FRAME_COUNT];
        self.frame_totals = [None; FRAME_COUNT];
        self.total_score = 0;
        self.current_frame = 0;
        self.current_ball = 0;
        self.pins = PinState::all_standing();
        self.frames_this_turn = 0;
        self.waiting_for_swap = false;
    }
}
