/// Best-ball pairs
///
/// Both members throw each ball at the same rack. A mark by either member is
/// kept straight away; otherwise the lane waits until one of the two results
/// is picked.
use serde::{Deserialize, Serialize};

use super::frame::Throw;
use super::symbols::Symbol;

/// Members in a best-ball pair.
pub const PAIR_SIZE: usize = 2;

/// One member's result for the ball being decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub member: String,
    pub throw: Throw,
}

/// Strike symbol, or a cleared rack after the first ball.
pub fn is_mark(throw: &Throw, ball: usize) -> bool {
    throw.symbol == Symbol::Strike || (ball > 0 && throw.pins_after.is_all_down())
}

/// Results collected for the current ball of the team that is up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestBallRound {
    candidates: Vec<Candidate>,
}

impl BestBallRound {
    /// 0-based index of the member throwing next.
    pub fn next_member(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_awaiting_selection(&self) -> bool {
        self.candidates.len() >= PAIR_SIZE
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn push(&mut self, candidate: Candidate) {
        if !self.is_awaiting_selection() {
            self.candidates.push(candidate);
        }
    }

    /// Take the 1-based `choice` and clear the round.
    pub fn select(&mut self, choice: usize) -> Option<Candidate> {
        if !self.is_awaiting_selection() || choice == 0 || choice > self.candidates.len() {
            return None;
        }
        let picked = self.candidates.swap_remove(choice - 1);
        self.candidates.clear();
        Some(picked)
    }

    pub fn clear(&mut self) {
        self.candidates.clear();
    }
}
