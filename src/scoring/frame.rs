/// Frames, throws and score computation
use serde::{Deserialize, Serialize};

use super::symbols::Symbol;
use crate::machine::PinState;

pub const FRAME_COUNT: usize = 10;
pub const LAST_FRAME: usize = FRAME_COUNT - 1;
pub const SLOTS_PER_FRAME: usize = 3;

/// One recorded ball.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Throw {
    pub pins_before: PinState,
    pub pins_after: PinState,
    pub score: u32,
    pub symbol: Symbol,
}

impl Throw {
    pub fn pins_knocked(&self) -> PinState {
        self.pins_after.newly_down_since(self.pins_before)
    }
}

/// A frame slot is either a live throw or a bonus value filled in from
/// later frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "slot", rename_all = "snake_case")]
pub enum Slot {
    #[default]
    Empty,
    Thrown(Throw),
    Bonus { score: u32 },
}

impl Slot {
    pub fn throw(&self) -> Option<&Throw> {
        match self {
            Slot::Thrown(throw) => Some(throw),
            _ => None,
        }
    }

    pub fn score(&self) -> Option<u32> {
        match self {
            Slot::Empty => None,
            Slot::Thrown(throw) => Some(throw.score),
            Slot::Bonus { score } => Some(*score),
        }
    }

    /// Scoreboard text for the slot.
    pub fn display(&self) -> String {
        match self {
            Slot::Empty => String::new(),
            Slot::Thrown(throw) => throw.symbol.text(),
            Slot::Bonus { score } => score.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Frame {
    pub slots: [Slot; SLOTS_PER_FRAME],
}

impl Frame {
    pub fn throws(&self) -> impl Iterator<Item = &Throw> {
        self.slots.iter().filter_map(Slot::throw)
    }

    pub fn first_throw(&self) -> Option<&Throw> {
        self.slots[0].throw()
    }

    pub fn is_started(&self) -> bool {
        self.first_throw().is_some()
    }

    pub fn is_strike(&self) -> bool {
        self.first_throw().map_or(false, |t| t.symbol == Symbol::Strike)
    }

    pub fn is_spare(&self) -> bool {
        !self.is_strike() && self.slots[1].throw().map_or(false, |t| t.symbol == Symbol::Spare)
    }

    /// Sum of every filled slot.
    pub fn raw_score(&self) -> u32 {
        self.slots.iter().filter_map(Slot::score).sum()
    }

    pub fn ball_scores(&self) -> Vec<u32> {
        self.throws().map(|t| t.score).collect()
    }

    pub fn symbols(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter(|slot| !matches!(slot, Slot::Empty))
            .map(Slot::display)
            .collect()
    }
}

/// Bonus slots a frame still needs: 2 for a strike, 1 for a spare.
fn bonus_slots(frames: &[Frame; FRAME_COUNT], index: usize) -> &'static [usize] {
    if index == LAST_FRAME {
        return &[];
    }
    let frame = &frames[index];
    if frame.is_strike() {
        &[1, 2]
    } else if frame.is_spare() {
        &[2]
    } else {
        &[]
    }
}

fn thrown_scores_after(frames: &[Frame; FRAME_COUNT], index: usize) -> impl Iterator<Item = u32> + '_ {
    frames[index + 1..].iter().flat_map(|f| f.throws().map(|t| t.score))
}

/// Fill empty bonus slots of strike and spare frames from later thrown balls.
pub fn fill_bonuses(frames: &mut [Frame; FRAME_COUNT]) {
    for index in 0..LAST_FRAME {
        let wanted = bonus_slots(frames, index);
        if wanted.iter().all(|slot| frames[index].slots[*slot] != Slot::Empty) {
            continue;
        }

        let following: Vec<u32> = thrown_scores_after(frames, index).take(wanted.len()).collect();
        for (slot, score) in wanted.iter().zip(following) {
            if frames[index].slots[*slot] == Slot::Empty {
                frames[index].slots[*slot] = Slot::Bonus { score };
            }
        }
    }
}

/// Score of a frame once it can be known.
fn frame_score(frames: &[Frame; FRAME_COUNT], index: usize) -> Option<u32> {
    let frame = &frames[index];
    if !frame.is_started() {
        return None;
    }
    let complete = bonus_slots(frames, index).iter().all(|slot| frame.slots[*slot] != Slot::Empty);
    complete.then(|| frame.raw_score())
}

/// Cumulative total per frame.
///
/// Stops at the first frame that has not started or whose bonus balls have
/// not been thrown yet.
pub fn running_totals(frames: &[Frame; FRAME_COUNT]) -> [Option<u32>; FRAME_COUNT] {
    let mut totals = [None; FRAME_COUNT];
    let mut cumulative = 0;
    for index in 0..FRAME_COUNT {
        match frame_score(frames, index) {
            Some(score) => {
                cumulative += score;
                totals[index] = Some(cumulative);
            }
            None => break,
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::PinState;
    use crate::scoring::symbols::classify;

    fn throw(before: &str, after: &str, ball: usize, tenth: bool) -> Slot {
        let before = PinState::from_pattern(before).unwrap();
        let after = PinState::from_pattern(after).unwrap();
        let knocked = after.newly_down_since(before);
        Slot::Thrown(Throw {
            pins_before: before,
            pins_after: after,
            score: knocked.value(),
            symbol: classify(ball, knocked, after, tenth),
        })
    }

    fn strike_frame() -> Frame {
        let mut frame = Frame::default();
        frame.slots[0] = throw("00000", "11111", 0, false);
        frame
    }

    #[test]
    fn test_strike_needs_two_thrown_balls() {
        let mut frames = [Frame::default(); FRAME_COUNT];
        frames[0] = strike_frame();
        fill_bonuses(&mut frames);
        assert_eq!(running_totals(&frames)[0], None);

        frames[1].slots[0] = throw("00000", "00100", 0, false);
        fill_bonuses(&mut frames);
        assert_eq!(frames[0].slots[1], Slot::Bonus { score: 5 });
        assert_eq!(running_totals(&frames)[0], None);

        frames[1].slots[1] = throw("00100", "10101", 1, false);
        fill_bonuses(&mut frames);
        assert_eq!(frames[0].slots[2], Slot::Bonus { score: 4 });
        let totals = running_totals(&frames);
        assert_eq!(totals[0], Some(24));
        assert_eq!(totals[1], Some(33));
    }

    #[test]
    fn test_bonus_skips_bonus_slots_of_later_frames() {
        let mut frames = [Frame::default(); FRAME_COUNT];
        frames[0] = strike_frame();
        frames[1] = strike_frame();
        frames[2].slots[0] = throw("00000", "01000", 0, false);
        fill_bonuses(&mut frames);

        // 15 (frame 1 strike) + 3 (frame 2 first ball), not frame 1's bonus.
        assert_eq!(frames[0].raw_score(), 33);
    }

    #[test]
    fn test_spare_bonus() {
        let mut frames = [Frame::default(); FRAME_COUNT];
        frames[0].slots[0] = throw("00000", "01110", 0, false);
        frames[0].slots[1] = throw("01110", "11111", 1, false);
        fill_bonuses(&mut frames);
        assert!(frames[0].is_spare());
        assert_eq!(running_totals(&frames)[0], None);

        frames[1].slots[0] = throw("00000", "00011", 0, false);
        fill_bonuses(&mut frames);
        assert_eq!(running_totals(&frames)[0], Some(20));
    }

    #[test]
    fn test_totals_are_idempotent() {
        let mut frames = [Frame::default(); FRAME_COUNT];
        frames[0] = strike_frame();
        frames[1].slots[0] = throw("00000", "11000", 0, false);
        frames[1].slots[1] = throw("11000", "11010", 1, false);

        fill_bonuses(&mut frames);
        let first = running_totals(&frames);
        let snapshot = frames;
        fill_bonuses(&mut frames);
        assert_eq!(running_totals(&frames), first);
        assert_eq!(frames, snapshot);
    }

    #[test]
    fn test_tenth_frame_counts_its_own_balls() {
        let mut frames = [Frame::default(); FRAME_COUNT];
        frames[LAST_FRAME].slots[0] = throw("00000", "11111", 0, true);
        frames[LAST_FRAME].slots[1] = throw("00000", "11111", 1, true);
        frames[LAST_FRAME].slots[2] = throw("00000", "11111", 2, true);
        assert_eq!(frames[LAST_FRAME].raw_score(), 45);
        assert_eq!(frames[LAST_FRAME].symbols(), vec!["X", "X", "X"]);
    }
}
