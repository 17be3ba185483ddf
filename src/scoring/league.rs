/// League play: handicaps, total formats and the turn-unit policy
use serde::{Deserialize, Serialize};

use super::bowler::Bowler;
use super::frame::FRAME_COUNT;
use crate::machine::RACK_VALUE;

/// Best case for one remaining frame: three strike balls.
const MAX_FRAME_SCORE: u32 = RACK_VALUE * 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LeagueProfile {
    pub average: u32,
    pub handicap: u32,
}

/// How running totals are shown on a league scoresheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalFormat {
    #[default]
    Raw,
    WithHandicap,
    /// `hdcp (raw)`
    HandicapFirst,
    /// `raw (hdcp)`
    RawFirst,
    /// `raw (max)`
    RawWithPotential,
    /// `hdcp (max)`
    HandicapWithPotential,
}

/// Highest total still reachable after `frame` if every later frame is perfect.
pub fn max_potential(bowler: &Bowler, frame: usize) -> u32 {
    let current = bowler.frame_totals.get(frame).copied().flatten().unwrap_or(0);
    let remaining = FRAME_COUNT.saturating_sub(frame + 1) as u32;
    current + remaining * MAX_FRAME_SCORE
}

/// Total cell text for `frame`, `None` while the frame cannot be scored yet.
pub fn total_display(bowler: &Bowler, frame: usize, format: TotalFormat) -> Option<String> {
    let raw = bowler.frame_totals.get(frame).copied().flatten()?;
    let with_handicap = raw + bowler.league.handicap;

    let text = match format {
        TotalFormat::Raw => raw.to_string(),
        TotalFormat::WithHandicap => with_handicap.to_string(),
        TotalFormat::HandicapFirst => format!("{with_handicap} ({raw})"),
        TotalFormat::RawFirst => format!("{raw} ({with_handicap})"),
        TotalFormat::RawWithPotential => format!("{raw} ({})", max_potential(bowler, frame)),
        TotalFormat::HandicapWithPotential => format!("{with_handicap} ({})", max_potential(bowler, frame)),
    };
    Some(text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveMode {
    /// Each bowler crosses to the paired lane on their own
    #[default]
    Bowler,
    /// The whole team crosses once every member finished the turn
    Team,
}

/// When the current bowler gives up the lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum TurnPolicy {
    Rotate {
        frames_per_turn: u32,
    },
    PairedLane {
        frames_per_turn: u32,
        paired_lane: u32,
        #[serde(default)]
        move_mode: MoveMode,
    },
}

impl Default for TurnPolicy {
    fn default() -> Self {
        TurnPolicy::Rotate { frames_per_turn: 1 }
    }
}

impl TurnPolicy {
    pub fn frames_per_turn(&self) -> u32 {
        match self {
            TurnPolicy::Rotate { frames_per_turn } | TurnPolicy::PairedLane { frames_per_turn, .. } => {
                (*frames_per_turn).max(1)
            }
        }
    }

    pub fn turn_complete(&self, bowler: &Bowler) -> bool {
        bowler.frames_this_turn >= self.frames_per_turn()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bowler_with_total(frame: usize, total: u32, handicap: u32) -> Bowler {
        let mut bowler = Bowler::new(1, "Ana").with_league(LeagueProfile { average: 180, handicap });
        bowler.frame_totals[frame] = Some(total);
        bowler
    }

    #[test]
    fn test_total_formats() {
        let bowler = bowler_with_total(4, 100, 25);
        let cases = [
            (TotalFormat::Raw, "100"),
            (TotalFormat::WithHandicap, "125"),
            (TotalFormat::HandicapFirst, "125 (100)"),
            (TotalFormat::RawFirst, "100 (125)"),
            (TotalFormat::RawWithPotential, "100 (325)"),
            (TotalFormat::HandicapWithPotential, "125 (325)"),
        ];
        for (format, expected) in cases {
            assert_eq!(total_display(&bowler, 4, format).as_deref(), Some(expected), "{format:?}");
        }
        assert_eq!(total_display(&bowler, 5, TotalFormat::Raw), None);
    }

    #[test]
    fn test_max_potential_in_last_frame() {
        let bowler = bowler_with_total(9, 300, 0);
        assert_eq!(max_potential(&bowler, 9), 300);
    }

    #[test]
    fn test_turn_policy() {
        let mut bowler = Bowler::new(1, "Ana");
        let policy = TurnPolicy::PairedLane { frames_per_turn: 2, paired_lane: 4, move_mode: MoveMode::Team };
        bowler.frames_this_turn = 1;
        assert!(!policy.turn_complete(&bowler));
        bowler.frames_this_turn = 2;
        assert!(policy.turn_complete(&bowler));

        let zero = TurnPolicy::Rotate { frames_per_turn: 0 };
        assert_eq!(zero.frames_per_turn(), 1);
    }

    #[test]
    fn test_turn_policy_config_shape() {
        let policy: TurnPolicy =
            serde_json::from_str(r#"{"policy":"paired_lane","frames_per_turn":1,"paired_lane":6}"#).unwrap();
        assert_eq!(policy, TurnPolicy::PairedLane { frames_per_turn: 1, paired_lane: 6, move_mode: MoveMode::Bowler });
    }
}
