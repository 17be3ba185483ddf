/// Inter-lane link
///
/// The scoring engine reports frames and finished games to the venue server
/// and hands bowlers or whole teams to a paired lane through [`LaneLink`].
/// Every call is fire-and-forget; `false` means the lane keeps the bowler.
use serde::Serialize;

use crate::scoring::{Bowler, FinalScore};

/// Called once the receiving lane accepts (`true`) or refuses a bowler move.
pub type MoveConfirm = Box<dyn FnOnce(bool, String) + Send>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FramePayload {
    pub frame_num: usize,
    pub balls: Vec<u32>,
    pub symbols: Vec<String>,
    pub total: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GamePayload {
    pub game_id: String,
    pub game_type: String,
    pub game_number: u32,
    pub lane_id: u32,
    pub bowlers: Vec<FinalScore>,
    /// RFC 3339 local time of completion
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BowlerTransfer {
    pub from_lane: u32,
    pub bowler: Bowler,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamTransfer {
    pub from_lane: u32,
    pub bowlers: Vec<Bowler>,
}

pub trait LaneLink: Send {
    fn send_frame_data(&self, bowler: &str, frame_index: usize, frame: &FramePayload) -> bool;

    fn send_game_complete(&self, game: &GamePayload) -> bool;

    fn send_team_move(&self, team: &TeamTransfer, target_lane: u32) -> bool;

    fn send_bowler_move(&self, bowler: &BowlerTransfer, target_lane: u32, move_id: &str, on_confirm: MoveConfirm) -> bool;
}

/// Link for a lane with no venue server.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineLink;

impl LaneLink for OfflineLink {
    fn send_frame_data(&self, bowler: &str, frame_index: usize, _frame: &FramePayload) -> bool {
        tracing::trace!("Offline, frame {} for {} not sent", frame_index + 1, bowler);
        false
    }

    fn send_game_complete(&self, game: &GamePayload) -> bool {
        tracing::debug!("Offline, game {} result not sent", game.game_id);
        false
    }

    fn send_team_move(&self, _team: &TeamTransfer, target_lane: u32) -> bool {
        tracing::warn!("Offline, team stays instead of moving to lane {}", target_lane);
        false
    }

    fn send_bowler_move(&self, bowler: &BowlerTransfer, target_lane: u32, _move_id: &str, _on_confirm: MoveConfirm) -> bool {
        tracing::warn!(
            "Offline, {} stays instead of moving to lane {}",
            bowler.bowler.name,
            target_lane
        );
        false
    }
}
