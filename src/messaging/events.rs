/// Event types for the lane
///
/// Events represent things that have happened (past tense).
/// They are broadcast to all subscribers of the lane [`EventBus`](super::EventBus).
use serde_json::{Map, Value};
use std::time::{Duration, Instant};

use crate::machine::PinState;
use crate::scoring::{GameNotice, Rejection, ThrowRecord};
use crate::state::LaneStatus;

/// Lane events
#[derive(Debug, Clone)]
pub enum LaneEvent {
    /// The daemon reported a ball
    BallDetected { timestamp: Instant },

    /// A ball arrived while the game could not take it
    ThrowIgnored { reason: Rejection },

    /// The controller settled the rack after a ball
    ThrowResolved {
        pins: PinState,
        knocked: PinState,
        scan_time: Duration,
        cycle_time: Duration,
    },

    /// The engine recorded a ball
    ThrowScored { record: ThrowRecord },

    /// A manual reset cut a resolution short
    ThrowPreempted,

    /// The rack was reset or rebuilt
    RackChanged { pins: PinState, manual: bool },

    /// Pin positions observed outside the lane controller
    PinSetReported { fields: Map<String, Value> },

    /// Lane status changed
    StatusChanged { old: LaneStatus, new: LaneStatus },

    /// Something the scoring engine announced
    Game(GameNotice),

    /// Sensor transport connected or dropped
    SensorLink { connected: bool },

    /// An error occurred
    ErrorOccurred { message: String, context: String },

    /// Lane is shutting down
    Shutdown,
}

impl LaneEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            LaneEvent::BallDetected { .. } => "Ball detected".to_string(),
            LaneEvent::ThrowIgnored { reason } => format!("Ball ignored: {reason}"),
            LaneEvent::ThrowResolved { pins, knocked, .. } => {
                format!("Throw resolved: {} down ({} this ball)", pins, knocked.down_count())
            }
            LaneEvent::ThrowScored { record } => format!(
                "{} frame {} ball {}: {}",
                record.bowler,
                record.frame + 1,
                record.ball + 1,
                record.throw.symbol
            ),
            LaneEvent::ThrowPreempted => "Throw preempted by manual reset".to_string(),
            LaneEvent::RackChanged { pins, manual } => {
                if *manual {
                    "Manual reset".to_string()
                } else {
                    format!("Rack set to {pins}")
                }
            }
            LaneEvent::PinSetReported { fields } => format!("Pin set reported ({} fields)", fields.len()),
            LaneEvent::StatusChanged { new, .. } => format!("Lane status: {}", new.description()),
            LaneEvent::Game(notice) => notice_description(notice),
            LaneEvent::SensorLink { connected } => {
                if *connected {
                    "Sensor connected".to_string()
                } else {
                    "Sensor disconnected".to_string()
                }
            }
            LaneEvent::ErrorOccurred { message, .. } => format!("Error: {message}"),
            LaneEvent::Shutdown => "Shutting down".to_string(),
        }
    }
}

fn notice_description(notice: &GameNotice) -> String {
    match notice {
        GameNotice::FrameCompleted { bowler, frame, total } => match total {
            Some(total) => format!("{bowler} finished frame {} ({total})", frame + 1),
            None => format!("{bowler} finished frame {}", frame + 1),
        },
        GameNotice::BowlerFinished { bowler, total } => format!("{bowler} finished with {total}"),
        GameNotice::GameCompleted { game_number, .. } => format!("Game {game_number} complete"),
        GameNotice::NextGameStarted { game_number } => format!("Game {game_number} started"),
        GameNotice::SessionEnded(phase) => format!("Session ended: {phase:?}"),
        GameNotice::SessionReopened => "Session reopened".to_string(),
        GameNotice::TimeWarning { minutes } => format!("{minutes} minutes left"),
        GameNotice::BowlerLeft { bowler, lane } => format!("{bowler} moved to lane {lane}"),
        GameNotice::BowlerReturned { bowler } => format!("{bowler} returned"),
        GameNotice::BowlerArrived { bowler } => format!("{bowler} arrived"),
        GameNotice::TeamLeft { lane } => format!("Team moved to lane {lane}"),
        GameNotice::Modifier(event) => event.description(),
    }
}
