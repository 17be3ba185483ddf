/// Session lifecycle: fixed game count or time-boxed play
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Reminders fire once per window inside this many minutes of the end.
const WARNING_HORIZON_MINUTES: u64 = 30;
const WARNING_WINDOW_MINUTES: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SessionMode {
    Games { total: u32 },
    Time { minutes: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Playing,
    BetweenGames,
    Complete,
    Expired,
}

/// Operator request to lengthen a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionExtension {
    AddGames(u32),
    AddMinutes(u32),
}

/// What a housekeeping tick decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTick {
    Idle,
    StartNextGame,
    Expired,
    /// Minutes left, announced once per window
    TimeWarning(u64),
}

#[derive(Debug, Clone)]
pub struct Session {
    mode: SessionMode,
    game_number: u32,
    phase: SessionPhase,
    started_at: Instant,
    next_game_at: Option<Instant>,
    last_warning: Option<u64>,
}

impl Session {
    pub fn new(mode: SessionMode, now: Instant) -> Self {
        Self {
            mode,
            game_number: 1,
            phase: SessionPhase::Playing,
            started_at: now,
            next_game_at: None,
            last_warning: None,
        }
    }

    /// Resume a recovered session at `game_number`.
    pub fn resumed(mode: SessionMode, game_number: u32, now: Instant) -> Self {
        Self {
            game_number: game_number.max(1),
            ..Self::new(mode, now)
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn game_number(&self) -> u32 {
        self.game_number
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_playing(&self) -> bool {
        self.phase == SessionPhase::Playing
    }

    pub fn is_ended(&self) -> bool {
        matches!(self.phase, SessionPhase::Complete | SessionPhase::Expired)
    }

    pub fn is_last_game(&self) -> bool {
        matches!(self.mode, SessionMode::Games { total } if self.game_number >= total)
    }

    /// Time left in a time-boxed session.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        match self.mode {
            SessionMode::Games { .. } => None,
            SessionMode::Time { minutes } => {
                let budget = Duration::from_secs(u64::from(minutes) * 60);
                Some(budget.saturating_sub(now.saturating_duration_since(self.started_at)))
            }
        }
    }

    pub fn time_up(&self, now: Instant) -> bool {
        self.remaining(now).map_or(false, |left| left.is_zero())
    }

    /// Time until the between-games timer starts the next game.
    pub fn next_game_in(&self, now: Instant) -> Option<Duration> {
        match (self.phase, self.next_game_at) {
            (SessionPhase::BetweenGames, Some(at)) => Some(at.saturating_duration_since(now)),
            _ => None,
        }
    }

    /// Settle the session after every bowler finished the current game.
    pub fn finish_game(&mut self, now: Instant, between_games: Duration) -> SessionPhase {
        self.phase = match self.mode {
            SessionMode::Games { total } if self.game_number >= total => SessionPhase::Complete,
            SessionMode::Time { .. } if self.time_up(now) => SessionPhase::Expired,
            _ => {
                self.next_game_at = Some(now + between_games);
                SessionPhase::BetweenGames
            }
        };
        self.phase
    }

    /// Begin the next game; only valid between games.
    pub fn start_next_game(&mut self) -> bool {
        if self.phase != SessionPhase::BetweenGames {
            return false;
        }
        self.game_number += 1;
        self.phase = SessionPhase::Playing;
        self.next_game_at = None;
        true
    }

    /// Lengthen the session. Returns true if an ended session was reopened.
    pub fn extend(&mut self, extension: SessionExtension, game_finished: bool, now: Instant) -> bool {
        let reopen = match (&mut self.mode, extension) {
            (SessionMode::Games { total }, SessionExtension::AddGames(games)) => {
                *total = total.saturating_add(games);
                self.phase == SessionPhase::Complete
            }
            (SessionMode::Time { minutes }, SessionExtension::AddMinutes(extra)) => {
                *minutes = minutes.saturating_add(extra);
                self.last_warning = None;
                self.phase == SessionPhase::Expired
            }
            _ => false,
        };

        if reopen {
            self.phase = if game_finished {
                self.next_game_at = Some(now);
                SessionPhase::BetweenGames
            } else {
                SessionPhase::Playing
            };
        }
        reopen
    }

    pub fn tick(&mut self, now: Instant) -> SessionTick {
        if self.is_ended() {
            return SessionTick::Idle;
        }

        // A game in progress always runs to completion.
        if self.phase == SessionPhase::BetweenGames && self.time_up(now) {
            self.phase = SessionPhase::Expired;
            self.next_game_at = None;
            return SessionTick::Expired;
        }

        if let Some(at) = self.next_game_at {
            if self.phase == SessionPhase::BetweenGames && now >= at {
                return SessionTick::StartNextGame;
            }
        }

        if let Some(left) = self.remaining(now) {
            let horizon = Duration::from_secs(WARNING_HORIZON_MINUTES * 60);
            if !left.is_zero() && left <= horizon {
                let window_secs = WARNING_WINDOW_MINUTES * 60;
                let window = left.as_secs().div_ceil(window_secs) * WARNING_WINDOW_MINUTES;
                if self.last_warning != Some(window) {
                    self.last_warning = Some(window);
                    return SessionTick::TimeWarning(left.as_secs() / 60);
                }
            }
        }

        SessionTick::Idle
    }

    /// Top bar text.
    pub fn info_display(&self, now: Instant) -> String {
        match self.mode {
            SessionMode::Games { total } => format!("Game {} of {}", self.game_number, total),
            SessionMode::Time { .. } => {
                let minutes = self.remaining(now).map_or(0, |left| left.as_secs() / 60);
                format!("Time: {minutes} min")
            }
        }
    }
}
