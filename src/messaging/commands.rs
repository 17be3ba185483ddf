/// Command types for the lane
///
/// Commands represent requests to perform actions (imperative).
/// They are executed by the sensor bridge, the single writer of game state.
use crate::scoring::{Bowler, ClickTarget, SessionExtension};

/// Operator and UI commands
#[derive(Debug, Clone)]
pub enum LaneCommand {
    /// Reset the rack by hand, preempting any throw in flight
    ManualReset,

    /// Pass the turn to the next bowler
    SkipBowler,

    /// Toggle the hold flag
    ToggleHold,

    /// Clear a machine fault
    ClearFault,

    /// Start the next game without waiting for the timer
    StartNextGame,

    /// Touch on the scoring screen
    Click(ClickTarget),

    /// Commit a best-ball candidate (1-based)
    SelectCandidate(usize),

    /// Spend a free strike for the bowler at this roster index
    UseFreeStrike { bowler_index: usize },

    /// Add games or minutes to the session
    ExtendSession(SessionExtension),

    /// A bowler handed over by a paired lane
    ReceiveBowler(Box<Bowler>),

    /// A team handed over by a paired lane
    ReceiveTeam(Vec<Bowler>),

    /// Stop the bridge
    Shutdown,
}

impl LaneCommand {
    /// Get a human-readable description of the command
    pub fn description(&self) -> String {
        match self {
            LaneCommand::ManualReset => "Manual reset".to_string(),
            LaneCommand::SkipBowler => "Skip bowler".to_string(),
            LaneCommand::ToggleHold => "Toggle hold".to_string(),
            LaneCommand::ClearFault => "Clear fault".to_string(),
            LaneCommand::StartNextGame => "Start next game".to_string(),
            LaneCommand::Click(target) => format!("Click: {target:?}"),
            LaneCommand::SelectCandidate(choice) => format!("Select candidate {choice}"),
            LaneCommand::UseFreeStrike { bowler_index } => format!("Free strike for bowler {}", bowler_index + 1),
            LaneCommand::ExtendSession(extension) => format!("Extend session: {extension:?}"),
            LaneCommand::ReceiveBowler(bowler) => format!("Receive bowler: {}", bowler.name),
            LaneCommand::ReceiveTeam(bowlers) => format!("Receive team of {}", bowlers.len()),
            LaneCommand::Shutdown => "Shut down lane".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_description() {
        let cmd = LaneCommand::ManualReset;
        assert_eq!(cmd.description(), "Manual reset");

        let cmd = LaneCommand::UseFreeStrike { bowler_index: 0 };
        assert_eq!(cmd.description(), "Free strike for bowler 1");

        let cmd = LaneCommand::ExtendSession(SessionExtension::AddGames(2));
        assert_eq!(cmd.description(), "Extend session: AddGames(2)");
    }
}
