/// Lane status state machine
///
/// Tracks whether the pinsetter is free, resolving a throw, or faulted.
/// A faulted lane rejects throws until an operator clears the fault.

use std::time::{Duration, Instant};

/// Status of the physical lane
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub enum LaneStatus {
    /// Waiting for a ball
    #[default]
    Idle,

    /// Scan, rack change and score update in progress
    Resolving { since: Instant },

    /// A resolution failed; operator action required
    Fault { reason: String, since: Instant },
}

impl LaneStatus {
    pub fn is_idle(&self) -> bool {
        matches!(self, LaneStatus::Idle)
    }

    pub fn is_resolving(&self) -> bool {
        matches!(self, LaneStatus::Resolving { .. })
    }

    pub fn is_faulted(&self) -> bool {
        matches!(self, LaneStatus::Fault { .. })
    }

    /// Time spent in the current resolution
    pub fn resolving_duration(&self) -> Option<Duration> {
        match self {
            LaneStatus::Resolving { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    pub fn description(&self) -> String {
        match self {
            LaneStatus::Idle => "Idle".to_string(),
            LaneStatus::Resolving { .. } => "Resolving...".to_string(),
            LaneStatus::Fault { reason, .. } => format!("Fault: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// A throw is already being resolved
    AlreadyResolving,

    /// Nothing is being resolved
    NotResolving,

    /// The lane is faulted
    Faulted,

    /// There is no fault to clear
    NotFaulted,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionError::AlreadyResolving => write!(f, "A throw is already being resolved"),
            TransitionError::NotResolving => write!(f, "No throw is being resolved"),
            TransitionError::Faulted => write!(f, "Lane is faulted"),
            TransitionError::NotFaulted => write!(f, "Lane has no fault to clear"),
        }
    }
}

impl std::error::Error for TransitionError {}

pub struct LaneStatusMachine {
    status: LaneStatus,
}

impl LaneStatusMachine {
    pub fn new() -> Self {
        Self {
            status: LaneStatus::Idle,
        }
    }

    pub fn status(&self) -> &LaneStatus {
        &self.status
    }

    /// Idle -> Resolving
    pub fn begin_resolution(&mut self) -> Result<(), TransitionError> {
        match self.status {
            LaneStatus::Idle => {
                self.status = LaneStatus::Resolving {
                    since: Instant::now(),
                };
                Ok(())
            }
            LaneStatus::Resolving { .. } => Err(TransitionError::AlreadyResolving),
            LaneStatus::Fault { .. } => Err(TransitionError::Faulted),
        }
    }

    /// Resolving -> Idle
    pub fn finish_resolution(&mut self) -> Result<(), TransitionError> {
        match self.status {
            LaneStatus::Resolving { .. } => {
                self.status = LaneStatus::Idle;
                Ok(())
            }
            _ => Err(TransitionError::NotResolving),
        }
    }

    /// Any -> Fault. A second fault keeps the first reason.
    pub fn fault(&mut self, reason: impl Into<String>) {
        if !self.status.is_faulted() {
            self.status = LaneStatus::Fault {
                reason: reason.into(),
                since: Instant::now(),
            };
        }
    }

    /// Fault -> Idle
    pub fn clear_fault(&mut self) -> Result<(), TransitionError> {
        match self.status {
            LaneStatus::Fault { .. } => {
                self.status = LaneStatus::Idle;
                Ok(())
            }
            _ => Err(TransitionError::NotFaulted),
        }
    }

    pub fn force_idle(&mut self) {
        self.status = LaneStatus::Idle;
    }
}

impl Default for LaneStatusMachine {
    fn default() -> Self {
        Self::new()
    }
}
