/// Lane state management
///
/// The pinsetter's own status, separate from the scoring engine's game state.

pub mod lane_status;

pub use lane_status::{LaneStatus, LaneStatusMachine, TransitionError};
