/// Five Pin Lane
///
/// Lane controller for 5-pin bowling: ball detection, pin machine control and
/// scoring for one lane.

pub mod config;
pub mod error;
pub mod hardware;
pub mod lane_link;
pub mod logging;
pub mod machine;
pub mod messaging;
pub mod scoring;
pub mod sensor;
pub mod state;
pub mod utils;

pub use config::LaneConfig;
pub use error::{AppResult, ConfigError, HardwareError, IpcError, PersistenceError, ScoringError};
pub use machine::{PinMachineController, PinState};
pub use scoring::ScoringEngine;
pub use sensor::{LaneHandle, SensorBridge};
