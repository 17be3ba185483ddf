/// Lane messaging
///
/// - **Wire**: the newline-delimited JSON protocol between the sensor daemon
///   and the lane controller, plus the suspend/resume control signal
/// - **Events**: things that happened on the lane (past tense, broadcast)
/// - **Commands**: operator and UI requests (imperative, executed by the bridge)
///
/// ```text
/// ┌────────┐  SensorMessage  ┌──────────────┐   LaneEvent   ┌───────────┐
/// │ daemon │ ──────────────> │ SensorBridge │ ────────────> │ Event Bus │
/// └────────┘ <────────────── └──────────────┘               └───────────┘
///             ControlSignal         ^
///                                   │ LaneCommand
///                             ┌────────────┐
///                             │ LaneHandle │
///                             └────────────┘
/// ```

pub mod bus;
pub mod commands;
pub mod events;
pub mod wire;

pub use bus::{EventBus, SubscriberId};
pub use commands::LaneCommand;
pub use events::LaneEvent;
pub use wire::{ControlSignal, DaemonCommand, SensorMessage};
