/// Pin machine module
///
/// Turns a ball detection into the authoritative pin-state vector:
///
/// ```text
/// detection ─> seed from standing pins ─> scan sensors (bounded window)
///                                              │
///          ┌───────────────┬───────────────────┤
///          ▼               ▼                   ▼
///     none knocked      all down            partial
///     (no actuation)   reset pulse     reset pulse ─> machine pin wait
///                                                     ─> apply breaks
/// ```

pub mod calibration;
pub mod controller;
pub mod pins;

// Re-export commonly used types
pub use calibration::{CalibrationBand, MachinePinCalibration};
pub use controller::{
    MachinePinWait, MachineTimings, PinMachineController, Resolution, ResetRequest, ThrowKind, ThrowOutcome,
};
pub use pins::{PinPosition, PinState, PIN_VALUES, RACK_VALUE};
