/// Hardware abstraction
///
/// The sensor daemon and the pin machine controller only talk to the lane
/// through the traits in this module:
///
/// ```text
/// ┌───────────────┐  BallInput      ┌──────────────┐
/// │ ball sensor   │ ──────────────> │ SensorDaemon │
/// └───────────────┘                 └──────────────┘
/// ┌───────────────┐  AnalogFrontEnd ┌──────────────────────┐
/// │ ADS1115 x2    │ ──────────────> │ PinMachineController │
/// └───────────────┘                 └──────────────────────┘
/// ┌───────────────┐  ActuatorBank             │
/// │ reset + breaks│ <─────────────────────────┘
/// └───────────────┘
/// ```
///
/// `sim` backs every test and the `--simulate` mode of both binaries.
/// `rpi` is the Raspberry Pi backend, compiled with the `hardware` feature.

pub mod ads1115;
pub mod sim;

#[cfg(feature = "hardware")]
pub mod rpi;

use std::thread;
use std::time::Duration;

use crate::error::HardwareError;
use crate::machine::PinPosition;

pub use ads1115::{AdcFrontEnd, Ads1115};
pub use sim::{PulseInput, SimBallInput, SimRig};

/// Logic level of a digital line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

/// Binary ball-presence input.
pub trait BallInput: Send {
    fn read(&mut self) -> Result<Level, HardwareError>;
}

/// Analog inputs read by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalogChannel {
    Pin(PinPosition),
    /// Confirms the setting arm completed its cycle
    MachinePin,
}

pub trait AnalogFrontEnd: Send {
    fn read_voltage(&mut self, channel: AnalogChannel) -> Result<f32, HardwareError>;
}

/// Output lines driven by the controller. Idle is high.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorLine {
    Break(PinPosition),
    Reset,
}

pub trait ActuatorBank: Send {
    fn drive(&mut self, line: ActuatorLine, level: Level) -> Result<(), HardwareError>;

    /// Return every break line to idle.
    fn release_breaks(&mut self) -> Result<(), HardwareError> {
        for position in PinPosition::ALL {
            self.drive(ActuatorLine::Break(position), Level::High)?;
        }
        Ok(())
    }
}

/// Run `init` up to `attempts` times, sleeping `backoff` between failures.
///
/// The last failure is kept as the source of `InitExhausted`.
pub fn init_with_retry<T, E, F>(attempts: u32, backoff: Duration, mut init: F) -> Result<T, HardwareError>
where
    F: FnMut(u32) -> Result<T, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    let attempts = attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match init(attempt) {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(target: "five_pin_lane::machine", "Analog front end ready after {attempt} attempts");
                }
                return Ok(value);
            }
            Err(err) => {
                tracing::warn!(target: "five_pin_lane::machine", "Analog init attempt {attempt}/{attempts} failed: {err}");
                last_error = Some(err);
                if attempt < attempts {
                    thread::sleep(backoff);
                }
            }
        }
    }

    Err(HardwareError::InitExhausted {
        attempts,
        source: match last_error {
            Some(err) => Box::new(err) as Box<dyn std::error::Error + Send + Sync>,
            None => "no attempt made".into(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_retry_succeeds_on_later_attempt() {
        let mut calls = 0;
        let value = init_with_retry(5, Duration::from_millis(1), |attempt| {
            calls += 1;
            if attempt < 3 {
                Err(io::Error::new(io::ErrorKind::Other, "nack"))
            } else {
                Ok(attempt)
            }
        })
        .unwrap();
        assert_eq!(value, 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_retry_exhaustion_is_fatal() {
        let mut calls = 0;
        let result: Result<(), _> = init_with_retry(5, Duration::from_millis(1), |_| {
            calls += 1;
            Err(io::Error::new(io::ErrorKind::Other, "bus busy"))
        });
        assert_eq!(calls, 5);
        match result {
            Err(HardwareError::InitExhausted { attempts, .. }) => assert_eq!(attempts, 5),
            other => panic!("expected InitExhausted, got {other:?}"),
        }
    }
}
