/// Simulated lane hardware
///
/// `SimRig` is a cloneable handle onto one shared simulated lane. Tests and
/// the `--simulate` binaries knock pins with [`SimRig::knock`] and inspect
/// the actuator log afterwards.
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{ActuatorBank, ActuatorLine, AnalogChannel, AnalogFrontEnd, BallInput, Level};
use crate::error::HardwareError;
use crate::machine::{PinPosition, PinState};

const DOWN_VOLTS: f32 = 4.8;
const IDLE_VOLTS: f32 = 0.2;

#[derive(Debug)]
struct RigState {
    /// Pins lying across their sensors
    fallen: PinState,
    /// Pins that will fall once the scan has started
    falling: PinState,
    reset_low: bool,
    reset_released_at: Option<Instant>,
    machine_pin_delay: Option<Duration>,
    failing_reads: u32,
    actuator_log: Vec<(ActuatorLine, Level)>,
    reads: u32,
}

#[derive(Debug, Clone)]
pub struct SimRig {
    state: Arc<Mutex<RigState>>,
}

impl SimRig {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RigState {
                fallen: PinState::all_standing(),
                falling: PinState::all_standing(),
                reset_low: false,
                reset_released_at: None,
                machine_pin_delay: Some(Duration::from_millis(5)),
                failing_reads: 0,
                actuator_log: Vec::new(),
                reads: 0,
            })),
        }
    }

    /// Pins that the next scan will see go down.
    pub fn knock(&self, pins: PinState) {
        let mut state = self.state.lock();
        state.falling = state.falling.union(pins);
    }

    /// Delay between reset release and the machine pin reading high.
    /// `None` means the machine pin never confirms.
    pub fn set_machine_pin_delay(&self, delay: Option<Duration>) {
        self.state.lock().machine_pin_delay = delay;
    }

    /// Make the next `count` reads fail.
    pub fn fail_next_reads(&self, count: u32) {
        self.state.lock().failing_reads = count;
    }

    pub fn fallen(&self) -> PinState {
        let state = self.state.lock();
        state.fallen.union(state.falling)
    }

    pub fn actuator_log(&self) -> Vec<(ActuatorLine, Level)> {
        self.state.lock().actuator_log.clone()
    }

    pub fn clear_actuator_log(&self) {
        self.state.lock().actuator_log.clear();
    }

    /// Number of reset pulses seen (low followed by high).
    pub fn reset_pulses(&self) -> usize {
        self.state
            .lock()
            .actuator_log
            .iter()
            .filter(|(line, level)| *line == ActuatorLine::Reset && *level == Level::High)
            .count()
    }

    pub fn read_count(&self) -> u32 {
        self.state.lock().reads
    }

    pub fn analog(&self) -> SimAnalog {
        SimAnalog { rig: self.clone() }
    }

    pub fn actuators(&self) -> SimActuators {
        SimActuators { rig: self.clone() }
    }
}

impl Default for SimRig {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SimAnalog {
    rig: SimRig,
}

impl AnalogFrontEnd for SimAnalog {
    fn read_voltage(&mut self, channel: AnalogChannel) -> Result<f32, HardwareError> {
        let mut state = self.rig.state.lock();
        state.reads += 1;
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(HardwareError::ReadFailed {
                what: format!("{channel:?}"),
                source: "simulated bus error".into(),
            });
        }

        match channel {
            AnalogChannel::Pin(position) => {
                state.fallen = state.fallen.union(state.falling);
                state.falling = PinState::all_standing();
                Ok(if state.fallen.is_down(position) { DOWN_VOLTS } else { IDLE_VOLTS })
            }
            AnalogChannel::MachinePin => {
                let confirmed = match (state.reset_released_at, state.machine_pin_delay) {
                    (Some(released), Some(delay)) => released.elapsed() >= delay,
                    _ => false,
                };
                Ok(if confirmed { DOWN_VOLTS } else { IDLE_VOLTS })
            }
        }
    }
}

pub struct SimActuators {
    rig: SimRig,
}

impl ActuatorBank for SimActuators {
    fn drive(&mut self, line: ActuatorLine, level: Level) -> Result<(), HardwareError> {
        let mut state = self.rig.state.lock();
        state.actuator_log.push((line, level));
        if line == ActuatorLine::Reset {
            match level {
                Level::Low => state.reset_low = true,
                Level::High if state.reset_low => {
                    // The arm sweeps the deck and re-spots every pin.
                    state.reset_low = false;
                    state.reset_released_at = Some(Instant::now());
                    state.fallen = PinState::all_standing();
                    state.falling = PinState::all_standing();
                }
                Level::High => {}
            }
        }
        Ok(())
    }
}

/// Ball input replaying a scripted sequence of levels; the last level
/// repeats once the script is exhausted.
#[derive(Debug, Clone)]
pub struct SimBallInput {
    levels: Arc<Mutex<VecDeque<Level>>>,
    last: Arc<Mutex<Level>>,
}

impl SimBallInput {
    pub fn new() -> Self {
        Self {
            levels: Arc::new(Mutex::new(VecDeque::new())),
            last: Arc::new(Mutex::new(Level::Low)),
        }
    }

    pub fn push(&self, level: Level) {
        self.levels.lock().push_back(level);
    }

    /// One ball passing the sensor: high then low.
    pub fn pulse(&self) {
        let mut levels = self.levels.lock();
        levels.push_back(Level::High);
        levels.push_back(Level::Low);
    }
}

impl Default for SimBallInput {
    fn default() -> Self {
        Self::new()
    }
}

impl BallInput for SimBallInput {
    fn read(&mut self) -> Result<Level, HardwareError> {
        let next = self.levels.lock().pop_front();
        let mut last = self.last.lock();
        if let Some(level) = next {
            *last = level;
        }
        Ok(*last)
    }
}

/// Free-running input that goes high for `width` once every `period`.
pub struct PulseInput {
    started: Instant,
    period: Duration,
    width: Duration,
}

impl PulseInput {
    pub fn new(period: Duration, width: Duration) -> Self {
        Self {
            started: Instant::now(),
            period: period.max(Duration::from_millis(1)),
            width,
        }
    }
}

impl BallInput for PulseInput {
    fn read(&mut self) -> Result<Level, HardwareError> {
        let phase = self.started.elapsed().as_micros() % self.period.as_micros();
        Ok(if phase < self.width.as_micros() { Level::High } else { Level::Low })
    }
}

/// Pin state with exactly `positions` down.
pub fn knocked(positions: &[PinPosition]) -> PinState {
    let mut pins = PinState::all_standing();
    for position in positions {
        pins.set_down(*position);
    }
    pins
}
