use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::calibration::{CalibrationBand, MachinePinCalibration};
use super::pins::{PinPosition, PinState};
use crate::error::HardwareError;
use crate::hardware::{ActuatorBank, ActuatorLine, AnalogChannel, AnalogFrontEnd, Level};

const LOG_TARGET: &str = "five_pin_lane::machine";

/// Timing and threshold settings for throw resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineTimings {
    /// Sensor visit order within one scan round
    pub scan_order: [PinPosition; 5],
    /// Total time a throw may spend scanning, in milliseconds
    pub detection_window_ms: u64,
    /// Delay after each sensor read
    pub settle_ms: u64,
    /// Delay between scan rounds
    pub round_delay_ms: u64,
    /// A pin reading at or above this voltage is down
    pub voltage_threshold: f32,
    /// Reset line low time
    pub reset_pulse_ms: u64,
    /// Break line asserted time
    pub break_pulse_ms: u64,
    /// Machine pin poll interval
    pub machine_pin_poll_ms: u64,
    /// Adaptive machine-pin wait band
    pub calibration: CalibrationBand,
}

impl Default for MachineTimings {
    fn default() -> Self {
        Self {
            scan_order: [
                PinPosition::RightTwo,
                PinPosition::CenterFive,
                PinPosition::LeftThree,
                PinPosition::RightThree,
                PinPosition::LeftTwo,
            ],
            detection_window_ms: 3000,
            settle_ms: 20,
            round_delay_ms: 500,
            voltage_threshold: 4.0,
            reset_pulse_ms: 350,
            break_pulse_ms: 100,
            machine_pin_poll_ms: 20,
            calibration: CalibrationBand::default(),
        }
    }
}

/// Shared flag a manual reset raises to cut an in-flight scan short.
#[derive(Debug, Clone, Default)]
pub struct ResetRequest(Arc<AtomicBool>);

impl ResetRequest {
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MachinePinWait {
    Confirmed(Duration),
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThrowKind {
    NoPinsKnocked,
    AllDown,
    Partial { machine_pin: MachinePinWait },
}

/// Result of one resolved throw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrowOutcome {
    /// Pin state for scoring (pins down after the throw)
    pub pins: PinState,
    /// Pins that went down during this throw
    pub knocked: PinState,
    pub kind: ThrowKind,
    pub scan_time: Duration,
    pub cycle_time: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    Completed(ThrowOutcome),
    /// A manual reset arrived while the throw was in flight
    Preempted,
}

/// Owns the authoritative pin state and drives the reset/break sequence.
pub struct PinMachineController {
    analog: Box<dyn AnalogFrontEnd>,
    actuators: Box<dyn ActuatorBank>,
    timings: MachineTimings,
    pins: PinState,
    calibration: MachinePinCalibration,
    reset_request: ResetRequest,
}

impl PinMachineController {
    pub fn new(analog: Box<dyn AnalogFrontEnd>, actuators: Box<dyn ActuatorBank>, timings: MachineTimings) -> Self {
        let calibration = MachinePinCalibration::new(timings.calibration);
        Self {
            analog,
            actuators,
            timings,
            pins: PinState::all_standing(),
            calibration,
            reset_request: ResetRequest::default(),
        }
    }

    /// Pins currently down on the deck.
    pub fn pins(&self) -> PinState {
        self.pins
    }

    pub fn calibration(&self) -> MachinePinCalibration {
        self.calibration
    }

    pub fn reset_request(&self) -> ResetRequest {
        self.reset_request.clone()
    }

    /// Resolve the throw that was just detected.
    pub fn resolve_throw(&mut self) -> Result<Resolution, HardwareError> {
        let started = Instant::now();
        let seeded = self.pins;

        let Some(control) = self.scan(seeded) else {
            return Ok(Resolution::Preempted);
        };
        let scan_time = started.elapsed();
        let knocked = control.newly_down_since(seeded);

        let kind = if knocked.is_all_standing() {
            debug!(target: LOG_TARGET, "No pins knocked, rack unchanged");
            ThrowKind::NoPinsKnocked
        } else if control.is_all_down() {
            self.reset_pulse()?;
            self.pins = PinState::all_standing();
            info!(target: LOG_TARGET, "All pins down, rack reset");
            ThrowKind::AllDown
        } else {
            self.reset_pulse()?;
            let (wait, next) = self.wait_for_machine_pin(self.calibration);
            self.calibration = next;
            let Some(wait) = wait else {
                return Ok(Resolution::Preempted);
            };
            if wait == MachinePinWait::TimedOut {
                warn!(target: LOG_TARGET, "Machine pin not seen, manually activating breaks");
            }
            self.apply_breaks(control)?;
            self.pins = control;
            ThrowKind::Partial { machine_pin: wait }
        };

        Ok(Resolution::Completed(ThrowOutcome {
            pins: control,
            knocked,
            kind,
            scan_time,
            cycle_time: started.elapsed(),
        }))
    }

    /// Force a reset cycle and mark every pin standing, bypassing the scan.
    pub fn manual_reset(&mut self) -> Result<(), HardwareError> {
        self.reset_request.clear();
        self.reset_pulse()?;
        self.actuators.release_breaks()?;
        self.pins = PinState::all_standing();
        info!(target: LOG_TARGET, "Manual reset");
        Ok(())
    }

    /// Rebuild the rack with exactly `target` down.
    pub fn restore_rack(&mut self, target: PinState) -> Result<(), HardwareError> {
        if target == self.pins {
            return Ok(());
        }
        self.reset_pulse()?;
        if target.is_all_standing() {
            self.pins = target;
            return Ok(());
        }
        let (_, next) = self.wait_for_machine_pin(self.calibration);
        self.calibration = next;
        self.apply_breaks(target)?;
        self.pins = target;
        debug!(target: LOG_TARGET, "Rack restored to {target}");
        Ok(())
    }

    /// Scan all standing pins until the window closes. `None` if preempted.
    fn scan(&mut self, seeded: PinState) -> Option<PinState> {
        let window = Duration::from_millis(self.timings.detection_window_ms);
        let settle = Duration::from_millis(self.timings.settle_ms);
        let round_delay = Duration::from_millis(self.timings.round_delay_ms);
        let started = Instant::now();
        let mut control = seeded;

        while started.elapsed() < window {
            for position in self.timings.scan_order {
                if self.reset_request.is_requested() {
                    info!(target: LOG_TARGET, "Scan preempted by manual reset");
                    return None;
                }
                if control.is_down(position) {
                    continue;
                }
                match self.analog.read_voltage(AnalogChannel::Pin(position)) {
                    Ok(volts) if volts >= self.timings.voltage_threshold => {
                        debug!(target: LOG_TARGET, "{position} down ({volts:.2} V)");
                        control.set_down(position);
                    }
                    Ok(_) => {}
                    Err(err) => warn!(target: LOG_TARGET, "Sensor read failed, continuing scan: {err}"),
                }
                thread::sleep(settle);
            }

            if control.is_all_down() {
                break;
            }
            let remaining = window.saturating_sub(started.elapsed());
            thread::sleep(round_delay.min(remaining));
        }

        Some(control)
    }

    fn reset_pulse(&mut self) -> Result<(), HardwareError> {
        self.actuators.drive(ActuatorLine::Reset, Level::Low)?;
        thread::sleep(Duration::from_millis(self.timings.reset_pulse_ms));
        self.actuators.drive(ActuatorLine::Reset, Level::High)
    }

    /// Poll the machine pin for at most the calibrated window.
    ///
    /// Returns the wait result (`None` if preempted) and the calibration for
    /// the next throw.
    fn wait_for_machine_pin(&mut self, calibration: MachinePinCalibration) -> (Option<MachinePinWait>, MachinePinCalibration) {
        let window = calibration.window();
        let poll = Duration::from_millis(self.timings.machine_pin_poll_ms);
        let started = Instant::now();

        while started.elapsed() < window {
            if self.reset_request.is_requested() {
                return (None, calibration);
            }
            match self.analog.read_voltage(AnalogChannel::MachinePin) {
                Ok(volts) if volts >= self.timings.voltage_threshold => {
                    let elapsed = started.elapsed();
                    let next = calibration.confirmed_after(elapsed);
                    debug!(
                        target: LOG_TARGET,
                        "Machine pin after {} ms, next window {} ms",
                        elapsed.as_millis(),
                        next.window().as_millis()
                    );
                    return (Some(MachinePinWait::Confirmed(elapsed)), next);
                }
                Ok(_) => {}
                Err(err) => warn!(target: LOG_TARGET, "Machine pin read failed: {err}"),
            }
            thread::sleep(poll);
        }

        (Some(MachinePinWait::TimedOut), calibration.timed_out())
    }

    /// Assert the break of every pin still standing in `control`, then
    /// release all breaks together.
    fn apply_breaks(&mut self, control: PinState) -> Result<(), HardwareError> {
        for position in control.standing_positions() {
            self.actuators.drive(ActuatorLine::Break(position), Level::Low)?;
        }
        thread::sleep(Duration::from_millis(self.timings.break_pulse_ms));
        self.actuators.release_breaks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::sim::{knocked, SimRig};

    fn fast_timings() -> MachineTimings {
        MachineTimings {
            detection_window_ms: 30,
            settle_ms: 0,
            round_delay_ms: 2,
            reset_pulse_ms: 1,
            break_pulse_ms: 1,
            machine_pin_poll_ms: 1,
            calibration: CalibrationBand {
                initial_ms: 40,
                min_ms: 20,
                max_ms: 60,
                fallback_ms: 30,
                margin_ms: 1,
            },
            ..MachineTimings::default()
        }
    }

    fn controller(rig: &SimRig) -> PinMachineController {
        PinMachineController::new(Box::new(rig.analog()), Box::new(rig.actuators()), fast_timings())
    }

    fn completed(resolution: Resolution) -> ThrowOutcome {
        match resolution {
            Resolution::Completed(outcome) => outcome,
            Resolution::Preempted => panic!("throw was preempted"),
        }
    }

    #[test]
    fn test_no_pins_knocked_leaves_rack_alone() {
        let rig = SimRig::new();
        let mut controller = controller(&rig);

        let outcome = completed(controller.resolve_throw().unwrap());
        assert_eq!(outcome.kind, ThrowKind::NoPinsKnocked);
        assert!(outcome.pins.is_all_standing());
        assert!(rig.actuator_log().is_empty());
    }

    #[test]
    fn test_all_down_resets_without_breaks() {
        let rig = SimRig::new();
        let mut controller = controller(&rig);
        rig.knock(PinState::all_down());

        let outcome = completed(controller.resolve_throw().unwrap());
        assert_eq!(outcome.kind, ThrowKind::AllDown);
        assert!(outcome.pins.is_all_down());
        assert!(controller.pins().is_all_standing());
        assert_eq!(rig.reset_pulses(), 1);
        assert!(!rig
            .actuator_log()
            .iter()
            .any(|(line, level)| matches!(line, ActuatorLine::Break(_)) && *level == Level::Low));
    }

    #[test]
    fn test_partial_throw_breaks_standing_pins() {
        let rig = SimRig::new();
        rig.set_machine_pin_delay(Some(Duration::from_millis(3)));
        let mut controller = controller(&rig);
        rig.knock(knocked(&[PinPosition::LeftTwo, PinPosition::LeftThree]));

        let outcome = completed(controller.resolve_throw().unwrap());
        assert_eq!(outcome.pins.pattern(), "11000");
        assert!(matches!(
            outcome.kind,
            ThrowKind::Partial { machine_pin: MachinePinWait::Confirmed(_) }
        ));
        assert_eq!(controller.pins().pattern(), "11000");

        let asserted: Vec<_> = rig
            .actuator_log()
            .into_iter()
            .filter_map(|(line, level)| match (line, level) {
                (ActuatorLine::Break(position), Level::Low) => Some(position),
                _ => None,
            })
            .collect();
        assert_eq!(
            asserted,
            vec![PinPosition::CenterFive, PinPosition::RightThree, PinPosition::RightTwo]
        );
    }

    #[test]
    fn test_calibration_follows_machine_cycle() {
        let rig = SimRig::new();
        rig.set_machine_pin_delay(Some(Duration::from_millis(25)));
        let mut controller = controller(&rig);
        rig.knock(knocked(&[PinPosition::CenterFive]));

        completed(controller.resolve_throw().unwrap());
        let window = controller.calibration().window();
        assert!(window >= Duration::from_millis(26), "window {window:?}");
        assert!(window < Duration::from_millis(40), "window {window:?}");
    }

    #[test]
    fn test_machine_pin_timeout_still_applies_breaks() {
        let rig = SimRig::new();
        rig.set_machine_pin_delay(None);
        let mut controller = controller(&rig);
        rig.knock(knocked(&[PinPosition::CenterFive]));

        let outcome = completed(controller.resolve_throw().unwrap());
        assert_eq!(
            outcome.kind,
            ThrowKind::Partial { machine_pin: MachinePinWait::TimedOut }
        );
        assert!(rig
            .actuator_log()
            .contains(&(ActuatorLine::Break(PinPosition::LeftTwo), Level::Low)));
    }

    #[test]
    fn test_read_errors_do_not_abort_scan() {
        let rig = SimRig::new();
        let mut controller = controller(&rig);
        rig.knock(PinState::all_down());
        rig.fail_next_reads(3);

        let outcome = completed(controller.resolve_throw().unwrap());
        assert!(outcome.pins.is_all_down());
    }

    #[test]
    fn test_second_throw_seeds_from_standing_pins() {
        let rig = SimRig::new();
        let mut controller = controller(&rig);
        rig.knock(knocked(&[PinPosition::CenterFive]));
        completed(controller.resolve_throw().unwrap());

        rig.knock(knocked(&[PinPosition::LeftTwo]));
        let outcome = completed(controller.resolve_throw().unwrap());
        assert_eq!(outcome.knocked.pattern(), "10000");
        assert_eq!(outcome.pins.pattern(), "10100");
    }

    #[test]
    fn test_manual_reset_preempts_scan() {
        let rig = SimRig::new();
        let mut controller = controller(&rig);
        controller.reset_request().request();

        assert_eq!(controller.resolve_throw().unwrap(), Resolution::Preempted);

        controller.manual_reset().unwrap();
        assert!(!controller.reset_request().is_requested());
        assert!(controller.pins().is_all_standing());
        assert_eq!(rig.reset_pulses(), 1);
    }
}
