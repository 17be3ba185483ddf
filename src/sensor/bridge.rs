use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::LOG_TARGET;
use crate::error::HardwareError;
use crate::machine::{PinMachineController, PinState, ResetRequest, Resolution};
use crate::messaging::{ControlSignal, EventBus, LaneCommand, LaneEvent, SensorMessage};
use crate::scoring::{BallOutcome, Bowler, ClickTarget, RackAction, ScoringEngine, SessionExtension};
use crate::state::{LaneStatus, LaneStatusMachine};
use crate::utils::{ResolutionStats, ResolutionTiming};

/// Everything the bridge loop consumes, in arrival order.
#[derive(Debug)]
pub enum BridgeInput {
    Sensor(SensorMessage),
    Command(LaneCommand),
    /// Stream transport connected or dropped
    Link { connected: bool },
}

/// Bounded queue feeding the bridge. Reader threads block when it is full.
pub fn bridge_channel(capacity: usize) -> (Sender<BridgeInput>, Receiver<BridgeInput>) {
    bounded(capacity.max(1))
}

/// Where suspend/resume signals go.
pub trait ControlSink: Send + Sync {
    fn signal(&self, signal: ControlSignal);
}

impl ControlSink for Sender<ControlSignal> {
    fn signal(&self, signal: ControlSignal) {
        if let Err(e) = self.try_send(signal) {
            warn!(target: LOG_TARGET, "Control signal {signal:?} not delivered: {e}");
        }
    }
}

/// Stream transport: the daemon has no control channel and the bridge queue
/// keeps detections in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoControl;

impl ControlSink for NoControl {
    fn signal(&self, signal: ControlSignal) {
        debug!(target: LOG_TARGET, "No control channel for {signal:?}");
    }
}

/// Suspends the daemon on creation and resumes it when dropped, however the
/// resolution ends.
pub struct SuspendGuard {
    sink: Arc<dyn ControlSink>,
}

impl SuspendGuard {
    pub fn engage(sink: Arc<dyn ControlSink>) -> Self {
        sink.signal(ControlSignal::Suspend);
        Self { sink }
    }
}

impl Drop for SuspendGuard {
    fn drop(&mut self) {
        self.sink.signal(ControlSignal::Resume);
    }
}

/// Single writer of lane state.
///
/// Drains detections and operator commands in order, runs one throw at a
/// time through the controller and the engine, and publishes what happened
/// on the [`EventBus`].
pub struct SensorBridge {
    controller: PinMachineController,
    engine: ScoringEngine,
    control: Arc<dyn ControlSink>,
    inputs: Receiver<BridgeInput>,
    bus: EventBus,
    status: LaneStatusMachine,
    stats: ResolutionStats,
    tick: Duration,
    last_pin_set: Option<Map<String, Value>>,
}

impl SensorBridge {
    pub fn new(
        controller: PinMachineController,
        engine: ScoringEngine,
        control: Arc<dyn ControlSink>,
        inputs: Receiver<BridgeInput>,
        bus: EventBus,
    ) -> Self {
        Self {
            controller,
            engine,
            control,
            inputs,
            bus,
            status: LaneStatusMachine::new(),
            stats: ResolutionStats::new(),
            tick: Duration::from_millis(250),
            last_pin_set: None,
        }
    }

    /// Housekeeping interval when no input arrives.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick.max(Duration::from_millis(1));
        self
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    pub fn controller(&self) -> &PinMachineController {
        &self.controller
    }

    pub fn status(&self) -> &LaneStatus {
        self.status.status()
    }

    pub fn stats(&self) -> &ResolutionStats {
        &self.stats
    }

    /// Last externally reported pin positions.
    pub fn last_pin_set(&self) -> Option<&Map<String, Value>> {
        self.last_pin_set.as_ref()
    }

    /// Process inputs until shutdown or until every sender is gone.
    pub fn run(mut self) -> Self {
        info!(target: LOG_TARGET, "Sensor bridge listening");
        loop {
            match self.inputs.recv_timeout(self.tick) {
                Ok(input) => {
                    if !self.handle(input) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    info!(target: LOG_TARGET, "All inputs closed");
                    break;
                }
            }
            self.housekeeping();
        }

        self.stats.log_report();
        self.bus.publish(LaneEvent::Shutdown);
        self
    }

    /// Handle one input. Returns false on shutdown.
    pub fn handle(&mut self, input: BridgeInput) -> bool {
        match input {
            BridgeInput::Sensor(SensorMessage::BallDetected { .. }) => self.on_ball(),
            BridgeInput::Sensor(SensorMessage::LastBall { .. }) => {
                info!(target: LOG_TARGET, "Last ball of the turn, resetting machine");
                self.manual_reset();
            }
            BridgeInput::Sensor(SensorMessage::PinSet { fields }) => {
                let reported = serde_json::Value::Object(fields.clone());
                debug!(target: LOG_TARGET, "Pin set reported: {reported}");
                self.bus.publish(LaneEvent::PinSetReported { fields: fields.clone() });
                self.last_pin_set = Some(fields);
            }
            BridgeInput::Sensor(SensorMessage::Ack { cmd }) => {
                debug!(target: LOG_TARGET, "Daemon acknowledged {cmd}");
            }
            BridgeInput::Link { connected } => {
                self.bus.publish(LaneEvent::SensorLink { connected });
            }
            BridgeInput::Command(LaneCommand::Shutdown) => {
                info!(target: LOG_TARGET, "Shutdown requested");
                return false;
            }
            BridgeInput::Command(command) => self.execute(command),
        }
        true
    }

    /// Timers and move confirmations between inputs.
    pub fn housekeeping(&mut self) {
        self.engine.update();
        self.apply_rack_action();
        self.publish_notices();
    }

    fn on_ball(&mut self) {
        self.bus.publish(LaneEvent::BallDetected {
            timestamp: Instant::now(),
        });

        if self.status.status().is_faulted() {
            warn!(target: LOG_TARGET, "Ball ignored: {}", self.status.status().description());
            return;
        }
        if let Some(reason) = self.engine.throw_rejection() {
            debug!(target: LOG_TARGET, "Ball ignored: {reason}");
            self.bus.publish(LaneEvent::ThrowIgnored { reason });
            return;
        }

        self.transition(|status| status.begin_resolution().map_err(|e| e.to_string()));
        let started = Instant::now();

        let result = {
            let _suspended = SuspendGuard::engage(Arc::clone(&self.control));
            self.resolve_and_score(started)
        };

        match result {
            Ok(()) => self.transition(|status| status.finish_resolution().map_err(|e| e.to_string())),
            Err(e) => self.raise_fault(&e),
        }
        self.publish_notices();
    }

    fn resolve_and_score(&mut self, started: Instant) -> Result<(), HardwareError> {
        let outcome = match self.controller.resolve_throw()? {
            Resolution::Completed(outcome) => outcome,
            Resolution::Preempted => {
                info!(target: LOG_TARGET, "Throw preempted by manual reset");
                self.bus.publish(LaneEvent::ThrowPreempted);
                return Ok(());
            }
        };

        self.bus.publish(LaneEvent::ThrowResolved {
            pins: outcome.pins,
            knocked: outcome.knocked,
            scan_time: outcome.scan_time,
            cycle_time: outcome.cycle_time,
        });

        match self.engine.process_ball(outcome.pins) {
            BallOutcome::Recorded(record) => self.bus.publish(LaneEvent::ThrowScored { record }),
            BallOutcome::Rejected(reason) => self.bus.publish(LaneEvent::ThrowIgnored { reason }),
            BallOutcome::AwaitingPartner { member } => {
                info!(target: LOG_TARGET, "{member} throws next at the same rack");
            }
            BallOutcome::AwaitingSelection => info!(target: LOG_TARGET, "Waiting for best ball selection"),
        }
        self.apply_rack()?;

        let scan = outcome.scan_time.as_secs_f64() * 1000.0;
        self.stats.add(ResolutionTiming {
            scan_ms: scan,
            cycle_ms: outcome.cycle_time.as_secs_f64() * 1000.0 - scan,
            total_ms: started.elapsed().as_secs_f64() * 1000.0,
        });
        Ok(())
    }

    fn apply_rack(&mut self) -> Result<(), HardwareError> {
        match self.engine.take_rack_action() {
            RackAction::Keep => {}
            RackAction::Reset => {
                if !self.controller.pins().is_all_standing() {
                    self.controller.manual_reset()?;
                }
                self.bus.publish(LaneEvent::RackChanged {
                    pins: PinState::all_standing(),
                    manual: false,
                });
            }
            RackAction::Restore(target) => {
                self.controller.restore_rack(target)?;
                self.bus.publish(LaneEvent::RackChanged {
                    pins: target,
                    manual: false,
                });
            }
        }
        Ok(())
    }

    fn apply_rack_action(&mut self) {
        if let Err(e) = self.apply_rack() {
            self.raise_fault(&e);
        }
    }

    fn manual_reset(&mut self) {
        match self.controller.manual_reset() {
            Ok(()) => {
                self.engine.reset_pins();
                self.bus.publish(LaneEvent::RackChanged {
                    pins: PinState::all_standing(),
                    manual: true,
                });
            }
            Err(e) => self.raise_fault(&e),
        }
    }

    fn execute(&mut self, command: LaneCommand) {
        debug!(target: LOG_TARGET, "Executing: {}", command.description());
        let accepted = match command {
            LaneCommand::ManualReset => {
                self.manual_reset();
                true
            }
            LaneCommand::SkipBowler => self.engine.skip_bowler(),
            LaneCommand::ToggleHold => self.engine.toggle_hold(),
            LaneCommand::ClearFault => {
                let cleared = self.status.status().is_faulted();
                self.transition(|status| status.clear_fault().map_err(|e| e.to_string()));
                cleared
            }
            LaneCommand::StartNextGame => self.engine.start_next_game(),
            LaneCommand::Click(target) => self.engine.handle_click(target),
            LaneCommand::SelectCandidate(choice) => self.engine.select_candidate(choice),
            LaneCommand::UseFreeStrike { bowler_index } => self.engine.use_free_strike(bowler_index),
            LaneCommand::ExtendSession(extension) => self.engine.update_session(extension),
            LaneCommand::ReceiveBowler(bowler) => {
                self.engine.receive_bowler(*bowler);
                true
            }
            LaneCommand::ReceiveTeam(bowlers) => {
                self.engine.receive_team(bowlers);
                true
            }
            LaneCommand::Shutdown => false,
        };

        if !accepted {
            debug!(target: LOG_TARGET, "Command had no effect");
        }
        self.apply_rack_action();
        self.publish_notices();
    }

    fn transition(&mut self, change: impl FnOnce(&mut LaneStatusMachine) -> Result<(), String>) {
        let old = self.status.status().clone();
        if let Err(e) = change(&mut self.status) {
            debug!(target: LOG_TARGET, "Status unchanged: {e}");
            return;
        }
        let new = self.status.status().clone();
        self.bus.publish(LaneEvent::StatusChanged { old, new });
    }

    fn raise_fault(&mut self, err: &HardwareError) {
        error!(target: LOG_TARGET, "Machine fault: {err}");
        let old = self.status.status().clone();
        self.status.fault(err.to_string());
        self.bus.publish(LaneEvent::ErrorOccurred {
            message: err.to_string(),
            context: "pin machine".to_string(),
        });
        let new = self.status.status().clone();
        if new != old {
            self.bus.publish(LaneEvent::StatusChanged { old, new });
        }
    }

    fn publish_notices(&mut self) {
        for notice in self.engine.take_notices() {
            self.bus.publish(LaneEvent::Game(notice));
        }
    }
}

/// Cloneable handle the UI uses to reach the bridge.
#[derive(Clone)]
pub struct LaneHandle {
    inputs: Sender<BridgeInput>,
    reset: ResetRequest,
}

impl LaneHandle {
    pub fn new(inputs: Sender<BridgeInput>, reset: ResetRequest) -> Self {
        Self { inputs, reset }
    }

    /// Preempts a throw in flight, then resets the rack.
    pub fn manual_reset(&self) -> bool {
        self.reset.request();
        self.send(LaneCommand::ManualReset)
    }

    pub fn skip_bowler(&self) -> bool {
        self.send(LaneCommand::SkipBowler)
    }

    pub fn toggle_hold(&self) -> bool {
        self.send(LaneCommand::ToggleHold)
    }

    pub fn clear_fault(&self) -> bool {
        self.send(LaneCommand::ClearFault)
    }

    pub fn start_next_game(&self) -> bool {
        self.send(LaneCommand::StartNextGame)
    }

    pub fn click(&self, target: ClickTarget) -> bool {
        self.send(LaneCommand::Click(target))
    }

    pub fn select_candidate(&self, choice: usize) -> bool {
        self.send(LaneCommand::SelectCandidate(choice))
    }

    pub fn use_free_strike(&self, bowler_index: usize) -> bool {
        self.send(LaneCommand::UseFreeStrike { bowler_index })
    }

    pub fn extend_session(&self, extension: SessionExtension) -> bool {
        self.send(LaneCommand::ExtendSession(extension))
    }

    pub fn receive_bowler(&self, bowler: Bowler) -> bool {
        self.send(LaneCommand::ReceiveBowler(Box::new(bowler)))
    }

    pub fn receive_team(&self, bowlers: Vec<Bowler>) -> bool {
        self.send(LaneCommand::ReceiveTeam(bowlers))
    }

    pub fn shutdown(&self) -> bool {
        self.send(LaneCommand::Shutdown)
    }

    /// Queue a command without blocking the caller.
    pub fn send(&self, command: LaneCommand) -> bool {
        match self.inputs.try_send(BridgeInput::Command(command)) {
            Ok(()) => true,
            Err(TrySendError::Full(input)) => {
                warn!(target: LOG_TARGET, "Bridge queue full, dropped {input:?}");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}
