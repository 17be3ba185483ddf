use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

use super::server::SocketServer;
use super::LOG_TARGET;
use crate::error::HardwareError;
use crate::hardware::{BallInput, Level};
use crate::messaging::{ControlSignal, DaemonCommand, SensorMessage};
use crate::utils::{unix_timestamp, Debouncer};

/// Pause after a failed input read before polling again.
const READ_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Ball-presence poller relaying detections to the lane controller.
///
/// A detection is a low-to-high edge at least `debounce_ms` after the last
/// accepted one. It is published on every configured output at once: the
/// in-process channel and the socket consumer. While the bridge has the
/// daemon suspended, at most one detection is held back and published on
/// resume.
pub struct BallSensorDaemon {
    input: Box<dyn BallInput>,
    debouncer: Debouncer,
    last_level: Level,
    channel: Option<Sender<SensorMessage>>,
    control: Option<Receiver<ControlSignal>>,
    server: Option<SocketServer>,
    suspended: bool,
    held: Option<f64>,
    poll_interval: Duration,
    running: Arc<AtomicBool>,
    accepted: u64,
}

impl BallSensorDaemon {
    pub fn new(input: Box<dyn BallInput>, debounce_ms: u64) -> Self {
        Self {
            input,
            debouncer: Debouncer::new(debounce_ms),
            last_level: Level::Low,
            channel: None,
            control: None,
            server: None,
            suspended: false,
            held: None,
            poll_interval: Duration::ZERO,
            running: Arc::new(AtomicBool::new(true)),
            accepted: 0,
        }
    }

    /// In-process hand-off, used when the daemon shares the controller's process.
    pub fn with_channel(mut self, channel: Sender<SensorMessage>) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_control(mut self, control: Receiver<ControlSignal>) -> Self {
        self.control = Some(control);
        self
    }

    pub fn with_server(mut self, server: SocketServer) -> Self {
        self.server = Some(server);
        self
    }

    /// Sleep between polls; zero keeps the loop hot.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Clear to stop [`run`](Self::run).
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Detections accepted so far, held ones included.
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Poll until the running flag is cleared.
    pub fn run(&mut self) {
        info!(target: LOG_TARGET, "Ball sensor daemon started");
        while self.running.load(Ordering::Relaxed) {
            if let Err(e) = self.step(Instant::now()) {
                error!(target: LOG_TARGET, "Sensor error: {e}");
                thread::sleep(READ_ERROR_BACKOFF);
            }
            if !self.poll_interval.is_zero() {
                thread::sleep(self.poll_interval);
            }
        }
        info!(target: LOG_TARGET, "Ball sensor daemon stopped after {} detections", self.accepted);
    }

    /// One loop iteration at `now`. Returns the timestamp of a detection
    /// accepted on this iteration.
    pub fn step(&mut self, now: Instant) -> Result<Option<f64>, HardwareError> {
        self.drain_control();
        let detection = self.sample(now);
        self.service_socket();
        detection
    }

    fn sample(&mut self, now: Instant) -> Result<Option<f64>, HardwareError> {
        let level = self.input.read()?;
        let rising = level.is_high() && !self.last_level.is_high();
        self.last_level = level;

        if !rising {
            return Ok(None);
        }
        if !self.debouncer.should_trigger_at(now) {
            trace!(target: LOG_TARGET, "Edge inside debounce window ignored");
            return Ok(None);
        }

        let timestamp = unix_timestamp();
        self.accepted += 1;
        if self.suspended {
            if self.held.is_none() {
                debug!(target: LOG_TARGET, "Ball detected while suspended, holding");
                self.held = Some(timestamp);
            } else {
                debug!(target: LOG_TARGET, "Ball detected while suspended, coalesced");
            }
        } else {
            info!(target: LOG_TARGET, "Ball detected at {timestamp:.3}");
            self.publish(SensorMessage::BallDetected { timestamp });
        }
        Ok(Some(timestamp))
    }

    fn drain_control(&mut self) {
        let Some(control) = &self.control else {
            return;
        };
        let signals: Vec<ControlSignal> = control.try_iter().collect();
        for signal in signals {
            match signal {
                ControlSignal::Suspend => {
                    trace!(target: LOG_TARGET, "Suspended");
                    self.suspended = true;
                }
                ControlSignal::Resume => {
                    trace!(target: LOG_TARGET, "Resumed");
                    self.suspended = false;
                    if let Some(timestamp) = self.held.take() {
                        info!(target: LOG_TARGET, "Releasing held detection from {timestamp:.3}");
                        self.publish(SensorMessage::BallDetected { timestamp });
                    }
                }
            }
        }
    }

    fn service_socket(&mut self) {
        let Some(server) = self.server.as_mut() else {
            return;
        };
        for command in server.poll() {
            self.handle_command(command);
        }
    }

    fn handle_command(&mut self, command: DaemonCommand) {
        match command {
            DaemonCommand::LastBall => {
                info!(target: LOG_TARGET, "Received LAST_BALL");
                self.publish(SensorMessage::LastBall {
                    timestamp: unix_timestamp(),
                });
            }
            DaemonCommand::PinSet(fields) => {
                info!(target: LOG_TARGET, "Received PIN_SET");
                self.publish(SensorMessage::PinSet { fields });
            }
            DaemonCommand::MalformedPinSet { line, error } => {
                error!(target: LOG_TARGET, "Failed parsing PIN_SET payload: {error}");
                self.reply(SensorMessage::Ack { cmd: line });
            }
            DaemonCommand::Other(line) => {
                debug!(target: LOG_TARGET, "Unknown command: {line}");
                self.reply(SensorMessage::Ack { cmd: line });
            }
        }
    }

    /// Send to every output. A failure drops this send only.
    fn publish(&mut self, message: SensorMessage) {
        if let Some(channel) = &self.channel {
            match channel.try_send(message.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(target: LOG_TARGET, "Detection channel full, dropped {}", message.kind());
                }
                Err(TrySendError::Disconnected(_)) => {
                    debug!(target: LOG_TARGET, "Detection channel closed, dropped {}", message.kind());
                }
            }
        }
        self.reply(message);
    }

    fn reply(&mut self, message: SensorMessage) {
        if let Some(server) = self.server.as_mut() {
            server.send(&message);
        }
    }
}
