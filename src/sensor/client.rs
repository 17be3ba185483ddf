/// Consumer side of the sensor socket
///
/// A reader thread keeps a connection to the daemon, reconnecting with
/// exponential backoff, and marshals every framed message into the bridge
/// queue. [`StreamWriter`] sends command lines back over the same connection.
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::io::{self, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::bridge::BridgeInput;
use super::LOG_TARGET;
use crate::machine::PinState;
use crate::messaging::{DaemonCommand, SensorMessage};

/// How often a blocked read wakes up to check the running flag.
const READ_TIMEOUT: Duration = Duration::from_millis(200);

/// Doubling reconnect delay, capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        let initial = initial.max(Duration::from_millis(1));
        Self {
            initial,
            max: max.max(initial),
            current: initial,
        }
    }

    /// Delay to wait now; the following one is twice as long.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Write half of the current daemon connection.
#[derive(Clone, Default)]
pub struct StreamWriter {
    stream: Arc<Mutex<Option<UnixStream>>>,
}

impl StreamWriter {
    pub fn is_connected(&self) -> bool {
        self.stream.lock().is_some()
    }

    /// Returns false when not connected or the write failed.
    pub fn send(&self, command: &DaemonCommand) -> bool {
        let mut guard = self.stream.lock();
        let Some(stream) = guard.as_mut() else {
            return false;
        };
        match stream.write_all(command.to_line().as_bytes()) {
            Ok(()) => true,
            Err(e) => {
                warn!(target: LOG_TARGET, "Failed to write to daemon: {e}");
                false
            }
        }
    }

    pub fn send_last_ball(&self) -> bool {
        self.send(&DaemonCommand::LastBall)
    }

    /// `PIN_SET [..]` with one 0/1 entry per pin, 1 = down.
    pub fn send_pin_set(&self, pins: PinState) -> bool {
        let values: Vec<serde_json::Value> = pins.slots().iter().map(|down| u8::from(*down).into()).collect();
        let mut fields = serde_json::Map::new();
        fields.insert("pins".to_string(), serde_json::Value::Array(values));
        self.send(&DaemonCommand::PinSet(fields))
    }

    fn set(&self, stream: Option<UnixStream>) {
        *self.stream.lock() = stream;
    }
}

pub struct StreamClient {
    path: PathBuf,
    backoff: Backoff,
    queue: Sender<BridgeInput>,
    writer: StreamWriter,
    running: Arc<AtomicBool>,
}

impl StreamClient {
    pub fn new(path: impl Into<PathBuf>, backoff: Backoff, queue: Sender<BridgeInput>) -> Self {
        Self {
            path: path.into(),
            backoff,
            queue,
            writer: StreamWriter::default(),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn writer(&self) -> StreamWriter {
        self.writer.clone()
    }

    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Start the reader thread.
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("sensor-stream".to_string())
            .spawn(move || self.run())
    }

    fn run(mut self) {
        while self.running.load(Ordering::Relaxed) {
            match UnixStream::connect(&self.path) {
                Ok(stream) => {
                    self.backoff.reset();
                    info!(target: LOG_TARGET, "Connected to sensor daemon at {}", self.path.display());
                    if !self.serve(stream) {
                        return;
                    }
                }
                Err(e) => {
                    let delay = self.backoff.next_delay();
                    debug!(
                        target: LOG_TARGET,
                        "Sensor daemon not reachable at {} ({e}), retrying in {delay:?}",
                        self.path.display()
                    );
                    thread::sleep(delay);
                }
            }
        }
    }

    /// Read until the connection drops. False once the bridge queue is gone.
    fn serve(&mut self, mut stream: UnixStream) -> bool {
        if let Err(e) = stream.set_read_timeout(Some(READ_TIMEOUT)) {
            warn!(target: LOG_TARGET, "Cannot set read timeout: {e}");
            return true;
        }
        self.writer.set(stream.try_clone().ok());
        if self.queue.send(BridgeInput::Link { connected: true }).is_err() {
            return false;
        }

        let mut buffer = Vec::new();
        let mut chunk = [0u8; 4096];
        while self.running.load(Ordering::Relaxed) {
            match stream.read(&mut chunk) {
                Ok(0) => {
                    info!(target: LOG_TARGET, "Socket closed by daemon");
                    break;
                }
                Ok(n) => {
                    buffer.extend_from_slice(&chunk[..n]);
                    if !self.forward_lines(&mut buffer) {
                        return false;
                    }
                }
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted) => {}
                Err(e) => {
                    warn!(target: LOG_TARGET, "Sensor stream read failed: {e}");
                    break;
                }
            }
        }

        self.writer.set(None);
        self.queue.send(BridgeInput::Link { connected: false }).is_ok()
    }

    fn forward_lines(&self, buffer: &mut Vec<u8>) -> bool {
        while let Some(end) = buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=end).collect();
            let line = String::from_utf8_lossy(&line);
            if line.trim().is_empty() {
                continue;
            }
            match SensorMessage::from_line(&line) {
                Ok(message) => {
                    if self.queue.send(BridgeInput::Sensor(message)).is_err() {
                        return false;
                    }
                }
                Err(e) => warn!(target: LOG_TARGET, "{e}"),
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_up_to_cap() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(500));
        let delays: Vec<u128> = (0..5).map(|_| backoff.next_delay().as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 400, 500, 500]);

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_writer_without_connection() {
        let writer = StreamWriter::default();
        assert!(!writer.is_connected());
        assert!(!writer.send_last_ball());
    }
}
