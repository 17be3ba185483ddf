/// Sensor pipeline
///
/// The daemon polls the ball sensor and publishes detections. The bridge
/// consumes them in order and drives the pin machine and the scoring engine.
/// Two transports connect them:
///
/// - in-process: a bounded channel plus the suspend/resume control channel
/// - stream: newline-delimited JSON over a Unix socket (`server` on the
///   daemon side, `client` on the controller side)

pub mod bridge;
pub mod client;
pub mod daemon;
pub mod server;

use crossbeam_channel::{Receiver, Sender};
use std::io;
use std::thread::{self, JoinHandle};

pub use bridge::{bridge_channel, BridgeInput, ControlSink, LaneHandle, NoControl, SensorBridge, SuspendGuard};
pub use client::{Backoff, StreamClient, StreamWriter};
pub use daemon::BallSensorDaemon;
pub use server::SocketServer;

use crate::messaging::SensorMessage;

pub(crate) const LOG_TARGET: &str = "five_pin_lane::sensor";

/// Move in-process detections onto the bridge queue.
///
/// Ends when either side disconnects.
pub fn spawn_channel_forwarder(detections: Receiver<SensorMessage>, queue: Sender<BridgeInput>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new().name("sensor-forward".to_string()).spawn(move || {
        for message in detections.iter() {
            if queue.send(BridgeInput::Sensor(message)).is_err() {
                break;
            }
        }
        tracing::debug!(target: LOG_TARGET, "Detection forwarder stopped");
    })
}
