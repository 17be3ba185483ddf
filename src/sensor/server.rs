/// Daemon side of the sensor socket
///
/// Non-blocking Unix listener with at most one consumer. A new connection
/// replaces the previous one. Polled from the daemon loop, never blocks.
/// Lines the socket did not take yet are kept and flushed on the next poll,
/// so the consumer only ever sees whole lines.
use std::fs;
use std::io::{self, Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::LOG_TARGET;
use crate::error::IpcError;
use crate::messaging::{DaemonCommand, SensorMessage};

const READ_CHUNK: usize = 4096;
/// Unsent bytes tolerated before a stalled consumer is dropped
const MAX_PENDING: usize = 256 * 1024;

pub struct SocketServer {
    path: PathBuf,
    listener: UnixListener,
    client: Option<UnixStream>,
    buffer: Vec<u8>,
    outgoing: Vec<u8>,
}

impl SocketServer {
    /// Bind at `path`, clearing a stale socket left by a previous run.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self, IpcError> {
        let path = path.as_ref().to_path_buf();
        let bind_failed = |source: io::Error| IpcError::BindFailed {
            path: path.display().to_string(),
            source,
        };

        match fs::remove_file(&path) {
            Ok(()) => debug!(target: LOG_TARGET, "Removed stale socket {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(bind_failed(e)),
        }

        let listener = UnixListener::bind(&path).map_err(bind_failed)?;
        listener.set_nonblocking(true).map_err(bind_failed)?;
        info!(target: LOG_TARGET, "Socket server listening at {}", path.display());

        Ok(Self {
            path,
            listener,
            client: None,
            buffer: Vec::new(),
            outgoing: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    /// Bytes framed for the consumer but not yet written.
    pub fn pending_bytes(&self) -> usize {
        self.outgoing.len()
    }

    /// Accept a waiting consumer and collect complete command lines.
    pub fn poll(&mut self) -> Vec<DaemonCommand> {
        self.accept();
        self.flush();
        self.read_commands()
    }

    /// Queue one framed message for the consumer, if any, and write what the
    /// socket takes.
    ///
    /// A consumer that lets more than [`MAX_PENDING`] bytes pile up, or whose
    /// stream breaks, is dropped.
    pub fn send(&mut self, message: &SensorMessage) {
        if self.client.is_none() {
            return;
        }
        let line = match message.to_line() {
            Ok(line) => line,
            Err(e) => {
                warn!(target: LOG_TARGET, "Failed to frame {}: {e}", message.kind());
                return;
            }
        };

        if self.outgoing.len() + line.len() > MAX_PENDING {
            warn!(target: LOG_TARGET, "Consumer not reading, dropping it before {}", message.kind());
            self.drop_client();
            return;
        }
        self.outgoing.extend_from_slice(line.as_bytes());
        self.flush();
    }

    fn flush(&mut self) {
        let Some(client) = self.client.as_mut() else {
            return;
        };

        let mut written = 0;
        while written < self.outgoing.len() {
            match client.write(&self.outgoing[written..]) {
                Ok(0) => {
                    warn!(target: LOG_TARGET, "Client stopped accepting data");
                    self.drop_client();
                    return;
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(target: LOG_TARGET, "Failed to send to client: {e}");
                    self.drop_client();
                    return;
                }
            }
        }
        self.outgoing.drain(..written);
    }

    fn accept(&mut self) {
        match self.listener.accept() {
            Ok((stream, _)) => {
                if let Err(e) = stream.set_nonblocking(true) {
                    warn!(target: LOG_TARGET, "Rejecting client: {e}");
                    return;
                }
                if self.client.is_some() {
                    info!(target: LOG_TARGET, "New client replaces the previous connection");
                } else {
                    info!(target: LOG_TARGET, "Client connected to ball sensor socket");
                }
                self.client = Some(stream);
                self.buffer.clear();
                self.outgoing.clear();
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => debug!(target: LOG_TARGET, "Accept failed: {e}"),
        }
    }

    fn read_commands(&mut self) -> Vec<DaemonCommand> {
        let Some(client) = self.client.as_mut() else {
            return Vec::new();
        };

        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match client.read(&mut chunk) {
                Ok(0) => {
                    info!(target: LOG_TARGET, "Client disconnected");
                    self.drop_client();
                    break;
                }
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(target: LOG_TARGET, "Client read error: {e}");
                    self.drop_client();
                    break;
                }
            }
        }

        let mut commands = Vec::new();
        while let Some(end) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            let line = String::from_utf8_lossy(&line);
            if !line.trim().is_empty() {
                commands.push(DaemonCommand::parse(&line));
            }
        }
        commands
    }

    fn drop_client(&mut self) {
        self.client = None;
        self.buffer.clear();
        self.outgoing.clear();
    }
}

impl Drop for SocketServer {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
