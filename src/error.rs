use thiserror::Error;

/// Lane-level errors using thiserror for structured error handling.
///
/// Each layer owns its own enum. Hardware and IPC errors are contained at
/// their layer and never reach the scoring engine.

#[derive(Error, Debug)]
pub enum HardwareError {
    #[error("Failed to claim GPIO line {line}")]
    ClaimFailed {
        line: u8,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Analog front end did not initialize after {attempts} attempts")]
    InitExhausted {
        attempts: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to read {what}")]
    ReadFailed {
        what: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to drive {what}")]
    WriteFailed {
        what: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Hardware backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum IpcError {
    #[error("Failed to bind sensor socket at {path}")]
    BindFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to connect to sensor socket at {path}")]
    ConnectFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Sensor stream I/O failed")]
    Io(#[from] std::io::Error),

    #[error("Malformed sensor frame: {line}")]
    MalformedFrame {
        line: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to save configuration to {path}")]
    SaveFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to create config directory: {path}")]
    DirectoryCreationFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No platform config directory available")]
    NoConfigDir,
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to create save directory: {path}")]
    DirectoryCreationFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize game state")]
    SerializeFailed(#[source] serde_json::Error),

    #[error("Failed to write game state to {path}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read game state from {path}")]
    ReadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Raised only for conditions the engine's guards should make unreachable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoringError {
    #[error("Bowler {0} has already finished all frames")]
    BowlerFinished(String),

    #[error("No bowler at rotation index {0}")]
    NoSuchBowler(usize),

    #[error("Game has no bowlers")]
    EmptyRoster,
}

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;
