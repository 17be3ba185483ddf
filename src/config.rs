use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::hardware::ads1115::AdcInput;
use crate::machine::MachineTimings;
use crate::scoring::{GameType, ModifierConfig, TurnPolicy, FRAME_COUNT};

const APP_DIR: &str = "FivePinLane";
const CONFIG_FILE: &str = "lane.json";

/// GPIO and ADC wiring of one lane.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WiringConfig {
    /// BCM line of the ball-presence sensor
    pub ball_sensor_gpio: u8,
    /// Break line per pin, in pin index order (L2, L3, C5, R3, R2)
    pub break_gpios: [u8; 5],
    /// Reset line of the setting arm
    pub reset_gpio: u8,
    /// I2C bus number of the converters
    pub i2c_bus: u8,
    /// Addresses of the two ADS1115 converters
    pub adc_addresses: [u8; 2],
    /// Sensor input per pin, in pin index order
    pub pin_inputs: [AdcInput; 5],
    /// Sensor input of the machine pin
    pub machine_pin_input: AdcInput,
    /// Analog init attempts before refusing to start
    pub adc_init_attempts: u32,
    /// Sleep between analog init attempts, in milliseconds
    pub adc_init_backoff_ms: u64,
}

impl Default for WiringConfig {
    fn default() -> Self {
        Self {
            ball_sensor_gpio: 5,
            break_gpios: [17, 27, 22, 23, 24],
            reset_gpio: 25,
            i2c_bus: 1,
            adc_addresses: [0x48, 0x49],
            pin_inputs: [
                AdcInput::new(0, 0),
                AdcInput::new(0, 1),
                AdcInput::new(0, 2),
                AdcInput::new(0, 3),
                AdcInput::new(1, 0),
            ],
            machine_pin_input: AdcInput::new(1, 1),
            adc_init_attempts: 5,
            adc_init_backoff_ms: 500,
        }
    }
}

/// How the lane controller receives detections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorTransport {
    /// Daemon runs on a thread of the lane controller
    InProcess,
    /// Daemon is a separate process reached over the Unix socket
    Stream,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Minimum time between two accepted detections
    pub debounce_ms: u64,
    /// Well-known path of the daemon socket
    pub socket_path: PathBuf,
    pub transport: SensorTransport,
    /// Capacity of the in-process detection channel
    pub channel_capacity: usize,
    /// First reconnect delay of the stream client
    pub reconnect_initial_ms: u64,
    /// Upper bound of the reconnect delay
    pub reconnect_max_ms: u64,
    /// Sleep between input polls in microseconds; 0 keeps the loop hot
    pub poll_interval_us: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            socket_path: PathBuf::from("/tmp/ball_sensor.sock"),
            transport: SensorTransport::Stream,
            channel_capacity: 64,
            reconnect_initial_ms: 100,
            reconnect_max_ms: 5000,
            poll_interval_us: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionDefaults {
    /// Where current and completed games are written
    pub save_dir: PathBuf,
    /// Delay before the next game of a session starts on its own
    pub between_games_secs: u64,
    /// How long the game-over message is shown
    pub game_over_pause_secs: u64,
    /// Roster used when none is given on the command line
    pub default_bowlers: Vec<String>,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            save_dir: default_data_dir().join("game_saves"),
            between_games_secs: 300,
            game_over_pause_secs: 60,
            default_bowlers: vec!["Iron Man".to_string(), "Superman".to_string(), "Snoopi".to_string()],
        }
    }
}

/// Game format played on the lane.
///
/// ```json
/// "game": {
///   "game_type": { "type": "league", "total_format": "with_handicap" },
///   "turn_policy": { "policy": "paired_lane", "frames_per_turn": 2, "paired_lane": 4 },
///   "modifiers": [{ "kind": "prize_frame", "frames": { "1": 5 } }]
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub game_type: GameType,
    pub turn_policy: TurnPolicy,
    pub modifiers: Vec<ModifierConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneConfig {
    /// Lane number used in transfers and game archives
    pub lane_id: u32,

    /// Shown in the idle scroll message
    #[serde(default = "default_venue")]
    pub venue_name: String,

    #[serde(default)]
    pub wiring: WiringConfig,

    #[serde(default)]
    pub sensor: SensorConfig,

    #[serde(default)]
    pub machine: MachineTimings,

    #[serde(default)]
    pub session: SessionDefaults,

    #[serde(default)]
    pub game: GameConfig,

    /// Hand-off tick for timers when no detection arrives, in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

fn default_venue() -> String {
    "Centrebowl".to_string()
}

fn default_tick_ms() -> u64 {
    250
}

fn default_data_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            lane_id: 1,
            venue_name: default_venue(),
            wiring: WiringConfig::default(),
            sensor: SensorConfig::default(),
            machine: MachineTimings::default(),
            session: SessionDefaults::default(),
            game: GameConfig::default(),
            tick_ms: default_tick_ms(),
        }
    }
}

/// One problem found by [`LaneConfig::validate`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigIssue {
    DebounceOutOfRange(u64),
    EmptyDetectionWindow,
    CalibrationBandInvalid,
    DuplicateGpio(u8),
    AdcInputOutOfRange { adc: u8, input: u8 },
    NoInitAttempts,
    NoFramesPerTurn,
    PairedWithItself(u32),
    ModifierFrameOutOfRange { kind: &'static str, frame: usize },
    DuplicateModifier(&'static str),
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigIssue::DebounceOutOfRange(ms) => {
                write!(f, "Debounce must be between 50 and 5000 ms, got {ms}")
            }
            ConfigIssue::EmptyDetectionWindow => write!(f, "Detection window must be non-zero"),
            ConfigIssue::CalibrationBandInvalid => {
                write!(f, "Calibration band must satisfy min <= fallback, initial <= max")
            }
            ConfigIssue::DuplicateGpio(line) => write!(f, "GPIO line {line} is assigned twice"),
            ConfigIssue::AdcInputOutOfRange { adc, input } => {
                write!(f, "ADC input {adc}/{input} does not exist")
            }
            ConfigIssue::NoInitAttempts => write!(f, "ADC init attempts must be at least 1"),
            ConfigIssue::NoFramesPerTurn => write!(f, "Frames per turn must be at least 1"),
            ConfigIssue::PairedWithItself(lane) => write!(f, "Lane {lane} cannot be paired with itself"),
            ConfigIssue::ModifierFrameOutOfRange { kind, frame } => {
                write!(f, "{kind} frame {frame} is outside 1..={FRAME_COUNT}")
            }
            ConfigIssue::DuplicateModifier(kind) => write!(f, "{kind} is configured more than once"),
        }
    }
}

impl LaneConfig {
    /// Default location: `<config_dir>/FivePinLane/lane.json`.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load the configuration from the default location.
    /// Creates default config if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = LaneConfig::default();
            config.save_to(path)?;
            tracing::info!("Created default lane config at: {}", path.display());
            return Ok(config);
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;
        let config: LaneConfig = serde_json::from_str(&content).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        let issues = config.validate();
        if !issues.is_empty() {
            let joined = issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
            return Err(ConfigError::Invalid(joined));
        }

        tracing::info!("Loaded lane config from: {}", path.display());
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::DirectoryCreationFailed {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;
        fs::write(path, json).map_err(|e| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })
    }

    /// Every range or wiring problem in the configuration.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if !(50..=5000).contains(&self.sensor.debounce_ms) {
            issues.push(ConfigIssue::DebounceOutOfRange(self.sensor.debounce_ms));
        }
        if self.machine.detection_window_ms == 0 {
            issues.push(ConfigIssue::EmptyDetectionWindow);
        }

        let band = self.machine.calibration;
        let band_ok = band.min_ms <= band.max_ms
            && (band.min_ms..=band.max_ms).contains(&band.initial_ms)
            && (band.min_ms..=band.max_ms).contains(&band.fallback_ms);
        if !band_ok {
            issues.push(ConfigIssue::CalibrationBandInvalid);
        }

        let mut lines = vec![self.wiring.ball_sensor_gpio, self.wiring.reset_gpio];
        lines.extend_from_slice(&self.wiring.break_gpios);
        lines.sort_unstable();
        for pair in lines.windows(2) {
            if pair[0] == pair[1] && !issues.contains(&ConfigIssue::DuplicateGpio(pair[0])) {
                issues.push(ConfigIssue::DuplicateGpio(pair[0]));
            }
        }

        let inputs = self.wiring.pin_inputs.iter().chain(std::iter::once(&self.wiring.machine_pin_input));
        for input in inputs {
            if input.adc > 1 || input.input > 3 {
                issues.push(ConfigIssue::AdcInputOutOfRange {
                    adc: input.adc,
                    input: input.input,
                });
            }
        }

        if self.wiring.adc_init_attempts == 0 {
            issues.push(ConfigIssue::NoInitAttempts);
        }

        let frames_per_turn = match self.game.turn_policy {
            TurnPolicy::Rotate { frames_per_turn } => frames_per_turn,
            TurnPolicy::PairedLane {
                frames_per_turn,
                paired_lane,
                ..
            } => {
                if paired_lane == self.lane_id {
                    issues.push(ConfigIssue::PairedWithItself(paired_lane));
                }
                frames_per_turn
            }
        };
        if frames_per_turn == 0 {
            issues.push(ConfigIssue::NoFramesPerTurn);
        }

        let mut kinds = Vec::new();
        for modifier in &self.game.modifiers {
            let kind = modifier.kind();
            if kinds.contains(&kind) {
                issues.push(ConfigIssue::DuplicateModifier(kind));
            }
            kinds.push(kind);
            for frame in modifier.frames() {
                if !(1..=FRAME_COUNT).contains(&frame) {
                    issues.push(ConfigIssue::ModifierFrameOutOfRange { kind, frame });
                }
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{GameSetup, MoveMode, SessionMode, TotalFormat};
    use std::collections::BTreeMap;

    #[test]
    fn test_default_config() {
        let config = LaneConfig::default();
        assert_eq!(config.sensor.debounce_ms, 500);
        assert_eq!(config.sensor.socket_path, PathBuf::from("/tmp/ball_sensor.sock"));
        assert_eq!(config.machine.detection_window_ms, 3000);
        assert_eq!(config.machine.reset_pulse_ms, 350);
        assert_eq!(config.wiring.break_gpios, [17, 27, 22, 23, 24]);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_config_serialization() {
        let config = LaneConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: LaneConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.lane_id, deserialized.lane_id);
        assert_eq!(config.wiring.pin_inputs, deserialized.wiring.pin_inputs);
        assert_eq!(config.machine.scan_order, deserialized.machine.scan_order);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: LaneConfig = serde_json::from_str(r#"{"lane_id": 7, "sensor": {"debounce_ms": 300}}"#).unwrap();
        assert_eq!(config.lane_id, 7);
        assert_eq!(config.sensor.debounce_ms, 300);
        assert_eq!(config.sensor.channel_capacity, 64);
        assert_eq!(config.venue_name, "Centrebowl");
    }

    #[test]
    fn test_validation_reports_every_issue() {
        let mut config = LaneConfig::default();
        config.sensor.debounce_ms = 10;
        config.wiring.reset_gpio = 17;
        config.wiring.machine_pin_input = AdcInput::new(2, 0);

        let issues = config.validate();
        assert!(issues.contains(&ConfigIssue::DebounceOutOfRange(10)));
        assert!(issues.contains(&ConfigIssue::DuplicateGpio(17)));
        assert!(issues.contains(&ConfigIssue::AdcInputOutOfRange { adc: 2, input: 0 }));
        assert_eq!(issues.len(), 3);
    }

    #[test]
    fn test_game_section_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lane.json");
        fs::write(
            &path,
            r#"{
                "lane_id": 3,
                "game": {
                    "game_type": {"type": "league", "total_format": "with_handicap"},
                    "turn_policy": {"policy": "paired_lane", "frames_per_turn": 2, "paired_lane": 4},
                    "modifiers": [
                        {"kind": "free_strikes", "count": 13, "auto_free": true},
                        {"kind": "three_six_nine", "targets": {"1": [3, 6, 9]}}
                    ]
                }
            }"#,
        )
        .unwrap();

        let config = LaneConfig::load_from(&path).unwrap();
        assert_eq!(
            config.game.game_type,
            GameType::League {
                total_format: TotalFormat::WithHandicap
            }
        );
        assert_eq!(config.game.turn_policy.frames_per_turn(), 2);
        let kinds: Vec<_> = config.game.modifiers.iter().map(ModifierConfig::kind).collect();
        assert_eq!(kinds, ["free_strikes", "three_six_nine"]);

        let setup = GameSetup::from_config(&config, SessionMode::Games { total: 1 });
        assert_eq!(setup.game_type, config.game.game_type);
        assert_eq!(setup.turn_policy, config.game.turn_policy);
        assert_eq!(setup.modifiers, config.game.modifiers);
    }

    #[test]
    fn test_game_section_defaults_to_plain_five_pin() {
        let config: LaneConfig = serde_json::from_str(r#"{"lane_id": 2, "game": {"game_type": {"type": "best_ball"}}}"#).unwrap();
        assert_eq!(config.game.game_type, GameType::BestBall);
        assert_eq!(config.game.turn_policy, TurnPolicy::default());
        assert!(config.game.modifiers.is_empty());
        assert_eq!(LaneConfig::default().game.game_type, GameType::FivePin);
    }

    #[test]
    fn test_validation_checks_game_section() {
        let mut config = LaneConfig::default();
        config.game.turn_policy = TurnPolicy::PairedLane {
            frames_per_turn: 0,
            paired_lane: config.lane_id,
            move_mode: MoveMode::Team,
        };
        config.game.modifiers = vec![
            ModifierConfig::PrizeFrame {
                frames: BTreeMap::from([(1, 11)]),
            },
            ModifierConfig::Turkey,
            ModifierConfig::Turkey,
        ];

        let issues = config.validate();
        assert!(issues.contains(&ConfigIssue::PairedWithItself(1)));
        assert!(issues.contains(&ConfigIssue::NoFramesPerTurn));
        assert!(issues.contains(&ConfigIssue::ModifierFrameOutOfRange {
            kind: "prize_frame",
            frame: 11
        }));
        assert!(issues.contains(&ConfigIssue::DuplicateModifier("turkey")));
        assert_eq!(issues.len(), 4);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("lane.json");

        let created = LaneConfig::load_from(&path).unwrap();
        assert!(path.exists());

        let reloaded = LaneConfig::load_from(&path).unwrap();
        assert_eq!(created.lane_id, reloaded.lane_id);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lane.json");
        fs::write(&path, r#"{"lane_id": 1, "sensor": {"debounce_ms": 1}}"#).unwrap();

        match LaneConfig::load_from(&path) {
            Err(ConfigError::Invalid(message)) => assert!(message.contains("Debounce")),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }
}
