/// Sensor stream protocol
///
/// Newline-delimited JSON objects, one per line, UTF-8. The daemon sends
/// [`SensorMessage`]s; the consumer sends plain command lines parsed into
/// [`DaemonCommand`].
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::IpcError;

/// Daemon to consumer messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SensorMessage {
    BallDetected {
        timestamp: f64,
    },
    LastBall {
        timestamp: f64,
    },
    /// Externally observed pin positions, fields forwarded verbatim
    PinSet {
        #[serde(flatten)]
        fields: Map<String, Value>,
    },
    Ack {
        cmd: String,
    },
}

impl SensorMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            SensorMessage::BallDetected { .. } => "ball_detected",
            SensorMessage::LastBall { .. } => "last_ball",
            SensorMessage::PinSet { .. } => "pin_set",
            SensorMessage::Ack { .. } => "ack",
        }
    }

    /// One framed line, including the trailing newline.
    pub fn to_line(&self) -> Result<String, IpcError> {
        let mut line = serde_json::to_string(self).map_err(|e| IpcError::MalformedFrame {
            line: self.kind().to_string(),
            source: e,
        })?;
        line.push('\n');
        Ok(line)
    }

    pub fn from_line(line: &str) -> Result<Self, IpcError> {
        serde_json::from_str(line.trim()).map_err(|e| IpcError::MalformedFrame {
            line: line.trim().to_string(),
            source: e,
        })
    }
}

/// Consumer to daemon command lines.
#[derive(Debug, Clone, PartialEq)]
pub enum DaemonCommand {
    LastBall,
    /// `PIN_SET <json>`; an object is forwarded as-is, anything else under `pins`
    PinSet(Map<String, Value>),
    /// `PIN_SET` whose payload is not JSON
    MalformedPinSet { line: String, error: String },
    /// Anything else; acknowledged and otherwise ignored
    Other(String),
}

impl DaemonCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line == "LAST_BALL" {
            return DaemonCommand::LastBall;
        }

        let pin_set = line
            .strip_prefix("PIN_SET")
            .filter(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace));
        if let Some(rest) = pin_set {
            return match serde_json::from_str::<Value>(rest.trim()) {
                Ok(Value::Object(fields)) => DaemonCommand::PinSet(fields),
                Ok(other) => {
                    let mut fields = Map::new();
                    fields.insert("pins".to_string(), other);
                    DaemonCommand::PinSet(fields)
                }
                Err(err) => DaemonCommand::MalformedPinSet {
                    line: line.to_string(),
                    error: err.to_string(),
                },
            };
        }

        DaemonCommand::Other(line.to_string())
    }

    /// Command line as written to the daemon, with trailing newline.
    pub fn to_line(&self) -> String {
        match self {
            DaemonCommand::LastBall => "LAST_BALL\n".to_string(),
            DaemonCommand::PinSet(fields) => format!("PIN_SET {}\n", Value::Object(fields.clone())),
            DaemonCommand::MalformedPinSet { line, .. } | DaemonCommand::Other(line) => format!("{line}\n"),
        }
    }
}

/// Suspend/resume handshake from the bridge to the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Suspend,
    Resume,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ball_detected_wire_shape() {
        let line = SensorMessage::BallDetected { timestamp: 1.5 }.to_line().unwrap();
        assert_eq!(line, "{\"type\":\"ball_detected\",\"timestamp\":1.5}\n");
    }

    #[test]
    fn test_pin_set_fields_are_flat() {
        let mut fields = Map::new();
        fields.insert("pins".to_string(), json!([1, 0, 1, 0, 0]));
        let line = SensorMessage::PinSet { fields }.to_line().unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value, json!({"type": "pin_set", "pins": [1, 0, 1, 0, 0]}));

        let back = SensorMessage::from_line(&line).unwrap();
        match back {
            SensorMessage::PinSet { fields } => assert_eq!(fields["pins"], json!([1, 0, 1, 0, 0])),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_malformed_line() {
        assert!(matches!(
            SensorMessage::from_line("{\"type\":\"bogus\"}"),
            Err(IpcError::MalformedFrame { .. })
        ));
        assert!(SensorMessage::from_line("not json").is_err());
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(DaemonCommand::parse("LAST_BALL\n"), DaemonCommand::LastBall);
        assert_eq!(DaemonCommand::parse("HELLO"), DaemonCommand::Other("HELLO".to_string()));

        match DaemonCommand::parse("PIN_SET {\"lane\": 3, \"pins\": [0,0,1,0,0]}") {
            DaemonCommand::PinSet(fields) => {
                assert_eq!(fields["lane"], json!(3));
                assert_eq!(fields["pins"], json!([0, 0, 1, 0, 0]));
            }
            other => panic!("unexpected {other:?}"),
        }

        match DaemonCommand::parse("PIN_SET [1,1,0,0,0]") {
            DaemonCommand::PinSet(fields) => assert_eq!(fields["pins"], json!([1, 1, 0, 0, 0])),
            other => panic!("unexpected {other:?}"),
        }

        assert!(matches!(
            DaemonCommand::parse("PIN_SET [1,1,"),
            DaemonCommand::MalformedPinSet { .. }
        ));
    }

    #[test]
    fn test_pin_set_needs_a_separator() {
        assert_eq!(
            DaemonCommand::parse("PIN_SETxyz [0,0,1,0,0]"),
            DaemonCommand::Other("PIN_SETxyz [0,0,1,0,0]".to_string())
        );
        assert!(matches!(
            DaemonCommand::parse("PIN_SET\t[0,0,1,0,0]"),
            DaemonCommand::PinSet(_)
        ));
        assert!(matches!(DaemonCommand::parse("PIN_SET"), DaemonCommand::MalformedPinSet { .. }));
    }
}
