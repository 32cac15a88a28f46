//! Decoding of remote-control payloads into typed commands.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// A validated remote-control request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RemoteCommand {
    TogglePlay,
    Stop,
    SeekTo(f64),
}

impl RemoteCommand {
    /// Wire name of the method.
    pub fn method(&self) -> &'static str {
        match self {
            RemoteCommand::TogglePlay => "togglePlay",
            RemoteCommand::Stop => "stop",
            RemoteCommand::SeekTo(_) => "seekTo",
        }
    }

    /// Decode `payload`, accepting only messages tagged with `origin`.
    /// Rejected payloads are logged at debug level and yield `None`.
    pub fn parse(payload: &str, origin: &str) -> Option<Self> {
        match decode(payload, origin) {
            Ok(command) => Some(command),
            Err(e) => {
                debug!(error = %e, "Dropping remote message");
                None
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub(crate) enum ProtocolError {
    #[error("payload is not a JSON object: {0}")]
    Malformed(String),

    #[error("unexpected origin {0:?}")]
    ForeignOrigin(Option<String>),

    #[error("unknown method {0:?}")]
    UnknownMethod(Option<String>),

    #[error("seekTo requires a numeric value, got {0}")]
    InvalidSeekValue(String),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    value: Option<Value>,
}

pub(crate) fn decode(payload: &str, origin: &str) -> Result<RemoteCommand, ProtocolError> {
    let envelope: Envelope =
        serde_json::from_str(payload).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

    if envelope.from.as_deref() != Some(origin) {
        return Err(ProtocolError::ForeignOrigin(envelope.from));
    }

    match envelope.method.as_deref() {
        Some("togglePlay") => Ok(RemoteCommand::TogglePlay),
        Some("stop") => Ok(RemoteCommand::Stop),
        Some("seekTo") => match envelope.value {
            Some(Value::Number(n)) => n
                .as_f64()
                .map(RemoteCommand::SeekTo)
                .ok_or_else(|| ProtocolError::InvalidSeekValue(n.to_string())),
            other => Err(ProtocolError::InvalidSeekValue(
                other.map_or_else(|| "nothing".to_string(), |v| v.to_string()),
            )),
        },
        _ => Err(ProtocolError::UnknownMethod(envelope.method)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "audiusapi";

    #[test]
    fn decodes_known_methods() {
        assert_eq!(
            decode(r#"{"from":"audiusapi","method":"togglePlay"}"#, ORIGIN),
            Ok(RemoteCommand::TogglePlay)
        );
        assert_eq!(
            decode(r#"{"from":"audiusapi","method":"stop","value":3}"#, ORIGIN),
            Ok(RemoteCommand::Stop)
        );
        assert_eq!(
            decode(r#"{"from":"audiusapi","method":"seekTo","value":42.5}"#, ORIGIN),
            Ok(RemoteCommand::SeekTo(42.5))
        );
    }

    #[test]
    fn origin_must_match_exactly() {
        assert!(matches!(
            decode(r#"{"from":"AudiusAPI","method":"stop"}"#, ORIGIN),
            Err(ProtocolError::ForeignOrigin(_))
        ));
        assert!(matches!(
            decode(r#"{"method":"stop"}"#, ORIGIN),
            Err(ProtocolError::ForeignOrigin(None))
        ));
    }

    #[test]
    fn seek_needs_a_number() {
        assert!(matches!(
            decode(r#"{"from":"audiusapi","method":"seekTo"}"#, ORIGIN),
            Err(ProtocolError::InvalidSeekValue(_))
        ));
        assert!(matches!(
            decode(r#"{"from":"audiusapi","method":"seekTo","value":"12"}"#, ORIGIN),
            Err(ProtocolError::InvalidSeekValue(_))
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(decode("not json", ORIGIN), Err(ProtocolError::Malformed(_))));
        assert!(matches!(decode("[1,2]", ORIGIN), Err(ProtocolError::Malformed(_))));
        assert!(matches!(
            decode(r#"{"from":"audiusapi","method":"play"}"#, ORIGIN),
            Err(ProtocolError::UnknownMethod(Some(_)))
        ));
        assert_eq!(RemoteCommand::parse(r#"{"from":"x"}"#, ORIGIN), None);
    }
}
