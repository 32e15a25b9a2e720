//! Error types for agent-stream.
//!
//! Errors are split into two categories:
//! - **Fatal errors** ([`AgentStreamError`]): Prevent the session from starting
//! - **Recoverable errors** ([`TransportError`]): Per-connection or per-message
//!   failures handled by the reconnect path or surfaced via
//!   [`EventCallback`](crate::EventCallback)

/// Fatal errors that prevent a streaming session from starting.
///
/// These errors are returned from [`AgentStreamBuilder::start()`] and indicate
/// that the session cannot be created. Runtime issues (dropped connections,
/// failed sends, buffer overflow) are handled via reconnection and the event
/// callback instead.
///
/// [`AgentStreamBuilder::start()`]: crate::AgentStreamBuilder::start
#[derive(Debug, thiserror::Error)]
pub enum AgentStreamError {
    /// The requested audio device was not found.
    #[error("device not found: {name}")]
    DeviceNotFound {
        /// Name of the device that wasn't found.
        name: String,
    },

    /// No default input device is configured on this system.
    #[error("no default input device configured")]
    NoDefaultInputDevice,

    /// No default output device is configured on this system.
    #[error("no default output device configured")]
    NoDefaultOutputDevice,

    /// Permission to capture audio was denied.
    ///
    /// On macOS, check System Preferences > Security & Privacy > Microphone.
    #[error("permission denied for audio capture (check OS settings)")]
    PermissionDenied,

    /// The requested sample format is not supported by the device.
    #[error("unsupported sample format: {format}")]
    UnsupportedFormat {
        /// The format that wasn't supported.
        format: String,
    },

    /// An error from the underlying audio library (CPAL).
    #[error("audio backend error: {0}")]
    BackendError(String),

    /// The configured base URL could not be parsed or the HTTP client could
    /// not be constructed from it.
    #[error("invalid agent endpoint '{url}': {reason}")]
    InvalidEndpoint {
        /// The offending URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The session was asked to send while no connection exists.
    ///
    /// `send_text` treats this as a silent no-op; it only surfaces from
    /// lower-level send paths used directly.
    #[error("not connected")]
    NotConnected,
}

/// Recoverable transport failures.
///
/// Connection-level variants (`OpenFailed`, `Stream`) tear down the current
/// downstream channel and trigger the reconnect path. Message-level variants
/// (`Protocol`, `SendRejected`) discard a single message and leave the
/// connection up.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The downstream event channel could not be opened.
    #[error("failed to open event stream: {reason}")]
    OpenFailed {
        /// Description of the failure.
        reason: String,
    },

    /// The downstream event channel dropped mid-stream.
    #[error("event stream error: {reason}")]
    Stream {
        /// Description of the failure.
        reason: String,
    },

    /// The server rejected an upstream message.
    #[error("send rejected with status {status}")]
    SendRejected {
        /// HTTP status code returned by the server.
        status: u16,
    },

    /// An upstream message could not be delivered.
    #[error("send failed: {reason}")]
    SendFailed {
        /// Description of the failure.
        reason: String,
    },

    /// The server sent a payload that could not be decoded.
    ///
    /// Malformed JSON or malformed base64 both fail closed: the message is
    /// discarded and the connection stays up.
    #[error("protocol error: {reason}")]
    Protocol {
        /// What was wrong with the payload.
        reason: String,
    },
}

impl TransportError {
    /// Creates a protocol error with the given reason.
    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error discards a single message rather than
    /// the whole connection.
    pub fn is_message_level(&self) -> bool {
        matches!(
            self,
            Self::Protocol { .. } | Self::SendRejected { .. } | Self::SendFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_stream_error_display() {
        let err = AgentStreamError::DeviceNotFound {
            name: "USB Mic".to_string(),
        };
        assert_eq!(err.to_string(), "device not found: USB Mic");
    }

    #[test]
    fn test_transport_error_protocol() {
        let err = TransportError::protocol("bad base64");
        assert_eq!(err.to_string(), "protocol error: bad base64");
        assert!(err.is_message_level());
    }

    #[test]
    fn test_transport_error_stream_is_connection_level() {
        let err = TransportError::Stream {
            reason: "reset by peer".to_string(),
        };
        assert!(!err.is_message_level());
    }

    #[test]
    fn test_send_rejected_display() {
        let err = TransportError::SendRejected { status: 503 };
        assert_eq!(err.to_string(), "send rejected with status 503");
    }
}
