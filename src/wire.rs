//! Wire protocol: message types, JSON envelopes, and transport encoding.
//!
//! The downstream channel carries server-sent events whose payloads are JSON
//! objects of the shape `{error?, turn_complete?, interrupted?, mime_type?,
//! data?}`. Audio payloads are base64-encoded little-endian PCM16; text
//! payloads are raw strings. The upstream path posts the same
//! `{mime_type, data}` pair.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Mime type for linear PCM16 audio payloads.
pub const MIME_AUDIO_PCM: &str = "audio/pcm";
/// Mime type for text payloads.
pub const MIME_TEXT_PLAIN: &str = "text/plain";

/// A message received on the downstream event channel.
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    /// A chunk of synthesized agent audio.
    Audio {
        /// Decoded payload bytes (little-endian PCM16 for `audio/pcm`).
        data: Vec<u8>,
        /// Mime type as sent by the server. Only `audio/pcm` is played;
        /// other audio encodings are discarded.
        mime_type: String,
    },

    /// A fragment of agent text output.
    Text(String),

    /// The agent finished (or was interrupted during) a response turn.
    TurnComplete {
        /// `true` when the turn ended due to user barge-in.
        interrupted: bool,
    },

    /// The server reported an error inside the stream.
    Error(String),
}

/// Downstream JSON envelope, exactly as the server serializes it.
#[derive(Debug, Deserialize)]
struct Envelope {
    error: Option<String>,
    turn_complete: Option<bool>,
    interrupted: Option<bool>,
    mime_type: Option<String>,
    data: Option<String>,
}

impl WireMessage {
    /// Parses one event payload (the JSON after an SSE `data:` prefix).
    ///
    /// Malformed JSON and malformed base64 both fail closed with a
    /// [`TransportError::Protocol`]; the caller discards the message and
    /// keeps the connection up.
    pub fn from_json(payload: &str) -> Result<Self, TransportError> {
        let envelope: Envelope = serde_json::from_str(payload)
            .map_err(|e| TransportError::protocol(format!("invalid event JSON: {e}")))?;

        if let Some(message) = envelope.error {
            return Ok(Self::Error(message));
        }

        if envelope.turn_complete.is_some() || envelope.interrupted.is_some() {
            return Ok(Self::TurnComplete {
                interrupted: envelope.interrupted.unwrap_or(false),
            });
        }

        match (envelope.mime_type, envelope.data) {
            (Some(mime), Some(data)) if mime.starts_with("audio/") => Ok(Self::Audio {
                data: decode(&data)?,
                mime_type: mime,
            }),
            (Some(mime), Some(data)) if mime == MIME_TEXT_PLAIN => Ok(Self::Text(data)),
            (Some(mime), _) => Err(TransportError::protocol(format!(
                "unsupported mime type: {mime}"
            ))),
            _ => Err(TransportError::protocol("event missing mime_type/data")),
        }
    }
}

/// An upstream message posted to `POST /send/{session_id}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Outbound {
    /// `audio/pcm` or `text/plain`.
    pub mime_type: String,
    /// Base64 PCM16 for audio, raw text otherwise.
    pub data: String,
}

impl Outbound {
    /// Builds a text message.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            mime_type: MIME_TEXT_PLAIN.to_string(),
            data: text.into(),
        }
    }

    /// Builds an audio message from raw little-endian PCM16 bytes.
    pub fn audio_pcm(bytes: &[u8]) -> Self {
        Self {
            mime_type: MIME_AUDIO_PCM.to_string(),
            data: encode(bytes),
        }
    }
}

/// Encodes a byte buffer to the text-safe transport representation.
///
/// Round-trips exactly with [`decode`] for all byte sequences, including
/// empty input.
pub fn encode(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decodes the text-safe transport representation back to bytes.
pub fn decode(text: &str) -> Result<Vec<u8>, TransportError> {
    BASE64
        .decode(text)
        .map_err(|e| TransportError::protocol(format!("invalid base64: {e}")))
}

/// Reinterprets little-endian PCM16 bytes as samples.
///
/// A trailing odd byte is dropped; the server always sends whole samples,
/// so an odd length indicates truncation somewhere upstream.
pub fn bytes_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Extracts the JSON payload from one SSE line, if it carries one.
///
/// Empty lines (event separators) and comment lines return `None`.
pub fn sse_payload(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(':') {
        return None;
    }
    trimmed.strip_prefix("data:").map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let cases: &[&[u8]] = &[b"", b"\x00", b"hello", &[0xFF, 0x00, 0x80, 0x7F]];
        for &bytes in cases {
            let text = encode(bytes);
            assert_eq!(decode(&text).unwrap(), bytes);
        }
    }

    #[test]
    fn test_decode_rejects_malformed() {
        let err = decode("not base64!!").unwrap_err();
        assert!(err.is_message_level());
    }

    #[test]
    fn test_parse_audio_chunk() {
        // "AAA=" decodes to [0x00, 0x00]
        let msg = WireMessage::from_json(r#"{"mime_type":"audio/pcm","data":"AAA="}"#).unwrap();
        assert_eq!(
            msg,
            WireMessage::Audio {
                data: vec![0, 0],
                mime_type: "audio/pcm".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_text_chunk() {
        let msg = WireMessage::from_json(r#"{"mime_type":"text/plain","data":"hi"}"#).unwrap();
        assert_eq!(msg, WireMessage::Text("hi".to_string()));
    }

    #[test]
    fn test_parse_turn_complete() {
        let msg = WireMessage::from_json(r#"{"turn_complete":true,"interrupted":false}"#).unwrap();
        assert_eq!(msg, WireMessage::TurnComplete { interrupted: false });

        let msg = WireMessage::from_json(r#"{"turn_complete":false,"interrupted":true}"#).unwrap();
        assert_eq!(msg, WireMessage::TurnComplete { interrupted: true });
    }

    #[test]
    fn test_parse_error_takes_precedence() {
        let msg =
            WireMessage::from_json(r#"{"error":"boom","mime_type":"text/plain","data":"x"}"#)
                .unwrap();
        assert_eq!(msg, WireMessage::Error("boom".to_string()));
    }

    #[test]
    fn test_parse_malformed_json_fails_closed() {
        assert!(WireMessage::from_json("{not json").is_err());
    }

    #[test]
    fn test_parse_malformed_base64_fails_closed() {
        let result = WireMessage::from_json(r#"{"mime_type":"audio/pcm","data":"!!!"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_unsupported_mime() {
        let result = WireMessage::from_json(r#"{"mime_type":"image/png","data":"AAA="}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_outbound_text_serializes() {
        let out = Outbound::text("hello");
        let json = serde_json::to_string(&out).unwrap();
        assert_eq!(json, r#"{"mime_type":"text/plain","data":"hello"}"#);
    }

    #[test]
    fn test_outbound_audio_encodes() {
        let out = Outbound::audio_pcm(&[0x01, 0x02]);
        assert_eq!(out.mime_type, "audio/pcm");
        assert_eq!(decode(&out.data).unwrap(), vec![0x01, 0x02]);
    }

    #[test]
    fn test_bytes_to_samples() {
        assert_eq!(bytes_to_samples(&[0x02, 0x01, 0xFE, 0xFF]), vec![258, -2]);
        // Trailing odd byte dropped
        assert_eq!(bytes_to_samples(&[0x02, 0x01, 0xAA]), vec![258]);
        assert!(bytes_to_samples(&[]).is_empty());
    }

    #[test]
    fn test_sse_payload() {
        assert_eq!(sse_payload("data: {\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(sse_payload("data:{\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(sse_payload(""), None);
        assert_eq!(sse_payload(": keepalive"), None);
        assert_eq!(sse_payload("event: message"), None);
    }
}
