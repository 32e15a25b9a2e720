//! Transport layer: the seam between the session controller and the agent
//! service.
//!
//! [`Transport`] is the trait the controller talks to; [`HttpTransport`] is
//! the production implementation (long-lived SSE downstream, `POST` upstream).
//! Tests implement the trait with in-memory mocks, so the whole state machine
//! runs without a network.

use async_trait::async_trait;
use bytes::BytesMut;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde::Deserialize;

use crate::error::{AgentStreamError, TransportError};
use crate::wire::{sse_payload, Outbound, WireMessage};

/// The downstream event channel: an ordered stream of parsed wire messages.
///
/// Message-level failures (malformed payloads) appear as `Err` items with
/// [`TransportError::is_message_level()`] true; the stream continues after
/// them. Connection-level failures end the stream.
pub type EventStream = BoxStream<'static, Result<WireMessage, TransportError>>;

/// Bidirectional transport to the agent service.
///
/// `open_events` establishes the long-lived downstream channel for a session;
/// `send` posts one upstream message. Both are parameterized by the opaque
/// client-generated session id.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens the downstream event channel for `session_id`.
    ///
    /// `is_audio` selects whether the agent replies with synthesized audio
    /// or plain text.
    async fn open_events(
        &self,
        session_id: &str,
        is_audio: bool,
    ) -> Result<EventStream, TransportError>;

    /// Posts one upstream message. Fire-and-forget, at-most-once: a failure
    /// drops the message, it is never retried.
    async fn send(&self, session_id: &str, message: &Outbound) -> Result<(), TransportError>;
}

/// Camera subsystem status as reported by `GET /agent/camera/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct CameraStatus {
    /// `"running"` or `"stopped"`.
    pub status: String,
    /// Whether the video capture device is open, when running.
    pub monitoring: Option<bool>,
}

/// HTTP implementation of [`Transport`].
///
/// Downstream: `GET {base}/events/{session_id}?is_audio={bool}` consumed as
/// server-sent events. Upstream: `POST {base}/send/{session_id}` with a JSON
/// `{mime_type, data}` body.
pub struct HttpTransport {
    client: reqwest::Client,
    base: reqwest::Url,
}

impl HttpTransport {
    /// Creates a transport against the given base URL.
    pub fn new(base_url: &str) -> Result<Self, AgentStreamError> {
        let mut base =
            reqwest::Url::parse(base_url).map_err(|e| AgentStreamError::InvalidEndpoint {
                url: base_url.to_string(),
                reason: e.to_string(),
            })?;
        if base.cannot_be_a_base() {
            return Err(AgentStreamError::InvalidEndpoint {
                url: base_url.to_string(),
                reason: "not a base URL".to_string(),
            });
        }
        // join() drops the last path segment of a base without a trailing slash
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base,
        })
    }

    fn endpoint(&self, path: &str) -> Result<reqwest::Url, TransportError> {
        self.base
            .join(path)
            .map_err(|e| TransportError::protocol(format!("bad endpoint path '{path}': {e}")))
    }

    /// Fetches the contents of a server-side log (`"audio"` or `"camera"`).
    ///
    /// Returns the raw JSON entries; a missing or empty log yields an empty
    /// list.
    pub async fn fetch_logs(
        &self,
        log_type: &str,
    ) -> Result<Vec<serde_json::Value>, TransportError> {
        let url = self.endpoint(&format!("logs/{log_type}"))?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::SendFailed {
                reason: e.to_string(),
            })?;

        response
            .json()
            .await
            .map_err(|e| TransportError::protocol(format!("invalid log payload: {e}")))
    }

    /// Fetches the camera subsystem status.
    pub async fn camera_status(&self) -> Result<CameraStatus, TransportError> {
        let url = self.endpoint("agent/camera/status")?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::SendFailed {
                reason: e.to_string(),
            })?;

        response
            .json()
            .await
            .map_err(|e| TransportError::protocol(format!("invalid status payload: {e}")))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open_events(
        &self,
        session_id: &str,
        is_audio: bool,
    ) -> Result<EventStream, TransportError> {
        let mut url = self.endpoint(&format!("events/{session_id}"))?;
        url.query_pairs_mut()
            .append_pair("is_audio", if is_audio { "true" } else { "false" });

        tracing::debug!(%url, "opening event stream");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::OpenFailed {
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(TransportError::OpenFailed {
                reason: format!("server returned {}", response.status()),
            });
        }

        Ok(sse_events(response.bytes_stream().boxed()))
    }

    async fn send(&self, session_id: &str, message: &Outbound) -> Result<(), TransportError> {
        let url = self.endpoint(&format!("send/{session_id}"))?;

        let response = self
            .client
            .post(url)
            .json(message)
            .send()
            .await
            .map_err(|e| TransportError::SendFailed {
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(TransportError::SendRejected {
                status: response.status().as_u16(),
            });
        }

        Ok(())
    }
}

/// State threaded through the SSE `unfold` stream.
struct SseState {
    stream: BoxStream<'static, Result<bytes::Bytes, reqwest::Error>>,
    buf: BytesMut,
    done: bool,
}

/// Converts a raw SSE byte stream into a stream of parsed [`WireMessage`]s.
///
/// Buffers bytes until a complete line is available, skips keepalive
/// comments and event separators, and parses each `data:` payload. Parse
/// failures are yielded as message-level errors; the stream continues.
fn sse_events(byte_stream: BoxStream<'static, Result<bytes::Bytes, reqwest::Error>>) -> EventStream {
    let state = SseState {
        stream: byte_stream,
        buf: BytesMut::new(),
        done: false,
    };

    futures_util::stream::unfold(state, |mut st| async move {
        if st.done {
            return None;
        }

        loop {
            // Try to extract a complete line from the buffer first.
            if let Some(line_end) = st.buf.iter().position(|&b| b == b'\n') {
                let line = st.buf.split_to(line_end + 1);
                let line_str = String::from_utf8_lossy(&line);

                let Some(payload) = sse_payload(&line_str) else {
                    continue;
                };

                return Some((WireMessage::from_json(payload), st));
            }

            // Need more bytes.
            match st.stream.next().await {
                Some(Ok(bytes)) => st.buf.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    st.done = true;
                    return Some((
                        Err(TransportError::Stream {
                            reason: e.to_string(),
                        }),
                        st,
                    ));
                }
                None => return None,
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn byte_chunks(chunks: Vec<&'static [u8]>) -> BoxStream<'static, Result<bytes::Bytes, reqwest::Error>> {
        futures_util::stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok(bytes::Bytes::from_static(c))),
        )
        .boxed()
    }

    #[tokio::test]
    async fn test_sse_events_parses_messages() {
        let stream = byte_chunks(vec![
            b"data: {\"mime_type\":\"text/plain\",\"data\":\"hi\"}\n\n",
            b"data: {\"turn_complete\":true}\n\n",
        ]);

        let messages: Vec<_> = sse_events(stream).collect().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(
            *messages[0].as_ref().unwrap(),
            WireMessage::Text("hi".to_string())
        );
        assert_eq!(
            *messages[1].as_ref().unwrap(),
            WireMessage::TurnComplete { interrupted: false }
        );
    }

    #[tokio::test]
    async fn test_sse_events_reassembles_split_lines() {
        // One event arriving across three TCP chunks
        let stream = byte_chunks(vec![
            b"data: {\"mime_type\":",
            b"\"text/plain\",\"data\"",
            b":\"split\"}\n",
        ]);

        let messages: Vec<_> = sse_events(stream).collect().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(
            *messages[0].as_ref().unwrap(),
            WireMessage::Text("split".to_string())
        );
    }

    #[tokio::test]
    async fn test_sse_events_skips_comments_and_blanks() {
        let stream = byte_chunks(vec![b": keepalive\n\ndata: {\"turn_complete\":true}\n"]);

        let messages: Vec<_> = sse_events(stream).collect().await;
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn test_sse_events_yields_protocol_error_and_continues() {
        let stream = byte_chunks(vec![b"data: {broken\ndata: {\"turn_complete\":true}\n"]);

        let messages: Vec<_> = sse_events(stream).collect().await;
        assert_eq!(messages.len(), 2);
        assert!(messages[0].as_ref().unwrap_err().is_message_level());
        assert!(messages[1].is_ok());
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(HttpTransport::new("not a url").is_err());
    }

    #[test]
    fn test_endpoint_join() {
        let transport = HttpTransport::new("http://localhost:8000/").unwrap();
        let url = transport.endpoint("send/abc123").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/send/abc123");
    }

    #[test]
    fn test_endpoint_join_keeps_base_path() {
        let transport = HttpTransport::new("http://localhost:8000/api").unwrap();
        let url = transport.endpoint("send/abc123").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/send/abc123");
    }
}
