//! Session controller: connection lifecycle, message dispatch, reconnection.
//!
//! The controller owns the downstream event channel. Its state machine is:
//!
//! ```text
//! Idle ──start──▶ Connecting ──open ok──▶ Connected
//! Connected ──AudioChunk──▶ Speaking
//! Connected ──TextChunk───▶ Responding
//! Speaking / Responding ──TurnComplete──▶ Connected
//! any non-Idle ──transport failure──▶ ConnError ──3s──▶ Connecting
//! any ──stop──▶ Idle
//! ```
//!
//! Every downstream message goes through a single [`Dispatcher::handle`]
//! entry point, so the whole machine is testable without a network.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::mpsc;

use crate::config::Mode;
use crate::error::TransportError;
use crate::event::{EventCallback, SessionEvent};
use crate::frame::AudioFrame;
use crate::pipeline::PlaybackProducer;
use crate::session::SessionState;
use crate::transport::Transport;
use crate::wire::{bytes_to_samples, Outbound, WireMessage, MIME_AUDIO_PCM};

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// No downstream connection; the send path is disabled.
    Idle = 0,
    /// Opening the downstream event channel.
    Connecting = 1,
    /// Event channel open; send path enabled; agent quiet.
    Connected = 2,
    /// The agent is streaming synthesized audio.
    Speaking = 3,
    /// The agent is streaming a text response.
    Responding = 4,
    /// The transport failed; a reconnect is scheduled.
    ConnError = 5,
}

impl ConnectionState {
    /// Returns `true` if the send path is enabled in this state.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected | Self::Speaking | Self::Responding)
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Speaking,
            4 => Self::Responding,
            5 => Self::ConnError,
            _ => Self::Idle,
        }
    }
}

/// Commands accepted by the controller task.
#[derive(Debug)]
pub(crate) enum ControlCommand {
    /// Intentional close: tear down without scheduling a reconnect.
    Stop,
}

/// Dispatches downstream messages: one entry point per event, no I/O.
pub(crate) struct Dispatcher {
    state: Arc<SessionState>,
    playback: Option<PlaybackProducer>,
    /// Accumulated text of the current response turn.
    response: String,
    events: Option<EventCallback>,
}

impl Dispatcher {
    pub fn new(
        state: Arc<SessionState>,
        playback: Option<PlaybackProducer>,
        events: Option<EventCallback>,
    ) -> Self {
        Self {
            state,
            playback,
            response: String::new(),
            events,
        }
    }

    /// Resets per-connection state. Called on every (re)connect.
    pub fn reset(&mut self) {
        self.response.clear();
    }

    /// Accumulated text of the in-progress turn.
    #[cfg(test)]
    pub fn response(&self) -> &str {
        &self.response
    }

    /// Handles one downstream message.
    pub fn handle(&mut self, message: WireMessage) {
        match message {
            WireMessage::Audio { data, mime_type } => self.handle_audio(&data, &mime_type),
            WireMessage::Text(text) => {
                self.state.set_connection(ConnectionState::Responding);
                self.response.push_str(&text);
                self.emit(SessionEvent::TextDelta { text });
            }
            WireMessage::TurnComplete { interrupted } => {
                if interrupted {
                    if let Some(playback) = &self.playback {
                        playback.flush();
                    }
                }
                self.response.clear();
                self.state.set_connection(ConnectionState::Connected);
                self.emit(SessionEvent::TurnComplete { interrupted });
            }
            WireMessage::Error(message) => {
                // Server-side error: surfaced, but the connection stays up
                tracing::warn!("agent error: {message}");
                self.emit(SessionEvent::AgentError { message });
            }
        }
    }

    /// Handles a message-level decode failure: discard and surface.
    pub fn handle_protocol_error(&mut self, error: &TransportError) {
        tracing::warn!("discarding malformed event: {error}");
        self.emit(SessionEvent::AgentError {
            message: error.to_string(),
        });
    }

    fn handle_audio(&mut self, data: &[u8], mime_type: &str) {
        if mime_type != MIME_AUDIO_PCM {
            // Other encodings (e.g. audio/opus) are out of scope
            tracing::debug!(mime_type, "discarding non-PCM audio chunk");
            return;
        }

        self.state.set_connection(ConnectionState::Speaking);

        let samples = bytes_to_samples(data);
        self.state
            .samples_enqueued
            .fetch_add(samples.len() as u64, Ordering::SeqCst);

        if let Some(playback) = &mut self.playback {
            let dropped = playback.push(&samples);
            if dropped > 0 {
                tracing::warn!(dropped, "playback queue full, dropping agent audio");
                self.emit(SessionEvent::PlaybackOverflow {
                    dropped_samples: dropped,
                });
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(ref callback) = self.events {
            callback(event);
        }
    }
}

/// Owns the downstream connection for the lifetime of a session.
pub(crate) struct SessionController {
    transport: Arc<dyn Transport>,
    session_id: String,
    mode: Mode,
    state: Arc<SessionState>,
    dispatcher: Dispatcher,
    cmd_rx: mpsc::Receiver<ControlCommand>,
    events: Option<EventCallback>,
    reconnect_delay: Duration,
}

impl SessionController {
    pub fn new(
        transport: Arc<dyn Transport>,
        session_id: String,
        mode: Mode,
        state: Arc<SessionState>,
        dispatcher: Dispatcher,
        cmd_rx: mpsc::Receiver<ControlCommand>,
        events: Option<EventCallback>,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            transport,
            session_id,
            mode,
            state,
            dispatcher,
            cmd_rx,
            events,
            reconnect_delay,
        }
    }

    /// Runs until stopped. Reconnects forever on transport failure, with a
    /// fixed delay and the original mode preserved.
    pub async fn run(mut self) {
        while self.state.running.load(Ordering::SeqCst) {
            self.state.set_connection(ConnectionState::Connecting);

            let reason = match self
                .transport
                .open_events(&self.session_id, self.mode.is_audio())
                .await
            {
                Ok(events) => {
                    self.dispatcher.reset();
                    self.state.set_connection(ConnectionState::Connected);
                    self.emit(SessionEvent::Connected);
                    tracing::info!(session_id = %self.session_id, "event stream open");

                    match self.pump_events(events).await {
                        StreamEnd::Stopped => break,
                        StreamEnd::Failed(reason) => reason,
                    }
                }
                Err(e) => e.to_string(),
            };

            if !self.state.running.load(Ordering::SeqCst) {
                break;
            }

            self.state.set_connection(ConnectionState::ConnError);
            self.state.reconnects.fetch_add(1, Ordering::SeqCst);
            self.emit(SessionEvent::Disconnected {
                reason: reason.clone(),
            });
            self.emit(SessionEvent::Reconnecting {
                delay: self.reconnect_delay,
            });
            tracing::warn!(
                session_id = %self.session_id,
                delay = ?self.reconnect_delay,
                "connection lost ({reason}), reconnecting"
            );

            // The sleep races the command channel so stop() cancels the
            // reconnect timer immediately.
            tokio::select! {
                _ = tokio::time::sleep(self.reconnect_delay) => {}
                _ = self.cmd_rx.recv() => break,
            }
        }

        self.state.set_connection(ConnectionState::Idle);
        tracing::debug!(session_id = %self.session_id, "controller exited");
    }

    /// Dispatches messages until the stream ends or a stop arrives.
    async fn pump_events(
        &mut self,
        mut events: crate::transport::EventStream,
    ) -> StreamEnd {
        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    // Stop or handle dropped: intentional close either way
                    let _ = cmd;
                    return StreamEnd::Stopped;
                }
                item = events.next() => match item {
                    Some(Ok(message)) => self.dispatcher.handle(message),
                    Some(Err(e)) if e.is_message_level() => {
                        self.dispatcher.handle_protocol_error(&e);
                    }
                    Some(Err(e)) => return StreamEnd::Failed(e.to_string()),
                    None => return StreamEnd::Failed("server closed event stream".to_string()),
                },
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(ref callback) = self.events {
            callback(event);
        }
    }
}

/// Why the connected inner loop ended.
enum StreamEnd {
    /// Explicit stop; do not reconnect.
    Stopped,
    /// Transport failure; reconnect after the fixed delay.
    Failed(String),
}

/// Forwards captured frames to the upstream send path.
///
/// Frames arriving while disconnected are dropped: real-time audio has no
/// redelivery semantics, and buffering across an outage would only replay
/// stale speech.
pub(crate) async fn upstream_pump(
    transport: Arc<dyn Transport>,
    session_id: String,
    state: Arc<SessionState>,
    mut frame_rx: mpsc::Receiver<AudioFrame>,
    events: Option<EventCallback>,
) {
    while let Some(frame) = frame_rx.recv().await {
        if !state.connection().is_connected() {
            continue;
        }

        let message = Outbound::audio_pcm(&frame.to_le_bytes());
        match transport.send(&session_id, &message).await {
            Ok(()) => {
                state.frames_sent.fetch_add(1, Ordering::SeqCst);
            }
            Err(e) => {
                // Dropped, never retried
                tracing::warn!("audio send failed: {e}");
                if let Some(ref callback) = events {
                    callback(SessionEvent::SendFailed {
                        reason: e.to_string(),
                    });
                }
            }
        }
    }
}
