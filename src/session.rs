//! Streaming session management.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::audio::{CaptureStream, PlaybackStream};
use crate::controller::{ConnectionState, ControlCommand};
use crate::error::TransportError;
use crate::transport::Transport;
use crate::wire::Outbound;

/// Statistics about a streaming session.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Audio frames posted upstream.
    pub frames_sent: u64,
    /// Capture samples dropped because the ring buffer was full.
    pub samples_dropped: u64,
    /// Wire-format samples captured from the microphone.
    pub samples_captured: u64,
    /// Agent audio samples queued for playback.
    pub samples_enqueued: u64,
    /// Reconnect attempts made so far.
    pub reconnects: u64,
}

/// Internal state shared between the Session handle and background tasks.
pub(crate) struct SessionState {
    pub running: AtomicBool,
    connection: AtomicU8,
    pub frames_sent: AtomicU64,
    /// Arc'd separately so the capture callback can own a clone.
    pub samples_dropped: Arc<AtomicU64>,
    pub samples_captured: AtomicU64,
    pub samples_enqueued: AtomicU64,
    pub reconnects: AtomicU64,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            connection: AtomicU8::new(ConnectionState::Idle as u8),
            frames_sent: AtomicU64::new(0),
            samples_dropped: Arc::new(AtomicU64::new(0)),
            samples_captured: AtomicU64::new(0),
            samples_enqueued: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
        }
    }

    pub fn connection(&self) -> ConnectionState {
        ConnectionState::from_u8(self.connection.load(Ordering::SeqCst))
    }

    pub fn set_connection(&self, state: ConnectionState) {
        self.connection.store(state as u8, Ordering::SeqCst);
    }
}

/// Handle to a running streaming session.
///
/// Returned by [`AgentStreamBuilder::start()`]. The downstream connection,
/// capture, and playback all run in the background until `stop()` is called
/// or the `Session` is dropped.
///
/// # Lifecycle
///
/// 1. Created by [`AgentStreamBuilder::start()`]
/// 2. The controller connects (and reconnects) in the background
/// 3. Call [`stop()`](Session::stop) for graceful shutdown
/// 4. Dropping the `Session` also stops everything (but prefer explicit `stop()`)
///
/// [`AgentStreamBuilder::start()`]: crate::AgentStreamBuilder::start
pub struct Session {
    state: Arc<SessionState>,
    transport: Arc<dyn Transport>,
    session_id: String,
    cmd_tx: mpsc::Sender<ControlCommand>,
    controller_handle: Option<JoinHandle<()>>,
    bridge_handle: Option<JoinHandle<()>>,
    pump_handle: Option<JoinHandle<()>>,
    // Keep the CPAL streams alive - dropping them releases the devices
    capture_stream: Option<CaptureStream>,
    playback_stream: Option<PlaybackStream>,
}

impl Session {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        state: Arc<SessionState>,
        transport: Arc<dyn Transport>,
        session_id: String,
        cmd_tx: mpsc::Sender<ControlCommand>,
        controller_handle: JoinHandle<()>,
        bridge_handle: Option<JoinHandle<()>>,
        pump_handle: Option<JoinHandle<()>>,
        capture_stream: Option<CaptureStream>,
        playback_stream: Option<PlaybackStream>,
    ) -> Self {
        Self {
            state,
            transport,
            session_id,
            cmd_tx,
            controller_handle: Some(controller_handle),
            bridge_handle,
            pump_handle,
            capture_stream,
            playback_stream,
        }
    }

    /// The opaque client-generated session identifier.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Returns `true` if the session has not been stopped.
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    /// Current connection lifecycle state.
    pub fn connection_state(&self) -> ConnectionState {
        self.state.connection()
    }

    /// Returns current session statistics.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            frames_sent: self.state.frames_sent.load(Ordering::SeqCst),
            samples_dropped: self.state.samples_dropped.load(Ordering::SeqCst),
            samples_captured: self.state.samples_captured.load(Ordering::SeqCst),
            samples_enqueued: self.state.samples_enqueued.load(Ordering::SeqCst),
            reconnects: self.state.reconnects.load(Ordering::SeqCst),
        }
    }

    /// Posts a text message to the agent.
    ///
    /// A no-op when not connected or when `text` is empty after trimming.
    /// Unlike audio sends, failures are returned to the caller so explicit
    /// user input can surface an inline error.
    pub async fn send_text(&self, text: &str) -> Result<(), TransportError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(());
        }
        if !self.state.connection().is_connected() {
            tracing::debug!("send_text while disconnected, dropping");
            return Ok(());
        }

        self.transport
            .send(&self.session_id, &Outbound::text(trimmed))
            .await
    }

    /// Gracefully stops the session.
    ///
    /// This will:
    /// 1. Cancel any in-flight reconnect timer
    /// 2. Close the downstream connection as an intentional close
    /// 3. Release the capture and playback devices
    /// 4. Wait for background tasks to complete
    ///
    /// Safe to call when already stopped.
    pub async fn stop(mut self) {
        self.stop_internal().await;
    }

    async fn stop_internal(&mut self) {
        if !self.state.running.swap(false, Ordering::SeqCst) {
            // Already stopped
            return;
        }

        // Intentional close: the controller must not schedule a reconnect
        let _ = self.cmd_tx.send(ControlCommand::Stop).await;

        // Release the audio devices; this also ends the capture bridge's
        // sample source and silences playback
        self.capture_stream.take();
        self.playback_stream.take();

        if let Some(handle) = self.bridge_handle.take() {
            let _ = handle.await;
        }
        if let Some(handle) = self.pump_handle.take() {
            let _ = handle.await;
        }
        if let Some(handle) = self.controller_handle.take() {
            let _ = handle.await;
        }

        self.state.set_connection(ConnectionState::Idle);
        tracing::info!(session_id = %self.session_id, "session stopped");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.state.running.load(Ordering::SeqCst) {
            // Session dropped without explicit stop() - trigger background cleanup
            self.state.running.store(false, Ordering::SeqCst);
            let _ = self.cmd_tx.try_send(ControlCommand::Stop);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_new() {
        let state = SessionState::new();
        assert!(state.running.load(Ordering::SeqCst));
        assert_eq!(state.connection(), ConnectionState::Idle);
        assert_eq!(state.frames_sent.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_session_state_connection_transitions() {
        let state = SessionState::new();
        state.set_connection(ConnectionState::Speaking);
        assert_eq!(state.connection(), ConnectionState::Speaking);
        assert!(state.connection().is_connected());
    }

    #[test]
    fn test_session_stats_default() {
        let stats = SessionStats::default();
        assert_eq!(stats.frames_sent, 0);
        assert_eq!(stats.samples_dropped, 0);
        assert_eq!(stats.reconnects, 0);
    }
}
