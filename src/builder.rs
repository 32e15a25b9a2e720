//! Builder pattern for `AgentStream`.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::audio::{CaptureDevice, CaptureStream, PlaybackDevice, PlaybackStream};
use crate::config::{Mode, SessionConfig, PLAYBACK_SAMPLE_RATE};
use crate::controller::{upstream_pump, Dispatcher, SessionController};
use crate::pipeline::{playback_queue, spawn_capture_bridge, CaptureBridgeConfig, PlaybackProducer};
use crate::session::{Session, SessionState};
use crate::transport::{HttpTransport, Transport};
use crate::{AgentStreamError, EventCallback};

/// Channel capacity for captured frames flowing to the upstream pump.
/// Large enough to buffer ~10 seconds at 100ms frames.
const FRAME_CHANNEL_CAPACITY: usize = 100;

/// Channel capacity for controller commands.
/// Only need 1 since commands are rare (just Stop).
const COMMAND_CHANNEL_CAPACITY: usize = 1;

/// Specifies which audio input device to use.
#[derive(Debug, Clone, Default)]
enum DeviceSelection {
    /// Use the system's default input device.
    #[default]
    SystemDefault,
    /// Use a specific device by name.
    ByName(String),
}

/// Entry point for configuring and starting a streaming session.
pub struct AgentStream;

impl AgentStream {
    /// Creates a new builder with default settings.
    pub fn builder() -> AgentStreamBuilder {
        AgentStreamBuilder::default()
    }
}

/// Builder for configuring and starting a streaming session.
///
/// # Example
///
/// ```rust,ignore
/// let session = AgentStream::builder()
///     .base_url("http://localhost:8000")
///     .mode(Mode::Audio)
///     .on_event(|e| tracing::info!(?e, "session event"))
///     .start()
///     .await?;
/// ```
pub struct AgentStreamBuilder {
    base_url: String,
    mode: Mode,
    session_id: Option<String>,
    device: DeviceSelection,
    config: SessionConfig,
    event_callback: Option<EventCallback>,
    transport: Option<Arc<dyn Transport>>,
}

impl Default for AgentStreamBuilder {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            mode: Mode::default(),
            session_id: None,
            device: DeviceSelection::default(),
            config: SessionConfig::default(),
            event_callback: None,
            transport: None,
        }
    }
}

impl AgentStreamBuilder {
    /// Sets the agent service base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Selects audio or text replies for this session.
    #[must_use]
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Overrides the client-generated session id.
    ///
    /// By default a fresh UUID is generated per `start()`.
    #[must_use]
    pub fn session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    /// Captures from a specific input device instead of the system default.
    #[must_use]
    pub fn input_device(mut self, name: impl Into<String>) -> Self {
        self.device = DeviceSelection::ByName(name.into());
        self
    }

    /// Sets session behavior configuration.
    #[must_use]
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a callback for runtime events.
    #[must_use]
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(crate::SessionEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(crate::event_callback(f));
        self
    }

    /// Injects a custom transport instead of HTTP.
    ///
    /// Primarily a testing seam; the state machine runs unchanged against
    /// any [`Transport`] implementation.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Starts the session.
    ///
    /// In audio mode this acquires the capture and playback devices and
    /// wires the full bidirectional pipeline; in text mode no audio device
    /// is touched. The first connection attempt happens in the background:
    /// transport failures surface as events and scheduled reconnects, not
    /// as errors from `start()`. Device failures are fatal and returned.
    pub async fn start(self) -> Result<Session, AgentStreamError> {
        let transport: Arc<dyn Transport> = match &self.transport {
            Some(t) => t.clone(),
            None => Arc::new(HttpTransport::new(&self.base_url)?),
        };

        let session_id = self
            .session_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
        let state = Arc::new(SessionState::new());
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

        let mut capture_stream = None;
        let mut playback_stream = None;
        let mut bridge_handle = None;
        let mut pump_handle = None;
        let mut playback_producer: Option<PlaybackProducer> = None;

        if self.mode.is_audio() {
            let (stream, producer) = self.open_playback()?;
            playback_stream = Some(stream);
            playback_producer = Some(producer);

            let (stream, bridge, pump) = Self::open_capture(
                &self.device,
                &self.config,
                &transport,
                &session_id,
                &state,
                self.event_callback.clone(),
            )?;
            capture_stream = Some(stream);
            bridge_handle = Some(bridge);
            pump_handle = Some(pump);
        }

        let dispatcher = Dispatcher::new(
            state.clone(),
            playback_producer,
            self.event_callback.clone(),
        );

        let controller = SessionController::new(
            transport.clone(),
            session_id.clone(),
            self.mode,
            state.clone(),
            dispatcher,
            cmd_rx,
            self.event_callback,
            self.config.reconnect_delay,
        );
        let controller_handle = tokio::spawn(controller.run());

        tracing::info!(%session_id, mode = ?self.mode, "session started");

        Ok(Session::new(
            state,
            transport,
            session_id,
            cmd_tx,
            controller_handle,
            bridge_handle,
            pump_handle,
            capture_stream,
            playback_stream,
        ))
    }

    fn open_playback(
        &self,
    ) -> Result<(PlaybackStream, PlaybackProducer), AgentStreamError> {
        let (producer, consumer) = playback_queue(self.config.playback_ring_capacity());
        let device = PlaybackDevice::open_default()?;
        let stream = device.start_playback(consumer, PLAYBACK_SAMPLE_RATE)?;
        Ok((stream, producer))
    }

    fn open_capture(
        device: &DeviceSelection,
        config: &SessionConfig,
        transport: &Arc<dyn Transport>,
        session_id: &str,
        state: &Arc<SessionState>,
        events: Option<EventCallback>,
    ) -> Result<
        (
            CaptureStream,
            tokio::task::JoinHandle<()>,
            tokio::task::JoinHandle<()>,
        ),
        AgentStreamError,
    > {
        let capture_device = match device {
            DeviceSelection::SystemDefault => CaptureDevice::open_default()?,
            DeviceSelection::ByName(name) => CaptureDevice::open_by_name(name)?,
        };

        let (device_sample_rate, device_channels) = capture_device.native_config()?;
        let ring_capacity = config.capture_ring_capacity()
            * device_channels.max(1) as usize
            * (device_sample_rate as usize).div_ceil(crate::config::CAPTURE_SAMPLE_RATE as usize);

        let (stream, consumer) =
            capture_device.start_capture(ring_capacity, state.samples_dropped.clone())?;

        let bridge_config = CaptureBridgeConfig {
            device_sample_rate,
            device_channels,
            chunk_duration: config.chunk_duration,
        };

        let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let bridge_handle = spawn_capture_bridge(consumer, &bridge_config, frame_tx, state.clone());
        let pump_handle = tokio::spawn(upstream_pump(
            transport.clone(),
            session_id.to_string(),
            state.clone(),
            frame_rx,
            events,
        ));

        Ok((stream, bridge_handle, pump_handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = AgentStreamBuilder::default();
        assert_eq!(builder.base_url, "http://localhost:8000");
        assert_eq!(builder.mode, Mode::Audio);
        assert!(builder.session_id.is_none());
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_url() {
        let result = AgentStream::builder()
            .base_url("::not a url::")
            .mode(Mode::Text)
            .start()
            .await;
        assert!(matches!(
            result,
            Err(AgentStreamError::InvalidEndpoint { .. })
        ));
    }
}
