//! Configuration types for streaming sessions.

use std::time::Duration;

/// Sample rate for microphone audio sent upstream.
///
/// Speech-recognition models want narrow-band mono; 16kHz is the wire
/// contract with the agent service.
pub const CAPTURE_SAMPLE_RATE: u32 = 16_000;

/// Sample rate for synthesized agent audio received downstream.
///
/// Synthesis runs at a higher rate than recognition; the two directions are
/// independent and fixed.
pub const PLAYBACK_SAMPLE_RATE: u32 = 24_000;

/// What kind of replies the agent should produce for this session.
///
/// The mode is fixed at `start()` and preserved across reconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Stream microphone audio upstream and play synthesized audio replies.
    #[default]
    Audio,

    /// Text in, text out. No audio devices are opened.
    Text,
}

impl Mode {
    /// Returns `true` for [`Mode::Audio`].
    #[must_use]
    pub fn is_audio(&self) -> bool {
        matches!(self, Self::Audio)
    }
}

/// Configuration for session behavior.
///
/// Use [`SessionConfig::default()`] for sensible defaults, or customize as
/// needed.
///
/// # Example
///
/// ```
/// use agent_stream::SessionConfig;
/// use std::time::Duration;
///
/// let config = SessionConfig {
///     chunk_duration: Duration::from_millis(50),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Duration of each captured audio frame sent upstream.
    ///
    /// Smaller values reduce latency but increase request overhead.
    /// Default: 100ms
    pub chunk_duration: Duration,

    /// Capacity of the capture ring buffer between the audio callback and
    /// the capture bridge.
    ///
    /// If the bridge stalls this long, the callback drops the newest
    /// samples rather than blocking. Default: 30 seconds
    pub capture_buffer_duration: Duration,

    /// Capacity of the playback ring buffer between the session controller
    /// and the render callback.
    ///
    /// If downstream delivery outruns playback by more than this, the
    /// newest samples are dropped and a
    /// [`SessionEvent::PlaybackOverflow`](crate::SessionEvent::PlaybackOverflow)
    /// is emitted. Default: 30 seconds
    pub playback_buffer_duration: Duration,

    /// Fixed delay before a reconnect attempt after a transport failure.
    ///
    /// There is no backoff growth and no retry cap; a permanently
    /// unreachable server is re-polled at this interval indefinitely.
    /// Default: 3 seconds
    pub reconnect_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chunk_duration: Duration::from_millis(100),
            capture_buffer_duration: Duration::from_secs(30),
            playback_buffer_duration: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(3),
        }
    }
}

impl SessionConfig {
    /// Capture ring capacity in samples.
    pub(crate) fn capture_ring_capacity(&self) -> usize {
        (CAPTURE_SAMPLE_RATE as f64 * self.capture_buffer_duration.as_secs_f64()) as usize
    }

    /// Playback ring capacity in samples.
    pub(crate) fn playback_ring_capacity(&self) -> usize {
        (PLAYBACK_SAMPLE_RATE as f64 * self.playback_buffer_duration.as_secs_f64()) as usize
    }
}
