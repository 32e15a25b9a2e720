//! Runtime events for observing session health and agent output.
//!
//! Events are non-fatal notifications about session behavior. The session
//! continues running after events are emitted - they're how the application
//! observes connection state changes, agent text, and degraded-mode
//! conditions like dropped audio.

use std::sync::Arc;
use std::time::Duration;

/// Runtime events emitted during a streaming session.
///
/// These are informational events, not errors. The session continues
/// running after any event is emitted. Use the [`EventCallback`] to
/// update UI state, log, or collect metrics.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The downstream event channel opened and the send path is enabled.
    Connected,

    /// The downstream event channel closed or failed.
    ///
    /// Unless the session was explicitly stopped, a reconnect attempt is
    /// already scheduled when this fires.
    Disconnected {
        /// Description of why the connection ended.
        reason: String,
    },

    /// A reconnect attempt is scheduled.
    Reconnecting {
        /// How long until the attempt is made.
        delay: Duration,
    },

    /// The agent produced a fragment of text output.
    ///
    /// Fragments accumulate until the turn completes; `text` is only the
    /// newly arrived delta.
    TextDelta {
        /// Newly arrived text fragment.
        text: String,
    },

    /// The agent finished a response turn.
    TurnComplete {
        /// `true` if the turn ended because the user barged in rather than
        /// because the agent finished speaking.
        interrupted: bool,
    },

    /// The server reported an error inside the event stream.
    ///
    /// This does not by itself close the connection.
    AgentError {
        /// The server's error message.
        message: String,
    },

    /// An upstream message could not be delivered and was dropped.
    ///
    /// Audio chunks are never retried - real-time audio has no redelivery
    /// semantics.
    SendFailed {
        /// Description of the failure.
        reason: String,
    },

    /// The playback queue was full and incoming agent audio was dropped.
    ///
    /// This happens when downstream delivery outpaces playback for longer
    /// than the queue capacity. Consider a larger
    /// [`playback_buffer_duration`](crate::SessionConfig::playback_buffer_duration).
    PlaybackOverflow {
        /// Number of samples that were dropped.
        dropped_samples: usize,
    },
}

/// Callback type for receiving runtime events.
///
/// Register an event callback via [`AgentStreamBuilder::on_event()`] to
/// receive notifications about connection state, agent output, and dropped
/// messages.
///
/// [`AgentStreamBuilder::on_event()`]: crate::AgentStreamBuilder::on_event
///
/// # Example
///
/// ```ignore
/// use agent_stream::{AgentStream, SessionEvent};
///
/// let session = AgentStream::builder()
///     .on_event(|event| {
///         tracing::info!(?event, "session event");
///     })
///     .start()
///     .await?;
/// ```
pub type EventCallback = Arc<dyn Fn(SessionEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// This is a convenience function for creating event callbacks without
/// manually wrapping in `Arc`.
///
/// # Example
///
/// ```
/// use agent_stream::{event_callback, SessionEvent};
///
/// let callback = event_callback(|event| {
///     println!("Got event: {:?}", event);
/// });
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(SessionEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_event_debug() {
        let event = SessionEvent::PlaybackOverflow {
            dropped_samples: 480,
        };
        let debug = format!("{:?}", event);
        assert!(debug.contains("PlaybackOverflow"));
        assert!(debug.contains("480"));
    }

    #[test]
    fn test_session_event_clone() {
        let event = SessionEvent::AgentError {
            message: "quota exceeded".to_string(),
        };
        let cloned = event.clone();
        if let SessionEvent::AgentError { message } = cloned {
            assert_eq!(message, "quota exceeded");
        } else {
            panic!("Expected AgentError variant");
        }
    }

    #[test]
    fn test_event_callback_helper() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();

        let callback = event_callback(move |_| {
            called_clone.store(true, Ordering::SeqCst);
        });

        callback(SessionEvent::Connected);
        assert!(called.load(Ordering::SeqCst));
    }
}
