//! # agent-stream
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Real-time bidirectional streaming client for live conversational agents.
//!
//! `agent-stream` captures microphone audio via CPAL, converts it to 16-bit
//! PCM, and streams it to a remote agent over HTTP, while playing back the
//! agent's synthesized audio reply (or surfacing its text reply) as it
//! arrives over a long-lived server-sent event stream.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use agent_stream::{AgentStream, Mode, SessionEvent};
//!
//! let session = AgentStream::builder()
//!     .base_url("http://localhost:8000")
//!     .mode(Mode::Audio)
//!     .on_event(|e| {
//!         if let SessionEvent::TextDelta { text } = e {
//!             print!("{text}");
//!         }
//!     })
//!     .start()
//!     .await?;
//!
//! // Speak into the microphone; the agent replies through the speakers.
//! session.send_text("what's the weather like?").await?;
//!
//! session.stop().await;
//! ```
//!
//! ## Architecture
//!
//! The crate maintains a strict thread boundary:
//!
//! - **CPAL Threads**: High-priority capture and render callbacks that never
//!   block, never allocate, and never touch the network
//! - **Ring Buffers**: Lock-free SPSC queues in both directions absorb the
//!   timing mismatch between audio hardware and the network
//! - **Tokio Runtime**: Session controller owning the downstream event
//!   stream, the upstream send path, and reconnection
//!
//! When the network stalls, capture drops frames rather than glitching the
//! callback; when the agent stalls, playback emits silence rather than
//! blocking the render thread.

#![warn(missing_docs)]
// Audio code requires intentional numeric casts between sample formats
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![allow(clippy::unwrap_used)]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod audio;
mod builder;
mod config;
mod controller;
mod error;
mod event;
pub mod format;
mod frame;
mod pipeline;
mod session;
pub mod transport;
pub mod wire;

pub use audio::{default_input_device_name, list_input_devices};
pub use builder::{AgentStream, AgentStreamBuilder};
pub use config::{Mode, SessionConfig};
pub use controller::ConnectionState;
pub use error::{AgentStreamError, TransportError};
pub use event::{event_callback, EventCallback, SessionEvent};
pub use frame::AudioFrame;
pub use session::{Session, SessionStats};
pub use transport::{EventStream, HttpTransport, Transport};
pub use wire::{Outbound, WireMessage};
