//! Playback queue: the session-to-render-thread handoff.
//!
//! The session controller pushes decoded agent audio into an SPSC ring; the
//! real-time render callback pops one sample per output slot and emits
//! silence when the ring is empty. Starvation is an expected steady state,
//! not an error. An atomic flush flag lets the control side discard queued
//! audio (user barge-in) without touching the ring from the wrong thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::HeapRb;

use crate::format::pcm;

/// Creates the playback queue pair.
///
/// `capacity` is in samples. The producer side belongs to the session
/// controller; the consumer side moves into the render callback.
pub(crate) fn playback_queue(capacity: usize) -> (PlaybackProducer, PlaybackConsumer) {
    let ring = HeapRb::<i16>::new(capacity);
    let (producer, consumer) = ring.split();
    let flush_flag = Arc::new(AtomicBool::new(false));

    (
        PlaybackProducer {
            producer,
            flush_flag: flush_flag.clone(),
        },
        PlaybackConsumer {
            consumer,
            flush_flag,
        },
    )
}

/// Control-side handle: appends decoded agent audio to the queue.
pub(crate) struct PlaybackProducer {
    producer: ringbuf::HeapProd<i16>,
    flush_flag: Arc<AtomicBool>,
}

impl PlaybackProducer {
    /// Appends samples, returning how many were dropped because the ring
    /// was full (drop-newest overflow policy).
    pub fn push(&mut self, samples: &[i16]) -> usize {
        let pushed = self.producer.push_slice(samples);
        samples.len() - pushed
    }

    /// Requests that the render side discard everything queued.
    ///
    /// Takes effect at the start of the next render quantum.
    pub fn flush(&self) {
        self.flush_flag.store(true, Ordering::Release);
    }
}

/// Render-side handle: consumed one sample per output slot inside the
/// real-time callback.
pub(crate) struct PlaybackConsumer {
    consumer: ringbuf::HeapCons<i16>,
    flush_flag: Arc<AtomicBool>,
}

impl PlaybackConsumer {
    /// Fills one f32 output block, duplicating each sample across
    /// `channels` interleaved slots. Never blocks; writes silence when the
    /// queue is empty.
    pub fn render_f32(&mut self, output: &mut [f32], channels: usize) {
        self.apply_flush();
        for frame in output.chunks_mut(channels.max(1)) {
            let sample = self
                .consumer
                .try_pop()
                .map(pcm::i16_to_f32)
                .unwrap_or(0.0);
            frame.fill(sample);
        }
    }

    /// Fills one i16 output block. Never blocks; silence on underrun.
    pub fn render_i16(&mut self, output: &mut [i16], channels: usize) {
        self.apply_flush();
        for frame in output.chunks_mut(channels.max(1)) {
            let sample = self.consumer.try_pop().unwrap_or(0);
            frame.fill(sample);
        }
    }

    fn apply_flush(&mut self) {
        if self.flush_flag.swap(false, Ordering::Acquire) {
            // Index arithmetic only - cheap enough for the callback
            self.consumer.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_pops_queued_samples() {
        let (mut producer, mut consumer) = playback_queue(64);
        assert_eq!(producer.push(&[16384, -16384]), 0);

        let mut out = [1.0f32; 4];
        consumer.render_f32(&mut out, 1);

        assert!((out[0] - 0.5).abs() < 0.001);
        assert!((out[1] + 0.5).abs() < 0.001);
        // Underrun degrades to silence
        assert_eq!(out[2], 0.0);
        assert_eq!(out[3], 0.0);
    }

    #[test]
    fn test_render_empty_queue_is_all_zeros() {
        let (_producer, mut consumer) = playback_queue(64);

        let mut out = [0.75f32; 128];
        consumer.render_f32(&mut out, 1);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_render_duplicates_across_channels() {
        let (mut producer, mut consumer) = playback_queue(64);
        producer.push(&[1000, 2000]);

        let mut out = [0i16; 4];
        consumer.render_i16(&mut out, 2);
        assert_eq!(out, [1000, 1000, 2000, 2000]);
    }

    #[test]
    fn test_overflow_drops_newest() {
        let (mut producer, _consumer) = playback_queue(4);
        let dropped = producer.push(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(dropped, 2);
    }

    #[test]
    fn test_flush_discards_queued_audio() {
        let (mut producer, mut consumer) = playback_queue(64);
        producer.push(&[1000; 32]);
        producer.flush();

        let mut out = [0.5f32; 8];
        consumer.render_f32(&mut out, 1);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_push_after_flush_plays() {
        let (mut producer, mut consumer) = playback_queue(64);
        producer.push(&[1000; 8]);
        producer.flush();

        let mut out = [0i16; 8];
        consumer.render_i16(&mut out, 1);
        assert!(out.iter().all(|&s| s == 0));

        producer.push(&[500; 2]);
        consumer.render_i16(&mut out, 1);
        assert_eq!(out[0], 500);
        assert_eq!(out[1], 500);
        assert_eq!(out[2], 0);
    }
}
