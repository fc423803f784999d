//! Lock-free mixer ring
//!
//! Single-producer single-consumer ring of i16 interleaved stereo samples
//! between the mixer thread and the render callback.
//!
//! Design:
//! - Producer (mixer thread): pushes whole stereo frames, counts overruns
//! - Consumer (audio callback): implements [`FrameSource`], pads any
//!   shortfall with silence and counts underruns
//! - No blocking on either side

use crate::audio::source::FrameSource;
use crate::audio::types::STEREO_CHANNELS;
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

/// Default ring capacity in frames (~43ms @ 48kHz)
pub const DEFAULT_CAPACITY_FRAMES: usize = 2048;

/// Mixer ring before it is split into its two halves
pub struct MixerRing {
    buffer: HeapRb<i16>,
    sample_rate: u32,
    underruns: Arc<AtomicU64>,
    overruns: Arc<AtomicU64>,
}

impl MixerRing {
    /// Create a ring holding `capacity_frames` stereo frames
    pub fn new(capacity_frames: Option<usize>, sample_rate: u32) -> Self {
        let capacity_frames = capacity_frames.unwrap_or(DEFAULT_CAPACITY_FRAMES).max(1);

        debug!(
            "Creating mixer ring with capacity: {} frames @ {}Hz",
            capacity_frames, sample_rate
        );

        Self {
            buffer: HeapRb::new(capacity_frames * STEREO_CHANNELS),
            sample_rate,
            underruns: Arc::new(AtomicU64::new(0)),
            overruns: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Split into producer and consumer halves.
    ///
    /// The producer moves to the mixer thread. The consumer is shared with
    /// the output stream, which reads it from the audio thread.
    pub fn split(self) -> (MixerProducer, Arc<RingFrameSource>) {
        let (prod, cons) = self.buffer.split();

        let producer = MixerProducer {
            producer: prod,
            overruns: Arc::clone(&self.overruns),
        };

        let source = RingFrameSource {
            consumer: Mutex::new(cons),
            sample_rate: self.sample_rate,
            underruns: Arc::clone(&self.underruns),
            frames_read: AtomicU64::new(0),
        };

        (producer, Arc::new(source))
    }
}

/// Producer half of the mixer ring (mixer thread)
pub struct MixerProducer {
    producer: HeapProd<i16>,
    overruns: Arc<AtomicU64>,
}

impl MixerProducer {
    /// Push interleaved stereo samples.
    ///
    /// Only whole frames are accepted; whatever does not fit is dropped and
    /// counted as an overrun. Returns the number of frames pushed.
    pub fn push_frames(&mut self, samples: &[i16]) -> usize {
        let offered = samples.len() / STEREO_CHANNELS;
        let frames = offered.min(self.free_frames());
        let pushed = self.producer.push_slice(&samples[..frames * STEREO_CHANNELS]);
        debug_assert_eq!(pushed, frames * STEREO_CHANNELS);

        if frames < offered {
            self.overruns.fetch_add(1, Ordering::Relaxed);
            trace!("Mixer ring overrun: dropped {} frames", offered - frames);
        }

        frames
    }

    /// Frames that can be pushed without overrunning
    pub fn free_frames(&self) -> usize {
        self.producer.vacant_len() / STEREO_CHANNELS
    }

    /// Frames waiting to be rendered
    pub fn queued_frames(&self) -> usize {
        self.producer.occupied_len() / STEREO_CHANNELS
    }

    /// Number of pushes that could not be fully accepted
    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }
}

/// Consumer half of the mixer ring (audio thread)
pub struct RingFrameSource {
    /// Only the audio thread locks this, and only with `try_lock`
    consumer: Mutex<HeapCons<i16>>,
    sample_rate: u32,
    underruns: Arc<AtomicU64>,
    frames_read: AtomicU64,
}

impl RingFrameSource {
    /// Number of fills that had to be padded with silence
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    /// Total frames handed out, including silence padding
    pub fn frames_read(&self) -> u64 {
        self.frames_read.load(Ordering::Relaxed)
    }
}

impl FrameSource for RingFrameSource {
    fn fill(&self, dest: &mut [i16]) -> usize {
        let frames = dest.len() / STEREO_CHANNELS;

        // A second concurrent reader violates the contract; render silence
        // rather than wait.
        let popped = match self.consumer.try_lock() {
            Ok(mut consumer) => consumer.pop_slice(dest),
            Err(_) => 0,
        };

        if popped < dest.len() {
            dest[popped..].fill(0);
            self.underruns.fetch_add(1, Ordering::Relaxed);
        }

        self.frames_read.fetch_add(frames as u64, Ordering::Relaxed);
        frames
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_then_fill_is_verbatim() {
        let (mut producer, source) = MixerRing::new(Some(16), 48_000).split();
        let samples: Vec<i16> = (0..16).collect();

        assert_eq!(producer.push_frames(&samples), 8);
        assert_eq!(producer.queued_frames(), 8);

        let mut dest = [0i16; 16];
        assert_eq!(source.fill(&mut dest), 8);
        assert_eq!(&dest[..], &samples[..]);
        assert_eq!(source.underruns(), 0);
    }

    #[test]
    fn test_underrun_pads_with_silence() {
        let (mut producer, source) = MixerRing::new(Some(16), 48_000).split();
        producer.push_frames(&[100, -100, 200, -200]);

        let mut dest = [7i16; 8];
        assert_eq!(source.fill(&mut dest), 4);
        assert_eq!(dest, [100, -100, 200, -200, 0, 0, 0, 0]);
        assert_eq!(source.underruns(), 1);
        assert_eq!(source.frames_read(), 4);
    }

    #[test]
    fn test_overrun_accepts_whole_frames_only() {
        let (mut producer, _source) = MixerRing::new(Some(4), 48_000).split();
        let samples = [1i16; 12];

        assert_eq!(producer.push_frames(&samples), 4);
        assert_eq!(producer.free_frames(), 0);
        assert_eq!(producer.overruns(), 1);

        // A trailing half frame is never pushed
        let (mut producer, _source) = MixerRing::new(Some(4), 48_000).split();
        assert_eq!(producer.push_frames(&[1, 2, 3]), 1);
        assert_eq!(producer.queued_frames(), 1);
    }

    #[test]
    fn test_reports_mixer_sample_rate() {
        let (_producer, source) = MixerRing::new(None, 44_100).split();
        assert_eq!(source.sample_rate(), 44_100);
    }
}
