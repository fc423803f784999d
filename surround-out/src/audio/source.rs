//! Frame source interface
//!
//! The render callback pulls already-mixed audio through [`FrameSource`].
//! The canonical implementation is the mixer ring's consumer half
//! ([`crate::playback::ring_buffer::RingFrameSource`]).

/// Producer of signed 16-bit interleaved stereo audio.
///
/// **Contract:**
/// - `fill` writes every sample of `dest` (padding with silence on underrun)
///   and returns `dest.len() / 2` frames
/// - `fill` never blocks indefinitely and never allocates
/// - at most one thread calls `fill` at a time (the audio thread), while
///   another thread may be producing concurrently
pub trait FrameSource: Send + Sync {
    /// Fill `dest` with interleaved stereo frames; returns frames written
    fn fill(&self, dest: &mut [i16]) -> usize;

    /// Sample rate of the mixed audio in Hz
    fn sample_rate(&self) -> u32;
}

/// Source that only ever produces silence
#[derive(Debug, Clone, Copy)]
pub struct SilenceSource {
    sample_rate: u32,
}

impl SilenceSource {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

impl FrameSource for SilenceSource {
    fn fill(&self, dest: &mut [i16]) -> usize {
        dest.fill(0);
        dest.len() / 2
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
