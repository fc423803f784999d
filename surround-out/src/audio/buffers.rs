//! Conversion buffers for the surround render path
//!
//! A pair of staging regions reused across render callbacks so that the
//! steady state never allocates:
//! - `int_staging`: i16 stereo samples as delivered by the frame source
//! - `float_staging`: the same samples normalized to f32 for the decoder
//!
//! Both are sized in stereo-domain samples (frames × 2). They only grow.
//! Growth happens on the audio thread, so it is the one place the render
//! path allocates; it only occurs when a period exceeds the previous
//! high-water mark.

use super::types::I16_TO_F32_DIVISOR;

/// Growable i16/f32 staging arena owned by a render session
#[derive(Debug, Default)]
pub struct ConversionBuffers {
    int_staging: Vec<i16>,
    float_staging: Vec<f32>,
    growths: u64,
}

impl ConversionBuffers {
    /// Empty buffers; the first surround callback grows them
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers pre-sized for `samples` stereo-domain samples
    pub fn with_capacity(samples: usize) -> Self {
        Self {
            int_staging: vec![0; samples],
            float_staging: vec![0.0; samples],
            growths: 0,
        }
    }

    /// Current capacity in stereo-domain samples (the smaller of the two)
    pub fn capacity(&self) -> usize {
        self.int_staging.len().min(self.float_staging.len())
    }

    /// Number of times the buffers have grown
    pub fn growth_count(&self) -> u64 {
        self.growths
    }

    /// Make both buffers hold at least `required` samples.
    ///
    /// Idempotent: returns `true` only when a reallocation happened.
    pub fn ensure_capacity(&mut self, required: usize) -> bool {
        if required <= self.int_staging.len() && required <= self.float_staging.len() {
            return false;
        }

        if self.int_staging.len() < required {
            self.int_staging.resize(required, 0);
        }
        if self.float_staging.len() < required {
            self.float_staging.resize(required, 0.0);
        }
        self.growths += 1;
        true
    }

    /// Integer staging region of `samples` length, for the frame source to fill
    pub fn int_staging_mut(&mut self, samples: usize) -> &mut [i16] {
        &mut self.int_staging[..samples]
    }

    /// First `samples` integer staging samples
    pub fn int_staging(&self, samples: usize) -> &[i16] {
        &self.int_staging[..samples]
    }

    /// First `samples` float staging samples
    pub fn float_staging(&self, samples: usize) -> &[f32] {
        &self.float_staging[..samples]
    }

    /// Normalize the first `samples` integer samples into float staging.
    ///
    /// `float[i] = int[i] / 32768.0`
    pub fn convert(&mut self, samples: usize) -> &[f32] {
        let src = &self.int_staging[..samples];
        let dst = &mut self.float_staging[..samples];
        for (out, &sample) in dst.iter_mut().zip(src) {
            *out = sample as f32 / I16_TO_F32_DIVISOR;
        }
        dst
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_capacity_is_idempotent() {
        let mut buffers = ConversionBuffers::new();
        assert_eq!(buffers.capacity(), 0);

        assert!(buffers.ensure_capacity(1024));
        assert!(!buffers.ensure_capacity(1024));
        assert!(!buffers.ensure_capacity(512));

        assert_eq!(buffers.capacity(), 1024);
        assert_eq!(buffers.growth_count(), 1);
    }

    #[test]
    fn test_capacity_never_shrinks() {
        let mut buffers = ConversionBuffers::with_capacity(256);
        buffers.ensure_capacity(4096);
        buffers.ensure_capacity(16);
        assert_eq!(buffers.capacity(), 4096);
    }

    #[test]
    fn test_convert_uses_asymmetric_divisor() {
        let mut buffers = ConversionBuffers::with_capacity(4);
        buffers
            .int_staging_mut(4)
            .copy_from_slice(&[i16::MIN, i16::MAX, 16384, -1]);

        let floats = buffers.convert(4);
        assert_eq!(floats[0], -1.0);
        assert_eq!(floats[1], 32767.0 / 32768.0);
        assert_eq!(floats[2], 0.5);
        assert_eq!(floats[3], -1.0 / 32768.0);
    }
}
