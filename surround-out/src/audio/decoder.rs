//! Surround decoding (stereo → 5.1)
//!
//! [`SurroundDecoder`] is the seam the render callback decodes through.
//! [`MatrixDecoder`] is a passive matrix implementation:
//!
//! ```text
//! FL  = L
//! FR  = R
//! FC  = (L + R) / (2·√2)
//! LFE = lowpass((L + R) / 2)      one-pole, 120 Hz
//! RL  = (L - R) / 2
//! RR  = (R - L) / 2
//! ```

use super::types::{STEREO_CHANNELS, SURROUND_CHANNELS};
use std::f32::consts::{FRAC_1_SQRT_2, PI};

/// LFE crossover frequency in Hz
pub const LFE_CUTOFF_HZ: f32 = 120.0;

/// Stereo float frames in, 6-channel float frames out.
///
/// Output frames are interleaved as FL, FR, FC, LFE, RL, RR. Implementations
/// may keep filter state between calls but must not allocate or block.
pub trait SurroundDecoder: Send {
    /// Decode `input.len() / 2` stereo frames into `output`.
    ///
    /// `output.len()` is exactly `input.len() / 2 * 6`.
    fn decode(&mut self, input: &[f32], output: &mut [f32]);
}

/// Passive matrix decoder with a low-passed LFE channel
#[derive(Debug, Clone)]
pub struct MatrixDecoder {
    /// One-pole smoothing coefficient for the LFE filter
    lfe_alpha: f32,
    /// LFE filter state
    lfe_state: f32,
}

impl MatrixDecoder {
    /// Create a decoder for audio at `sample_rate` Hz
    pub fn new(sample_rate: u32) -> Self {
        let rate = sample_rate.max(1) as f32;
        let lfe_alpha = 1.0 - (-2.0 * PI * LFE_CUTOFF_HZ / rate).exp();
        Self {
            lfe_alpha,
            lfe_state: 0.0,
        }
    }

    /// Clear filter state
    pub fn reset(&mut self) {
        self.lfe_state = 0.0;
    }
}

impl SurroundDecoder for MatrixDecoder {
    fn decode(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(
            output.len(),
            input.len() / STEREO_CHANNELS * SURROUND_CHANNELS,
            "surround output region does not match input frame count"
        );

        for (stereo, out) in input
            .chunks_exact(STEREO_CHANNELS)
            .zip(output.chunks_exact_mut(SURROUND_CHANNELS))
        {
            let (left, right) = (stereo[0], stereo[1]);
            let mono = (left + right) * 0.5;
            let side = (left - right) * 0.5;

            self.lfe_state += self.lfe_alpha * (mono - self.lfe_state);

            out[0] = left;
            out[1] = right;
            out[2] = mono * FRAC_1_SQRT_2;
            out[3] = self.lfe_state;
            out[4] = side;
            out[5] = -side;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_channel_mapping() {
        let mut decoder = MatrixDecoder::new(48_000);
        let input = [0.5f32, 0.25];
        let mut output = [0.0f32; 6];

        decoder.decode(&input, &mut output);

        assert_eq!(output[0], 0.5);
        assert_eq!(output[1], 0.25);
        assert!((output[2] - 0.375 * FRAC_1_SQRT_2).abs() < 1e-6);
        assert!(output[3] > 0.0 && output[3] < 0.375);
        assert_eq!(output[4], 0.125);
        assert_eq!(output[5], -0.125);
    }

    #[test]
    fn test_lfe_settles_to_dc_level() {
        let mut decoder = MatrixDecoder::new(48_000);
        let input = vec![0.5f32; 2 * 4800];
        let mut output = vec![0.0f32; 6 * 4800];

        decoder.decode(&input, &mut output);

        let last_lfe = output[output.len() - 3];
        assert!((last_lfe - 0.5).abs() < 1e-3, "LFE = {}", last_lfe);
    }

    #[test]
    fn test_reset_clears_filter_state() {
        let mut decoder = MatrixDecoder::new(48_000);
        let mut output = [0.0f32; 6];
        decoder.decode(&[1.0, 1.0], &mut output);
        let first = output[3];

        decoder.decode(&[1.0, 1.0], &mut output);
        assert!(output[3] > first);

        decoder.reset();
        decoder.decode(&[1.0, 1.0], &mut output);
        assert_eq!(output[3], first);
    }

    #[test]
    fn test_silence_in_silence_out() {
        let mut decoder = MatrixDecoder::new(44_100);
        let input = [0.0f32; 64];
        let mut output = [1.0f32; 192];
        decoder.decode(&input, &mut output);
        assert!(output.iter().all(|&s| s == 0.0));
    }
}
