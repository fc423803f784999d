//! Test helper modules for surround-out integration tests
//!
//! Provides reusable test infrastructure components:
//! - MockBackend / MockDevice: scriptable output backend that lets a test
//!   play the role of the audio device
//! - ScriptedSource: frame source replaying a fixed sample script
//! - RecordingDecoder: surround decoder that records what it was given

#![allow(dead_code)]

pub mod mock_backend;

pub use mock_backend::{MockBackend, MockConfig, MockDevice};

use std::sync::{Arc, Mutex};
use surround_out::audio::{FrameSource, SurroundDecoder};

/// Frame source that hands out a fixed sample script, then silence
pub struct ScriptedSource {
    script: Vec<i16>,
    position: Mutex<usize>,
    sample_rate: u32,
}

impl ScriptedSource {
    pub fn new(script: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            script,
            position: Mutex::new(0),
            sample_rate,
        }
    }

    /// Script of `frames` frames covering the full i16 range
    pub fn ramp(frames: usize, sample_rate: u32) -> Self {
        let script = (0..frames * 2)
            .map(|i| (i as i64 * 37 % 65536 - 32768) as i16)
            .collect();
        Self::new(script, sample_rate)
    }

    pub fn script(&self) -> &[i16] {
        &self.script
    }
}

impl FrameSource for ScriptedSource {
    fn fill(&self, dest: &mut [i16]) -> usize {
        let mut position = self.position.lock().unwrap();
        let available = self.script.len().saturating_sub(*position).min(dest.len());

        dest[..available].copy_from_slice(&self.script[*position..*position + available]);
        dest[available..].fill(0);
        *position += available;

        dest.len() / 2
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Decoder that records every input sample it receives.
///
/// Writes FL = L, FR = R and silence on the other four channels.
#[derive(Clone, Default)]
pub struct RecordingDecoder {
    pub received: Arc<Mutex<Vec<f32>>>,
    pub calls: Arc<Mutex<Vec<usize>>>,
}

impl RecordingDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<f32> {
        self.received.lock().unwrap().clone()
    }

    /// Frame count of every decode call
    pub fn calls(&self) -> Vec<usize> {
        self.calls.lock().unwrap().clone()
    }
}

impl SurroundDecoder for RecordingDecoder {
    fn decode(&mut self, input: &[f32], output: &mut [f32]) {
        self.received.lock().unwrap().extend_from_slice(input);
        self.calls.lock().unwrap().push(input.len() / 2);

        for (stereo, out) in input.chunks_exact(2).zip(output.chunks_exact_mut(6)) {
            out[0] = stereo[0];
            out[1] = stereo[1];
            out[2..].fill(0.0);
        }
    }
}
