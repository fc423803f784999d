//! # Surround Output Library (surround-out)
//!
//! Real-time render pipeline between a sample mixer and an audio device.
//!
//! **Purpose:** On every device period, pull i16 stereo from the mixer ring
//! and either pass it straight through or decode it to 5.1 float surround,
//! without blocking or allocating on the audio thread.
//!
//! **Architecture:** mixer thread → `MixerRing` → `RenderSession` (audio
//! thread) → device, with `OutputStream` managing start/stop/volume on the
//! control thread and cpal as the device backend.

pub mod audio;
pub mod backend;
pub mod error;
pub mod playback;

pub use error::{Error, Result};
pub use playback::{OutputStream, StreamState};
