//! Output backend abstraction
//!
//! An [`OutputBackend`] is the process-level audio context (one per host
//! device). It reports latency and opens device streams that drive a
//! [`RenderCallback`]. A [`BackendStream`] is destroyed by dropping it;
//! once dropped, the backend never invokes its callback again.

pub mod context;
pub mod cpal_backend;

pub use context::SharedContext;
pub use cpal_backend::{CpalContext, CpalStream};

use crate::audio::types::RenderFormat;
use crate::error::Result;
use crate::playback::render::RenderCallback;

/// Parameters negotiated with the backend for one stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamParams {
    /// Sample rate as reported by the mixer
    pub sample_rate: u32,
    pub format: RenderFormat,
}

/// Audio backend context
pub trait OutputBackend: 'static {
    type Stream: BackendStream;

    /// Minimum buffer size in frames the backend supports for `params`
    fn min_latency_frames(&self, params: &StreamParams) -> Result<u32>;

    /// Create a stopped stream that will call `callback` once running
    fn open_stream(
        &self,
        name: &str,
        params: &StreamParams,
        buffer_frames: u32,
        callback: Box<dyn RenderCallback>,
    ) -> Result<Self::Stream>;
}

/// An open device stream; dropping it destroys the stream
pub trait BackendStream {
    fn start(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    /// Set output gain (1.0 = unity); clamping is backend-defined
    fn set_volume(&mut self, gain: f32) -> Result<()>;
}
