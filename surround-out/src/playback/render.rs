//! Render callback
//!
//! Invoked by the output device once per period on the backend's audio
//! thread. Produces exactly the requested number of frames in the session's
//! [`RenderFormat`]:
//!
//! ```text
//! stereo:   FrameSource ──────────────────────────────────────────→ device (i16)
//! surround: FrameSource → int_staging → ÷32768 → float_staging → decoder → device (f32)
//! ```
//!
//! **Real-time rules:** no locks, no blocking I/O, no allocation except the
//! conversion buffer growth when a period exceeds the previous high-water
//! mark. Contract violations by the caller (wrong region type, region too
//! small) are clamped and counted; the device has no way to receive an
//! error from here.

use crate::audio::buffers::ConversionBuffers;
use crate::audio::decoder::SurroundDecoder;
use crate::audio::source::FrameSource;
use crate::audio::types::{OutputRegion, RenderFormat, STEREO_CHANNELS, SURROUND_CHANNELS};
use crate::playback::callback_monitor::CallbackMonitor;
use std::sync::Arc;
use tracing::info;

/// Capability handed to an output backend at stream creation.
///
/// The backend calls `render` once per period with the number of frames it
/// needs and the region to write them into; the return value is the number
/// of frames produced.
pub trait RenderCallback: Send {
    fn render(&mut self, frames: usize, output: OutputRegion<'_>) -> usize;
}

/// Per-stream render state
///
/// Owns its conversion buffers and decoder exclusively; shares the frame
/// source with whoever feeds it.
pub struct RenderSession {
    format: RenderFormat,
    source: Arc<dyn FrameSource>,
    decoder: Box<dyn SurroundDecoder>,
    buffers: ConversionBuffers,
    monitor: Arc<CallbackMonitor>,
}

impl RenderSession {
    /// `period_frames` is the expected device period; the surround path
    /// pre-sizes its staging buffers for it so the first callback does not
    /// allocate.
    pub fn new(
        format: RenderFormat,
        source: Arc<dyn FrameSource>,
        decoder: Box<dyn SurroundDecoder>,
        monitor: Arc<CallbackMonitor>,
        period_frames: usize,
    ) -> Self {
        let buffers = if format.is_stereo() {
            ConversionBuffers::new()
        } else {
            ConversionBuffers::with_capacity(period_frames * STEREO_CHANNELS)
        };

        Self {
            format,
            source,
            decoder,
            buffers,
            monitor,
        }
    }

    pub fn format(&self) -> RenderFormat {
        self.format
    }

    /// Conversion buffers (surround path staging)
    pub fn buffers(&self) -> &ConversionBuffers {
        &self.buffers
    }

    pub fn monitor(&self) -> &Arc<CallbackMonitor> {
        &self.monitor
    }

    /// Zero-copy path: the source writes straight into the device buffer
    fn render_stereo(&mut self, frames: usize, output: &mut [i16]) {
        let samples = frames * STEREO_CHANNELS;
        let filled = self.source.fill(&mut output[..samples]);
        debug_assert_eq!(filled, frames, "frame source returned a short period");
        output[samples..].fill(0);
    }

    fn render_surround(&mut self, frames: usize, output: &mut [f32]) {
        let required = frames * STEREO_CHANNELS;

        // Period size may change between callbacks
        if self.buffers.ensure_capacity(required) {
            self.monitor.record_growth();
            info!("Expanding conversion buffers size: {} frames", frames);
        }

        let filled = self.source.fill(self.buffers.int_staging_mut(required));
        debug_assert_eq!(filled, frames, "frame source returned a short period");

        let stereo = self.buffers.convert(required);
        let written = frames * SURROUND_CHANNELS;
        self.decoder.decode(stereo, &mut output[..written]);
        output[written..].fill(0.0);
    }
}

impl RenderCallback for RenderSession {
    fn render(&mut self, frames: usize, mut output: OutputRegion<'_>) -> usize {
        if frames == 0 {
            return 0;
        }

        if output.encoding() != self.format.encoding() {
            self.monitor.record_violation();
            output.silence();
            return 0;
        }

        let capacity = output.len() / self.format.channels();
        let frames = if frames > capacity {
            self.monitor.record_violation();
            capacity
        } else {
            frames
        };

        match output {
            OutputRegion::I16(data) => self.render_stereo(frames, data),
            OutputRegion::F32(data) => self.render_surround(frames, data),
        }

        self.monitor.record_period(frames);
        frames
    }
}
