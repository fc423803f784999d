//! Output stream lifecycle
//!
//! ```text
//! Idle ──start()──→ Starting ──ok──→ Running ──stop()──→ Stopping ──→ Idle
//!                      │
//!                      └──error──→ Idle (context and stream released)
//! ```
//!
//! Start and stop run on the control thread. Rendering happens on the
//! backend's audio thread through the [`RenderSession`] handed to the
//! backend at stream creation. Dropping the backend stream guarantees no
//! render callback is in flight afterwards, so `stop()` returning means the
//! session is gone.

use crate::audio::decoder::MatrixDecoder;
use crate::audio::source::FrameSource;
use crate::audio::types::RenderFormat;
use crate::backend::{BackendStream, OutputBackend, SharedContext, StreamParams};
use crate::error::{Error, Result};
use crate::playback::callback_monitor::{CallbackMonitor, CallbackStats};
use crate::playback::render::RenderSession;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Default device buffer in frames.
///
/// ~10 ms; the surround decoder needs at least 240 frames.
pub const DEFAULT_BUFFER_FRAMES: u32 = 512;

/// Name given to the backend stream
pub const STREAM_NAME: &str = "Surround Audio Output";

/// Lifecycle state of an [`OutputStream`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Starting,
    Running,
    Stopping,
}

/// Start/stop/volume controller for one output stream.
///
/// Holds a shared handle to the frame source; the caller keeps the source
/// alive for as long as it wants to feed it.
pub struct OutputStream<B: OutputBackend> {
    contexts: Arc<SharedContext<B>>,
    source: Arc<dyn FrameSource>,
    state: StreamState,
    /// Held only while a stream is open
    context: Option<Arc<B>>,
    stream: Option<B::Stream>,
    format: Option<RenderFormat>,
    buffer_frames: Option<u32>,
    /// Gain requested via `set_volume`, applied again on every start
    gain: Option<f32>,
    monitor: Arc<CallbackMonitor>,
}

impl<B: OutputBackend> OutputStream<B> {
    pub fn new(contexts: Arc<SharedContext<B>>, source: Arc<dyn FrameSource>) -> Self {
        Self {
            contexts,
            source,
            state: StreamState::Idle,
            context: None,
            stream: None,
            format: None,
            buffer_frames: None,
            gain: None,
            monitor: Arc::new(CallbackMonitor::new()),
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == StreamState::Running
    }

    /// Render format of the running stream
    pub fn format(&self) -> Option<RenderFormat> {
        self.format
    }

    /// Buffer size requested from the backend for the running stream
    pub fn buffer_frames(&self) -> Option<u32> {
        self.buffer_frames
    }

    /// Render counters of the current (or most recent) session
    pub fn stats(&self) -> CallbackStats {
        self.monitor.snapshot()
    }

    /// Start playback.
    ///
    /// `surround_requested` selects 6-channel f32 surround decode; otherwise
    /// the stream is 2-channel i16 passthrough. On error the stream is back
    /// in `Idle` with nothing held.
    pub fn start(&mut self, surround_requested: bool) -> Result<()> {
        if self.state != StreamState::Idle {
            return Err(Error::InvalidState(format!(
                "start requested while {:?}",
                self.state
            )));
        }

        self.state = StreamState::Starting;

        match self.open(surround_requested) {
            Ok(()) => {
                self.state = StreamState::Running;
                Ok(())
            }
            Err(e) => {
                error!("Failed to start audio stream: {}", e);
                self.release();
                Err(e)
            }
        }
    }

    fn open(&mut self, surround_requested: bool) -> Result<()> {
        let context = self.contexts.acquire().ok_or(Error::ContextUnavailable)?;
        self.context = Some(Arc::clone(&context));

        let format = RenderFormat::select(surround_requested);
        let params = StreamParams {
            sample_rate: self.source.sample_rate(),
            format,
        };

        let minimum_latency = match context.min_latency_frames(&params) {
            Ok(frames) => frames,
            Err(e) => {
                error!("Error getting minimum latency: {}", e);
                0
            }
        };
        info!("Minimum latency: {} frames", minimum_latency);

        let buffer_frames = DEFAULT_BUFFER_FRAMES.max(minimum_latency);

        self.monitor = Arc::new(CallbackMonitor::new());
        let session = RenderSession::new(
            format,
            Arc::clone(&self.source),
            Box::new(MatrixDecoder::new(params.sample_rate)),
            Arc::clone(&self.monitor),
            buffer_frames as usize,
        );

        let stream = context
            .open_stream(STREAM_NAME, &params, buffer_frames, Box::new(session))
            .map_err(|e| match e {
                Error::StreamInitFailed(_) => e,
                other => Error::StreamInitFailed(other.to_string()),
            })?;
        let stream = self.stream.insert(stream);

        if let Some(gain) = self.gain {
            if let Err(e) = stream.set_volume(gain) {
                warn!("Failed to apply volume {:.2}: {}", gain, e);
            }
        }

        stream.start().map_err(|e| match e {
            Error::StreamStartFailed(_) => e,
            other => Error::StreamStartFailed(other.to_string()),
        })?;

        self.format = Some(format);
        self.buffer_frames = Some(buffer_frames);

        info!(
            "Audio stream started: {} channels, {:?}, {}Hz, buffer {} frames",
            format.channels(),
            format.encoding(),
            params.sample_rate,
            buffer_frames
        );
        Ok(())
    }

    /// Stop playback and release the backend context.
    ///
    /// Never fails: a backend stop error is logged and teardown continues.
    /// Safe to call when idle, including after a failed start.
    pub fn stop(&mut self) {
        let Some(mut stream) = self.stream.take() else {
            debug!("Stop requested with no open stream");
            self.release();
            return;
        };

        self.state = StreamState::Stopping;
        info!("Stopping audio stream");

        if let Err(e) = stream.stop() {
            error!("Error stopping audio stream: {}", e);
        }
        drop(stream);

        let stats = self.monitor.snapshot();
        if stats.contract_violations > 0 {
            warn!(
                "Render callback received {} malformed output regions",
                stats.contract_violations
            );
        }
        debug!(
            "Render stats: {} callbacks, {} frames, {} buffer growths",
            stats.callback_count, stats.frames_rendered, stats.buffer_growths
        );

        self.release();
    }

    /// Set output volume in percent.
    ///
    /// Forwarded as `percent / 100.0` without clamping; the backend decides
    /// what out-of-range gains mean. Remembered and re-applied on start.
    pub fn set_volume(&mut self, percent: i32) {
        let gain = percent as f32 / 100.0;
        self.gain = Some(gain);

        match self.stream.as_mut() {
            Some(stream) => {
                if let Err(e) = stream.set_volume(gain) {
                    warn!("Failed to set volume to {}%: {}", percent, e);
                }
            }
            None => debug!("Volume {}% stored until the stream starts", percent),
        }
    }

    /// Drop the stream (if any) and the context handle; back to Idle
    fn release(&mut self) {
        self.stream = None;
        if self.context.take().is_some() {
            debug!("Released audio backend context handle");
        }
        self.format = None;
        self.buffer_frames = None;
        self.state = StreamState::Idle;
    }
}

impl<B: OutputBackend> Drop for OutputStream<B> {
    fn drop(&mut self) {
        self.stop();
    }
}
