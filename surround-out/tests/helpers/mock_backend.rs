//! Scriptable output backend
//!
//! `MockBackend` is the context, `MockDevice` is the shared handle a test
//! keeps to inspect what the backend was asked to do and to drive render
//! periods the way a real device thread would.

use std::sync::{Arc, Mutex, MutexGuard};
use surround_out::audio::OutputRegion;
use surround_out::backend::{BackendStream, OutputBackend, StreamParams};
use surround_out::playback::RenderCallback;
use surround_out::{Error, Result};

/// Failure injection and reported latency
#[derive(Debug, Clone, Copy, Default)]
pub struct MockConfig {
    pub min_latency_frames: u32,
    pub fail_latency_query: bool,
    pub fail_init: bool,
    pub fail_start: bool,
    pub fail_stop: bool,
}

/// One `open_stream` request
#[derive(Debug, Clone)]
pub struct OpenRequest {
    pub name: String,
    pub params: StreamParams,
    pub buffer_frames: u32,
}

#[derive(Default)]
struct DeviceState {
    callback: Option<Box<dyn RenderCallback>>,
    opened: Vec<OpenRequest>,
    starts: usize,
    stops: usize,
    destroyed: usize,
    volumes: Vec<f32>,
}

/// Shared view of everything the mock backend did
#[derive(Clone, Default)]
pub struct MockDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap()
    }

    /// Whether a stream currently holds a render callback
    pub fn has_callback(&self) -> bool {
        self.lock().callback.is_some()
    }

    pub fn opened(&self) -> Vec<OpenRequest> {
        self.lock().opened.clone()
    }

    pub fn starts(&self) -> usize {
        self.lock().starts
    }

    pub fn stops(&self) -> usize {
        self.lock().stops
    }

    pub fn destroyed(&self) -> usize {
        self.lock().destroyed
    }

    pub fn volumes(&self) -> Vec<f32> {
        self.lock().volumes.clone()
    }

    /// Run one stereo period; `None` when no stream is open
    pub fn render_i16(&self, frames: usize) -> Option<(usize, Vec<i16>)> {
        let mut state = self.lock();
        let callback = state.callback.as_mut()?;
        let mut data = vec![0i16; frames * 2];
        let produced = callback.render(frames, OutputRegion::I16(&mut data));
        Some((produced, data))
    }

    /// Run one surround period; `None` when no stream is open
    pub fn render_f32(&self, frames: usize) -> Option<(usize, Vec<f32>)> {
        let mut state = self.lock();
        let callback = state.callback.as_mut()?;
        let mut data = vec![0.0f32; frames * 6];
        let produced = callback.render(frames, OutputRegion::F32(&mut data));
        Some((produced, data))
    }
}

/// Backend context handed out by `SharedContext`
pub struct MockBackend {
    config: MockConfig,
    device: MockDevice,
}

impl MockBackend {
    pub fn new(config: MockConfig, device: MockDevice) -> Self {
        Self { config, device }
    }
}

impl OutputBackend for MockBackend {
    type Stream = MockStream;

    fn min_latency_frames(&self, _params: &StreamParams) -> Result<u32> {
        if self.config.fail_latency_query {
            return Err(Error::LatencyQueryFailed("mock latency failure".to_string()));
        }
        Ok(self.config.min_latency_frames)
    }

    fn open_stream(
        &self,
        name: &str,
        params: &StreamParams,
        buffer_frames: u32,
        callback: Box<dyn RenderCallback>,
    ) -> Result<MockStream> {
        let mut state = self.device.lock();
        state.opened.push(OpenRequest {
            name: name.to_string(),
            params: *params,
            buffer_frames,
        });

        if self.config.fail_init {
            return Err(Error::StreamInitFailed("mock init failure".to_string()));
        }

        state.callback = Some(callback);
        Ok(MockStream {
            config: self.config,
            device: self.device.clone(),
        })
    }
}

/// Stream returned by `MockBackend`; dropping it removes the callback
pub struct MockStream {
    config: MockConfig,
    device: MockDevice,
}

impl BackendStream for MockStream {
    fn start(&mut self) -> Result<()> {
        if self.config.fail_start {
            return Err(Error::StreamStartFailed("mock start failure".to_string()));
        }
        self.device.lock().starts += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.device.lock().stops += 1;
        if self.config.fail_stop {
            return Err(Error::StopFailed("mock stop failure".to_string()));
        }
        Ok(())
    }

    fn set_volume(&mut self, gain: f32) -> Result<()> {
        self.device.lock().volumes.push(gain);
        Ok(())
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        let mut state = self.device.lock();
        state.callback = None;
        state.destroyed += 1;
    }
}
