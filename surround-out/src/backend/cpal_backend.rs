//! cpal output backend
//!
//! Maps the render callback onto a cpal output stream:
//! - stereo/i16 and surround/f32 render straight into the device buffer
//!   when the device accepts that sample format
//! - stereo/i16 on an f32-only device renders into a scratch buffer
//!   converted with the 2^15 divisor
//! - any other pairing (f32 on i16, either on u16 or i32) renders into a
//!   scratch buffer in the render encoding and converts per sample
//!
//! cpal has no stream volume, so gain is applied after rendering. At unity
//! gain the output is untouched.

use super::{BackendStream, OutputBackend, StreamParams};
use crate::audio::types::{OutputRegion, SampleEncoding, I16_TO_F32_DIVISOR};
use crate::error::{Error, Result};
use crate::playback::render::RenderCallback;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig, SupportedBufferSize,
    SupportedStreamConfigRange,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// cpal device context
pub struct CpalContext {
    device: Device,
    device_name: String,
}

impl CpalContext {
    /// Open the named output device, or the host default when `None`
    pub fn open(device_name: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();

        let device = match device_name {
            Some(name) => {
                let mut devices = host.output_devices().map_err(|e| {
                    error!("Failed to enumerate devices: {}", e);
                    Error::ContextUnavailable
                })?;
                devices
                    .find(|d| d.name().ok().as_deref() == Some(name))
                    .ok_or_else(|| {
                        error!("Requested audio device '{}' not found", name);
                        Error::ContextUnavailable
                    })?
            }
            None => host.default_output_device().ok_or_else(|| {
                error!("No default output device found");
                Error::ContextUnavailable
            })?,
        };

        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Using audio device: {}", device_name);

        Ok(Self {
            device,
            device_name,
        })
    }

    /// List available audio output device names
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::StreamInitFailed(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Best supported config range for `params`, preferring the native
    /// sample format of the render format, then any format it converts to
    fn find_config(&self, params: &StreamParams) -> Option<SupportedStreamConfigRange> {
        let wanted = sample_format(params.format.encoding());
        let channels = params.format.channels();
        let rate = params.sample_rate;

        self.device
            .supported_output_configs()
            .ok()?
            .filter(|c| {
                c.channels() as usize == channels
                    && c.min_sample_rate().0 <= rate
                    && c.max_sample_rate().0 >= rate
            })
            .max_by_key(|c| (c.sample_format() == wanted, is_convertible(c.sample_format())))
    }

    /// Stream in a device sample format the render path does not produce.
    ///
    /// Renders into a scratch buffer in the session's encoding, applies gain
    /// there, then converts each sample to `T`.
    fn build_staged<T>(
        &self,
        config: &StreamConfig,
        encoding: SampleEncoding,
        scratch_len: usize,
        mut callback: Box<dyn RenderCallback>,
        gain: Arc<AtomicU32>,
    ) -> std::result::Result<Stream, cpal::BuildStreamError>
    where
        T: SizedSample + FromSample<i16> + FromSample<f32> + Send + 'static,
    {
        let channels = config.channels as usize;
        warn!(
            "Device lacks native {:?} output, converting to {:?}",
            encoding,
            T::FORMAT
        );

        match encoding {
            SampleEncoding::I16 => {
                let mut scratch: Vec<i16> = vec![0; scratch_len];
                self.device.build_output_stream(
                    config,
                    move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                        let staged = grow_scratch(&mut scratch, data.len());
                        callback.render(data.len() / channels, OutputRegion::I16(&mut *staged));
                        apply_gain_i16(staged, load_gain(&gain));
                        convert_into(staged, data);
                    },
                    on_stream_error,
                    None,
                )
            }
            SampleEncoding::F32 => {
                let mut scratch: Vec<f32> = vec![0.0; scratch_len];
                self.device.build_output_stream(
                    config,
                    move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                        let staged = grow_scratch(&mut scratch, data.len());
                        callback.render(data.len() / channels, OutputRegion::F32(&mut *staged));
                        apply_gain_f32(staged, load_gain(&gain));
                        convert_into(staged, data);
                    },
                    on_stream_error,
                    None,
                )
            }
        }
    }
}

impl OutputBackend for CpalContext {
    type Stream = CpalStream;

    fn min_latency_frames(&self, params: &StreamParams) -> Result<u32> {
        let config = self.find_config(params).ok_or_else(|| {
            Error::LatencyQueryFailed(format!(
                "no {}-channel config at {}Hz",
                params.format.channels(),
                params.sample_rate
            ))
        })?;

        match config.buffer_size() {
            SupportedBufferSize::Range { min, .. } => Ok(*min),
            SupportedBufferSize::Unknown => Err(Error::LatencyQueryFailed(
                "device does not report buffer sizes".to_string(),
            )),
        }
    }

    fn open_stream(
        &self,
        name: &str,
        params: &StreamParams,
        buffer_frames: u32,
        mut callback: Box<dyn RenderCallback>,
    ) -> Result<CpalStream> {
        let supported = self.find_config(params).ok_or_else(|| {
            Error::StreamInitFailed(format!(
                "device '{}' has no {}-channel config at {}Hz",
                self.device_name,
                params.format.channels(),
                params.sample_rate
            ))
        })?;

        let buffer_frames = match supported.buffer_size() {
            SupportedBufferSize::Range { min, max } => buffer_frames.clamp(*min, *max),
            SupportedBufferSize::Unknown => buffer_frames,
        };

        let config = StreamConfig {
            channels: params.format.channels() as u16,
            sample_rate: cpal::SampleRate(params.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(buffer_frames),
        };
        let channels = params.format.channels();
        let device_format = supported.sample_format();

        debug!(
            "Opening '{}': sample_rate={}, channels={}, render={:?}, device={:?}, buffer={} frames",
            name,
            params.sample_rate,
            channels,
            params.format.encoding(),
            device_format,
            buffer_frames
        );

        let gain = Arc::new(AtomicU32::new(1.0f32.to_bits()));
        let stream_gain = Arc::clone(&gain);
        let scratch_len = buffer_frames as usize * channels;

        let stream = match (params.format.encoding(), device_format) {
            (SampleEncoding::I16, SampleFormat::I16) => self.device.build_output_stream(
                &config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / channels;
                    callback.render(frames, OutputRegion::I16(&mut *data));
                    apply_gain_i16(data, load_gain(&stream_gain));
                },
                on_stream_error,
                None,
            ),
            (SampleEncoding::F32, SampleFormat::F32) => self.device.build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / channels;
                    callback.render(frames, OutputRegion::F32(&mut *data));
                    apply_gain_f32(data, load_gain(&stream_gain));
                },
                on_stream_error,
                None,
            ),
            (SampleEncoding::I16, SampleFormat::F32) => {
                let mut scratch: Vec<i16> = vec![0; scratch_len];
                self.device.build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        let staged = grow_scratch(&mut scratch, data.len());
                        callback.render(data.len() / channels, OutputRegion::I16(&mut *staged));
                        stage_to_f32(staged, data, load_gain(&stream_gain));
                    },
                    on_stream_error,
                    None,
                )
            }
            (encoding, SampleFormat::I16) => {
                self.build_staged::<i16>(&config, encoding, scratch_len, callback, stream_gain)
            }
            (encoding, SampleFormat::U16) => {
                self.build_staged::<u16>(&config, encoding, scratch_len, callback, stream_gain)
            }
            (encoding, SampleFormat::I32) => {
                self.build_staged::<i32>(&config, encoding, scratch_len, callback, stream_gain)
            }
            (_, other) => {
                return Err(Error::StreamInitFailed(format!(
                    "unsupported device sample format {:?}",
                    other
                )))
            }
        }
        .map_err(|e| Error::StreamInitFailed(e.to_string()))?;

        Ok(CpalStream { stream, gain })
    }
}

/// Running or paused cpal stream; dropping it destroys the stream
pub struct CpalStream {
    stream: Stream,
    gain: Arc<AtomicU32>,
}

impl BackendStream for CpalStream {
    fn start(&mut self) -> Result<()> {
        self.stream
            .play()
            .map_err(|e| Error::StreamStartFailed(e.to_string()))
    }

    fn stop(&mut self) -> Result<()> {
        self.stream
            .pause()
            .map_err(|e| Error::StopFailed(e.to_string()))
    }

    /// Gain is clamped to [0.0, 1.0]
    fn set_volume(&mut self, gain: f32) -> Result<()> {
        let clamped = clamp_gain(gain)?;
        self.gain.store(clamped.to_bits(), Ordering::Relaxed);
        debug!("Volume set to {:.2}", clamped);
        Ok(())
    }
}

/// Validate a requested gain and clamp it to [0.0, 1.0]
fn clamp_gain(gain: f32) -> Result<f32> {
    if gain.is_nan() {
        return Err(Error::VolumeFailed("gain is NaN".to_string()));
    }
    Ok(gain.clamp(0.0, 1.0))
}

fn load_gain(gain: &AtomicU32) -> f32 {
    f32::from_bits(gain.load(Ordering::Relaxed))
}

/// Scale samples in place; unity gain leaves them untouched
fn apply_gain_i16(data: &mut [i16], gain: f32) {
    if gain == 1.0 {
        return;
    }
    for sample in data.iter_mut() {
        *sample = (*sample as f32 * gain) as i16;
    }
}

/// Scale samples in place; unity gain leaves them untouched
fn apply_gain_f32(data: &mut [f32], gain: f32) {
    if gain == 1.0 {
        return;
    }
    for sample in data.iter_mut() {
        *sample *= gain;
    }
}

/// i16 scratch to f32 device buffer with the 2^15 divisor, then gain
fn stage_to_f32(src: &[i16], dst: &mut [f32], gain: f32) {
    for (out, &sample) in dst.iter_mut().zip(src) {
        *out = sample as f32 / I16_TO_F32_DIVISOR * gain;
    }
}

fn convert_into<S, T>(src: &[S], dst: &mut [T])
where
    S: Copy,
    T: FromSample<S>,
{
    for (out, &sample) in dst.iter_mut().zip(src) {
        *out = T::from_sample_(sample);
    }
}

/// Scratch region of `len` samples; grows only when the device exceeds the
/// requested period
fn grow_scratch<S: Copy + Default>(scratch: &mut Vec<S>, len: usize) -> &mut [S] {
    if scratch.len() < len {
        scratch.resize(len, S::default());
    }
    &mut scratch[..len]
}

fn on_stream_error(err: cpal::StreamError) {
    error!("Audio stream error: {}", err);
}

/// Device sample formats `open_stream` can feed
fn is_convertible(format: SampleFormat) -> bool {
    matches!(
        format,
        SampleFormat::I16 | SampleFormat::F32 | SampleFormat::U16 | SampleFormat::I32
    )
}

fn sample_format(encoding: SampleEncoding) -> SampleFormat {
    match encoding {
        SampleEncoding::I16 => SampleFormat::I16,
        SampleEncoding::F32 => SampleFormat::F32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_clamping() {
        assert_eq!(clamp_gain(0.5).unwrap(), 0.5);
        assert_eq!(clamp_gain(1.5).unwrap(), 1.0);
        assert_eq!(clamp_gain(-0.2).unwrap(), 0.0);
        assert!(matches!(clamp_gain(f32::NAN), Err(Error::VolumeFailed(_))));
    }

    #[test]
    fn test_unity_gain_leaves_samples_untouched() {
        let mut ints = [i16::MIN, -1, 0, 1, i16::MAX];
        apply_gain_i16(&mut ints, 1.0);
        assert_eq!(ints, [i16::MIN, -1, 0, 1, i16::MAX]);

        let mut floats = [-1.0f32, 0.123_456_7, 0.0, 0.999_969_5];
        apply_gain_f32(&mut floats, 1.0);
        assert_eq!(floats, [-1.0, 0.123_456_7, 0.0, 0.999_969_5]);
    }

    #[test]
    fn test_gain_scales_samples() {
        let mut ints = [1000i16, -1000, 3];
        apply_gain_i16(&mut ints, 0.5);
        assert_eq!(ints, [500, -500, 1]);

        let mut floats = [0.5f32, -1.0];
        apply_gain_f32(&mut floats, 0.0);
        assert_eq!(floats, [0.0, 0.0]);
    }

    #[test]
    fn test_stage_to_f32_uses_two_to_the_fifteenth() {
        let src = [i16::MIN, 16384, 0, i16::MAX];
        let mut dst = [9.0f32; 4];

        stage_to_f32(&src, &mut dst, 1.0);
        assert_eq!(dst[0], -1.0);
        assert_eq!(dst[1], 0.5);
        assert_eq!(dst[2], 0.0);
        assert_eq!(dst[3], 32767.0 / 32768.0);

        stage_to_f32(&src, &mut dst, 0.5);
        assert_eq!(dst[0], -0.5);
        assert_eq!(dst[1], 0.25);
    }

    #[test]
    fn test_convert_into_other_device_formats() {
        let mut unsigned = [0u16; 3];
        convert_into(&[i16::MIN, 0, i16::MAX], &mut unsigned);
        assert_eq!(unsigned, [0, 32768, u16::MAX]);

        let mut ints = [0i16; 3];
        convert_into(&[0.0f32, 0.5, -1.0], &mut ints);
        assert_eq!(ints[0], 0);
        assert!((ints[1] - 16384).abs() <= 1, "0.5 -> {}", ints[1]);
        assert!(ints[2] <= -32767, "-1.0 -> {}", ints[2]);
    }

    #[test]
    fn test_convertible_device_formats() {
        assert!(is_convertible(SampleFormat::I16));
        assert!(is_convertible(SampleFormat::U16));
        assert!(is_convertible(SampleFormat::I32));
        assert!(is_convertible(SampleFormat::F32));
        assert!(!is_convertible(SampleFormat::F64));
        assert!(!is_convertible(SampleFormat::U8));
    }

    #[test]
    fn test_scratch_grows_only_when_exceeded() {
        let mut scratch = vec![0i16; 8];
        assert_eq!(grow_scratch(&mut scratch, 4).len(), 4);
        assert_eq!(scratch.len(), 8);

        assert_eq!(grow_scratch(&mut scratch, 16).len(), 16);
        assert_eq!(scratch.len(), 16);
    }
}
