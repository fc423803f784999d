//! Core audio data types
//!
//! Defines the render format negotiated with the output device and the
//! output region handed to the render callback.
//!
//! **Internal format:** the mixer always produces signed 16-bit interleaved
//! stereo `[L, R, L, R, ...]`. Everything downstream is expressed relative
//! to that stereo domain.

/// Channels in the mixer's internal format
pub const STEREO_CHANNELS: usize = 2;

/// Channels produced by the surround decoder
pub const SURROUND_CHANNELS: usize = 6;

/// Divisor for i16 → f32 conversion.
///
/// 2^15, not 2^15 - 1: -32768 maps to exactly -1.0 and 32767 maps to just
/// under 1.0. Output amplitude depends on this value.
pub const I16_TO_F32_DIVISOR: f32 = (1 << 15) as f32;

/// Sample encoding expected by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    /// Signed 16-bit, native endian
    I16,
    /// 32-bit float, native endian
    F32,
}

/// Speaker layout expected by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    /// Front left, front right
    Stereo,
    /// Three front, two rear, plus LFE
    Surround51,
}

/// Speaker positions in the order the surround path writes them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    FrontLeft,
    FrontRight,
    FrontCenter,
    Lfe,
    RearLeft,
    RearRight,
}

/// Interleaving order of surround output frames
pub const SURROUND_ORDER: [Channel; SURROUND_CHANNELS] = [
    Channel::FrontLeft,
    Channel::FrontRight,
    Channel::FrontCenter,
    Channel::Lfe,
    Channel::RearLeft,
    Channel::RearRight,
];

/// Format the render callback produces for the device.
///
/// Only two combinations exist, so the fields are private and the values
/// are built with [`RenderFormat::stereo`] and [`RenderFormat::surround`].
/// Chosen once at stream start and never changed for the stream's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderFormat {
    channels: usize,
    encoding: SampleEncoding,
    layout: ChannelLayout,
}

impl RenderFormat {
    /// 2 channels, i16, stereo layout (passthrough)
    pub const fn stereo() -> Self {
        Self {
            channels: STEREO_CHANNELS,
            encoding: SampleEncoding::I16,
            layout: ChannelLayout::Stereo,
        }
    }

    /// 6 channels, f32, 5.1 layout (surround decode)
    pub const fn surround() -> Self {
        Self {
            channels: SURROUND_CHANNELS,
            encoding: SampleEncoding::F32,
            layout: ChannelLayout::Surround51,
        }
    }

    /// Pick the format from the surround-decode configuration flag
    pub const fn select(surround_requested: bool) -> Self {
        if surround_requested {
            Self::surround()
        } else {
            Self::stereo()
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn encoding(&self) -> SampleEncoding {
        self.encoding
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    pub fn is_stereo(&self) -> bool {
        self.layout == ChannelLayout::Stereo
    }
}

/// Device-owned output region for one render period.
///
/// Interleaved; the variant must match the session's [`SampleEncoding`].
#[derive(Debug)]
pub enum OutputRegion<'a> {
    I16(&'a mut [i16]),
    F32(&'a mut [f32]),
}

impl OutputRegion<'_> {
    /// Total number of samples (all channels) in the region
    pub fn len(&self) -> usize {
        match self {
            OutputRegion::I16(data) => data.len(),
            OutputRegion::F32(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn encoding(&self) -> SampleEncoding {
        match self {
            OutputRegion::I16(_) => SampleEncoding::I16,
            OutputRegion::F32(_) => SampleEncoding::F32,
        }
    }

    /// Write silence to the whole region
    pub fn silence(&mut self) {
        match self {
            OutputRegion::I16(data) => data.fill(0),
            OutputRegion::F32(data) => data.fill(0.0),
        }
    }
}
