//! Audio data types, conversion buffers, and the source/decoder seams

pub mod buffers;
pub mod decoder;
pub mod source;
pub mod types;

pub use buffers::ConversionBuffers;
pub use decoder::{MatrixDecoder, SurroundDecoder};
pub use source::{FrameSource, SilenceSource};
pub use types::{Channel, ChannelLayout, OutputRegion, RenderFormat, SampleEncoding};
