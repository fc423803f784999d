//! Playback: mixer ring, render callback, and stream lifecycle

pub mod callback_monitor;
pub mod render;
pub mod ring_buffer;
pub mod stream;

pub use callback_monitor::{CallbackMonitor, CallbackStats};
pub use render::{RenderCallback, RenderSession};
pub use ring_buffer::{MixerProducer, MixerRing, RingFrameSource};
pub use stream::{OutputStream, StreamState, DEFAULT_BUFFER_FRAMES};
