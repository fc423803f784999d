//! Render callback counters
//!
//! Shared between a render session (audio thread, writer) and its
//! output stream (control thread, reader).
//!
//! **Design:** lock-free; every update is a single relaxed atomic so the
//! audio callback can record without logging or system calls.

use std::sync::atomic::{AtomicU64, Ordering};

/// Render callback counters
#[derive(Debug, Default)]
pub struct CallbackMonitor {
    /// Total callback invocations
    callback_count: AtomicU64,

    /// Total frames handed to the device
    frames_rendered: AtomicU64,

    /// Conversion buffer reallocations
    buffer_growths: AtomicU64,

    /// Frame count of the most recent period
    last_period_frames: AtomicU64,

    /// Largest period seen
    max_period_frames: AtomicU64,

    /// Callbacks whose output region did not match the contract
    contract_violations: AtomicU64,
}

/// Point-in-time copy of [`CallbackMonitor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallbackStats {
    pub callback_count: u64,
    pub frames_rendered: u64,
    pub buffer_growths: u64,
    pub last_period_frames: u64,
    pub max_period_frames: u64,
    pub contract_violations: u64,
}

impl CallbackMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed render period
    ///
    /// **REAL-TIME SAFE**: atomics only
    pub fn record_period(&self, frames: usize) {
        let frames = frames as u64;
        self.callback_count.fetch_add(1, Ordering::Relaxed);
        self.frames_rendered.fetch_add(frames, Ordering::Relaxed);
        self.last_period_frames.store(frames, Ordering::Relaxed);
        self.max_period_frames.fetch_max(frames, Ordering::Relaxed);
    }

    /// Record a conversion buffer reallocation
    pub fn record_growth(&self) {
        self.buffer_growths.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an output region that broke the render contract
    pub fn record_violation(&self) {
        self.contract_violations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CallbackStats {
        CallbackStats {
            callback_count: self.callback_count.load(Ordering::Relaxed),
            frames_rendered: self.frames_rendered.load(Ordering::Relaxed),
            buffer_growths: self.buffer_growths.load(Ordering::Relaxed),
            last_period_frames: self.last_period_frames.load(Ordering::Relaxed),
            max_period_frames: self.max_period_frames.load(Ordering::Relaxed),
            contract_violations: self.contract_violations.load(Ordering::Relaxed),
        }
    }
}
