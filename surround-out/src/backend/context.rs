//! Reference-counted backend context
//!
//! All active output streams share one backend context. The cache only
//! holds a `Weak`; each running stream holds an `Arc`. The context is
//! created on the first acquire and released when the last stream stops.

use super::OutputBackend;
use crate::error::Result;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tracing::{error, info};

type ContextFactory<B> = Box<dyn Fn() -> Result<B> + Send + Sync>;

/// Lazily created, jointly owned backend context
pub struct SharedContext<B: OutputBackend> {
    slot: Mutex<Weak<B>>,
    factory: ContextFactory<B>,
}

impl<B: OutputBackend> SharedContext<B> {
    /// `factory` creates the context whenever no stream holds one
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<B> + Send + Sync + 'static,
    {
        Self {
            slot: Mutex::new(Weak::new()),
            factory: Box::new(factory),
        }
    }

    /// Get the live context, creating it if no stream currently holds one.
    ///
    /// Returns `None` when the factory fails; the failure is logged.
    pub fn acquire(&self) -> Option<Arc<B>> {
        let mut slot = self.lock_slot();

        if let Some(context) = slot.upgrade() {
            return Some(context);
        }

        match (self.factory)() {
            Ok(context) => {
                let context = Arc::new(context);
                *slot = Arc::downgrade(&context);
                info!("Audio backend context created");
                Some(context)
            }
            Err(e) => {
                error!("Failed to create audio backend context: {}", e);
                None
            }
        }
    }

    /// Number of outstanding handles to the live context
    pub fn handle_count(&self) -> usize {
        self.lock_slot().strong_count()
    }

    /// Whether a context currently exists
    pub fn is_active(&self) -> bool {
        self.handle_count() > 0
    }

    fn lock_slot(&self) -> MutexGuard<'_, Weak<B>> {
        // The slot only ever holds a Weak, so a poisoned lock is still usable
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<B: OutputBackend> std::fmt::Debug for SharedContext<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedContext")
            .field("handle_count", &self.handle_count())
            .finish()
    }
}
