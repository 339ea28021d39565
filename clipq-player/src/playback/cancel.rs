//! Cross-thread skip signal
//!
//! A single atomic flag: settable from any thread without blocking, consumed
//! by the playback monitor with an atomic test-and-clear so a raise is
//! observed at most once.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct CancellationSignal {
    raised: AtomicBool,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request abort of the clip in flight (idempotent)
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// Atomically read and reset the flag
    ///
    /// Returns true for exactly one caller per raise.
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::AcqRel)
    }

    /// Observational check that does not consume the raise
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}
