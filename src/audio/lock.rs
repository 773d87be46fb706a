//! Exclusive ownership of the capture device.
//!
//! A [`DeviceLock`] is a one-permit semaphore.  A voice session holds the
//! [`DeviceGuard`] from `recording` until it reaches a terminal state, so at
//! most one session can be recording or transcribing at a time, even when
//! several wizard controllers share the same microphone.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Cheap-to-clone handle to the single capture slot.
#[derive(Debug, Clone)]
pub struct DeviceLock {
    permits: Arc<Semaphore>,
}

/// Proof of exclusive device ownership.  Dropping it frees the slot.
#[derive(Debug)]
pub struct DeviceGuard {
    _permit: OwnedSemaphorePermit,
}

impl DeviceLock {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
        }
    }

    /// Take the slot, or `None` when another session already holds it.
    /// Never waits: a second capture is rejected, not queued.
    pub fn try_acquire(&self) -> Option<DeviceGuard> {
        Arc::clone(&self.permits)
            .try_acquire_owned()
            .ok()
            .map(|permit| DeviceGuard { _permit: permit })
    }

    /// `true` while some session owns the device.
    pub fn is_held(&self) -> bool {
        self.permits.available_permits() == 0
    }
}

impl Default for DeviceLock {
    fn default() -> Self {
        Self::new()
    }
}
