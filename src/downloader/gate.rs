// Admission gate - bounds how many pipelines are in the download phase
//
// A counting gate over a tokio Semaphore. Each admission hands out a
// permit; dropping the permit releases the slot, whatever the transfer's
// result. Admissions and releases are recorded with timestamps so callers
// (and tests) can check the ceiling was honoured.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::trace;

use super::errors::DownloadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateEventKind {
    Admitted,
    Released,
}

/// One admit or release, in the order it happened
#[derive(Debug, Clone, Copy)]
pub struct GateEvent {
    pub kind: GateEventKind,
    /// Slots in use right after this event
    pub active: usize,
    pub at: Instant,
}

struct GateState {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    active: AtomicUsize,
    peak: AtomicUsize,
    events: Mutex<Vec<GateEvent>>,
}

impl GateState {
    fn record(&self, kind: GateEventKind) {
        // Under the lock so event order matches counter order
        let mut events = self.events.lock();
        let active = match kind {
            GateEventKind::Admitted => {
                let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(active, Ordering::SeqCst);
                active
            }
            GateEventKind::Released => self.active.fetch_sub(1, Ordering::SeqCst) - 1,
        };
        events.push(GateEvent {
            kind,
            active,
            at: Instant::now(),
        });
    }
}

/// Counting gate of fixed capacity. Cloning shares the same slots.
#[derive(Clone)]
pub struct AdmissionGate {
    state: Arc<GateState>,
}

impl AdmissionGate {
    pub fn new(capacity: usize) -> Result<Self, DownloadError> {
        if capacity == 0 {
            return Err(DownloadError::InvalidConfig(
                "admission gate needs at least one slot".to_string(),
            ));
        }
        Ok(Self {
            state: Arc::new(GateState {
                semaphore: Arc::new(Semaphore::new(capacity)),
                capacity,
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                events: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Wait for a free slot
    pub async fn admit(&self) -> Result<GatePermit, DownloadError> {
        let permit = Arc::clone(&self.state.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| DownloadError::Cancelled)?;
        self.state.record(GateEventKind::Admitted);
        trace!(active = self.active(), capacity = self.state.capacity, "Gate admitted");

        Ok(GatePermit {
            _permit: permit,
            state: Arc::clone(&self.state),
        })
    }

    pub fn capacity(&self) -> usize {
        self.state.capacity
    }

    /// Slots currently held
    pub fn active(&self) -> usize {
        self.state.active.load(Ordering::SeqCst)
    }

    /// Most slots ever held at once
    pub fn peak(&self) -> usize {
        self.state.peak.load(Ordering::SeqCst)
    }

    /// Snapshot of every admit/release so far
    pub fn events(&self) -> Vec<GateEvent> {
        self.state.events.lock().clone()
    }
}

impl std::fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionGate")
            .field("capacity", &self.capacity())
            .field("active", &self.active())
            .field("peak", &self.peak())
            .finish()
    }
}

/// Held for the whole download phase
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    state: Arc<GateState>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        // Fields drop after this, so the release is logged before the slot frees
        self.state.record(GateEventKind::Released);
    }
}
