//! Process-wide accounting of native allocations.
//!
//! Every aligned allocation made through [`crate::aligned`] is reported here. The
//! counters are always maintained; an [`AllocationObserver`] can additionally be
//! installed once per process to forward the same events to a host (for instance,
//! a runtime that wants to know how much unmanaged memory is kept alive).

use std::sync::{
    OnceLock,
    atomic::{AtomicU64, AtomicUsize, Ordering},
};

/// Receives a notification for every native allocation and release.
///
/// Implementations are called on the allocating (or releasing) thread and must not
/// allocate through this crate themselves.
pub trait AllocationObserver: Send + Sync {
    /// Called after `size` payload bytes were successfully allocated.
    fn allocated(&self, size: usize);

    /// Called after an allocation of `size` payload bytes was released.
    fn released(&self, size: usize);
}

/// A snapshot of the global allocation counters.
///
/// **Note**: the values may be outdated by the time they are inspected when other
/// threads allocate concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocationStats {
    /// Number of allocations that have not been released yet.
    pub live_allocations: usize,
    /// Payload bytes held by the live allocations.
    pub live_bytes: usize,
    /// Number of allocations made since process start.
    pub total_allocations: u64,
}

static OBSERVER: OnceLock<Box<dyn AllocationObserver>> = OnceLock::new();

static LIVE_ALLOCATIONS: AtomicUsize = AtomicUsize::new(0);
static LIVE_BYTES: AtomicUsize = AtomicUsize::new(0);
static TOTAL_ALLOCATIONS: AtomicU64 = AtomicU64::new(0);

/// Installs the process-wide allocation observer.
///
/// The observer can be set only once; subsequent calls hand the rejected observer
/// back to the caller.
pub fn set_allocation_observer(
    observer: Box<dyn AllocationObserver>,
) -> Result<(), Box<dyn AllocationObserver>> {
    OBSERVER.set(observer)
}

/// Returns the current values of the global allocation counters.
pub fn allocation_stats() -> AllocationStats {
    AllocationStats {
        live_allocations: LIVE_ALLOCATIONS.load(Ordering::Relaxed),
        live_bytes: LIVE_BYTES.load(Ordering::Relaxed),
        total_allocations: TOTAL_ALLOCATIONS.load(Ordering::Relaxed),
    }
}

pub(crate) fn notify_allocated(size: usize) {
    LIVE_ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
    LIVE_BYTES.fetch_add(size, Ordering::Relaxed);
    TOTAL_ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
    if let Some(observer) = OBSERVER.get() {
        observer.allocated(size);
    }
}

pub(crate) fn notify_released(size: usize) {
    LIVE_ALLOCATIONS.fetch_sub(1, Ordering::Relaxed);
    LIVE_BYTES.fetch_sub(size, Ordering::Relaxed);
    if let Some(observer) = OBSERVER.get() {
        observer.released(size);
    }
}
