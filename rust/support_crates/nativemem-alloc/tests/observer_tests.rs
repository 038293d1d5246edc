use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use nativemem_alloc::{
    AlignedBlock,
    observer::{self, AllocationObserver},
};

#[derive(Default)]
struct CountingObserver {
    allocated: AtomicUsize,
    released: AtomicUsize,
    bytes: AtomicUsize,
}

struct SharedObserver(Arc<CountingObserver>);

impl AllocationObserver for SharedObserver {
    fn allocated(&self, size: usize) {
        self.0.allocated.fetch_add(1, Ordering::SeqCst);
        self.0.bytes.fetch_add(size, Ordering::SeqCst);
    }

    fn released(&self, size: usize) {
        self.0.released.fetch_add(1, Ordering::SeqCst);
        self.0.bytes.fetch_sub(size, Ordering::SeqCst);
    }
}

// Single test in this binary: the observer is process-wide.
#[test]
fn test_observer_sees_every_allocation_once() {
    let counts = Arc::new(CountingObserver::default());
    assert!(observer::set_allocation_observer(Box::new(SharedObserver(counts.clone()))).is_ok());
    assert!(
        observer::set_allocation_observer(Box::new(SharedObserver(counts.clone()))).is_err()
    );

    let blocks: Vec<_> = (1..=10)
        .map(|i| AlignedBlock::allocate(i * 100, 16, true).expect("allocate"))
        .collect();
    assert_eq!(counts.allocated.load(Ordering::SeqCst), 10);
    assert_eq!(counts.bytes.load(Ordering::SeqCst), 5500);

    let stats = observer::allocation_stats();
    assert_eq!(stats.live_allocations, 10);
    assert_eq!(stats.live_bytes, 5500);

    drop(blocks);
    assert_eq!(counts.released.load(Ordering::SeqCst), 10);
    assert_eq!(counts.bytes.load(Ordering::SeqCst), 0);
    assert_eq!(observer::allocation_stats().live_allocations, 0);
}
