use std::sync::atomic::{AtomicUsize, Ordering};

use moor::{Alloc, Arc, Managed, Tracking};

#[test]
fn init_then_drop_releases_the_allocation() {
    let tracker = Tracking::new();
    let arc = Arc::new_in(7u32, &tracker).unwrap();
    assert_eq!(arc.strong_count(), 1);
    drop(arc);
    assert_eq!(tracker.live_bytes(), 0);
    assert_eq!(tracker.live_blocks(), 0);
}

#[test]
fn clone_arithmetic() {
    let arc = Arc::new(0u8).unwrap();
    let clones: Vec<_> = (0..5).map(|_| arc.clone()).collect();
    assert_eq!(arc.strong_count(), 6);

    drop(clones);
    assert_eq!(arc.strong_count(), 1);
}

#[test]
fn get_mut_iff_unique() {
    let mut arc = Arc::new(1u32).unwrap();
    assert!(arc.get_mut().is_some());

    let other = arc.clone();
    assert!(arc.get_mut().is_none());

    drop(other);
    *arc.get_mut().unwrap() = 3;
    assert_eq!(*arc, 3);
}

#[test]
fn value_released_exactly_once_at_zero() {
    static RELEASES: AtomicUsize = AtomicUsize::new(0);

    struct Probe;

    impl Managed for Probe {
        fn release<A: Alloc>(&mut self, _alloc: &A) {
            RELEASES.fetch_add(1, Ordering::Relaxed);
        }
    }

    let arc = Arc::new(Probe).unwrap();
    let other = arc.clone();
    let third = other.clone();

    drop(arc);
    drop(other);
    assert_eq!(RELEASES.load(Ordering::Relaxed), 0);

    drop(third);
    assert_eq!(RELEASES.load(Ordering::Relaxed), 1);
}

// The end-to-end lifecycle: init 10, clone, drop the original, read through
// the clone, drop it, and the allocator reports nothing outstanding.
#[test]
fn shared_lifecycle_scenario() {
    let tracker = Tracking::new();

    let original = Arc::new_in(10u32, &tracker).unwrap();
    let clone = original.clone();
    assert_eq!(original.strong_count(), 2);

    drop(original);
    assert_eq!(clone.strong_count(), 1);
    assert_eq!(*clone, 10);

    drop(clone);
    assert_eq!(tracker.live_bytes(), 0);
}

#[test]
fn clone_and_drop_across_threads() {
    let tracker = Tracking::new();
    let arc = Arc::new_in(99u64, &tracker).unwrap();

    crossbeam_utils::thread::scope(|scope| {
        for _ in 0..8 {
            let handle = arc.clone();
            scope.spawn(move |_| {
                assert_eq!(*handle, 99);
                drop(handle);
            });
        }
    })
    .unwrap();

    assert_eq!(arc.strong_count(), 1);
    drop(arc);
    assert_eq!(tracker.live_bytes(), 0);
}

#[test]
fn ptr_eq_distinguishes_boxes() {
    let a = Arc::new(1u32).unwrap();
    let b = a.clone();
    let c = Arc::new(1u32).unwrap();

    assert!(a.ptr_eq(&b));
    assert!(!a.ptr_eq(&c));
}
