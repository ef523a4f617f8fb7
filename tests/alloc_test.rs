use anyhow::Result;
use moor::{Alloc, AllocError, Global, Quota, Tracking};

#[test]
fn create_and_destroy_round_trip() -> Result<()> {
    let tracker = Tracking::new();

    let cell = tracker.create::<u64>()?;
    unsafe { cell.as_ptr().write(77) };
    assert_eq!(unsafe { *cell.as_ptr() }, 77);
    assert_eq!(tracker.live_bytes(), 8);

    unsafe { tracker.destroy(cell) };
    assert_eq!(tracker.live_bytes(), 0);
    Ok(())
}

#[test]
fn dupe_copies_and_free_returns_everything() -> Result<()> {
    let tracker = Tracking::new();

    let copy = tracker.dupe(b"sequence".as_slice())?;
    assert_eq!(unsafe { copy.as_ref() }, b"sequence");
    assert_eq!(tracker.live_bytes(), 8);

    unsafe { tracker.free(copy) };
    assert_eq!(tracker.live_bytes(), 0);
    Ok(())
}

#[test]
fn dupe_with_sentinel_appends_one_element() -> Result<()> {
    let tracker = Tracking::new();

    let copy = tracker.dupe_with_sentinel(b"abc".as_slice(), 0)?;
    assert_eq!(copy.len(), 4);
    assert_eq!(unsafe { copy.as_ref() }, b"abc\0");

    unsafe { tracker.free(copy) };
    assert_eq!(tracker.live_bytes(), 0);
    Ok(())
}

#[test]
fn empty_dupe_is_allocation_free() -> Result<()> {
    let tracker = Tracking::new();

    let copy = tracker.dupe::<u32>(&[])?;
    assert_eq!(copy.len(), 0);
    assert_eq!(tracker.allocations(), 0);

    unsafe { tracker.free(copy) };
    Ok(())
}

#[test]
fn quota_surfaces_out_of_memory() {
    let quota = Quota::new(0);
    assert_eq!(quota.create::<u32>(), Err(AllocError));
    assert_eq!(quota.remaining(), 0);
}

#[test]
fn error_display_and_source() {
    let err = AllocError;
    assert_eq!(err.to_string(), "memory allocation failed");
    let boxed: Box<dyn std::error::Error> = Box::new(err);
    assert!(boxed.source().is_none());
}

#[test]
fn stats_snapshot_serializes() -> Result<()> {
    let tracker = Tracking::wrap(Global);
    let cell = tracker.create::<u32>()?;
    unsafe { tracker.destroy(cell) };

    let stats = tracker.stats();
    assert_eq!(stats.allocations, 1);
    assert_eq!(stats.deallocations, 1);
    assert_eq!(stats.live_bytes, 0);
    assert_eq!(stats.peak_bytes, 4);

    let json = serde_json::to_value(stats)?;
    assert_eq!(json["live_bytes"], 0);
    assert_eq!(json["allocations"], 1);
    Ok(())
}
