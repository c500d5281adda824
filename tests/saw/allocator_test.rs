/*!
 * Watchdog Allocator Tests
 * Arming against a synthetic system and guarded allocations
 *
 * Every test owns its watchdog so they can run in parallel.
 */

use lowmem::{
    LowmemError, MemoryMonitor, MonitorConfig, OomContext, StaticSource, SysPaths, Watchdog,
    WatchdogAllocator, WatchdogConfig,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::Arc;
use std::thread;

// min(avail_ram, usable) for the synthetic meminfo below
const AVAILABLE: usize = 256_000_000;

fn monitor() -> MemoryMonitor {
    let paths = SysPaths::default();
    let source = Arc::new(StaticSource::new());
    source.set(
        &paths.meminfo,
        "MemTotal: 1000000 kB\nMemFree: 200000 kB\nBuffers: 50000 kB\n\
         Cached: 50000 kB\nSwapTotal: 0 kB\nSwapFree: 0 kB\n",
    );
    MemoryMonitor::new(source, MonitorConfig::default())
}

fn layout(size: usize) -> Layout {
    Layout::from_size_align(size, 8).unwrap()
}

#[test]
fn test_enable_requires_headroom() {
    static WATCHDOG: Watchdog = Watchdog::new();
    let monitor = monitor();

    let err = WATCHDOG
        .enable(&monitor, WatchdogConfig::new(AVAILABLE + 1))
        .unwrap_err();
    assert_eq!(
        err,
        LowmemError::InsufficientHeadroom {
            available: AVAILABLE,
            threshold: AVAILABLE + 1,
        }
    );
    assert!(!WATCHDOG.is_armed());

    assert!(WATCHDOG.enable(&monitor, WatchdogConfig::new(AVAILABLE)).is_err());
    assert!(WATCHDOG.enable(&monitor, WatchdogConfig::new(0)).is_err());
    assert!(!WATCHDOG.is_armed());
}

#[test]
fn test_enable_sets_budget_from_heap_extent() {
    static WATCHDOG: Watchdog = Watchdog::new();
    let monitor = monitor();

    WATCHDOG.record_claim(10_000);
    WATCHDOG
        .enable(&monitor, WatchdogConfig::new(AVAILABLE - 1_000_000))
        .unwrap();

    assert!(WATCHDOG.is_armed());
    assert_eq!(WATCHDOG.max_heap_size(), Some(10_000 + 1_000_000));
    assert_eq!(WATCHDOG.max_block_size(), Some(4096));
    WATCHDOG.disable();
}

#[test]
fn test_failed_enable_keeps_previous_arming() {
    static WATCHDOG: Watchdog = Watchdog::new();
    let monitor = monitor();

    WATCHDOG
        .enable(&monitor, WatchdogConfig::new(AVAILABLE - 4096).with_watchblock(512))
        .unwrap();
    assert!(WATCHDOG.enable(&monitor, WatchdogConfig::new(AVAILABLE)).is_err());

    assert_eq!(WATCHDOG.max_heap_size(), Some(4096));
    assert_eq!(WATCHDOG.max_block_size(), Some(512));
    WATCHDOG.disable();
}

#[test]
fn test_denied_allocation_returns_null_and_notifies() {
    static WATCHDOG: Watchdog = Watchdog::new();
    let alloc = WatchdogAllocator::with_watchdog(System, &WATCHDOG);
    let calls: Arc<Mutex<Vec<(usize, usize, Option<u32>)>>> = Arc::default();

    let sink = Arc::clone(&calls);
    let config = WatchdogConfig::new(AVAILABLE - 1_000_000)
        .with_context(42u32)
        .with_callback(move |projected, max_heap, ctx: Option<&OomContext>| {
            let tag = ctx.and_then(|c| c.downcast_ref::<u32>()).copied();
            sink.lock().push((projected, max_heap, tag));
        });
    WATCHDOG.enable(&monitor(), config).unwrap();

    unsafe {
        let small = alloc.alloc(layout(64));
        assert!(!small.is_null());
        assert_eq!(WATCHDOG.heap_extent(), 64);

        let big = alloc.alloc(layout(2_000_000));
        assert!(big.is_null());
        assert_eq!(WATCHDOG.heap_extent(), 64);

        alloc.dealloc(small, layout(64));
    }

    assert_eq!(*calls.lock(), vec![(2_000_064, 1_000_000, Some(42))]);
    WATCHDOG.disable();
}

#[test]
fn test_disable_lets_large_allocations_through() {
    static WATCHDOG: Watchdog = Watchdog::new();
    let alloc = WatchdogAllocator::with_watchdog(System, &WATCHDOG);
    WATCHDOG
        .enable(&monitor(), WatchdogConfig::new(AVAILABLE - 1_000_000))
        .unwrap();

    unsafe {
        assert!(alloc.alloc(layout(2_000_000)).is_null());

        WATCHDOG.disable();
        assert!(!WATCHDOG.is_armed());
        assert_eq!(WATCHDOG.max_heap_size(), None);

        let big = alloc.alloc_zeroed(layout(2_000_000));
        assert!(!big.is_null());
        assert_eq!(*big.add(1_999_999), 0);
        assert_eq!(WATCHDOG.heap_extent(), 2_000_000);

        alloc.dealloc(big, layout(2_000_000));
    }
    assert_eq!(WATCHDOG.heap_extent(), 0);
}

#[test]
fn test_reenable_reconfigures() {
    static WATCHDOG: Watchdog = Watchdog::new();
    let alloc = WatchdogAllocator::with_watchdog(System, &WATCHDOG);
    let monitor = monitor();

    WATCHDOG
        .enable(&monitor, WatchdogConfig::new(AVAILABLE - 1_000_000))
        .unwrap();
    WATCHDOG
        .enable(&monitor, WatchdogConfig::new(AVAILABLE - 8_000_000))
        .unwrap();
    assert_eq!(WATCHDOG.max_heap_size(), Some(8_000_000));

    unsafe {
        let big = alloc.alloc(layout(2_000_000));
        assert!(!big.is_null());
        alloc.dealloc(big, layout(2_000_000));
    }
    WATCHDOG.disable();
}

#[test]
fn test_realloc_growth_is_guarded() {
    static WATCHDOG: Watchdog = Watchdog::new();
    let alloc = WatchdogAllocator::with_watchdog(System, &WATCHDOG);
    WATCHDOG
        .enable(&monitor(), WatchdogConfig::new(AVAILABLE - 1_000_000))
        .unwrap();

    unsafe {
        let ptr = alloc.alloc(layout(512));
        assert!(!ptr.is_null());
        ptr.write(7);

        assert!(alloc.realloc(ptr, layout(512), 3_000_000).is_null());
        assert_eq!(WATCHDOG.heap_extent(), 512);

        // Shrinking is never checked
        let shrunk = alloc.realloc(ptr, layout(512), 128);
        assert!(!shrunk.is_null());
        assert_eq!(*shrunk, 7);
        assert_eq!(WATCHDOG.heap_extent(), 128);

        alloc.dealloc(shrunk, layout(128));
    }
    WATCHDOG.disable();
}

#[test]
fn test_try_reserve_reports_overcommit() {
    static WATCHDOG: Watchdog = Watchdog::new();
    WATCHDOG
        .enable(&monitor(), WatchdogConfig::new(AVAILABLE - 1_000_000))
        .unwrap();

    assert!(WATCHDOG.try_reserve(500_000).is_ok());
    assert_eq!(
        WATCHDOG.try_reserve(1_000_000),
        Err(LowmemError::PredictedOvercommit {
            projected: 1_000_000,
            max_heap_size: 1_000_000,
        })
    );
    WATCHDOG.disable();
}

#[test]
fn test_kernel_lowmem_flag_denies_checked_requests() {
    static WATCHDOG: Watchdog = Watchdog::new();
    let paths = SysPaths::default();
    let source = Arc::new(StaticSource::new());
    source.set(&paths.meminfo, "MemTotal: 1000000 kB\nMemFree: 900000 kB\n");
    let monitor = MemoryMonitor::new(source.clone(), MonitorConfig::default());

    WATCHDOG.enable(&monitor, WatchdogConfig::new(1 << 20)).unwrap();
    assert!(!WATCHDOG.admit(8192).is_denied());

    source.set(&paths.high_watermark, "1");
    assert!(WATCHDOG.admit(8192).is_denied());

    source.set(&paths.high_watermark, "0");
    assert!(!WATCHDOG.admit(8192).is_denied());
    WATCHDOG.disable();
}

#[test]
fn test_concurrent_enable_disable_and_allocation() {
    static WATCHDOG: Watchdog = Watchdog::new();
    static ALLOC: WatchdogAllocator<System> = WatchdogAllocator::with_watchdog(System, &WATCHDOG);
    let monitor = Arc::new(monitor());

    let togglers: Vec<_> = (0..2)
        .map(|_| {
            let monitor = Arc::clone(&monitor);
            thread::spawn(move || {
                for i in 0..200 {
                    if i % 2 == 0 {
                        WATCHDOG
                            .enable(&monitor, WatchdogConfig::new(AVAILABLE / 2))
                            .unwrap();
                    } else {
                        WATCHDOG.disable();
                    }
                }
            })
        })
        .collect();

    let allocators: Vec<_> = (0..4)
        .map(|_| {
            thread::spawn(|| {
                for size in (1..500).map(|i| i * 64) {
                    unsafe {
                        let ptr = ALLOC.alloc(layout(size));
                        assert!(!ptr.is_null());
                        ALLOC.dealloc(ptr, layout(size));
                    }
                }
            })
        })
        .collect();

    for handle in togglers.into_iter().chain(allocators) {
        handle.join().unwrap();
    }

    WATCHDOG.disable();
    assert!(!WATCHDOG.is_armed());
    assert_eq!(WATCHDOG.heap_extent(), 0);
}
