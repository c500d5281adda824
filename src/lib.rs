/*!
 * lowmem
 * Low-memory watermarks, cached usage snapshots and the Simple Allocation
 * Watchdog for resource-constrained Linux devices
 *
 * The free functions below operate on the process-wide
 * [`MemoryMonitor::global`] and [`saw::global`] instances.
 */

pub mod core;
pub mod memory;
pub mod monitoring;
pub mod platform;
pub mod saw;

// Re-exports
pub use crate::core::{LowmemError, LowmemResult, MonitorConfig, Size, SysPaths};
pub use memory::{
    MemInfoField, MemoryMonitor, MemoryUsageSnapshot, ProcFs, StaticSource, SystemLimits,
    SystemSource,
};
pub use monitoring::init_tracing;
pub use platform::FpuMode;
pub use saw::{Admission, OomCallback, OomContext, Watchdog, WatchdogAllocator, WatchdogConfig};

/// Usage snapshot, cached while the kernel counters are unchanged
pub fn get_usage() -> LowmemResult<MemoryUsageSnapshot> {
    MemoryMonitor::global().get_usage()
}

/// Usage snapshot from a full meminfo parse
pub fn get_usage_now() -> LowmemResult<MemoryUsageSnapshot> {
    MemoryMonitor::global().get_usage_now()
}

pub fn get_avail_ram() -> Size {
    MemoryMonitor::global().avail_ram()
}

pub fn get_free() -> Size {
    MemoryMonitor::global().free()
}

pub fn get_deny_limit() -> Size {
    MemoryMonitor::global().deny_limit()
}

pub fn get_lowmem_limit() -> Size {
    MemoryMonitor::global().lowmem_limit()
}

pub fn in_lowmem_state() -> bool {
    MemoryMonitor::global().in_lowmem_state()
}

/// Arm the process-wide watchdog
///
/// `watchblock` 0 selects the page size. Only allocations made through a
/// [`WatchdogAllocator`] are guarded.
pub fn watchdog_enable(
    threshold: Size,
    watchblock: Size,
    callback: Option<OomCallback>,
    context: Option<OomContext>,
) -> LowmemResult<()> {
    let config = WatchdogConfig {
        callback,
        context,
        ..WatchdogConfig::new(threshold).with_watchblock(watchblock)
    };
    saw::global().enable(MemoryMonitor::global(), config)
}

pub fn watchdog_disable() {
    saw::global().disable()
}

/// Make this process the kernel's preferred OOM victim
pub fn score_adjust() -> LowmemResult<()> {
    platform::score_adjust(&MemoryMonitor::global().paths().oom_adj)
}
