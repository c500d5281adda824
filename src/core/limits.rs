/*!
 * System Limits and Constants
 *
 * Centralized location for the thresholds, fallbacks and file locations
 * used by the calibrator, the usage cache and the allocation watchdog.
 */

// =============================================================================
// CALIBRATION
// =============================================================================

/// Available RAM assumed when meminfo cannot be read (64MB, in KB)
pub const FALLBACK_AVAIL_RAM_KB: usize = 64 << 10;

/// Share of MemTotal treated as available RAM (MemTotal >> 2)
pub const AVAIL_RAM_SHIFT: u32 = 2;

/// Deny limit fallback keeps 1/32 (~3%) of available memory in reserve
pub const DENY_RESERVE_SHIFT: u32 = 5;

/// Headroom fallback when no low-memory limit is configured (1/8, 12.5%)
pub const USABLE_HEADROOM_SHIFT: u32 = 3;

/// Page size used when the platform does not report one
pub const DEFAULT_PAGE_SIZE: usize = 4096;

// =============================================================================
// ALLOCATION WATCHDOG
// =============================================================================

/// Small allocations passed through between two full heap checks
/// [PERF] Amortizes the predictive check over a batch of small requests
pub const SAW_CHECK_WINDOW: usize = 1024;

/// Value written to the OOM adjust file (most system-friendly)
pub const OOM_ADJ_FRIENDLY: &str = "15";

// =============================================================================
// KERNEL FILES [LINUX-COMPAT]
// =============================================================================

pub const MEMINFO_PATH: &str = "/proc/meminfo";
pub const ALLOWED_PAGES_PATH: &str = "/proc/sys/vm/lowmem_allowed_pages";
pub const DENY_WATERMARK_PATH: &str = "/proc/sys/vm/lowmem_deny_watermark";
pub const NOTIFY_HIGH_PATH: &str = "/proc/sys/vm/lowmem_notify_high";
pub const NOTIFY_HIGH_PAGES_PATH: &str = "/proc/sys/vm/lowmem_notify_high_pages";
pub const FREE_PAGES_PATH: &str = "/proc/sys/vm/lowmem_free_pages";
pub const HIGH_WATERMARK_PATH: &str = "/sys/kernel/high_watermark";
pub const OOM_ADJ_PATH: &str = "/proc/self/oom_adj";

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Re-roots every kernel file path (chroots, fixtures)
pub const ENV_SYSFS_ROOT: &str = "LOWMEM_SYSFS_ROOT";

/// Enables JSON trace output when set to `1` or `true`
pub const ENV_TRACE_JSON: &str = "LOWMEM_TRACE_JSON";
