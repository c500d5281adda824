/*!
 * Memory Monitor
 *
 * Owns the system source, the calibrated limits and the usage cache.
 *
 * ## Costs
 *
 * - **Limits**: computed on first use, several file reads, never again
 * - **get_usage**: one single-value read on every call, plus a full
 *   meminfo parse when the cache is stale
 * - **get_usage_now**: full meminfo parse, always
 *
 * A process-wide instance backed by procfs is available through
 * [`MemoryMonitor::global`]; tests and simulations build their own over a
 * [`StaticSource`](super::source::StaticSource).
 *
 * Every query runs with the allocation watchdog bypassed for the calling
 * thread, so the monitor keeps working when a guarded allocator is
 * installed and the watchdog is refusing requests.
 */

use super::calibrate::{calibrate, SystemLimits};
use super::meminfo::{parse_meminfo, MemInfoField};
use super::source::{read_value, ProcFs, SystemSource};
use super::usage::{MemoryUsageSnapshot, UsageCache};
use crate::core::config::{MonitorConfig, SysPaths};
use crate::core::errors::{LowmemError, LowmemResult};
use crate::core::types::{Pages, Size};
use crate::saw::bypass;
use std::sync::{Arc, OnceLock};
use tracing::{trace, warn};

/// Low-memory monitor
pub struct MemoryMonitor {
    source: Arc<dyn SystemSource>,
    paths: SysPaths,
    limits: OnceLock<SystemLimits>,
    // Notify-high watermark in pages, read once
    high_pages: OnceLock<Option<Pages>>,
    cache: UsageCache,
}

impl MemoryMonitor {
    pub fn new(source: Arc<dyn SystemSource>, config: MonitorConfig) -> Self {
        Self {
            source,
            paths: config.paths,
            limits: OnceLock::new(),
            high_pages: OnceLock::new(),
            cache: UsageCache::new(),
        }
    }

    /// Monitor over the real procfs with the given configuration
    pub fn procfs(config: MonitorConfig) -> Self {
        Self::new(Arc::new(ProcFs), config)
    }

    /// Process-wide monitor
    ///
    /// Configured from the environment on first use; an invalid environment
    /// falls back to the default paths.
    pub fn global() -> &'static MemoryMonitor {
        static GLOBAL: OnceLock<MemoryMonitor> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            bypass(|| {
                let config = MonitorConfig::from_env().unwrap_or_else(|e| {
                    warn!(target: "lowmem", error = %e, "Ignoring invalid monitor environment");
                    MonitorConfig::default()
                });
                Self::procfs(config)
            })
        })
    }

    pub fn source(&self) -> &Arc<dyn SystemSource> {
        &self.source
    }

    pub fn paths(&self) -> &SysPaths {
        &self.paths
    }

    pub fn page_size(&self) -> Size {
        self.source.page_size()
    }

    /// Calibrated limits, computed on first call
    pub fn limits(&self) -> SystemLimits {
        *self
            .limits
            .get_or_init(|| bypass(|| calibrate(self.source.as_ref(), &self.paths)))
    }

    /// Usage snapshot, served from cache while it is fresh
    pub fn get_usage(&self) -> LowmemResult<MemoryUsageSnapshot> {
        bypass(|| {
            let now = self.source.now_secs();
            let free_pages = read_value(self.source.as_ref(), &self.paths.free_pages);

            if let Some(snapshot) = self.cache.lookup(now, free_pages) {
                return Ok(snapshot);
            }

            let snapshot = self.compute_usage()?;
            self.cache.store(now, free_pages, snapshot);
            Ok(snapshot)
        })
    }

    /// Usage snapshot from a full meminfo parse; refreshes the cache
    pub fn get_usage_now(&self) -> LowmemResult<MemoryUsageSnapshot> {
        bypass(|| {
            let now = self.source.now_secs();
            let free_pages = read_value(self.source.as_ref(), &self.paths.free_pages);
            let snapshot = self.compute_usage()?;
            self.cache.store(now, free_pages, snapshot);
            Ok(snapshot)
        })
    }

    fn compute_usage(&self) -> LowmemResult<MemoryUsageSnapshot> {
        let unavailable = || LowmemError::SourceUnavailable {
            path: self.paths.meminfo.display().to_string(),
        };

        let text = self.source.read(&self.paths.meminfo).map_err(|_| unavailable())?;
        let info = parse_meminfo(text.lines(), &MemInfoField::ALL);
        if info.matched() == 0 {
            return Err(unavailable());
        }

        let snapshot = MemoryUsageSnapshot::from_meminfo(&info, &self.limits());
        trace!(
            target: "lowmem",
            total = snapshot.total,
            used = snapshot.used,
            util = snapshot.util,
            usable = snapshot.usable,
            "usage recomputed"
        );
        Ok(snapshot)
    }

    /// Available RAM in bytes
    pub fn avail_ram(&self) -> Size {
        self.limits().avail_ram
    }

    /// Deny limit in bytes
    pub fn deny_limit(&self) -> Size {
        self.limits().deny_limit
    }

    /// Low-memory limit in bytes
    pub fn lowmem_limit(&self) -> Size {
        self.limits().lowmem_limit
    }

    /// Memory available below the notify-high watermark, in bytes
    ///
    /// Falls back to the available RAM when the kernel does not expose the
    /// page counters.
    pub fn free(&self) -> Size {
        bypass(|| {
            let free_pages = read_value(self.source.as_ref(), &self.paths.free_pages);
            let high_pages = *self
                .high_pages
                .get_or_init(|| read_value(self.source.as_ref(), &self.paths.notify_high_pages));

            match (free_pages, high_pages) {
                (Some(free), Some(high)) if free > high => {
                    (free - high).saturating_mul(self.page_size())
                }
                (Some(_), Some(_)) => 0,
                _ => self.avail_ram(),
            }
        })
    }

    /// Whether the kernel has flagged the low-memory state
    pub fn in_lowmem_state(&self) -> bool {
        bypass(|| read_value(self.source.as_ref(), &self.paths.high_watermark) == Some(1))
    }
}

impl std::fmt::Debug for MemoryMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryMonitor")
            .field("paths", &self.paths)
            .field("limits", &self.limits.get())
            .finish_non_exhaustive()
    }
}
