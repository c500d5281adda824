/*!
 * Memory Usage Snapshots
 *
 * Point-in-time usage derived from meminfo and the calibrated limits, and
 * the staleness cache that keeps repeated queries cheap.
 */

use super::calibrate::{divide_round, kb_to_bytes, SystemLimits};
use super::meminfo::{MemInfo, MemInfoField};
use crate::core::limits::USABLE_HEADROOM_SHIFT;
use crate::core::types::Seconds;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// System memory usage, in bytes except `util`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUsageSnapshot {
    /// RAM plus swap
    pub total: usize,
    /// Free, buffered and cached RAM plus free swap
    pub free: usize,
    /// `total - free`
    pub used: usize,
    /// Utilization percentage (0-100)
    pub util: u8,
    /// Deny limit
    pub deny: usize,
    /// Low-memory limit
    pub low: usize,
    /// Free memory left before the low-memory watermark
    pub usable: usize,
}

impl MemoryUsageSnapshot {
    /// Build a snapshot from parsed meminfo (kilobytes) and the limits
    pub fn from_meminfo(info: &MemInfo, limits: &SystemLimits) -> Self {
        let total_kb = info
            .kb(MemInfoField::MemTotal)
            .saturating_add(info.kb(MemInfoField::SwapTotal));
        let free_kb = [
            MemInfoField::MemFree,
            MemInfoField::Buffers,
            MemInfoField::Cached,
            MemInfoField::SwapFree,
        ]
        .into_iter()
        .fold(0usize, |acc, field| acc.saturating_add(info.kb(field)));
        let used_kb = total_kb.saturating_sub(free_kb);

        let util = if total_kb == 0 {
            0
        } else {
            divide_round(100 * used_kb as u128, total_kb as u128).min(100) as u8
        };

        let free = kb_to_bytes(free_kb);
        let low = limits.lowmem_limit;

        // Distance from the ceiling to the low watermark, 12.5% when unset
        let headroom = if low != 0 {
            limits.avail_memory.saturating_sub(low)
        } else {
            limits.avail_memory >> USABLE_HEADROOM_SHIFT
        };

        Self {
            total: kb_to_bytes(total_kb),
            free,
            used: kb_to_bytes(used_kb),
            util,
            deny: limits.deny_limit,
            low,
            usable: if headroom < free { free - headroom } else { 0 },
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    stamp: Seconds,
    free_pages: Option<usize>,
    snapshot: MemoryUsageSnapshot,
}

/// Two-signal staleness cache
///
/// A cached snapshot is reused only while the kernel free-page counter is
/// unchanged. Within the second of the last refresh an unavailable counter
/// counts as unchanged; across seconds it forces a recompute.
#[derive(Debug, Default)]
pub struct UsageCache {
    entry: Mutex<Option<CacheEntry>>,
}

impl UsageCache {
    pub const fn new() -> Self {
        Self {
            entry: parking_lot::const_mutex(None),
        }
    }

    /// Cached snapshot if it is still fresh
    ///
    /// A hit in a new second moves the cache stamp forward.
    pub fn lookup(&self, now: Seconds, free_pages: Option<usize>) -> Option<MemoryUsageSnapshot> {
        let mut guard = self.entry.lock();
        let entry = guard.as_mut()?;

        if entry.free_pages != free_pages {
            return None;
        }
        if entry.stamp == now {
            return Some(entry.snapshot);
        }
        if free_pages.is_some() {
            entry.stamp = now;
            return Some(entry.snapshot);
        }
        // Counter unavailable on both sides: only the clock says anything,
        // so a snapshot from an earlier second is stale
        None
    }

    /// Replace the cached snapshot
    pub fn store(&self, now: Seconds, free_pages: Option<usize>, snapshot: MemoryUsageSnapshot) {
        *self.entry.lock() = Some(CacheEntry {
            stamp: now,
            free_pages,
            snapshot,
        });
    }

    pub fn clear(&self) {
        *self.entry.lock() = None;
    }
}
