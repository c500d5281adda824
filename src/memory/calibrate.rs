/*!
 * System Limits Calibration
 *
 * Derives the device memory watermarks from the lowmem kernel files once.
 * The kernel values are treated as static for the process lifetime.
 *
 * All intermediate quantities are kilobytes; the stored limits are bytes.
 */

use super::meminfo::{parse_meminfo, MemInfoField};
use super::source::{read_value, SystemSource};
use crate::core::config::SysPaths;
use crate::core::limits::{AVAIL_RAM_SHIFT, DENY_RESERVE_SHIFT, FALLBACK_AVAIL_RAM_KB};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Device memory limits, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemLimits {
    /// RAM the device considers available to applications
    pub avail_ram: usize,
    /// Memory ceiling the lowmem watermarks are relative to
    pub avail_memory: usize,
    /// Boundary past which the kernel refuses allocations
    pub deny_limit: usize,
    /// Earlier, softer warning boundary
    pub lowmem_limit: usize,
}

/// Round-half-up division of unsigned values
#[inline]
pub(crate) fn divide_round(a: u128, b: u128) -> u128 {
    (a.saturating_add(b >> 1)) / b
}

/// `percent` of `base`, rounded half up, saturating
#[inline]
fn percent_of(base: usize, percent: usize) -> usize {
    let value = divide_round(base as u128 * percent as u128, 100);
    usize::try_from(value).unwrap_or(usize::MAX)
}

/// Kilobytes to bytes, saturating
#[inline]
pub(crate) fn kb_to_bytes(kb: usize) -> usize {
    kb.saturating_mul(1024)
}

/// Compute the limits from the kernel files
///
/// Never fails: every unreadable input falls back to a default.
pub fn calibrate(source: &dyn SystemSource, paths: &SysPaths) -> SystemLimits {
    let page_size = source.page_size();
    let allowed_pages = read_value(source, &paths.allowed_pages);

    let total_kb = source
        .read(&paths.meminfo)
        .ok()
        .and_then(|text| {
            parse_meminfo(text.lines(), &[MemInfoField::MemTotal]).get(MemInfoField::MemTotal)
        })
        .filter(|kb| *kb > 0);

    let avail_ram = total_kb.map_or(FALLBACK_AVAIL_RAM_KB, |kb| kb >> AVAIL_RAM_SHIFT);

    let (avail_memory, deny_pct, notify_pct) = match allowed_pages {
        None => (avail_ram, None, None),
        Some(pages) => (
            pages.saturating_mul(page_size >> 10),
            read_value(source, &paths.deny_watermark),
            read_value(source, &paths.notify_high),
        ),
    };

    let deny_limit = match deny_pct {
        None => avail_memory - (avail_memory >> DENY_RESERVE_SHIFT),
        Some(pct) => percent_of(avail_memory, pct),
    };

    let lowmem_limit = match notify_pct {
        None => deny_limit,
        Some(pct) => percent_of(avail_memory, pct),
    };

    let limits = SystemLimits {
        avail_ram: kb_to_bytes(avail_ram),
        avail_memory: kb_to_bytes(avail_memory),
        deny_limit: kb_to_bytes(deny_limit),
        lowmem_limit: kb_to_bytes(lowmem_limit),
    };

    debug!(
        target: "lowmem",
        avail_ram = limits.avail_ram,
        avail_memory = limits.avail_memory,
        deny_limit = limits.deny_limit,
        lowmem_limit = limits.lowmem_limit,
        meminfo = total_kb.is_some(),
        lowmem_files = allowed_pages.is_some(),
        "system limits calibrated"
    );

    limits
}
