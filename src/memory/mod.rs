/*!
 * Memory Module
 * System memory limits, usage snapshots and their kernel sources
 */

pub mod calibrate;
pub mod meminfo;
pub mod monitor;
pub mod source;
pub mod usage;

// Re-export for convenience
pub use calibrate::{calibrate, SystemLimits};
pub use meminfo::{parse_meminfo, parse_value, MemInfo, MemInfoField};
pub use monitor::MemoryMonitor;
pub use source::{read_value, ProcFs, StaticSource, SystemSource};
pub use usage::{MemoryUsageSnapshot, UsageCache};
