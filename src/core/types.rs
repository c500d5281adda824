/*!
 * Core Types
 * Common types used across the crate
 */

/// Byte count (or kilobyte count where noted)
pub type Size = usize;

/// Wall-clock seconds since the Unix epoch
pub type Seconds = u64;

/// Page count as reported by the kernel lowmem files
pub type Pages = usize;
