/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias for every fallible operation in the crate
pub type LowmemResult<T> = Result<T, LowmemError>;

/// Low-memory subsystem errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum LowmemError {
    #[error("Invalid argument: {0}")]
    #[diagnostic(
        code(lowmem::invalid_argument),
        help("The caller passed a value the operation cannot accept.")
    )]
    InvalidArgument(String),

    #[error("No memory information could be read from {path}")]
    #[diagnostic(
        code(lowmem::source_unavailable),
        help("Check that procfs is mounted and readable, or point LOWMEM_SYSFS_ROOT at a populated tree.")
    )]
    SourceUnavailable { path: String },

    #[error("Insufficient headroom: available {available} bytes, threshold {threshold} bytes")]
    #[diagnostic(
        code(lowmem::insufficient_headroom),
        help("Lower the threshold or free memory before arming the watchdog.")
    )]
    InsufficientHeadroom { available: usize, threshold: usize },

    #[error("Predicted overcommit: heap would reach {projected} bytes, limit {max_heap_size} bytes")]
    #[diagnostic(
        code(lowmem::predicted_overcommit),
        help("The allocation watchdog refused the request to protect the system.")
    )]
    PredictedOvercommit { projected: usize, max_heap_size: usize },

    #[error("Failed to write {path}: {reason}")]
    #[diagnostic(code(lowmem::write_failed))]
    WriteFailed { path: String, reason: String },
}
