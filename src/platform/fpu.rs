/*!
 * Floating-Point Mode
 *
 * Process-wide rounding/denormal mode flag. Only the flag is kept; no FPU
 * control register is touched. Reads and writes are relaxed: concurrent
 * `set_mode` calls race, the last write wins and other threads may
 * observe it late.
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

/// Floating-point mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FpuMode {
    /// Full IEEE-754 semantics
    #[default]
    Accurate,
    /// Flush-to-zero with default NaN
    Fast,
}

impl FpuMode {
    const fn as_u8(self) -> u8 {
        match self {
            FpuMode::Accurate => 0,
            FpuMode::Fast => 1,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => FpuMode::Fast,
            _ => FpuMode::Accurate,
        }
    }
}

impl std::fmt::Display for FpuMode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FpuMode::Accurate => write!(f, "ACCURATE"),
            FpuMode::Fast => write!(f, "FAST"),
        }
    }
}

static MODE: AtomicU8 = AtomicU8::new(FpuMode::Accurate.as_u8());

/// Current mode
#[inline]
pub fn get_mode() -> FpuMode {
    FpuMode::from_u8(MODE.load(Ordering::Relaxed))
}

/// Record the requested mode
#[inline]
pub fn set_mode(mode: FpuMode) {
    MODE.store(mode.as_u8(), Ordering::Relaxed);
}
