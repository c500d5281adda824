/*!
 * Simple Allocation Watchdog
 *
 * Predicts heap overcommit and refuses the allocation instead of letting
 * the kernel OOM killer act.
 *
 * ## Admission
 *
 * - **Disarmed**: every request bypasses the watchdog
 * - **Small request, countdown > 0**: allowed, countdown decremented
 * - **Large request or countdown exhausted**: full check of
 *   `heap + size` against the heap budget and the kernel low-memory flag
 *
 * A passed full check re-opens the amortization window. A denial closes
 * it, so the very next request is validated again.
 */

use super::reentry::HookGuard;
use super::state::{LowmemProbe, WatchdogConfig, WatchdogState};
use crate::core::errors::{LowmemError, LowmemResult};
use crate::core::types::Size;
use crate::memory::monitor::MemoryMonitor;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Watchdog disarmed or re-entered
    Bypass,
    /// Passed on the amortization countdown
    Allowed,
    /// Passed a full check
    Verified,
    /// Refused: the heap would reach `projected` bytes
    Denied { projected: Size, max_heap_size: Size },
}

impl Admission {
    #[inline]
    pub fn is_denied(&self) -> bool {
        matches!(self, Admission::Denied { .. })
    }
}

/// Allocation watchdog
///
/// Const-constructible so it can back a `#[global_allocator]`.
pub struct Watchdog {
    armed: AtomicBool,
    // Bytes currently claimed through the guarded allocator
    heap: AtomicUsize,
    state: Mutex<WatchdogState>,
}

static GLOBAL: Watchdog = Watchdog::new();

/// Process-wide watchdog
pub fn global() -> &'static Watchdog {
    &GLOBAL
}

impl Watchdog {
    pub const fn new() -> Self {
        Self {
            armed: AtomicBool::new(false),
            heap: AtomicUsize::new(0),
            state: parking_lot::const_mutex(WatchdogState::disarmed()),
        }
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Current heap extent in bytes
    #[inline]
    pub fn heap_extent(&self) -> Size {
        self.heap.load(Ordering::Relaxed)
    }

    /// Account `size` bytes claimed from the underlying allocator
    #[inline]
    pub fn record_claim(&self, size: Size) {
        self.heap.fetch_add(size, Ordering::Relaxed);
    }

    /// Account `size` bytes returned to the underlying allocator
    #[inline]
    pub fn record_release(&self, size: Size) {
        let _ = self
            .heap
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |heap| {
                Some(heap.saturating_sub(size))
            });
    }

    /// Heap budget while armed
    pub fn max_heap_size(&self) -> Option<Size> {
        let state = self.state.lock();
        state.armed.then_some(state.max_heap_size)
    }

    /// Size from which every request is checked, while armed
    pub fn max_block_size(&self) -> Option<Size> {
        let state = self.state.lock();
        state.armed.then_some(state.max_block_size)
    }

    /// Arm (or re-arm) the watchdog
    ///
    /// The heap may grow by `min(avail_ram, usable) - threshold` from its
    /// current extent. Fails with `InsufficientHeadroom`, leaving the
    /// previous arming untouched, when that is not positive.
    ///
    /// Safe to call while armed: its own reads and logging bypass the
    /// watchdog.
    pub fn enable(&self, monitor: &MemoryMonitor, config: WatchdogConfig) -> LowmemResult<()> {
        let _hook = HookGuard::enter();
        let watchblock = match config.watchblock {
            0 => monitor.page_size(),
            size => size,
        };

        let usage = monitor.get_usage()?;
        let available = monitor.avail_ram().min(usage.usable);
        let threshold = config.threshold;

        if threshold == 0 || available <= threshold {
            warn!(
                target: "lowmem",
                available,
                threshold,
                "SAW not armed: available memory does not exceed threshold"
            );
            return Err(LowmemError::InsufficientHeadroom {
                available,
                threshold,
            });
        }

        let max_heap_size = self.heap_extent().saturating_add(available - threshold);
        let lowmem = Arc::new(LowmemProbe {
            source: Arc::clone(monitor.source()),
            path: monitor.paths().high_watermark.clone(),
        });

        let previous = {
            let mut state = self.state.lock();
            let previous = std::mem::replace(
                &mut *state,
                WatchdogState {
                    armed: true,
                    max_block_size: watchblock,
                    max_heap_size,
                    window: config.window,
                    countdown: 0,
                    callback: config.callback,
                    context: config.context,
                    lowmem: Some(lowmem),
                },
            );
            self.armed.store(true, Ordering::Release);
            previous
        };

        info!(
            target: "lowmem",
            block_size = watchblock,
            max_heap = max_heap_size,
            threshold,
            reconfigured = previous.armed,
            "SAW hook installed"
        );
        Ok(())
    }

    /// Disarm and drop the stored parameters; no-op when already disarmed
    pub fn disable(&self) {
        let _hook = HookGuard::enter();
        let previous = {
            let mut state = self.state.lock();
            self.armed.store(false, Ordering::Release);
            std::mem::replace(&mut *state, WatchdogState::disarmed())
        };

        if previous.armed {
            info!(target: "lowmem", "SAW hook removed");
        }
    }

    /// Admission check against the tracked heap extent
    #[inline]
    pub fn admit(&self, size: Size) -> Admission {
        self.admit_with_heap(size, self.heap_extent())
    }

    /// Admission check against an explicit heap extent
    ///
    /// Runs on the allocation path: no logging, the user callback is
    /// invoked only after the lock is released.
    pub fn admit_with_heap(&self, size: Size, heap: Size) -> Admission {
        if !self.is_armed() {
            return Admission::Bypass;
        }
        let Some(_hook) = HookGuard::enter() else {
            return Admission::Bypass;
        };

        let (projected, max_heap_size, callback, context) = {
            let mut state = self.state.lock();
            if !state.armed {
                return Admission::Bypass;
            }

            if size < state.max_block_size && state.countdown > 0 {
                state.countdown -= 1;
                return Admission::Allowed;
            }

            let projected = heap.saturating_add(size);
            let over_budget = projected >= state.max_heap_size
                || state
                    .lowmem
                    .as_ref()
                    .is_some_and(|probe| probe.in_lowmem_state());

            if !over_budget {
                state.countdown = state.window;
                return Admission::Verified;
            }

            // Force validation of the next request
            state.countdown = 0;
            (
                projected,
                state.max_heap_size,
                state.callback.clone(),
                state.context.clone(),
            )
        };

        if let Some(callback) = callback {
            callback(projected, max_heap_size, context.as_ref());
        }

        Admission::Denied {
            projected,
            max_heap_size,
        }
    }

    /// Explicit check for call sites that manage their own memory
    ///
    /// Does not record the claim.
    pub fn try_reserve(&self, size: Size) -> LowmemResult<()> {
        match self.admit(size) {
            Admission::Denied {
                projected,
                max_heap_size,
            } => {
                let _hook = HookGuard::enter();
                debug!(target: "lowmem", size, projected, max_heap_size, "SAW: OOM for reservation");
                Err(LowmemError::PredictedOvercommit {
                    projected,
                    max_heap_size,
                })
            }
            _ => Ok(()),
        }
    }

    #[cfg(test)]
    pub(crate) fn arm_fixed(&self, max_heap_size: Size, config: WatchdogConfig) {
        let mut state = self.state.lock();
        *state = WatchdogState {
            armed: true,
            max_block_size: config.watchblock,
            max_heap_size,
            window: config.window,
            countdown: 0,
            callback: config.callback,
            context: config.context,
            lowmem: None,
        };
        self.armed.store(true, Ordering::Release);
    }
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Watchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watchdog")
            .field("armed", &self.is_armed())
            .field("heap", &self.heap_extent())
            .finish_non_exhaustive()
    }
}
