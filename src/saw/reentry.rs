/*!
 * Hook Reentry Guard
 *
 * Marks the current thread as running watchdog code. Allocations issued
 * while the mark is set (lock slow paths, the low-memory probe, the user
 * callback) skip the watchdog and go straight to the wrapped allocator.
 */

use std::cell::Cell;

thread_local! {
    // Const-initialized and drop-free: touching it never allocates
    static IN_HOOK: Cell<bool> = const { Cell::new(false) };
}

/// Held while the current thread is inside the watchdog
pub(crate) struct HookGuard {
    _private: (),
}

impl HookGuard {
    /// Enter the watchdog; `None` when this thread is already inside it
    /// or its thread-local storage is gone
    #[inline]
    pub(crate) fn enter() -> Option<Self> {
        IN_HOOK
            .try_with(|flag| {
                if flag.replace(true) {
                    None
                } else {
                    Some(HookGuard { _private: () })
                }
            })
            .ok()
            .flatten()
    }
}

/// Run `f` with this thread's allocations bypassing the watchdog
///
/// Nests: an inner call inside an outer one keeps the outer mark.
#[inline]
pub(crate) fn bypass<R>(f: impl FnOnce() -> R) -> R {
    let _hook = HookGuard::enter();
    f()
}

impl Drop for HookGuard {
    #[inline]
    fn drop(&mut self) {
        let _ = IN_HOOK.try_with(|flag| flag.set(false));
    }
}
