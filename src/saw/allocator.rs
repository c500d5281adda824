/*!
 * Watchdog Allocator
 *
 * The interception point of the allocation watchdog. Rust has no malloc
 * hook, so the application opts in by wrapping the allocator it would
 * otherwise use:
 *
 * ```ignore
 * #[global_allocator]
 * static ALLOC: WatchdogAllocator<System> = WatchdogAllocator::new(System);
 *
 * lowmem::watchdog_enable(8 << 20, 0, None, None)?;
 * ```
 *
 * Every request is delegated to the wrapped allocator; while the watchdog
 * is disarmed the wrapper only keeps the heap extent up to date. A denied
 * request returns null, which the standard library reports through
 * `handle_alloc_error` unless the caller uses a fallible API such as
 * `Vec::try_reserve`.
 */

use super::watchdog::{global, Watchdog};
use std::alloc::{GlobalAlloc, Layout};
use std::ptr;

/// Allocator wrapper guarded by a [`Watchdog`]
pub struct WatchdogAllocator<A> {
    inner: A,
    // None: the process-wide watchdog
    watchdog: Option<&'static Watchdog>,
}

impl<A> WatchdogAllocator<A> {
    /// Wrap `inner`, guarded by the process-wide watchdog
    pub const fn new(inner: A) -> Self {
        Self {
            inner,
            watchdog: None,
        }
    }

    /// Wrap `inner`, guarded by a dedicated watchdog
    pub const fn with_watchdog(inner: A, watchdog: &'static Watchdog) -> Self {
        Self {
            inner,
            watchdog: Some(watchdog),
        }
    }

    #[inline]
    pub fn watchdog(&self) -> &'static Watchdog {
        self.watchdog.unwrap_or_else(global)
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }
}

unsafe impl<A: GlobalAlloc> GlobalAlloc for WatchdogAllocator<A> {
    #[inline]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if self.watchdog().admit(layout.size()).is_denied() {
            return ptr::null_mut();
        }
        let ptr = self.inner.alloc(layout);
        if !ptr.is_null() {
            self.watchdog().record_claim(layout.size());
        }
        ptr
    }

    #[inline]
    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        if self.watchdog().admit(layout.size()).is_denied() {
            return ptr::null_mut();
        }
        let ptr = self.inner.alloc_zeroed(layout);
        if !ptr.is_null() {
            self.watchdog().record_claim(layout.size());
        }
        ptr
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.inner.dealloc(ptr, layout);
        self.watchdog().record_release(layout.size());
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let old_size = layout.size();
        // Only growth is admitted; shrinking never raises the heap
        if new_size > old_size && self.watchdog().admit(new_size - old_size).is_denied() {
            return ptr::null_mut();
        }

        let new_ptr = self.inner.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            if new_size >= old_size {
                self.watchdog().record_claim(new_size - old_size);
            } else {
                self.watchdog().record_release(old_size - new_size);
            }
        }
        new_ptr
    }
}

impl<A: std::fmt::Debug> std::fmt::Debug for WatchdogAllocator<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchdogAllocator")
            .field("inner", &self.inner)
            .field("watchdog", self.watchdog())
            .finish()
    }
}
