/*!
 * Watchdog State
 * Arming parameters and the state guarded by the watchdog lock
 */

use crate::core::limits::SAW_CHECK_WINDOW;
use crate::core::types::Size;
use crate::memory::source::{read_value, SystemSource};
use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;

/// Opaque user data handed back to the OOM callback
pub type OomContext = Arc<dyn Any + Send + Sync>;

/// Called on every denied allocation with
/// `(projected_heap, max_heap_size, context)`
///
/// Runs on the allocating thread after the watchdog lock is released.
/// Allocations made from inside the callback are not guarded.
pub type OomCallback = Arc<dyn Fn(Size, Size, Option<&OomContext>) + Send + Sync>;

/// Parameters for [`Watchdog::enable`](super::Watchdog::enable)
#[derive(Clone)]
pub struct WatchdogConfig {
    /// Memory that must stay free in the system, in bytes
    pub threshold: Size,
    /// Requests at least this large are always checked; 0 means page size
    pub watchblock: Size,
    /// Small requests passed through between two full checks
    pub window: usize,
    pub callback: Option<OomCallback>,
    pub context: Option<OomContext>,
}

impl WatchdogConfig {
    pub fn new(threshold: Size) -> Self {
        Self {
            threshold,
            watchblock: 0,
            window: SAW_CHECK_WINDOW,
            callback: None,
            context: None,
        }
    }

    pub fn with_watchblock(mut self, watchblock: Size) -> Self {
        self.watchblock = watchblock;
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(Size, Size, Option<&OomContext>) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    pub fn with_context<T: Any + Send + Sync>(mut self, context: T) -> Self {
        self.context = Some(Arc::new(context));
        self
    }
}

impl std::fmt::Debug for WatchdogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchdogConfig")
            .field("threshold", &self.threshold)
            .field("watchblock", &self.watchblock)
            .field("window", &self.window)
            .field("callback", &self.callback.is_some())
            .field("context", &self.context.is_some())
            .finish()
    }
}

/// Reads the kernel low-memory flag
pub(crate) struct LowmemProbe {
    pub(crate) source: Arc<dyn SystemSource>,
    pub(crate) path: PathBuf,
}

impl LowmemProbe {
    pub(crate) fn in_lowmem_state(&self) -> bool {
        read_value(self.source.as_ref(), &self.path) == Some(1)
    }
}

/// Everything the admission check reads, behind one lock
pub(crate) struct WatchdogState {
    pub(crate) armed: bool,
    pub(crate) max_block_size: Size,
    pub(crate) max_heap_size: Size,
    pub(crate) window: usize,
    pub(crate) countdown: usize,
    pub(crate) callback: Option<OomCallback>,
    pub(crate) context: Option<OomContext>,
    pub(crate) lowmem: Option<Arc<LowmemProbe>>,
}

impl WatchdogState {
    pub(crate) const fn disarmed() -> Self {
        Self {
            armed: false,
            max_block_size: 0,
            max_heap_size: 0,
            window: 0,
            countdown: 0,
            callback: None,
            context: None,
            lowmem: None,
        }
    }
}
