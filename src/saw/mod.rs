/*!
 * SAW Module
 * Simple Allocation Watchdog: predictive allocation denial
 */

mod allocator;
mod reentry;
mod state;
mod watchdog;

pub(crate) use reentry::bypass;
pub use allocator::WatchdogAllocator;
pub use state::{OomCallback, OomContext, WatchdogConfig};
pub use watchdog::{global, Admission, Watchdog};
