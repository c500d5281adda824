/*!
 * Process-wide Watchdog Tests
 */

use lowmem::{saw, watchdog_disable, watchdog_enable, LowmemError};
use serial_test::serial;

#[test]
#[serial]
fn test_zero_threshold_never_arms() {
    let result = watchdog_enable(0, 0, None, None);
    assert!(matches!(
        result,
        Err(LowmemError::InsufficientHeadroom { threshold: 0, .. })
            | Err(LowmemError::SourceUnavailable { .. })
    ));
    assert!(!saw::global().is_armed());
}

#[test]
#[serial]
fn test_unreachable_threshold_never_arms() {
    assert!(watchdog_enable(usize::MAX, 0, None, None).is_err());
    assert!(!saw::global().is_armed());
}

#[test]
#[serial]
fn test_disable_without_enable_is_noop() {
    watchdog_disable();
    watchdog_disable();
    assert!(!saw::global().is_armed());
    assert_eq!(saw::global().max_heap_size(), None);
}
