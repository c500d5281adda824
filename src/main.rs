/*!
 * lowmem - Memory Report
 *
 * Prints the calibrated limits and the current usage of the system as
 * JSON. `--now` bypasses the usage cache.
 */

use lowmem::{init_tracing, MemoryMonitor, MemoryUsageSnapshot, SystemLimits};
use miette::IntoDiagnostic;
use serde::Serialize;
use tracing::info;

#[derive(Serialize)]
struct Report {
    limits: SystemLimits,
    usage: MemoryUsageSnapshot,
    free: usize,
    lowmem_state: bool,
}

fn main() -> miette::Result<()> {
    init_tracing();

    let force = std::env::args().skip(1).any(|arg| arg == "--now");
    let monitor = MemoryMonitor::global();

    info!(paths = ?monitor.paths(), force, "Collecting memory report");

    let usage = if force {
        monitor.get_usage_now()?
    } else {
        monitor.get_usage()?
    };

    let report = Report {
        limits: monitor.limits(),
        usage,
        free: monitor.free(),
        lowmem_state: monitor.in_lowmem_state(),
    };

    println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
    Ok(())
}
