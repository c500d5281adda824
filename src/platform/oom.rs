/*!
 * OOM Score Adjustment
 * Marks the current process as the kernel's preferred OOM victim
 */

use crate::core::errors::{LowmemError, LowmemResult};
use crate::core::limits::OOM_ADJ_FRIENDLY;
use crate::saw::bypass;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// Write the most system-friendly OOM adjustment to `path`
///
/// The file is never created.
pub fn score_adjust(path: &Path) -> LowmemResult<()> {
    bypass(|| write_adjustment(path))
}

fn write_adjustment(path: &Path) -> LowmemResult<()> {
    let result = OpenOptions::new()
        .write(true)
        .open(path)
        .and_then(|mut file| file.write_all(OOM_ADJ_FRIENDLY.as_bytes()));

    match result {
        Ok(()) => {
            info!(target: "lowmem", path = %path.display(), value = OOM_ADJ_FRIENDLY, "OOM score adjusted");
            Ok(())
        }
        Err(e) => {
            warn!(target: "lowmem", path = %path.display(), error = %e, "Failed to adjust OOM score");
            Err(LowmemError::WriteFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        }
    }
}
