/*!
 * System Source
 * Injectable access to kernel files, the wall clock and the page size
 */

use super::meminfo::parse_value;
use crate::core::limits::DEFAULT_PAGE_SIZE;
use crate::core::types::{Seconds, Size};
use ahash::RandomState;
use dashmap::DashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Everything the monitor needs from the platform
#[cfg_attr(test, mockall::automock)]
pub trait SystemSource: Send + Sync {
    /// Read a whole (small) text file
    fn read(&self, path: &Path) -> io::Result<String>;

    /// Page size in bytes
    fn page_size(&self) -> Size;

    /// Current wall-clock second
    fn now_secs(&self) -> Seconds;
}

/// Read a single-value kernel file
///
/// Returns `None` when the file is missing, unreadable, empty or holds a
/// non-positive value. Zero is never returned. Does not log: this runs on
/// the allocation path.
pub fn read_value(source: &dyn SystemSource, path: &Path) -> Option<usize> {
    source.read(path).ok().and_then(|raw| parse_value(&raw))
}

/// The real procfs/sysfs backed source
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcFs;

impl SystemSource for ProcFs {
    fn read(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn page_size(&self) -> Size {
        use nix::unistd::{sysconf, SysconfVar};

        match sysconf(SysconfVar::PAGE_SIZE) {
            Ok(Some(size)) if size > 0 => size as Size,
            _ => DEFAULT_PAGE_SIZE,
        }
    }

    fn now_secs(&self) -> Seconds {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// In-memory source with a manual clock
///
/// Used for simulation and deterministic tests. Paths that were never set
/// read as `NotFound`.
#[derive(Debug)]
pub struct StaticSource {
    files: DashMap<PathBuf, String, RandomState>,
    page_size: AtomicUsize,
    now: AtomicU64,
}

impl StaticSource {
    pub fn new() -> Self {
        Self {
            files: DashMap::with_hasher(RandomState::new()),
            page_size: AtomicUsize::new(DEFAULT_PAGE_SIZE),
            now: AtomicU64::new(1),
        }
    }

    pub fn with_page_size(self, page_size: Size) -> Self {
        self.page_size.store(page_size, Ordering::Relaxed);
        self
    }

    /// Create or replace a file
    pub fn set(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files.insert(path.into(), contents.into());
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        self.files.remove(path.as_ref());
    }

    pub fn set_time(&self, secs: Seconds) {
        self.now.store(secs, Ordering::Relaxed);
    }

    /// Move the clock forward
    pub fn advance(&self, secs: Seconds) {
        self.now.fetch_add(secs, Ordering::Relaxed);
    }
}

impl Default for StaticSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemSource for StaticSource {
    fn read(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(path)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn page_size(&self) -> Size {
        self.page_size.load(Ordering::Relaxed)
    }

    fn now_secs(&self) -> Seconds {
        self.now.load(Ordering::Relaxed)
    }
}
