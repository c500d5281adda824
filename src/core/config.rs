/*!
 * Configuration
 * Kernel file locations and monitor settings
 */

use super::errors::{LowmemError, LowmemResult};
use super::limits;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Locations of every kernel file the monitor reads or writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SysPaths {
    pub meminfo: PathBuf,
    pub allowed_pages: PathBuf,
    pub deny_watermark: PathBuf,
    pub notify_high: PathBuf,
    pub notify_high_pages: PathBuf,
    pub free_pages: PathBuf,
    pub high_watermark: PathBuf,
    pub oom_adj: PathBuf,
}

impl SysPaths {
    /// Default locations re-rooted under `root`
    ///
    /// `/proc/meminfo` with root `/tmp/fixture` becomes
    /// `/tmp/fixture/proc/meminfo`.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let join = |path: &str| root.join(path.trim_start_matches('/'));
        Self {
            meminfo: join(limits::MEMINFO_PATH),
            allowed_pages: join(limits::ALLOWED_PAGES_PATH),
            deny_watermark: join(limits::DENY_WATERMARK_PATH),
            notify_high: join(limits::NOTIFY_HIGH_PATH),
            notify_high_pages: join(limits::NOTIFY_HIGH_PAGES_PATH),
            free_pages: join(limits::FREE_PAGES_PATH),
            high_watermark: join(limits::HIGH_WATERMARK_PATH),
            oom_adj: join(limits::OOM_ADJ_PATH),
        }
    }
}

impl Default for SysPaths {
    fn default() -> Self {
        Self::with_root("/")
    }
}

/// Memory monitor configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub paths: SysPaths,
}

impl MonitorConfig {
    /// Configuration from the environment
    ///
    /// Environment variables:
    /// - LOWMEM_SYSFS_ROOT: prefix applied to every kernel file path
    pub fn from_env() -> LowmemResult<Self> {
        match std::env::var_os(limits::ENV_SYSFS_ROOT) {
            None => Ok(Self::default()),
            Some(root) if root.is_empty() => Err(LowmemError::InvalidArgument(format!(
                "{} is set but empty",
                limits::ENV_SYSFS_ROOT
            ))),
            Some(root) => Ok(Self {
                paths: SysPaths::with_root(PathBuf::from(root)),
            }),
        }
    }

    /// Parse a JSON document; missing fields keep their defaults
    pub fn from_json(raw: &str) -> LowmemResult<Self> {
        serde_json::from_str(raw).map_err(|e| LowmemError::InvalidArgument(e.to_string()))
    }
}
