//! Tool configuration for storstack
//!
//! Host-specific locations and timings live here rather than in the topology
//! document, so the same topology can be replayed on a test root.

use crate::error::{Error, Result};
use crate::types::PageGeometry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default location of the tool configuration file
pub const DEFAULT_TOOL_CONFIG: &str = "/etc/storstack/storstack.toml";

/// Root tool configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub geometry: PageGeometry,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ToolConfig {
    /// Load the tool configuration, falling back to defaults if the file is absent
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("Tool config {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
            .map_err(|e| Error::configuration(format!("{}: {e}", path.display())))
    }

    /// Parse the tool configuration from TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| Error::configuration(e.to_string()))?;
        config.geometry.sectors_per_page()?;
        Ok(config)
    }
}

/// Host paths written or read by the tool
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    /// Block device sysfs directory
    #[serde(default = "default_sys_block")]
    pub sys_block: PathBuf,
    /// Directory holding the md speed limit controls
    #[serde(default = "default_proc_raid")]
    pub proc_raid: PathBuf,
    /// Boot-time script that replays tuning commands
    #[serde(default = "default_rc_file")]
    pub rc_file: PathBuf,
    /// mdadm configuration file
    #[serde(default = "default_mdadm_conf")]
    pub mdadm_conf: PathBuf,
    /// NFS exports table
    #[serde(default = "default_exports_file")]
    pub exports_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            sys_block: default_sys_block(),
            proc_raid: default_proc_raid(),
            rc_file: default_rc_file(),
            mdadm_conf: default_mdadm_conf(),
            exports_file: default_exports_file(),
        }
    }
}

/// External disk-query utilities
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeConfig {
    #[serde(default = "default_hdparm")]
    pub hdparm: String,
    #[serde(default = "default_blockdev")]
    pub blockdev: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            hdparm: default_hdparm(),
            blockdev: default_blockdev(),
        }
    }
}

/// Polling intervals for long-running host operations
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimingConfig {
    /// Interval between checks of spawned processes and partition nodes
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Interval between RAID resync status checks
    #[serde(default = "default_resync_poll_secs")]
    pub resync_poll_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            resync_poll_secs: default_resync_poll_secs(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_sys_block() -> PathBuf {
    PathBuf::from("/sys/block")
}

fn default_proc_raid() -> PathBuf {
    PathBuf::from("/proc/sys/dev/raid")
}

fn default_rc_file() -> PathBuf {
    PathBuf::from("/etc/rc.local")
}

fn default_mdadm_conf() -> PathBuf {
    PathBuf::from("/etc/mdadm/mdadm.conf")
}

fn default_exports_file() -> PathBuf {
    PathBuf::from("/etc/exports")
}

fn default_hdparm() -> String {
    "hdparm".to_string()
}

fn default_blockdev() -> String {
    "blockdev".to_string()
}

const fn default_poll_interval_ms() -> u64 {
    100
}

const fn default_resync_poll_secs() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ToolConfig::default();
        assert_eq!(config.paths.rc_file, PathBuf::from("/etc/rc.local"));
        assert_eq!(config.geometry.sectors_per_page().unwrap(), 8);
        assert_eq!(config.timing.resync_poll_secs, 5);
        assert_eq!(config.probe.hdparm, "hdparm");
    }

    #[test]
    fn test_partial_toml() {
        let config = ToolConfig::from_toml(
            r#"
            [paths]
            sys_block = "/tmp/sys/block"

            [geometry]
            sector_size = 4096
            page_size = 4096
            "#,
        )
        .unwrap();
        assert_eq!(config.paths.sys_block, PathBuf::from("/tmp/sys/block"));
        assert_eq!(config.paths.rc_file, PathBuf::from("/etc/rc.local"));
        assert_eq!(config.geometry.sectors_per_page().unwrap(), 1);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(ToolConfig::from_toml("[paths]\nbogus = 1\n").is_err());
        assert!(ToolConfig::from_toml("[geometry]\nsector_size = 0\npage_size = 4096\n").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ToolConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storstack.toml");
        std::fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();
        let config = ToolConfig::load(&path).unwrap();
        assert_eq!(config.logging.level, "debug");
    }
}
