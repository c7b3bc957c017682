//! Device probes
//!
//! Measured device attributes come from external utilities and sysfs. The
//! [`DeviceProbe`] trait keeps the planner independent of the host so it can be
//! driven by fixed values in tests.

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use storstack_common::config::ProbeConfig;
use storstack_common::{Error, Result, ToolConfig};
use storstack_config::schema::DiskDevice;
use tracing::debug;

/// Source of measured per-device values
pub trait DeviceProbe {
    /// NCQ queue depth, `None` when the device does not report one
    fn queue_depth(&self, device: &DiskDevice) -> Result<Option<u32>>;

    /// Block size in bytes
    fn block_size(&self, device: &DiskDevice) -> Result<u32>;

    /// Device size in 512-byte sectors
    fn size_sectors(&self, device: &DiskDevice) -> Result<u64>;

    /// Whether the device has spinning media
    fn rotational(&self, device: &DiskDevice) -> Result<bool>;

    /// Raw scheduler listing, e.g. `mq-deadline kyber [bfq] none`
    fn available_schedulers(&self, device: &DiskDevice) -> Result<String>;
}

/// Probe backed by hdparm, blockdev and sysfs
#[derive(Clone, Debug)]
pub struct SystemProbe {
    hdparm: String,
    blockdev: String,
    sys_block: PathBuf,
}

impl SystemProbe {
    #[must_use]
    pub fn new(probe: &ProbeConfig, sys_block: impl Into<PathBuf>) -> Self {
        Self {
            hdparm: probe.hdparm.clone(),
            blockdev: probe.blockdev.clone(),
            sys_block: sys_block.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &ToolConfig) -> Self {
        Self::new(&config.probe, config.paths.sys_block.clone())
    }

    fn output(&self, program: &str, args: &[&str], device: &DiskDevice) -> Result<String> {
        debug!("Probing {} with {program} {}", device.path, args.join(" "));
        let output = Command::new(program)
            .args(args)
            .arg(&device.path)
            .output()
            .map_err(|e| Error::probe(&device.path, format!("failed to run {program}: {e}")))?;

        if !output.status.success() {
            return Err(Error::probe(
                &device.path,
                format!(
                    "{program} exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn read_sysfs(&self, device: &DiskDevice, path: &PathBuf) -> Result<String> {
        fs::read_to_string(path)
            .map_err(|e| Error::probe(&device.path, format!("{}: {e}", path.display())))
    }
}

impl DeviceProbe for SystemProbe {
    fn queue_depth(&self, device: &DiskDevice) -> Result<Option<u32>> {
        let stdout = self.output(&self.hdparm, &["-Q"], device)?;
        Ok(parse_hdparm_queue_depth(&stdout))
    }

    fn block_size(&self, device: &DiskDevice) -> Result<u32> {
        let stdout = self.output(&self.blockdev, &["--getbsz"], device)?;
        parse_block_size(&stdout).ok_or_else(|| {
            Error::probe(&device.path, format!("unexpected blockdev output: {}", stdout.trim()))
        })
    }

    fn size_sectors(&self, device: &DiskDevice) -> Result<u64> {
        let stdout = self.output(&self.blockdev, &["--getsz"], device)?;
        parse_size_sectors(&stdout).ok_or_else(|| {
            Error::probe(&device.path, format!("unexpected blockdev output: {}", stdout.trim()))
        })
    }

    fn rotational(&self, device: &DiskDevice) -> Result<bool> {
        let raw = self.read_sysfs(device, &device.rotational_file(&self.sys_block))?;
        Ok(raw.trim() == "1")
    }

    fn available_schedulers(&self, device: &DiskDevice) -> Result<String> {
        let raw = self.read_sysfs(device, &device.scheduler_file(&self.sys_block))?;
        Ok(raw.trim().to_string())
    }
}

/// Queue depth from `hdparm -Q` output: the last token of the `queue_depth` line
#[must_use]
pub fn parse_hdparm_queue_depth(output: &str) -> Option<u32> {
    output
        .lines()
        .find(|line| line.contains("queue_depth"))
        .and_then(|line| line.split_whitespace().last())
        .and_then(|token| token.parse().ok())
}

/// Block size from `blockdev --getbsz` output
#[must_use]
pub fn parse_block_size(output: &str) -> Option<u32> {
    output.trim().parse().ok().filter(|&size| size > 0)
}

/// Sector count from `blockdev --getsz` output
#[must_use]
pub fn parse_size_sectors(output: &str) -> Option<u64> {
    output.trim().parse().ok().filter(|&sectors| sectors > 0)
}
