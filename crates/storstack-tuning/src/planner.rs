//! Tuning plan computation
//!
//! The planner probes every device it needs and derives every value before
//! anything is written, so a failure anywhere leaves the host untouched.

use crate::params;
use crate::probe::DeviceProbe;
use crate::scheduler::{self, DeviceClass};
use serde::Serialize;
use std::path::PathBuf;
use storstack_common::{Error, PageGeometry, RaidLevel, Result, ToolConfig};
use storstack_config::schema::{
    DeviceGroup, DiskDevice, FsVolume, Raid, RaidVolume, SchedulerSetting,
};
use storstack_config::Configuration;
use tracing::{debug, warn};

/// Every value `tune` applies, in application order
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TuningPlan {
    pub disks: Vec<DiskTuning>,
    pub raid: RaidTuning,
    pub filesystems: Vec<FsTuning>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiskTuning {
    pub path: String,
    pub readahead_sectors: u32,
    /// Largest request size, matched to the RAID chunk; absent without striping
    pub max_sectors_kb: Option<u32>,
    pub max_sectors_kb_file: PathBuf,
    pub nr_requests: u32,
    pub nr_requests_file: PathBuf,
    pub ncq_depth: u32,
    pub queue_depth_file: PathBuf,
    pub scheduler: Option<String>,
    pub scheduler_file: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RaidTuning {
    pub speed_limit_min: u32,
    pub speed_limit_min_file: PathBuf,
    pub speed_limit_max: u32,
    pub speed_limit_max_file: PathBuf,
    pub volumes: Vec<RaidVolumeTuning>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RaidVolumeTuning {
    pub name: String,
    pub raid_level: RaidLevel,
    pub label_path: PathBuf,
    pub readahead_sectors: u64,
    /// Only parity levels keep a stripe cache
    pub stripe_cache_pages: Option<u64>,
    pub stripe_cache_size_file: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FsTuning {
    pub name: String,
    pub device_path: String,
    /// Absent when the filesystem does not sit on a striped RAID volume
    pub stride: Option<u32>,
    pub stripe_width: Option<u32>,
}

impl FsTuning {
    /// Extended options for `tune2fs -E` and `mke2fs -E`
    #[must_use]
    pub fn extended_options(&self) -> Option<String> {
        match (self.stride, self.stripe_width) {
            (Some(stride), Some(width)) => Some(format!("stride={stride},stripe-width={width}")),
            _ => None,
        }
    }
}

/// Derives a [`TuningPlan`] from a topology and a device probe
pub struct Planner<'a, P: DeviceProbe> {
    config: &'a Configuration,
    probe: &'a P,
    geometry: PageGeometry,
    sys_block: PathBuf,
    proc_raid: PathBuf,
}

impl<'a, P: DeviceProbe> Planner<'a, P> {
    pub fn new(config: &'a Configuration, probe: &'a P, tool: &ToolConfig) -> Self {
        Self {
            config,
            probe,
            geometry: tool.geometry,
            sys_block: tool.paths.sys_block.clone(),
            proc_raid: tool.paths.proc_raid.clone(),
        }
    }

    /// Compute the full plan
    pub fn plan(&self) -> Result<TuningPlan> {
        let mut disks = Vec::new();
        for group in &self.config.disk.device_groups {
            disks.extend(self.plan_group(group)?);
        }

        let raid = &self.config.raid;
        let volumes = raid
            .volumes
            .iter()
            .map(|volume| self.plan_raid_volume(volume))
            .collect::<Result<Vec<_>>>()?;

        let filesystems = self
            .config
            .fs
            .volumes
            .iter()
            .map(|volume| self.plan_fs_volume(volume))
            .collect::<Result<Vec<_>>>()?;

        Ok(TuningPlan {
            disks,
            raid: RaidTuning {
                speed_limit_min: raid.speed_limit_min,
                speed_limit_min_file: Raid::speed_limit_min_file(&self.proc_raid),
                speed_limit_max: raid.speed_limit_max,
                speed_limit_max_file: Raid::speed_limit_max_file(&self.proc_raid),
                volumes,
            },
            filesystems,
        })
    }

    fn plan_group(&self, group: &DeviceGroup) -> Result<Vec<DiskTuning>> {
        let (max_sectors_kb, peers) = match &group.raid_volume {
            Some(name) => {
                let volume = self.config.find_raid_volume(name)?;
                (
                    params::effective_chunk_size_kb(volume.raid_level, volume.chunk_size_kb),
                    self.config.find_disk_devices_with_raid_volume(name),
                )
            }
            None => (None, group.devices.iter().collect()),
        };
        let ncq_depth = self.ncq_depth(&peers)?;

        group
            .devices
            .iter()
            .map(|device| {
                Ok(DiskTuning {
                    path: device.path.clone(),
                    readahead_sectors: device.readahead_sectors,
                    max_sectors_kb,
                    max_sectors_kb_file: device.max_sectors_kb_file(&self.sys_block),
                    nr_requests: device.nr_requests,
                    nr_requests_file: device.nr_requests_file(&self.sys_block),
                    ncq_depth,
                    queue_depth_file: device.queue_depth_file(&self.sys_block),
                    scheduler: self.scheduler(device)?,
                    scheduler_file: device.scheduler_file(&self.sys_block),
                })
            })
            .collect()
    }

    /// Shallowest queue among devices that report one
    fn ncq_depth(&self, devices: &[&DiskDevice]) -> Result<u32> {
        let mut depths = Vec::with_capacity(devices.len());
        for device in devices {
            match self.probe.queue_depth(device)? {
                Some(depth) => depths.push(depth),
                None => debug!("{} reports no queue depth, skipping", device.path),
            }
        }
        params::disk_ncq_depth(&depths)
    }

    fn scheduler(&self, device: &DiskDevice) -> Result<Option<String>> {
        match &device.scheduler {
            None => Ok(None),
            Some(SchedulerSetting::Named(name)) => Ok(Some(name.clone())),
            Some(SchedulerSetting::Auto) => {
                let class = DeviceClass::detect(device.basename(), self.probe.rotational(device)?);
                let listing = self.probe.available_schedulers(device)?;
                let selected = scheduler::select_scheduler(&listing, class);
                let current = scheduler::active(&listing);
                if selected.is_some() && selected != current {
                    debug!(
                        "{} switches scheduler from {} to {}",
                        device.path,
                        current.unwrap_or("none"),
                        selected.unwrap_or_default()
                    );
                }
                if selected.is_none() {
                    warn!(
                        "No preferred scheduler for {} ({class:?}) in '{listing}', leaving it unchanged",
                        device.path
                    );
                }
                Ok(selected.map(str::to_string))
            }
        }
    }

    fn plan_raid_volume(&self, volume: &RaidVolume) -> Result<RaidVolumeTuning> {
        let readaheads = self.member_readaheads(&volume.name)?;
        let stripe_cache_pages = match volume.raid_level {
            RaidLevel::Raid5 | RaidLevel::Raid6 => {
                Some(params::raid_stripe_cache_pages(&readaheads, &self.geometry)?)
            }
            RaidLevel::Raid0 | RaidLevel::Raid1 => None,
        };

        Ok(RaidVolumeTuning {
            name: volume.name.clone(),
            raid_level: volume.raid_level,
            label_path: volume.label_path(),
            readahead_sectors: params::raid_readahead_sectors(&readaheads)?,
            stripe_cache_pages,
            stripe_cache_size_file: volume.stripe_cache_size_file(&self.sys_block),
        })
    }

    fn member_readaheads(&self, raid_volume: &str) -> Result<Vec<u32>> {
        let devices = self.config.find_disk_devices_with_raid_volume(raid_volume);
        if devices.is_empty() {
            return Err(Error::empty_devices(format!(
                "no disk device group backs RAID volume '{raid_volume}'"
            )));
        }
        Ok(devices.iter().map(|d| d.readahead_sectors).collect())
    }

    /// Stride and stripe width for one filesystem volume
    pub fn plan_fs_volume(&self, volume: &FsVolume) -> Result<FsTuning> {
        let group = self.config.find_device_group_with_fs_volume(&volume.name)?;
        let (stride, stripe_width) = match &group.raid_volume {
            Some(name) => {
                let raid = self.config.find_raid_volume(name)?;
                let block_sizes =
                    self.block_sizes(&self.config.find_disk_devices_with_raid_volume(name))?;
                let chunk = params::effective_chunk_size_kb(raid.raid_level, raid.chunk_size_kb);
                (
                    params::fs_stride_with_chunk(&block_sizes, chunk)?,
                    params::fs_stripe_width_with_chunk(&block_sizes, raid.raid_level, chunk)?,
                )
            }
            None => (None, None),
        };

        Ok(FsTuning {
            name: volume.name.clone(),
            device_path: volume.device_path.clone(),
            stride,
            stripe_width,
        })
    }

    fn block_sizes(&self, devices: &[&DiskDevice]) -> Result<Vec<u32>> {
        devices.iter().map(|d| self.probe.block_size(d)).collect()
    }

    /// Filesystem block size in KB for the disks backing a filesystem volume
    pub fn fs_block_size_kb(&self, volume: &FsVolume) -> Result<u32> {
        let devices = self.config.find_disk_devices_with_fs_volume(&volume.name);
        params::fs_block_size_kb(&self.block_sizes(&devices)?)
    }
}
