//! Typed topology entities
//!
//! A merged [`ConfigNode`] is decoded here into explicit records. Group
//! `defaults` are merged into each item before it is decoded, unknown keys are
//! rejected, and every cross reference is resolved up front so later lookups
//! only fail for names that were never part of the document.

use crate::node::{merge, ConfigNode, Mapping, Scalar};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use storstack_common::{Error, FsType, RaidLevel, RandomSource, Result};

/// Top-level sections of a topology document
pub const SECTIONS: [&str; 6] = ["disk", "raid", "crypt", "fs", "bind", "export"];

/// The fully decoded storage topology
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Configuration {
    pub disk: Disk,
    pub raid: Raid,
    pub crypt: Crypt,
    pub fs: Fs,
    pub bind: Bind,
    pub export: Export,
}

impl Configuration {
    /// Decode and validate a merged topology document
    pub fn from_node(node: &ConfigNode) -> Result<Self> {
        let root = node
            .as_mapping()
            .ok_or_else(|| Error::configuration("topology document must be a mapping"))?;
        if let Some(key) = root.keys().find(|k| !SECTIONS.contains(&k.as_str())) {
            return Err(Error::invalid_field(key.as_str(), "unknown section"));
        }

        let config = Self {
            disk: match present(root, "disk") {
                Some(node) => Disk::from_node(node)?,
                None => Disk::default(),
            },
            raid: match present(root, "raid") {
                Some(node) => Raid::from_node(node)?,
                None => Raid::default(),
            },
            crypt: match present(root, "crypt") {
                Some(node) => Crypt::from_node(node)?,
                None => Crypt::default(),
            },
            fs: section(root, "fs")?,
            bind: section(root, "bind")?,
            export: section(root, "export")?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.raid.validate()?;
        self.crypt.validate()?;

        unique(self.fs.volumes.iter().map(|v| v.name.as_str()), "fs.volumes")?;

        let mut paths = HashSet::new();
        for group in &self.disk.device_groups {
            if let Some(name) = &group.raid_volume {
                self.find_raid_volume(name)?;
            }
            if let Some(name) = &group.fs_volume {
                self.find_fs_volume(name)?;
            }
            for device in &group.devices {
                if !paths.insert(device.path.as_str()) {
                    return Err(Error::invalid_field(
                        "disk.device_groups",
                        format!("device {} is listed more than once", device.path),
                    ));
                }
            }
        }

        for volume in &self.export.volumes {
            for pairing in &volume.host_group_options {
                self.find_host_group(&pairing.host_group)?;
                self.find_export_options(&pairing.option)?;
            }
        }
        Ok(())
    }

    pub fn find_raid_volume(&self, name: &str) -> Result<&RaidVolume> {
        self.raid
            .volumes
            .iter()
            .find(|v| v.name == name)
            .ok_or_else(|| Error::UnknownRaidVolume(name.to_string()))
    }

    /// Find a crypt volume by its decrypted name
    pub fn find_crypt_volume(&self, decrypted_name: &str) -> Result<&CryptVolume> {
        self.crypt
            .volumes
            .iter()
            .find(|v| v.decrypted_name == decrypted_name)
            .ok_or_else(|| Error::UnknownCryptVolume(decrypted_name.to_string()))
    }

    pub fn find_fs_volume(&self, name: &str) -> Result<&FsVolume> {
        self.fs
            .volumes
            .iter()
            .find(|v| v.name == name)
            .ok_or_else(|| Error::UnknownFsVolume(name.to_string()))
    }

    /// First device group backing a RAID volume
    pub fn find_device_group_with_raid_volume(&self, name: &str) -> Result<&DeviceGroup> {
        self.disk
            .device_groups
            .iter()
            .find(|g| g.raid_volume.as_deref() == Some(name))
            .ok_or_else(|| Error::UnknownRaidVolume(name.to_string()))
    }

    /// First device group backing a filesystem volume
    pub fn find_device_group_with_fs_volume(&self, name: &str) -> Result<&DeviceGroup> {
        self.disk
            .device_groups
            .iter()
            .find(|g| g.fs_volume.as_deref() == Some(name))
            .ok_or_else(|| Error::UnknownFsVolume(name.to_string()))
    }

    /// All disk devices of every group backing a RAID volume, in document order
    #[must_use]
    pub fn find_disk_devices_with_raid_volume(&self, name: &str) -> Vec<&DiskDevice> {
        self.disk
            .device_groups
            .iter()
            .filter(|g| g.raid_volume.as_deref() == Some(name))
            .flat_map(|g| g.devices.iter())
            .collect()
    }

    /// All disk devices of every group backing a filesystem volume, in document order
    #[must_use]
    pub fn find_disk_devices_with_fs_volume(&self, name: &str) -> Vec<&DiskDevice> {
        self.disk
            .device_groups
            .iter()
            .filter(|g| g.fs_volume.as_deref() == Some(name))
            .flat_map(|g| g.devices.iter())
            .collect()
    }

    pub fn find_host_group(&self, name: &str) -> Result<&HostGroup> {
        self.export
            .host_groups
            .iter()
            .find(|h| h.name == name)
            .ok_or_else(|| Error::UnknownHostGroup(name.to_string()))
    }

    pub fn find_export_options(&self, name: &str) -> Result<&ExportOptions> {
        self.export
            .options
            .iter()
            .find(|o| o.name == name)
            .ok_or_else(|| Error::UnknownExportOptions(name.to_string()))
    }
}

/// A section value, treating an explicit null as absent
fn present<'a>(root: &'a Mapping, key: &str) -> Option<&'a ConfigNode> {
    match root.get(key) {
        None | Some(ConfigNode::Scalar(Scalar::Null)) => None,
        Some(node) => Some(node),
    }
}

fn section<T: DeserializeOwned + Default>(root: &Mapping, key: &str) -> Result<T> {
    present(root, key).map_or_else(|| Ok(T::default()), |node| node.decode(key))
}

fn unique<'a>(names: impl IntoIterator<Item = &'a str>, path: &str) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(Error::invalid_field(path, format!("duplicate name '{name}'")));
        }
    }
    Ok(())
}

/// Group defaults with null-valued keys removed, so a null leaves the field unset
fn defaults_without_nulls(defaults: &ConfigNode) -> ConfigNode {
    match defaults {
        ConfigNode::Mapping(m) => ConfigNode::Mapping(
            m.iter()
                .filter(|(_, v)| !matches!(v, ConfigNode::Scalar(Scalar::Null)))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Merge a group's defaults into each raw item of the group
fn merge_defaults(
    defaults: Option<&ConfigNode>,
    items: &[ConfigNode],
) -> Result<Vec<ConfigNode>> {
    match defaults {
        Some(defaults) => items.iter().map(|item| merge(defaults, item)).collect(),
        None => Ok(items.to_vec()),
    }
}

// ---------------------------------------------------------------------------
// disk
// ---------------------------------------------------------------------------

/// Readahead in 512-byte sectors when neither defaults nor device set one
pub const DEFAULT_READAHEAD_SECTORS: u32 = 256;

/// Request queue size when neither defaults nor device set one
pub const DEFAULT_NR_REQUESTS: u32 = 128;

/// All disk device groups managed on the host
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Disk {
    pub device_groups: Vec<DeviceGroup>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDisk {
    device_groups: Vec<RawDeviceGroup>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDeviceGroup {
    #[serde(default)]
    defaults: Option<ConfigNode>,
    #[serde(default)]
    raid_volume: Option<String>,
    #[serde(default)]
    fs_volume: Option<String>,
    devices: Vec<ConfigNode>,
}

/// Device settings allowed in a group's `defaults`
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
#[allow(dead_code)]
struct DeviceDefaults {
    randomize_source: Option<RandomSource>,
    readahead_sectors: Option<u32>,
    nr_requests: Option<u32>,
    scheduler: Option<SchedulerSetting>,
}

impl Disk {
    fn from_node(node: &ConfigNode) -> Result<Self> {
        let raw: RawDisk = node.decode("disk")?;
        let device_groups = raw
            .device_groups
            .iter()
            .enumerate()
            .map(|(i, group)| DeviceGroup::from_raw(group, &format!("disk.device_groups[{i}]")))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { device_groups })
    }
}

/// A set of disks sharing defaults and an optional RAID/filesystem association
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceGroup {
    pub raid_volume: Option<String>,
    pub fs_volume: Option<String>,
    pub devices: Vec<DiskDevice>,
}

impl DeviceGroup {
    fn from_raw(raw: &RawDeviceGroup, path: &str) -> Result<Self> {
        let defaults = raw.defaults.as_ref().map(defaults_without_nulls);
        if let Some(defaults) = &defaults {
            defaults.decode::<DeviceDefaults>(&format!("{path}.defaults"))?;
        }
        if raw.devices.is_empty() {
            return Err(Error::invalid_field(
                format!("{path}.devices"),
                "a device group needs at least one device",
            ));
        }

        let devices = merge_defaults(defaults.as_ref(), &raw.devices)?
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let item_path = format!("{path}.devices[{i}]");
                let device: DiskDevice = node.decode(&item_path)?;
                device.validate(&item_path)?;
                Ok(device)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            raid_volume: raw.raid_volume.clone(),
            fs_volume: raw.fs_volume.clone(),
            devices,
        })
    }
}

/// How a device's I/O scheduler is chosen
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SchedulerSetting {
    /// Pick the best scheduler the kernel offers for the device
    Auto,
    /// Use this scheduler verbatim
    Named(String),
}

impl From<String> for SchedulerSetting {
    fn from(s: String) -> Self {
        if s == "auto" { Self::Auto } else { Self::Named(s) }
    }
}

impl From<SchedulerSetting> for String {
    fn from(s: SchedulerSetting) -> Self {
        match s {
            SchedulerSetting::Auto => "auto".to_string(),
            SchedulerSetting::Named(name) => name,
        }
    }
}

/// A physical disk after defaults were merged in
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiskDevice {
    /// Path to the block device, usually /dev/sdX
    pub path: String,
    /// Source used to initialize the disk with random data
    #[serde(default)]
    pub randomize_source: Option<RandomSource>,
    /// Readahead in 512-byte sectors
    #[serde(default = "default_readahead_sectors")]
    pub readahead_sectors: u32,
    /// Active I/O requests passed to the device before buffering
    #[serde(default = "default_nr_requests")]
    pub nr_requests: u32,
    #[serde(default)]
    pub scheduler: Option<SchedulerSetting>,
}

const fn default_readahead_sectors() -> u32 {
    DEFAULT_READAHEAD_SECTORS
}

const fn default_nr_requests() -> u32 {
    DEFAULT_NR_REQUESTS
}

impl DiskDevice {
    fn validate(&self, path: &str) -> Result<()> {
        if self.path.is_empty() {
            return Err(Error::invalid_field(format!("{path}.path"), "must not be empty"));
        }
        if self.nr_requests == 0 {
            return Err(Error::invalid_field(
                format!("{path}.nr_requests"),
                "must be a positive integer",
            ));
        }
        Ok(())
    }

    /// Kernel name of the device, e.g. `sdb` for `/dev/sdb`
    #[must_use]
    pub fn basename(&self) -> &str {
        Path::new(&self.path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.path)
    }

    /// Path of the single data partition created on the disk
    #[must_use]
    pub fn partition_path(&self) -> String {
        if self.path.ends_with(|c: char| c.is_ascii_digit()) {
            format!("{}p1", self.path)
        } else {
            format!("{}1", self.path)
        }
    }

    #[must_use]
    pub fn max_sectors_kb_file(&self, sys_block: &Path) -> PathBuf {
        sys_block.join(self.basename()).join("queue/max_sectors_kb")
    }

    #[must_use]
    pub fn nr_requests_file(&self, sys_block: &Path) -> PathBuf {
        sys_block.join(self.basename()).join("queue/nr_requests")
    }

    #[must_use]
    pub fn scheduler_file(&self, sys_block: &Path) -> PathBuf {
        sys_block.join(self.basename()).join("queue/scheduler")
    }

    #[must_use]
    pub fn rotational_file(&self, sys_block: &Path) -> PathBuf {
        sys_block.join(self.basename()).join("queue/rotational")
    }

    #[must_use]
    pub fn queue_depth_file(&self, sys_block: &Path) -> PathBuf {
        sys_block.join(self.basename()).join("device/queue_depth")
    }
}

// ---------------------------------------------------------------------------
// raid
// ---------------------------------------------------------------------------

/// RAID layer settings and volumes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raid {
    pub mdadm_config: MdadmConfig,
    /// Minimum resync speed in KB/s
    pub speed_limit_min: u32,
    /// Maximum resync speed in KB/s
    pub speed_limit_max: u32,
    pub volumes: Vec<RaidVolume>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRaid {
    #[serde(default)]
    mdadm_config: MdadmConfig,
    #[serde(default = "default_speed_limit_min")]
    speed_limit_min: u32,
    #[serde(default = "default_speed_limit_max")]
    speed_limit_max: u32,
    #[serde(default)]
    volumes: Vec<ConfigNode>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRaidVolume {
    name: String,
    label: String,
    raid_level: i64,
    devices: Vec<RaidMember>,
    #[serde(default)]
    chunk_size_kb: Option<u32>,
}

impl Default for Raid {
    fn default() -> Self {
        Self {
            mdadm_config: MdadmConfig::default(),
            speed_limit_min: default_speed_limit_min(),
            speed_limit_max: default_speed_limit_max(),
            volumes: Vec::new(),
        }
    }
}

const fn default_speed_limit_min() -> u32 {
    1000
}

const fn default_speed_limit_max() -> u32 {
    200_000
}

impl Raid {
    fn from_node(node: &ConfigNode) -> Result<Self> {
        let raw: RawRaid = node.decode("raid")?;
        let volumes = raw
            .volumes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let volume: RawRaidVolume = node.decode(&format!("raid.volumes[{i}]"))?;
                Ok(RaidVolume {
                    name: volume.name,
                    label: volume.label,
                    raid_level: RaidLevel::from_level(volume.raid_level)?,
                    devices: volume.devices,
                    chunk_size_kb: volume.chunk_size_kb,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            mdadm_config: raw.mdadm_config,
            speed_limit_min: raw.speed_limit_min,
            speed_limit_max: raw.speed_limit_max,
            volumes,
        })
    }

    fn validate(&self) -> Result<()> {
        if self.speed_limit_min > self.speed_limit_max {
            return Err(Error::invalid_field(
                "raid.speed_limit_min",
                format!(
                    "{} exceeds speed_limit_max {}",
                    self.speed_limit_min, self.speed_limit_max
                ),
            ));
        }
        unique(self.volumes.iter().map(|v| v.name.as_str()), "raid.volumes")?;
        unique(self.volumes.iter().map(|v| v.label.as_str()), "raid.volumes")?;

        for volume in &self.volumes {
            let required = volume.raid_level.min_disks();
            if volume.devices.len() < required {
                return Err(Error::InsufficientDisks {
                    level: volume.raid_level.level(),
                    required,
                    available: volume.devices.len(),
                });
            }
            if volume.chunk_size_kb == Some(0) {
                return Err(Error::invalid_field(
                    format!("raid.volumes.{}.chunk_size_kb", volume.name),
                    "must be a positive integer",
                ));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn speed_limit_min_file(proc_raid: &Path) -> PathBuf {
        proc_raid.join("speed_limit_min")
    }

    #[must_use]
    pub fn speed_limit_max_file(proc_raid: &Path) -> PathBuf {
        proc_raid.join("speed_limit_max")
    }
}

/// Lines written to mdadm.conf ahead of the scanned array definitions
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MdadmConfig {
    #[serde(default = "default_mdadm_device")]
    pub device: String,
    #[serde(default = "default_mdadm_create")]
    pub create: String,
    #[serde(default = "default_mdadm_homehost")]
    pub homehost: String,
    #[serde(default = "default_mdadm_mailaddr")]
    pub mailaddr: String,
}

impl Default for MdadmConfig {
    fn default() -> Self {
        Self {
            device: default_mdadm_device(),
            create: default_mdadm_create(),
            homehost: default_mdadm_homehost(),
            mailaddr: default_mdadm_mailaddr(),
        }
    }
}

fn default_mdadm_device() -> String {
    "partitions".to_string()
}

fn default_mdadm_create() -> String {
    "owner=root group=disk mode=0660 auto=yes".to_string()
}

fn default_mdadm_homehost() -> String {
    "<system>".to_string()
}

fn default_mdadm_mailaddr() -> String {
    "root".to_string()
}

impl MdadmConfig {
    /// Render mdadm.conf given the output of `mdadm --detail --scan`
    #[must_use]
    pub fn render(&self, scan: &str) -> String {
        let mut lines = vec![
            format!("DEVICE {}", self.device),
            format!("CREATE {}", self.create),
            format!("HOMEHOST {}", self.homehost),
            format!("MAILADDR {}", self.mailaddr),
        ];
        lines.extend(scan.lines().filter(|l| !l.trim().is_empty()).map(str::to_string));
        lines.join("\n")
    }
}

/// A RAID volume assembled from disk partitions
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RaidVolume {
    /// Appears as a symlink at /dev/md/<name>
    pub name: String,
    /// Appears as a block device at /dev/<label>, usually mdN
    pub label: String,
    pub raid_level: RaidLevel,
    pub devices: Vec<RaidMember>,
    /// Overrides the chunk size derived from the RAID level
    pub chunk_size_kb: Option<u32>,
}

impl RaidVolume {
    #[must_use]
    pub fn name_path(&self) -> PathBuf {
        Path::new("/dev/md").join(&self.name)
    }

    #[must_use]
    pub fn label_path(&self) -> PathBuf {
        Path::new("/dev").join(&self.label)
    }

    #[must_use]
    pub fn stripe_cache_size_file(&self, sys_block: &Path) -> PathBuf {
        sys_block.join(&self.label).join("md/stripe_cache_size")
    }

    #[must_use]
    pub fn sync_action_file(&self, sys_block: &Path) -> PathBuf {
        sys_block.join(&self.label).join("md/sync_action")
    }

    #[must_use]
    pub fn sync_completed_file(&self, sys_block: &Path) -> PathBuf {
        sys_block.join(&self.label).join("md/sync_completed")
    }
}

/// A member partition of a RAID volume, usually /dev/sdX1
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RaidMember {
    pub path: String,
}

// ---------------------------------------------------------------------------
// crypt
// ---------------------------------------------------------------------------

/// Encryption layer volumes
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Crypt {
    pub volumes: Vec<CryptVolume>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCrypt {
    #[serde(default)]
    defaults: Option<ConfigNode>,
    #[serde(default)]
    volumes: Vec<ConfigNode>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
#[allow(dead_code)]
struct CryptDefaults {
    cipher: Option<String>,
    key_size: Option<u32>,
    hash_algorithm: Option<String>,
    iter_time: Option<u32>,
}

impl Crypt {
    fn from_node(node: &ConfigNode) -> Result<Self> {
        let raw: RawCrypt = node.decode("crypt")?;
        let defaults = raw.defaults.as_ref().map(defaults_without_nulls);
        if let Some(defaults) = &defaults {
            defaults.decode::<CryptDefaults>("crypt.defaults")?;
        }
        let volumes = merge_defaults(defaults.as_ref(), &raw.volumes)?
            .iter()
            .enumerate()
            .map(|(i, node)| node.decode(&format!("crypt.volumes[{i}]")))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { volumes })
    }

    fn validate(&self) -> Result<()> {
        unique(
            self.volumes.iter().map(|v| v.decrypted_name.as_str()),
            "crypt.volumes",
        )?;
        for volume in &self.volumes {
            if volume.key_size == 0 || volume.key_size % 8 != 0 {
                return Err(Error::invalid_field(
                    format!("crypt.volumes.{}.key_size", volume.decrypted_name),
                    format!("{} is not a positive multiple of 8", volume.key_size),
                ));
            }
        }
        Ok(())
    }
}

/// A LUKS volume layered over a block device
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CryptVolume {
    /// Path to the encrypted block device
    pub encrypted_path: String,
    /// Appears as a symlink at /dev/mapper/<decrypted_name>
    pub decrypted_name: String,
    #[serde(default = "default_cipher")]
    pub cipher: String,
    /// Key size in bits
    #[serde(default = "default_key_size")]
    pub key_size: u32,
    #[serde(default = "default_hash_algorithm")]
    pub hash_algorithm: String,
    /// Milliseconds spent on passphrase processing, 0 selects the cryptsetup default
    #[serde(default = "default_iter_time")]
    pub iter_time: u32,
}

fn default_cipher() -> String {
    "aes-xts-plain64".to_string()
}

const fn default_key_size() -> u32 {
    512
}

fn default_hash_algorithm() -> String {
    "sha512".to_string()
}

const fn default_iter_time() -> u32 {
    5000
}

impl CryptVolume {
    #[must_use]
    pub fn decrypted_path(&self) -> PathBuf {
        Path::new("/dev/mapper").join(&self.decrypted_name)
    }
}

// ---------------------------------------------------------------------------
// fs, bind, export
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fs {
    #[serde(default)]
    pub volumes: Vec<FsVolume>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FsVolume {
    /// Referenced by disk device groups
    pub name: String,
    pub fs_type: FsType,
    pub device_path: String,
    pub mount_location: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Bind {
    #[serde(default)]
    pub read_only: Vec<BindVolume>,
    #[serde(default)]
    pub read_write: Vec<BindVolume>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindVolume {
    pub source: String,
    pub target: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Export {
    #[serde(default)]
    pub host_groups: Vec<HostGroup>,
    #[serde(default)]
    pub options: Vec<ExportOptions>,
    #[serde(default)]
    pub volumes: Vec<ExportVolume>,
}

/// Named list of host addresses (IPs, CIDRs, domains, wildcards)
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostGroup {
    pub name: String,
    pub hosts: Vec<String>,
}

/// Named, comma-delimited set of export options
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportOptions {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportVolume {
    pub path: String,
    #[serde(default)]
    pub host_group_options: Vec<HostGroupOptions>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostGroupOptions {
    pub host_group: String,
    pub option: String,
}
