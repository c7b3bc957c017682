//! Core type definitions for storstack
//!
//! This module defines the storage-topology primitives shared by the
//! configuration loader, the parameter derivation and the CLI.

use crate::error::{Error, Result};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Bytes per disk sector
pub const BYTES_PER_SECTOR: u32 = 512;

/// Bytes per memory page
pub const BYTES_PER_PAGE: u32 = 4096;

/// Bytes per kibibyte
pub const BYTES_PER_KB: u32 = 1024;

/// Supported RAID levels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(try_from = "i64", into = "i64")]
pub enum RaidLevel {
    /// Block-level striping
    #[display("0")]
    Raid0,
    /// Full-disk mirroring
    #[display("1")]
    Raid1,
    /// Parity distribution with 1 parity stripe
    #[display("5")]
    Raid5,
    /// Parity distribution with 2 parity stripes
    #[display("6")]
    Raid6,
}

impl RaidLevel {
    /// All supported levels
    pub const ALL: [Self; 4] = [Self::Raid0, Self::Raid1, Self::Raid5, Self::Raid6];

    /// Resolve a numeric RAID level
    pub const fn from_level(level: i64) -> Result<Self> {
        match level {
            0 => Ok(Self::Raid0),
            1 => Ok(Self::Raid1),
            5 => Ok(Self::Raid5),
            6 => Ok(Self::Raid6),
            other => Err(Error::InvalidRaidLevel(other)),
        }
    }

    /// Numeric level as understood by mdadm
    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::Raid0 => 0,
            Self::Raid1 => 1,
            Self::Raid5 => 5,
            Self::Raid6 => 6,
        }
    }

    /// Minimum number of member disks for this level
    #[must_use]
    pub const fn min_disks(self) -> usize {
        match self {
            Self::Raid0 => 1,
            Self::Raid1 | Self::Raid5 => 2,
            Self::Raid6 => 3,
        }
    }
}

impl TryFrom<i64> for RaidLevel {
    type Error = Error;

    fn try_from(level: i64) -> Result<Self> {
        Self::from_level(level)
    }
}

impl From<RaidLevel> for i64 {
    fn from(level: RaidLevel) -> Self {
        Self::from(level.level())
    }
}

/// Filesystem types that can be created and tuned
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum FsType {
    #[display("ext2")]
    Ext2,
    #[display("ext3")]
    Ext3,
    #[display("ext4")]
    Ext4,
}

/// Source used to fill disks with random data before partitioning
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum RandomSource {
    /// Cryptographically secure, but very slow
    #[serde(rename = "/dev/random")]
    #[display("/dev/random")]
    Random,
    /// Sufficient to obfuscate data occupancy, but slow
    #[serde(rename = "/dev/urandom")]
    #[display("/dev/urandom")]
    Urandom,
}

impl RandomSource {
    /// Device path of the random source
    #[must_use]
    pub const fn as_path(self) -> &'static str {
        match self {
            Self::Random => "/dev/random",
            Self::Urandom => "/dev/urandom",
        }
    }
}

/// Sector and page sizes used to convert between tuning units
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageGeometry {
    /// Sector size in bytes
    pub sector_size: u32,
    /// Page size in bytes
    pub page_size: u32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            sector_size: BYTES_PER_SECTOR,
            page_size: BYTES_PER_PAGE,
        }
    }
}

impl PageGeometry {
    /// Number of sectors that fit in one page
    pub fn sectors_per_page(&self) -> Result<u32> {
        if self.sector_size == 0
            || self.page_size < self.sector_size
            || self.page_size % self.sector_size != 0
        {
            return Err(Error::InvalidGeometry(format!(
                "page size {} is not a multiple of sector size {}",
                self.page_size, self.sector_size
            )));
        }
        Ok(self.page_size / self.sector_size)
    }
}
