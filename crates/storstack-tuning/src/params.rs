//! Tuning parameter derivation
//!
//! Pure functions translating a storage topology into tuning values. Measured
//! device values (queue depth, block size) are passed in as plain numbers; no
//! function here touches a device.
//!
//! Where disks differ, the most conservative common value wins: the shallowest
//! queue, the least common multiple of block sizes, the average readahead.

use storstack_common::{Error, PageGeometry, RaidLevel, Result, BYTES_PER_KB};

/// Number of disks carrying data in a RAID volume
pub fn num_data_disks(disk_count: usize, level: RaidLevel) -> Result<usize> {
    let required = level.min_disks();
    if disk_count < required {
        return Err(Error::InsufficientDisks {
            level: level.level(),
            required,
            available: disk_count,
        });
    }
    Ok(match level {
        RaidLevel::Raid0 => disk_count,
        RaidLevel::Raid1 => 1,
        RaidLevel::Raid5 => disk_count - 1,
        RaidLevel::Raid6 => disk_count - 2,
    })
}

/// Chunk size in KB for a RAID level, `None` when the level does not stripe
#[must_use]
pub const fn raid_chunk_size_kb(level: RaidLevel) -> Option<u32> {
    match level {
        RaidLevel::Raid0 => Some(512),
        RaidLevel::Raid1 => None,
        RaidLevel::Raid5 | RaidLevel::Raid6 => Some(64),
    }
}

/// Chunk size honoring a configured override
///
/// Mirrors never stripe, so an override on a RAID 1 volume is ignored.
#[must_use]
pub const fn effective_chunk_size_kb(level: RaidLevel, configured: Option<u32>) -> Option<u32> {
    match raid_chunk_size_kb(level) {
        None => None,
        Some(default) => match configured {
            Some(kb) => Some(kb),
            None => Some(default),
        },
    }
}

/// Readahead of a RAID volume: the sum of its members' readahead
pub fn raid_readahead_sectors(readaheads: &[u32]) -> Result<u64> {
    if readaheads.is_empty() {
        return Err(Error::empty_devices("RAID readahead needs at least one device"));
    }
    Ok(readaheads.iter().copied().map(u64::from).sum())
}

/// Stripe cache in pages: the average member readahead expressed in pages
pub fn raid_stripe_cache_pages(readaheads: &[u32], geometry: &PageGeometry) -> Result<u64> {
    let sectors_per_page = u64::from(geometry.sectors_per_page()?);
    let total = raid_readahead_sectors(readaheads)?;
    let average = total / readaheads.len() as u64;
    Ok(average / sectors_per_page)
}

/// NCQ depth shared by a set of disks: the shallowest measured queue
pub fn disk_ncq_depth(depths: &[u32]) -> Result<u32> {
    depths
        .iter()
        .copied()
        .min()
        .ok_or_else(|| Error::empty_devices("NCQ depth needs at least one measured device"))
}

const fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Filesystem block size in KB: the LCM of all device block sizes
pub fn fs_block_size_kb(block_sizes: &[u32]) -> Result<u32> {
    if block_sizes.is_empty() {
        return Err(Error::empty_devices("filesystem block size needs at least one device"));
    }
    let mut lcm: u64 = 1;
    for &size in block_sizes {
        if size == 0 {
            return Err(Error::InvalidGeometry("device reported a zero block size".into()));
        }
        let size = u64::from(size);
        lcm = lcm / gcd(lcm, size) * size;
    }

    let kb = lcm / u64::from(BYTES_PER_KB);
    match u32::try_from(kb) {
        Ok(0) => Err(Error::InvalidGeometry(format!(
            "common block size of {lcm} bytes is smaller than 1 KB"
        ))),
        Ok(kb) => Ok(kb),
        Err(_) => Err(Error::InvalidGeometry(format!(
            "common block size of {lcm} bytes is too large"
        ))),
    }
}

/// Filesystem stride in blocks for a given chunk size
pub fn fs_stride_with_chunk(block_sizes: &[u32], chunk_kb: Option<u32>) -> Result<Option<u32>> {
    let block_kb = fs_block_size_kb(block_sizes)?;
    Ok(chunk_kb.map(|chunk| chunk / block_kb))
}

/// Filesystem stride in blocks: chunk size over filesystem block size
pub fn fs_stride(block_sizes: &[u32], level: RaidLevel) -> Result<Option<u32>> {
    fs_stride_with_chunk(block_sizes, raid_chunk_size_kb(level))
}

/// Filesystem stripe width in blocks for a given chunk size
///
/// `block_sizes` holds one entry per member disk, so its length is the disk count.
pub fn fs_stripe_width_with_chunk(
    block_sizes: &[u32],
    level: RaidLevel,
    chunk_kb: Option<u32>,
) -> Result<Option<u32>> {
    let Some(stride) = fs_stride_with_chunk(block_sizes, chunk_kb)? else {
        return Ok(None);
    };
    let data_disks = num_data_disks(block_sizes.len(), level)?;
    let data_disks = u32::try_from(data_disks)
        .map_err(|_| Error::InvalidGeometry(format!("{data_disks} data disks")))?;
    Ok(Some(stride * data_disks))
}

/// Filesystem stripe width in blocks: stride times the number of data disks
pub fn fs_stripe_width(block_sizes: &[u32], level: RaidLevel) -> Result<Option<u32>> {
    fs_stripe_width_with_chunk(block_sizes, level, raid_chunk_size_kb(level))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_num_data_disks() {
        assert_eq!(num_data_disks(4, RaidLevel::Raid0).unwrap(), 4);
        assert_eq!(num_data_disks(4, RaidLevel::Raid1).unwrap(), 1);
        assert_eq!(num_data_disks(4, RaidLevel::Raid5).unwrap(), 3);
        assert_eq!(num_data_disks(4, RaidLevel::Raid6).unwrap(), 2);
        assert!(matches!(RaidLevel::from_level(2), Err(Error::InvalidRaidLevel(2))));
    }

    #[test]
    fn test_num_data_disks_minimums() {
        assert_eq!(num_data_disks(1, RaidLevel::Raid0).unwrap(), 1);
        assert_eq!(num_data_disks(2, RaidLevel::Raid5).unwrap(), 1);
        assert_eq!(num_data_disks(3, RaidLevel::Raid6).unwrap(), 1);
        assert!(matches!(
            num_data_disks(0, RaidLevel::Raid0),
            Err(Error::InsufficientDisks { .. })
        ));
        assert!(matches!(
            num_data_disks(2, RaidLevel::Raid6),
            Err(Error::InsufficientDisks {
                level: 6,
                required: 3,
                available: 2
            })
        ));
    }

    #[test]
    fn test_raid_chunk_size_kb() {
        assert_eq!(raid_chunk_size_kb(RaidLevel::Raid0), Some(512));
        assert_eq!(raid_chunk_size_kb(RaidLevel::Raid1), None);
        assert_eq!(raid_chunk_size_kb(RaidLevel::Raid5), Some(64));
        assert_eq!(raid_chunk_size_kb(RaidLevel::Raid6), Some(64));
    }

    #[test]
    fn test_effective_chunk_size_kb() {
        assert_eq!(effective_chunk_size_kb(RaidLevel::Raid5, None), Some(64));
        assert_eq!(effective_chunk_size_kb(RaidLevel::Raid5, Some(128)), Some(128));
        assert_eq!(effective_chunk_size_kb(RaidLevel::Raid1, Some(128)), None);
    }

    #[test]
    fn test_raid_readahead_sectors() {
        assert_eq!(raid_readahead_sectors(&[256, 256, 256, 256]).unwrap(), 1024);
        assert_eq!(raid_readahead_sectors(&[u32::MAX, u32::MAX]).unwrap(), 2 * u64::from(u32::MAX));
        assert!(matches!(raid_readahead_sectors(&[]), Err(Error::EmptyDeviceSet(_))));
    }

    #[test]
    fn test_raid_stripe_cache_pages() {
        let geometry = PageGeometry::default();
        assert_eq!(raid_stripe_cache_pages(&[256, 256, 256, 256], &geometry).unwrap(), 32);
        // average 300, floored to 37 pages
        assert_eq!(raid_stripe_cache_pages(&[256, 344], &geometry).unwrap(), 37);
        assert!(matches!(
            raid_stripe_cache_pages(&[], &geometry),
            Err(Error::EmptyDeviceSet(_))
        ));

        let large_sectors = PageGeometry {
            sector_size: 4096,
            page_size: 4096,
        };
        assert_eq!(raid_stripe_cache_pages(&[256, 256], &large_sectors).unwrap(), 256);
    }

    #[test]
    fn test_disk_ncq_depth() {
        assert_eq!(disk_ncq_depth(&[32, 31, 32, 32]).unwrap(), 31);
        assert_eq!(disk_ncq_depth(&[1]).unwrap(), 1);
        assert!(matches!(disk_ncq_depth(&[]), Err(Error::EmptyDeviceSet(_))));
    }

    #[test]
    fn test_fs_block_size_kb() {
        assert_eq!(fs_block_size_kb(&[4096, 4096]).unwrap(), 4);
        assert_eq!(fs_block_size_kb(&[4096, 8192]).unwrap(), 8);
        assert_eq!(fs_block_size_kb(&[1024, 4096, 2048]).unwrap(), 4);
        // lcm(3072, 4096) = 12288
        assert_eq!(fs_block_size_kb(&[3072, 4096]).unwrap(), 12);
        assert!(matches!(fs_block_size_kb(&[512]), Err(Error::InvalidGeometry(_))));
        assert!(matches!(fs_block_size_kb(&[0, 4096]), Err(Error::InvalidGeometry(_))));
        assert!(matches!(fs_block_size_kb(&[]), Err(Error::EmptyDeviceSet(_))));
    }

    #[test]
    fn test_fs_stride_and_stripe_width() {
        let blocks = [4096; 4];
        assert_eq!(fs_stride(&blocks, RaidLevel::Raid5).unwrap(), Some(16));
        assert_eq!(fs_stripe_width(&blocks, RaidLevel::Raid5).unwrap(), Some(48));
        assert_eq!(fs_stride(&blocks, RaidLevel::Raid0).unwrap(), Some(128));
        assert_eq!(fs_stripe_width(&blocks, RaidLevel::Raid0).unwrap(), Some(512));
        assert_eq!(fs_stripe_width(&blocks, RaidLevel::Raid6).unwrap(), Some(32));
        assert_eq!(fs_stride(&blocks, RaidLevel::Raid1).unwrap(), None);
        assert_eq!(fs_stripe_width(&blocks, RaidLevel::Raid1).unwrap(), None);
    }

    #[test]
    fn test_fs_stripe_width_with_override() {
        let blocks = [4096; 4];
        assert_eq!(
            fs_stripe_width_with_chunk(&blocks, RaidLevel::Raid5, Some(256)).unwrap(),
            Some(192)
        );
        assert!(fs_stripe_width_with_chunk(&blocks[..2], RaidLevel::Raid6, Some(64)).is_err());
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let mut rng = rand::thread_rng();
        let geometry = PageGeometry::default();
        for _ in 0..100 {
            let count = rng.gen_range(3..12);
            let readaheads: Vec<u32> = (0..count).map(|_| rng.gen_range(0..8192)).collect();
            let depths: Vec<u32> = (0..count).map(|_| rng.gen_range(1..64)).collect();
            let blocks: Vec<u32> = (0..count).map(|_| 1024 << rng.gen_range(0..3)).collect();
            let level = RaidLevel::ALL[rng.gen_range(0..RaidLevel::ALL.len())];

            let derive = || {
                (
                    raid_readahead_sectors(&readaheads).unwrap(),
                    raid_stripe_cache_pages(&readaheads, &geometry).unwrap(),
                    disk_ncq_depth(&depths).unwrap(),
                    fs_stride(&blocks, level).unwrap(),
                    fs_stripe_width(&blocks, level).unwrap(),
                )
            };
            let first = derive();
            assert_eq!(first, derive());
            assert!(first.2 <= *depths.iter().max().unwrap());
        }
    }
}
