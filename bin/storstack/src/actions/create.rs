//! `storstack create`: build every storage layer from bare disks
//!
//! Disks are randomized, partitioned and assembled into RAID volumes, then
//! encrypted and formatted. This destroys all data on the listed disks.

use super::Context;
use crate::executor::{wait_all, Executor};
use anyhow::{bail, Context as _, Result};
use std::path::Path;
use std::time::Duration;
use storstack_common::RaidLevel;
use storstack_config::schema::{CryptVolume, DiskDevice, FsVolume, RaidVolume};
use storstack_tuning::params::effective_chunk_size_kb;
use storstack_tuning::{DeviceProbe, Planner, SystemProbe};
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

/// Longest wait for the kernel to drop or add partition nodes
const PARTITION_TIMEOUT: Duration = Duration::from_secs(60);

const PARTED: [&str; 3] = ["--script", "--align", "optimal"];

pub async fn run(ctx: &Context) -> Result<()> {
    ctx.require_root()?;
    create(ctx, &SystemProbe::from_config(&ctx.tool)).await
}

async fn create(ctx: &Context, probe: &impl DeviceProbe) -> Result<()> {
    let disks: Vec<&DiskDevice> = ctx
        .config
        .disk
        .device_groups
        .iter()
        .flat_map(|g| g.devices.iter())
        .collect();

    randomize_disks(ctx, probe, &disks).await?;
    partition_disks(ctx, &disks).await?;

    for volume in &ctx.config.raid.volumes {
        create_raid(ctx, volume).await?;
    }
    if !ctx.config.raid.volumes.is_empty() {
        configure_raid(ctx).await?;
    }

    for volume in &ctx.config.crypt.volumes {
        create_crypt(&ctx.executor, volume).await?;
    }

    let planner = Planner::new(&ctx.config, probe, &ctx.tool);
    for volume in &ctx.config.fs.volumes {
        let block_size_kb = planner.fs_block_size_kb(volume)?;
        let options = planner.plan_fs_volume(volume)?.extended_options();
        create_fs(&ctx.executor, volume, block_size_kb, options.as_deref()).await?;
    }

    info!("Storage stack created");
    Ok(())
}

/// Fill disks with random data, all disks at once
async fn randomize_disks(
    ctx: &Context,
    probe: &impl DeviceProbe,
    disks: &[&DiskDevice],
) -> Result<()> {
    let targets: Vec<_> = disks
        .iter()
        .filter_map(|d| d.randomize_source.map(|source| (*d, source)))
        .collect();
    if targets.is_empty() {
        return Ok(());
    }
    let _ = ctx.executor.info("Randomizing devices in parallel");

    let mut spawned = Vec::with_capacity(targets.len());
    for (disk, source) in targets {
        let count = format!("count={}", probe.size_sectors(disk)?);
        let input = format!("if={}", source.as_path());
        let output = format!("of={}", disk.path);
        spawned.push(ctx.executor.spawn("dd", &[&input, &output, "bs=512", &count])?);
    }
    wait_all(spawned).await?;
    Ok(())
}

async fn partition_disks(ctx: &Context, disks: &[&DiskDevice]) -> Result<()> {
    if disks.is_empty() {
        return Ok(());
    }
    let _ = ctx.executor.info("Partitioning devices");
    let partitions: Vec<String> = disks.iter().map(|d| d.partition_path()).collect();

    for disk in disks {
        let args: Vec<&str> = PARTED
            .iter()
            .copied()
            .chain([disk.path.as_str(), "mklabel", "gpt"])
            .collect();
        ctx.executor.run("parted", &args).await?;
    }
    wait_for_partitions(ctx, &partitions, false).await?;

    for disk in disks {
        let args: Vec<&str> = PARTED
            .iter()
            .copied()
            .chain([disk.path.as_str(), "mkpart", "primary", "0%", "100%"])
            .collect();
        ctx.executor.run("parted", &args).await?;
    }
    wait_for_partitions(ctx, &partitions, true).await?;
    Ok(())
}

/// Poll until every partition node is present (or absent)
async fn wait_for_partitions(ctx: &Context, partitions: &[String], present: bool) -> Result<()> {
    if ctx.executor.is_dryrun() {
        return Ok(());
    }
    let interval = Duration::from_millis(ctx.tool.timing.poll_interval_ms);
    let settled = || partitions.iter().all(|p| Path::new(p).exists() == present);

    timeout(PARTITION_TIMEOUT, async {
        while !settled() {
            sleep(interval).await;
        }
    })
    .await
    .with_context(|| {
        format!(
            "partitions {} did not {} in time",
            partitions.join(", "),
            if present { "appear" } else { "disappear" }
        )
    })
}

async fn create_raid(ctx: &Context, volume: &RaidVolume) -> Result<()> {
    let _ = ctx
        .executor
        .info(format!("Creating RAID volume '{}' ({})", volume.name, volume.label));
    let members: Vec<&str> = volume.devices.iter().map(|d| d.path.as_str()).collect();
    let label = volume.label_path().display().to_string();

    let mut zero = vec!["--zero-superblock"];
    zero.extend(&members);
    ctx.executor.run("mdadm", &zero).await?;

    let level = format!("--level={}", volume.raid_level);
    let name = format!("--name={}", volume.name);
    let count = format!("--raid-devices={}", members.len());
    let chunk = effective_chunk_size_kb(volume.raid_level, volume.chunk_size_kb)
        .map(|kb| format!("--chunk={kb}"));

    let mut args = vec![
        "--create",
        "--verbose",
        label.as_str(),
        level.as_str(),
        name.as_str(),
    ];
    if let Some(chunk) = &chunk {
        args.push(chunk.as_str());
    }
    args.push(count.as_str());
    args.extend(&members);
    ctx.executor.run("mdadm", &args).await?;

    if volume.raid_level != RaidLevel::Raid0 {
        wait_for_resync(ctx, volume).await?;
    }
    Ok(())
}

/// Resync progress as a percentage floored to 10% steps
fn sync_progress(sync_completed: &str) -> Option<u64> {
    let (current, total) = sync_completed.split_once('/')?;
    let current: u64 = current.trim().parse().ok()?;
    let total: u64 = total.trim().parse().ok()?;
    if total == 0 {
        return None;
    }
    Some(current * 100 / total / 10 * 10)
}

async fn wait_for_resync(ctx: &Context, volume: &RaidVolume) -> Result<()> {
    if ctx.executor.is_dryrun() {
        return Ok(());
    }
    let sys_block = &ctx.tool.paths.sys_block;
    let action_file = volume.sync_action_file(sys_block);
    let completed_file = volume.sync_completed_file(sys_block);
    let interval = Duration::from_secs(ctx.tool.timing.resync_poll_secs);

    let mut last_progress = None;
    loop {
        let action = tokio::fs::read_to_string(&action_file)
            .await
            .with_context(|| format!("failed to read {}", action_file.display()))?;
        match action.trim() {
            "idle" => break,
            "resync" | "recover" => {
                let completed = tokio::fs::read_to_string(&completed_file)
                    .await
                    .unwrap_or_default();
                let progress = sync_progress(&completed);
                match (last_progress, progress) {
                    (None, _) => info!("RAID resync of '{}' in progress", volume.name),
                    (Some(last), Some(now)) if now > last => {
                        info!("RAID resync of '{}' {now}% complete", volume.name);
                    }
                    _ => {}
                }
                last_progress = Some(progress.unwrap_or(0));
            }
            other => bail!("unexpected sync action '{other}' on {}", volume.label),
        }
        sleep(interval).await;
    }
    info!("RAID resync of '{}' complete", volume.name);
    Ok(())
}

async fn configure_raid(ctx: &Context) -> Result<()> {
    let _ = ctx.executor.info("Configuring mdadm");
    // A dry run created no arrays, so there is nothing to scan.
    let scan = if ctx.executor.is_dryrun() {
        String::new()
    } else {
        ctx.executor.capture("mdadm", &["--detail", "--scan"]).await?
    };
    if scan.trim().is_empty() && !ctx.executor.is_dryrun() {
        warn!("mdadm reported no arrays, mdadm.conf will not list any");
    }
    let content = ctx.config.raid.mdadm_config.render(&scan);
    ctx.executor.write(&ctx.tool.paths.mdadm_conf, content)?;
    Ok(())
}

/// `cryptsetup luksFormat` arguments for a crypt volume
fn luks_format_args(volume: &CryptVolume) -> Vec<String> {
    let mut args = vec![
        format!("--cipher={}", volume.cipher),
        format!("--key-size={}", volume.key_size),
        format!("--hash={}", volume.hash_algorithm),
    ];
    if volume.iter_time > 0 {
        args.push(format!("--iter-time={}", volume.iter_time));
    }
    args.extend([
        "--use-random".to_string(),
        "luksFormat".to_string(),
        volume.encrypted_path.clone(),
    ]);
    args
}

async fn create_crypt(executor: &Executor, volume: &CryptVolume) -> Result<()> {
    let _ = executor.info(format!(
        "Encrypting {} as '{}'",
        volume.encrypted_path, volume.decrypted_name
    ));
    let args = luks_format_args(volume);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    executor.run("cryptsetup", &args).await?;
    executor
        .run("cryptsetup", &["luksOpen", &volume.encrypted_path, &volume.decrypted_name])
        .await?;
    Ok(())
}

/// `mke2fs` arguments for a filesystem volume
fn mke2fs_args(volume: &FsVolume, block_size_kb: u32, extended: Option<&str>) -> Vec<String> {
    let mut args = vec![
        "-t".to_string(),
        volume.fs_type.to_string(),
        "-b".to_string(),
        (u64::from(block_size_kb) * 1024).to_string(),
    ];
    if let Some(extended) = extended {
        args.extend(["-E".to_string(), extended.to_string()]);
    }
    args.push(volume.device_path.clone());
    args
}

async fn create_fs(
    executor: &Executor,
    volume: &FsVolume,
    block_size_kb: u32,
    extended: Option<&str>,
) -> Result<()> {
    let _ = executor.info(format!("Creating {} filesystem '{}'", volume.fs_type, volume.name));
    let args = mke2fs_args(volume, block_size_kb, extended);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    executor.run("mke2fs", &args).await?;
    Ok(())
}
