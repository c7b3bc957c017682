//! `storstack tune`: apply derived parameters to disks, RAID and filesystems

use super::Context;
use crate::executor::{CommandLog, Executor};
use crate::persist::persist;
use anyhow::Result;
use storstack_tuning::{DiskTuning, FsTuning, Planner, RaidTuning, SystemProbe, TuningPlan};
use tracing::info;

pub async fn run(ctx: &Context) -> Result<()> {
    ctx.require_root()?;

    let probe = SystemProbe::from_config(&ctx.tool);
    let plan = Planner::new(&ctx.config, &probe, &ctx.tool).plan()?;

    let log = apply(&ctx.executor, &plan).await?;
    persist(&ctx.executor, &ctx.tool.paths.rc_file, &log).await?;

    info!("Tuning complete, {} commands persisted", log.lines().len());
    Ok(())
}

/// Apply a plan, returning the lines that must be replayed at boot
///
/// Filesystem geometry lives in the superblock, so `tune2fs` is not logged.
pub async fn apply(executor: &Executor, plan: &TuningPlan) -> Result<CommandLog> {
    let mut log = CommandLog::new();

    log.push(executor.info("Tuning disk parameters"));
    for disk in &plan.disks {
        tune_disk(executor, disk, &mut log).await?;
    }

    log.push(executor.info("Tuning RAID parameters"));
    tune_raid(executor, &plan.raid, &mut log).await?;

    let _ = executor.info("Tuning FS parameters");
    for fs in &plan.filesystems {
        tune_fs(executor, fs).await?;
    }
    Ok(log)
}

async fn tune_disk(executor: &Executor, disk: &DiskTuning, log: &mut CommandLog) -> Result<()> {
    log.push(executor.info(format!("Tuning disk device '{}'", disk.path)));

    let readahead = disk.readahead_sectors.to_string();
    log.push(executor.run("blockdev", &["--setra", &readahead, &disk.path]).await?);

    if let Some(kb) = disk.max_sectors_kb {
        log.push(executor.write(&disk.max_sectors_kb_file, kb.to_string())?);
    }
    log.push(executor.write(&disk.nr_requests_file, disk.nr_requests.to_string())?);
    log.push(executor.write(&disk.queue_depth_file, disk.ncq_depth.to_string())?);
    if let Some(scheduler) = &disk.scheduler {
        log.push(executor.write(&disk.scheduler_file, scheduler)?);
    }
    Ok(())
}

async fn tune_raid(executor: &Executor, raid: &RaidTuning, log: &mut CommandLog) -> Result<()> {
    log.push(executor.write(&raid.speed_limit_min_file, raid.speed_limit_min.to_string())?);
    log.push(executor.write(&raid.speed_limit_max_file, raid.speed_limit_max.to_string())?);

    for volume in &raid.volumes {
        let label = volume.label_path.display().to_string();
        log.push(executor.info(format!("Tuning RAID volume '{}' ('{label}')", volume.name)));

        let readahead = volume.readahead_sectors.to_string();
        log.push(executor.run("blockdev", &["--setra", &readahead, &label]).await?);

        if let Some(pages) = volume.stripe_cache_pages {
            log.push(executor.write(&volume.stripe_cache_size_file, pages.to_string())?);
        }
    }
    Ok(())
}

async fn tune_fs(executor: &Executor, fs: &FsTuning) -> Result<()> {
    let _ = executor.info(format!("Tuning FS volume '{}' ({})", fs.name, fs.device_path));
    match fs.extended_options() {
        Some(options) => {
            executor.run("tune2fs", &["-E", &options, &fs.device_path]).await?;
        }
        None => info!("{} is not striped, leaving its geometry alone", fs.name),
    }
    Ok(())
}
