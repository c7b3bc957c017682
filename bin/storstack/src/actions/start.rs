//! `storstack start`: bring up existing volumes, layer by layer

use super::Context;
use crate::executor::Executor;
use crate::exports::render_exports;
use anyhow::Result;
use storstack_config::schema::BindVolume;
use tracing::info;

pub async fn run(ctx: &Context) -> Result<()> {
    ctx.require_root()?;
    let executor = &ctx.executor;
    let config = &ctx.config;

    for volume in &config.raid.volumes {
        let _ = executor.info(format!("Starting RAID volume '{}'", volume.name));
        let label = volume.label_path().display().to_string();
        executor.run("mdadm", &["--assemble", &label]).await?;
    }

    for volume in &config.crypt.volumes {
        let _ = executor.info(format!("Opening crypt volume '{}'", volume.decrypted_name));
        executor
            .run(
                "cryptsetup",
                &["luksOpen", &volume.encrypted_path, &volume.decrypted_name],
            )
            .await?;
    }

    for volume in &config.fs.volumes {
        let _ = executor.info(format!(
            "Mounting FS volume '{}' at {}",
            volume.name, volume.mount_location
        ));
        let fs_type = volume.fs_type.to_string();
        executor.run("mkdir", &["-p", &volume.mount_location]).await?;
        executor
            .run(
                "mount",
                &["-t", &fs_type, &volume.device_path, &volume.mount_location],
            )
            .await?;
    }

    for volume in &config.bind.read_write {
        bind(executor, volume, false).await?;
    }
    for volume in &config.bind.read_only {
        bind(executor, volume, true).await?;
    }

    if !config.export.volumes.is_empty() {
        let _ = executor.info("Exporting volumes");
        executor.write(&ctx.tool.paths.exports_file, render_exports(config)?)?;
        executor.run("exportfs", &["-ra"]).await?;
    }

    info!("Storage stack started");
    Ok(())
}

/// Bind-mount a volume; read-only binds need a second remount to take effect
async fn bind(executor: &Executor, volume: &BindVolume, read_only: bool) -> Result<()> {
    let _ = executor.info(format!(
        "Binding {} to {}{}",
        volume.source,
        volume.target,
        if read_only { " (read-only)" } else { "" }
    ));
    executor.run("mkdir", &["-p", &volume.target]).await?;
    executor
        .run("mount", &["--bind", &volume.source, &volume.target])
        .await?;
    if read_only {
        executor
            .run("mount", &["-o", "remount,ro,bind", &volume.target])
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use storstack_common::ToolConfig;
    use storstack_config::{parse_node, Configuration};

    #[tokio::test]
    async fn test_bind_dryrun() {
        let volume = BindVolume {
            source: "/srv/data/media".into(),
            target: "/export/media".into(),
        };
        bind(&Executor::new(true, false), &volume, true).await.unwrap();
    }

    #[tokio::test]
    async fn test_start_dryrun() {
        let dir = tempfile::tempdir().unwrap();
        let mut tool = ToolConfig::default();
        tool.paths.exports_file = dir.path().join("exports");

        let node = parse_node(
            r"
raid:
  volumes:
    - {name: data, label: md0, raid_level: 1, devices: [{path: /dev/sdb1}, {path: /dev/sdc1}]}
fs:
  volumes:
    - {name: data, fs_type: ext4, device_path: /dev/md0, mount_location: /srv/data}
export:
  host_groups: [{name: lan, hosts: ['*']}]
  options: [{name: ro, value: ro}]
  volumes: [{path: /srv/data, host_group_options: [{host_group: lan, option: ro}]}]
",
        )
        .unwrap();
        let ctx = Context {
            config: Configuration::from_node(&node).unwrap(),
            tool,
            executor: Executor::new(true, false),
        };
        run(&ctx).await.unwrap();
        assert!(!dir.path().join("exports").exists());
    }
}
