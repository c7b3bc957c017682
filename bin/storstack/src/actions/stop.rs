//! `storstack stop`: tear down volumes in the reverse order of `start`

use super::Context;
use anyhow::Result;
use tracing::info;

pub async fn run(ctx: &Context) -> Result<()> {
    ctx.require_root()?;
    let executor = &ctx.executor;
    let config = &ctx.config;

    if !config.export.volumes.is_empty() {
        let _ = executor.info("Unexporting volumes");
        executor.run("exportfs", &["-ua"]).await?;
    }

    for volume in config.bind.read_only.iter().rev().chain(config.bind.read_write.iter().rev()) {
        let _ = executor.info(format!("Unbinding {}", volume.target));
        executor.run("umount", &[volume.target.as_str()]).await?;
    }

    for volume in config.fs.volumes.iter().rev() {
        let _ = executor.info(format!("Unmounting FS volume '{}'", volume.name));
        executor.run("umount", &[volume.mount_location.as_str()]).await?;
    }

    for volume in config.crypt.volumes.iter().rev() {
        let _ = executor.info(format!("Closing crypt volume '{}'", volume.decrypted_name));
        executor
            .run("cryptsetup", &["luksClose", &volume.decrypted_name])
            .await?;
    }

    for volume in config.raid.volumes.iter().rev() {
        let _ = executor.info(format!("Stopping RAID volume '{}'", volume.name));
        let label = volume.label_path().display().to_string();
        executor.run("mdadm", &["--stop", &label]).await?;
    }

    info!("Storage stack stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Executor;
    use storstack_common::ToolConfig;
    use storstack_config::{parse_node, Configuration};

    #[tokio::test]
    async fn test_stop_dryrun() {
        let node = parse_node(
            r"
crypt:
  volumes: [{encrypted_path: /dev/md0, decrypted_name: data}]
bind:
  read_only: [{source: /srv/data/media, target: /export/media}]
",
        )
        .unwrap();
        let ctx = Context {
            config: Configuration::from_node(&node).unwrap(),
            tool: ToolConfig::default(),
            executor: Executor::new(true, true),
        };
        run(&ctx).await.unwrap();
    }
}
