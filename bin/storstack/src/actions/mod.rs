//! Subcommand implementations
//!
//! Each action loads the topology, then works through the storage layers in
//! order. The first failure aborts the whole action.

pub mod create;
pub mod merge;
pub mod plan;
pub mod start;
pub mod stop;
pub mod tune;

use crate::executor::Executor;
use anyhow::{bail, Context as _, Result};
use std::path::PathBuf;
use storstack_common::ToolConfig;
use storstack_config::{load_merged, Configuration};
use tracing::debug;

/// Everything an action needs to touch the host
pub struct Context {
    pub config: Configuration,
    pub tool: ToolConfig,
    pub executor: Executor,
}

impl Context {
    /// Load and merge the topology documents, in order
    pub fn load(
        config_files: &[PathBuf],
        tool: ToolConfig,
        dryrun: bool,
        verbose: bool,
    ) -> Result<Self> {
        let node = load_merged(config_files).context("failed to load topology")?;
        let config = Configuration::from_node(&node).context("invalid topology")?;
        debug!(
            "Loaded topology with {} device groups, {} RAID volumes, {} filesystems",
            config.disk.device_groups.len(),
            config.raid.volumes.len(),
            config.fs.volumes.len()
        );
        Ok(Self {
            config,
            tool,
            executor: Executor::new(dryrun, verbose),
        })
    }

    /// Mutating actions need root unless nothing is applied
    pub fn require_root(&self) -> Result<()> {
        if self.executor.is_dryrun() {
            return Ok(());
        }
        #[cfg(unix)]
        if !nix::unistd::geteuid().is_root() {
            bail!("this action must run as root (use --dryrun to preview it)");
        }
        Ok(())
    }
}
