//! storstack storage stack tool
//!
//! Builds and operates a layered storage stack: RAID volumes over raw disks,
//! LUKS over RAID, ext filesystems over LUKS, plus bind mounts and NFS exports.
//!
//! Usage:
//!   storstack create --config-file topology.yaml
//!   storstack tune --config-file topology.yaml --dryrun --verbose
//!   storstack plan --config-file topology.yaml
//!   storstack merge base.yaml site.yaml --output topology.yaml

mod actions;
mod executor;
mod exports;
mod persist;

use actions::Context;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use storstack_common::config::DEFAULT_TOOL_CONFIG;
use storstack_common::{Error, ToolConfig};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "storstack")]
#[command(about = "Layered RAID/crypt/filesystem storage stack tool")]
#[command(version)]
struct Args {
    /// Log level, overrides the tool configuration
    #[arg(long)]
    log_level: Option<String>,

    /// Tool configuration file
    #[arg(long, default_value = DEFAULT_TOOL_CONFIG, env = "STORSTACK_CONFIG")]
    tool_config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every action that touches the host
#[derive(clap::Args, Debug)]
struct ExecArgs {
    /// Topology documents, merged in order
    #[arg(long = "config-file", required = true, num_args = 1..)]
    config_files: Vec<PathBuf>,

    /// Log what would be done without changing anything
    #[arg(long)]
    dryrun: bool,

    /// Log every file write and command
    #[arg(long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Randomize, partition, and build RAID, crypt and filesystem volumes
    Create(ExecArgs),

    /// Apply derived performance parameters and persist them for boot
    Tune(ExecArgs),

    /// Assemble, open, mount, bind and export existing volumes
    Start(ExecArgs),

    /// Unexport, unmount, close and stop volumes
    Stop(ExecArgs),

    /// Merge topology documents into one
    Merge {
        /// Documents to merge, later ones win
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the tuning plan as JSON without applying it
    Plan {
        /// Topology documents, merged in order
        #[arg(long = "config-file", required = true, num_args = 1..)]
        config_files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let tool = ToolConfig::load(&args.tool_config)?;

    // Initialize logging
    let level = args.log_level.clone().unwrap_or_else(|| tool.logging.level.clone());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = dispatch(args.command, tool).await {
        if is_topology_error(&err) {
            error!("{err:#}");
            std::process::exit(EXIT_INVALID_TOPOLOGY);
        }
        return Err(err);
    }
    Ok(())
}

/// Exit status when the topology documents themselves are at fault
const EXIT_INVALID_TOPOLOGY: i32 = 2;

async fn dispatch(command: Commands, tool: ToolConfig) -> Result<()> {
    match command {
        Commands::Create(exec) => actions::create::run(&load(&exec, tool)?).await?,
        Commands::Tune(exec) => actions::tune::run(&load(&exec, tool)?).await?,
        Commands::Start(exec) => actions::start::run(&load(&exec, tool)?).await?,
        Commands::Stop(exec) => actions::stop::run(&load(&exec, tool)?).await?,
        Commands::Merge { inputs, output } => actions::merge::run(&inputs, output.as_deref())?,
        Commands::Plan { config_files } => {
            actions::plan::run(&Context::load(&config_files, tool, true, false)?)?;
        }
    }
    Ok(())
}

fn is_topology_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<Error>().is_some_and(Error::is_config_error)
}

fn load(exec: &ExecArgs, tool: ToolConfig) -> Result<Context> {
    Context::load(&exec.config_files, tool, exec.dryrun, exec.verbose)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_exec_args() {
        let args = Args::parse_from([
            "storstack",
            "tune",
            "--config-file",
            "a.yaml",
            "b.yaml",
            "--dryrun",
        ]);
        match args.command {
            Commands::Tune(exec) => {
                assert_eq!(exec.config_files, [PathBuf::from("a.yaml"), PathBuf::from("b.yaml")]);
                assert!(exec.dryrun);
                assert!(!exec.verbose);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_topology_error_detection() {
        let err = anyhow::Error::from(Error::InvalidRaidLevel(2)).context("invalid topology");
        assert!(is_topology_error(&err));

        let err = anyhow::Error::from(Error::command("mdadm --stop /dev/md0", "exited with 1"));
        assert!(!is_topology_error(&err));
        assert!(!is_topology_error(&anyhow::anyhow!("must run as root")));
    }

    #[test]
    fn test_config_file_required() {
        assert!(Args::try_parse_from(["storstack", "start"]).is_err());
        assert!(Args::try_parse_from(["storstack", "merge"]).is_err());
    }
}
