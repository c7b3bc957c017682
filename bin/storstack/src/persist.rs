//! Boot-time replay of tuning commands

use crate::executor::{CommandLog, Executor};
use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use storstack_common::Result;

/// Backup location for the rc file, e.g. `/etc/rc.local.bak.20240131T120000`
pub fn backup_path<Tz>(rc_file: &Path, now: &DateTime<Tz>) -> PathBuf
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut name = rc_file.as_os_str().to_owned();
    name.push(format!(".bak.{}", now.format("%Y%m%dT%H%M%S")));
    PathBuf::from(name)
}

/// Interpreter line of the rc file; a failing command stops the replay
pub const RC_SHEBANG: &str = "#!/bin/sh -e";

/// The rc file body: interpreter line, the logged lines, then `exit 0`
#[must_use]
pub fn rc_contents(log: &CommandLog) -> String {
    std::iter::once(RC_SHEBANG)
        .chain(log.lines().iter().map(String::as_str))
        .chain(std::iter::once("exit 0"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Back up the current rc file and replace it with the logged commands
pub async fn persist(executor: &Executor, rc_file: &Path, log: &CommandLog) -> Result<()> {
    let _ = executor.info("Persisting tuning parameters");

    if rc_file.exists() {
        let backup = backup_path(rc_file, &chrono::Local::now());
        let (from, to) = (rc_file.display().to_string(), backup.display().to_string());
        executor.run("cp", &["-p", &from, &to]).await?;
    }

    executor.write(rc_file, rc_contents(log))?;

    #[cfg(unix)]
    if !executor.is_dryrun() {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(rc_file, std::fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}
