//! Host command execution
//!
//! Every mutating step goes through [`Executor`], which honors `--dryrun` and
//! `--verbose` and returns the shell line that replays the step. Callers keep
//! the lines they want to persist in their own [`CommandLog`].

use futures::future::try_join_all;
use std::path::Path;
use std::process::Stdio;
use storstack_common::{Error, Result};
use tokio::process::{Child, Command};
use tracing::{debug, info};

/// Ordered shell lines collected by one action
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandLog {
    lines: Vec<String>,
}

impl CommandLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: String) {
        self.lines.push(line);
    }

    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// Runs or simulates host commands
#[derive(Clone, Copy, Debug)]
pub struct Executor {
    dryrun: bool,
    verbose: bool,
}

/// Wrap a word in single quotes for the shell
fn single_quote(word: &str) -> String {
    format!("'{}'", word.replace('\'', r"'\''"))
}

/// Render a command as a shell line, quoting arguments that need it
#[must_use]
pub fn render_command(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .map(|word| {
            if !word.is_empty()
                && word
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || "-_./=:,%+@".contains(c))
            {
                word.to_string()
            } else {
                single_quote(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl Executor {
    #[must_use]
    pub const fn new(dryrun: bool, verbose: bool) -> Self {
        Self { dryrun, verbose }
    }

    #[must_use]
    pub const fn is_dryrun(&self) -> bool {
        self.dryrun
    }

    fn trace(&self, kind: &str, line: &str) {
        if self.verbose {
            info!(dryrun = self.dryrun, "{kind} {line}");
        } else {
            debug!(dryrun = self.dryrun, "{kind} {line}");
        }
    }

    /// Log a progress message; the returned line is a shell comment
    #[must_use]
    pub fn info(&self, message: impl AsRef<str>) -> String {
        let message = message.as_ref();
        info!(dryrun = self.dryrun, "{message}");
        format!("# {message}")
    }

    /// Write `content` to `path`, followed by a newline
    pub fn write(&self, path: impl AsRef<Path>, content: impl AsRef<str>) -> Result<String> {
        let path = path.as_ref();
        let content = content.as_ref();
        self.trace("write", &path.display().to_string());
        for line in content.lines() {
            debug!(dryrun = self.dryrun, "  {line}");
        }

        if !self.dryrun {
            std::fs::write(path, format!("{content}\n"))?;
        }
        Ok(format!(
            "echo {} > {}",
            single_quote(content),
            single_quote(&path.display().to_string())
        ))
    }

    /// Run a command to completion, failing on a non-zero exit
    pub async fn run(&self, program: &str, args: &[&str]) -> Result<String> {
        let line = render_command(program, args);
        self.trace("run", &line);

        if !self.dryrun {
            let status = Command::new(program)
                .args(args)
                .status()
                .await
                .map_err(|e| Error::command(&line, e.to_string()))?;
            if !status.success() {
                return Err(Error::command(&line, format!("exited with {status}")));
            }
        }
        Ok(line)
    }

    /// Run a read-only command and return its stdout, even in a dry run
    pub async fn capture(&self, program: &str, args: &[&str]) -> Result<String> {
        let line = render_command(program, args);
        debug!("capture {line}");
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::command(&line, e.to_string()))?;
        if !output.status.success() {
            return Err(Error::command(
                &line,
                format!(
                    "exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Start a command without waiting; a dry run starts nothing
    pub fn spawn(&self, program: &str, args: &[&str]) -> Result<Spawned> {
        let line = render_command(program, args);
        self.trace("spawn", &line);

        let child = if self.dryrun {
            None
        } else {
            Some(
                Command::new(program)
                    .args(args)
                    .spawn()
                    .map_err(|e| Error::command(&line, e.to_string()))?,
            )
        };
        Ok(Spawned { line, child })
    }
}

/// A command started by [`Executor::spawn`]
#[derive(Debug)]
pub struct Spawned {
    line: String,
    child: Option<Child>,
}

impl Spawned {
    /// Wait for the command, failing on a non-zero exit
    pub async fn wait(self) -> Result<String> {
        if let Some(mut child) = self.child {
            let status = child
                .wait()
                .await
                .map_err(|e| Error::command(&self.line, e.to_string()))?;
            if !status.success() {
                return Err(Error::command(&self.line, format!("exited with {status}")));
            }
        }
        Ok(self.line)
    }
}

/// Wait for every spawned command; the first failure wins
pub async fn wait_all(spawned: Vec<Spawned>) -> Result<Vec<String>> {
    try_join_all(spawned.into_iter().map(Spawned::wait)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_command() {
        assert_eq!(
            render_command("blockdev", &["--setra", "1024", "/dev/md0"]),
            "blockdev --setra 1024 /dev/md0"
        );
        assert_eq!(
            render_command("mdadm", &["--create", "name with space", ""]),
            "mdadm --create 'name with space' ''"
        );
        assert_eq!(render_command("echo", &["it's"]), r"echo 'it'\''s'");
    }

    #[test]
    fn test_info_line() {
        let executor = Executor::new(true, false);
        assert_eq!(executor.info("Tuning RAID parameters"), "# Tuning RAID parameters");
    }

    #[test]
    fn test_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nr_requests");

        let line = Executor::new(true, true).write(&path, "32").unwrap();
        assert_eq!(line, format!("echo '32' > '{}'", path.display()));
        assert!(!path.exists());

        Executor::new(false, false).write(&path, "32").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "32\n");
    }

    #[test]
    fn test_write_quotes_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("it's");
        let line = Executor::new(true, false).write(&path, "a'b").unwrap();
        assert_eq!(
            line,
            format!(r"echo 'a'\''b' > '{}'", path.display().to_string().replace('\'', r"'\''"))
        );
        assert!(line.ends_with(r"it'\''s'"));
    }

    #[test]
    fn test_write_failure() {
        let executor = Executor::new(false, false);
        let err = executor.write("/nonexistent/dir/file", "1").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn test_run() {
        let executor = Executor::new(false, false);
        assert_eq!(executor.run("true", &[]).await.unwrap(), "true");
        let err = executor.run("false", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Command { .. }));
        assert!(executor.run("/nonexistent/program", &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_dryrun_runs_nothing() {
        let executor = Executor::new(true, false);
        assert_eq!(executor.run("false", &["x"]).await.unwrap(), "false x");
        let spawned = executor.spawn("/nonexistent/program", &[]).unwrap();
        assert_eq!(spawned.wait().await.unwrap(), "/nonexistent/program");
    }

    #[tokio::test]
    async fn test_capture() {
        let executor = Executor::new(true, false);
        assert_eq!(executor.capture("echo", &["4096"]).await.unwrap(), "4096\n");
        assert!(executor.capture("false", &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_wait_all() {
        let executor = Executor::new(false, false);
        let spawned = vec![
            executor.spawn("true", &[]).unwrap(),
            executor.spawn("sleep", &["0.1"]).unwrap(),
        ];
        assert_eq!(wait_all(spawned).await.unwrap(), ["true", "sleep 0.1"]);

        let spawned = vec![
            executor.spawn("true", &[]).unwrap(),
            executor.spawn("false", &[]).unwrap(),
        ];
        assert!(wait_all(spawned).await.is_err());
    }

    #[test]
    fn test_command_log() {
        let mut log = CommandLog::new();
        assert!(log.lines().is_empty());
        log.push("# Tuning".to_string());
        log.push("blockdev --setra 256 /dev/sdb".to_string());
        assert_eq!(log.lines().len(), 2);
    }
}
