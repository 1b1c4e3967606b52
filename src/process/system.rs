use std::collections::HashMap;
use std::path::Path;
use std::process::Output;

use tokio::process::Command;

use super::{CollectorError, CwdResolver, ProcessRecord, ProcessSource, Snapshot};
use crate::duration::parse_elapsed;

/// Process snapshots taken with `ps`
pub struct PsProcessSource {
    /// Path to ps binary
    ps_path: String,
}

impl PsProcessSource {
    pub fn new() -> Self {
        Self {
            ps_path: "ps".to_string(),
        }
    }
}

impl Default for PsProcessSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSource for PsProcessSource {
    async fn capture(&self) -> Result<Snapshot, CollectorError> {
        let output = Command::new(&self.ps_path)
            .args(["-eo", "pid,ppid,etime,command"])
            .output()
            .await
            .map_err(|source| CollectorError::Spawn {
                command: "ps",
                source,
            })?;
        let output = check_status("ps", output)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_ps_output(&stdout))
    }
}

/// Parse `ps -eo pid,ppid,etime,command` output. The header and any line
/// that does not parse are dropped.
pub fn parse_ps_output(stdout: &str) -> Snapshot {
    let records = stdout
        .lines()
        .skip(1)
        .filter_map(|line| {
            let record = parse_ps_line(line);
            if record.is_none() {
                tracing::trace!(line, "skipping malformed ps line");
            }
            record
        })
        .collect();
    Snapshot::new(records)
}

fn parse_ps_line(line: &str) -> Option<ProcessRecord> {
    let mut fields = line.split_whitespace();
    let pid = fields.next()?.parse().ok()?;
    let parent_pid = fields.next()?.parse().ok()?;
    let elapsed_secs = parse_elapsed(fields.next()?).ok()?;

    let command_line = fields.collect::<Vec<_>>().join(" ");
    if command_line.is_empty() {
        return None;
    }

    Some(ProcessRecord::new(pid, parent_pid, elapsed_secs, command_line))
}

/// Working directory lookup: `/proc` on Linux, one batched `lsof` call elsewhere.
pub struct SystemCwdResolver {
    /// Path to lsof binary
    lsof_path: String,
}

impl SystemCwdResolver {
    pub fn new() -> Self {
        Self {
            lsof_path: "lsof".to_string(),
        }
    }

    async fn resolve_with_lsof(&self, pids: &[u32]) -> Result<HashMap<u32, String>, CollectorError> {
        let pid_list = pids
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let output = Command::new(&self.lsof_path)
            .args(["-a", "-d", "cwd", "-Fpn", "-p", &pid_list])
            .output()
            .await
            .map_err(|source| CollectorError::Spawn {
                command: "lsof",
                source,
            })?;

        // lsof exits 1 when any requested PID has vanished, but still reports the rest
        if !output.status.success() && output.stdout.is_empty() {
            return check_status("lsof", output).map(|_| HashMap::new());
        }

        Ok(parse_lsof_fields(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn resolve_with_procfs(&self, pids: &[u32]) -> HashMap<u32, String> {
        let mut cwds = HashMap::new();
        for &pid in pids {
            match tokio::fs::read_link(format!("/proc/{pid}/cwd")).await {
                Ok(path) => {
                    cwds.insert(pid, path.to_string_lossy().into_owned());
                }
                Err(e) => tracing::trace!(pid, error = %e, "cwd not readable"),
            }
        }
        cwds
    }
}

impl Default for SystemCwdResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CwdResolver for SystemCwdResolver {
    async fn resolve(&self, pids: &[u32]) -> Result<HashMap<u32, String>, CollectorError> {
        if pids.is_empty() {
            return Ok(HashMap::new());
        }

        if cfg!(target_os = "linux") && Path::new("/proc/self/cwd").exists() {
            Ok(self.resolve_with_procfs(pids).await)
        } else {
            self.resolve_with_lsof(pids).await
        }
    }
}

/// Parse `lsof -Fpn` field output: a `p<pid>` line opens a process set and
/// the following `n<path>` line names its cwd.
pub fn parse_lsof_fields(stdout: &str) -> HashMap<u32, String> {
    let mut cwds = HashMap::new();
    let mut current: Option<u32> = None;

    for line in stdout.lines() {
        let Some(tag) = line.chars().next() else {
            continue;
        };
        let value = &line[tag.len_utf8()..];
        match tag {
            'p' => current = value.parse().ok(),
            'n' => {
                if let Some(pid) = current.take() {
                    if !value.is_empty() {
                        cwds.insert(pid, value.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    cwds
}

fn check_status(command: &'static str, output: Output) -> Result<Output, CollectorError> {
    if output.status.success() {
        Ok(output)
    } else {
        Err(CollectorError::Failed {
            command,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ps_output() {
        let stdout = "\
  PID  PPID     ELAPSED COMMAND
    1     0 10-01:00:00 /sbin/launchd
  412     1    02:10:33 /Applications/Ghostty.app/Contents/MacOS/ghostty
  500   412       05:01 /usr/bin/login -flp elle /bin/bash --noprofile
";
        let snapshot = parse_ps_output(stdout);
        let records = snapshot.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], ProcessRecord::new(1, 0, 867_600, "/sbin/launchd"));
        assert_eq!(records[1].elapsed_secs, 7_833);
        assert_eq!(
            records[2].command_line,
            "/usr/bin/login -flp elle /bin/bash --noprofile"
        );
    }

    #[test]
    fn test_parse_ps_skips_malformed_lines() {
        let stdout = "\
  PID  PPID ELAPSED COMMAND
  abc     1   00:01 bogus
    7     1
    8     1   xx:yy zsh
    9     1   00:05 zsh
   10     1   999999999999999-00:00:00 zsh
";
        let snapshot = parse_ps_output(stdout);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.records()[0].pid, 9);
        assert!(parse_ps_output("").is_empty());
    }

    #[test]
    fn test_parse_lsof_fields() {
        let stdout = "p501\nfcwd\nn/Users/elle/code/gmon\np502\nfcwd\nn/Users/elle/My Projects/app\np503\n";
        let cwds = parse_lsof_fields(stdout);
        assert_eq!(cwds.len(), 2);
        assert_eq!(cwds.get(&501).map(String::as_str), Some("/Users/elle/code/gmon"));
        assert_eq!(cwds.get(&502).map(String::as_str), Some("/Users/elle/My Projects/app"));
        assert!(!cwds.contains_key(&503));
    }

    #[tokio::test]
    async fn test_resolve_empty_pid_set() {
        let resolver = SystemCwdResolver::new();
        let cwds = resolver.resolve(&[]).await.unwrap();
        assert!(cwds.is_empty());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_resolve_own_cwd_via_procfs() {
        let resolver = SystemCwdResolver::new();
        let pid = std::process::id();
        let cwds = resolver.resolve(&[pid, u32::MAX]).await.unwrap();
        let expected = std::env::current_dir().unwrap();
        assert_eq!(cwds.get(&pid).map(String::as_str), expected.to_str());
        assert!(!cwds.contains_key(&u32::MAX));
    }
}
