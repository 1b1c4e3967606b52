use regex::Regex;

use crate::config::{ConfigError, MonitorConfig};
use crate::process::{ProcessRecord, Snapshot};

/// Parent PIDs that mark a process as started by the OS itself
const ROOT_PARENTS: [u32; 2] = [0, 1];

/// Assistant process found directly under a session's shell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssistantProcess {
    pub pid: u32,
    pub uptime_secs: u64,
}

/// One terminal tab located in the process tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredSession {
    pub login_pid: u32,
    pub shell_pid: u32,
    /// Elapsed time of the login wrapper
    pub uptime_secs: u64,
    pub assistant: Option<AssistantProcess>,
}

/// Locates terminal tabs and their assistant processes in a snapshot
#[derive(Debug, Clone)]
pub struct SessionDiscovery {
    app_marker: String,
    login_marker: String,
    shell_names: Vec<String>,
    assistant_pattern: Regex,
    assistant_exclude: String,
}

impl SessionDiscovery {
    pub fn new(config: &MonitorConfig) -> Result<Self, ConfigError> {
        let token = config.assistant_token.trim();
        let assistant_pattern = Regex::new(&format!(r"\b{}\b", regex::escape(token))).map_err(
            |source| ConfigError::Pattern {
                token: token.to_string(),
                source,
            },
        )?;

        Ok(Self {
            app_marker: config.app_marker.clone(),
            login_marker: config.login_marker.clone(),
            shell_names: config.shell_names.clone(),
            assistant_pattern,
            assistant_exclude: config.assistant_exclude.clone(),
        })
    }

    /// Terminal application process started directly by the OS
    pub fn find_app_root<'a>(&self, snapshot: &'a Snapshot) -> Option<&'a ProcessRecord> {
        snapshot.records().iter().find(|p| {
            p.command_line.contains(&self.app_marker) && ROOT_PARENTS.contains(&p.parent_pid)
        })
    }

    /// All sessions under the terminal application, in snapshot order.
    /// A missing application yields no sessions.
    pub fn discover(&self, snapshot: &Snapshot) -> Vec<DiscoveredSession> {
        let Some(root) = self.find_app_root(snapshot) else {
            tracing::debug!(marker = %self.app_marker, "terminal application not running");
            return Vec::new();
        };

        snapshot
            .children_of(root.pid)
            .into_iter()
            .filter(|p| p.command_line.contains(&self.login_marker))
            .filter_map(|login| self.session_for_login(snapshot, login))
            .collect()
    }

    fn session_for_login(
        &self,
        snapshot: &Snapshot,
        login: &ProcessRecord,
    ) -> Option<DiscoveredSession> {
        let Some(shell) = snapshot
            .children_of(login.pid)
            .into_iter()
            .find(|p| self.is_shell(&p.command_line))
        else {
            tracing::trace!(login_pid = login.pid, "login without a shell yet");
            return None;
        };

        let assistant = snapshot
            .children_of(shell.pid)
            .into_iter()
            .find(|p| self.is_assistant(&p.command_line))
            .map(|p| AssistantProcess {
                pid: p.pid,
                uptime_secs: p.elapsed_secs,
            });

        Some(DiscoveredSession {
            login_pid: login.pid,
            shell_pid: shell.pid,
            uptime_secs: login.elapsed_secs,
            assistant,
        })
    }

    fn is_shell(&self, cmd: &str) -> bool {
        cmd.starts_with('-') || self.shell_names.iter().any(|name| cmd.contains(name.as_str()))
    }

    fn is_assistant(&self, cmd: &str) -> bool {
        self.assistant_pattern.is_match(cmd) && !cmd.contains(&self.assistant_exclude)
    }
}
