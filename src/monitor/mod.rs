mod discovery;
mod heuristics;
mod ranking;

pub use discovery::SessionDiscovery;
pub use heuristics::StateInferenceEngine;

use std::collections::HashMap;

use crate::config::{ConfigError, MonitorConfig};
use crate::process::{CollectorError, CwdResolver, ProcessSource, Snapshot};
use ranking::{build_views, rank_sessions, ClassifiedSession};

/// What the assistant in a session is doing. Declaration order is display priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ActivityState {
    /// Running a shell command while working
    Active,
    /// Working without a shell command (model call or internal tool)
    Thinking,
    /// Assistant at its prompt
    Waiting,
    /// No assistant in this tab
    #[default]
    Idle,
}

impl ActivityState {
    pub fn label(self) -> &'static str {
        match self {
            ActivityState::Active => "ACTIVE",
            ActivityState::Thinking => "THINKING",
            ActivityState::Waiting => "WAITING",
            ActivityState::Idle => "idle shell",
        }
    }
}

/// Classifier output for one session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Activity {
    pub state: ActivityState,
    /// In-flight shell command, only when active
    pub current_action: Option<String>,
    pub background: Vec<String>,
}

impl Activity {
    pub fn idle() -> Self {
        Self::default()
    }
}

/// Display-ready record for one terminal tab
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub login_pid: u32,
    pub shell_pid: u32,
    pub uptime_secs: u64,
    /// Resolved cwd of the shell, empty when unknown
    pub working_directory: String,
    pub display_name: String,
    pub assistant_uptime_secs: Option<u64>,
    pub assistant_subprocesses: usize,
    pub activity: Activity,
}

impl SessionView {
    pub fn has_assistant(&self) -> bool {
        self.assistant_uptime_secs.is_some()
    }
}

/// Runs one stateless refresh pass: snapshot, discovery, classification,
/// cwd enrichment and ranking.
pub struct Monitor<S, R> {
    source: S,
    resolver: R,
    discovery: SessionDiscovery,
}

impl<S: ProcessSource, R: CwdResolver> Monitor<S, R> {
    pub fn new(source: S, resolver: R, config: &MonitorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            source,
            resolver,
            discovery: SessionDiscovery::new(config)?,
        })
    }

    /// Capture a fresh snapshot and build ranked session views.
    /// Only a failed snapshot is an error; a failed cwd lookup falls back to PID names.
    pub async fn refresh(&self) -> Result<Vec<SessionView>, CollectorError> {
        let snapshot = self.source.capture().await?;
        if snapshot.is_empty() {
            tracing::debug!("process snapshot was empty");
        }
        let classified = self.classify(&snapshot);

        let shell_pids: Vec<u32> = classified.iter().map(|c| c.session.shell_pid).collect();
        let cwds = match self.resolver.resolve(&shell_pids).await {
            Ok(cwds) => cwds,
            Err(e) => {
                tracing::debug!(error = %e, "working directory lookup failed");
                HashMap::new()
            }
        };

        let mut views = build_views(classified, &cwds);
        rank_sessions(&mut views);

        for view in &views {
            tracing::trace!(
                login_pid = view.login_pid,
                shell_pid = view.shell_pid,
                cwd = %view.working_directory,
                state = ?view.activity.state,
                "session"
            );
        }

        tracing::debug!(
            processes = snapshot.len(),
            sessions = views.len(),
            assistants = views.iter().filter(|v| v.has_assistant()).count(),
            "refresh complete"
        );
        Ok(views)
    }

    fn classify(&self, snapshot: &Snapshot) -> Vec<ClassifiedSession> {
        self.discovery
            .discover(snapshot)
            .into_iter()
            .map(|session| {
                let assistant_pid = session.assistant.map(|a| a.pid);
                ClassifiedSession {
                    activity: StateInferenceEngine::classify_session(snapshot, assistant_pid),
                    assistant_subprocesses: assistant_pid
                        .map(|pid| snapshot.descendants_of(pid).len())
                        .unwrap_or(0),
                    session,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessRecord;

    const GHOSTTY: &str = "/Applications/Ghostty.app/Contents/MacOS/ghostty";
    const LOGIN: &str = "/usr/bin/login -flp elle /bin/bash --noprofile -c exec -l /bin/zsh";

    struct FakeSource(Option<Snapshot>);

    impl ProcessSource for FakeSource {
        async fn capture(&self) -> Result<Snapshot, CollectorError> {
            self.0.clone().ok_or_else(|| CollectorError::Spawn {
                command: "ps",
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "ps missing"),
            })
        }
    }

    struct FakeResolver(Option<HashMap<u32, String>>);

    impl CwdResolver for FakeResolver {
        async fn resolve(&self, _pids: &[u32]) -> Result<HashMap<u32, String>, CollectorError> {
            self.0.clone().ok_or_else(|| CollectorError::Spawn {
                command: "lsof",
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "lsof missing"),
            })
        }
    }

    fn three_tabs() -> Snapshot {
        Snapshot::new(vec![
            ProcessRecord::new(1, 0, 90_000, "/sbin/launchd"),
            ProcessRecord::new(10, 1, 80_000, GHOSTTY),
            // waiting claude, oldest tab
            ProcessRecord::new(20, 10, 9_000, LOGIN),
            ProcessRecord::new(21, 20, 9_000, "-zsh"),
            ProcessRecord::new(22, 21, 8_000, "claude"),
            ProcessRecord::new(23, 22, 8_000, "npx -y @modelcontextprotocol/server-memory mcp"),
            // idle shell
            ProcessRecord::new(30, 10, 20_000, LOGIN),
            ProcessRecord::new(31, 30, 20_000, "-zsh"),
            // active claude
            ProcessRecord::new(40, 10, 100, LOGIN),
            ProcessRecord::new(41, 40, 100, "-zsh"),
            ProcessRecord::new(42, 41, 90, "node /usr/local/bin/claude"),
            ProcessRecord::new(43, 42, 5, "caffeinate -i"),
            ProcessRecord::new(
                44,
                42,
                4,
                "/bin/zsh -c -l source /Users/elle/.claude/shell-snapshots/snapshot-zsh-1.sh && eval 'cargo build' < /dev/null",
            ),
            ProcessRecord::new(45, 44, 3, "cargo build"),
        ])
    }

    fn config() -> MonitorConfig {
        MonitorConfig::default()
    }

    #[tokio::test]
    async fn test_refresh_classifies_and_ranks() {
        let cwds = HashMap::from([
            (21, "/Users/elle/code/api".to_string()),
            (41, "/Users/elle/code/gmon".to_string()),
        ]);
        let monitor = Monitor::new(FakeSource(Some(three_tabs())), FakeResolver(Some(cwds)), &config())
            .unwrap();

        let views = monitor.refresh().await.unwrap();
        let summary: Vec<_> = views
            .iter()
            .map(|v| (v.display_name.as_str(), v.activity.state))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("gmon", ActivityState::Active),
                ("api", ActivityState::Waiting),
                ("pid:31", ActivityState::Idle),
            ]
        );

        assert_eq!(views[0].activity.current_action.as_deref(), Some("$ cargo build"));
        assert_eq!(views[0].assistant_subprocesses, 3);
        assert_eq!(views[0].assistant_uptime_secs, Some(90));
        assert!(views[1].activity.background.is_empty());
        assert!(!views[2].has_assistant());
        assert_eq!(views[2].activity, Activity::idle());
    }

    #[tokio::test]
    async fn test_refresh_survives_cwd_failure() {
        let monitor =
            Monitor::new(FakeSource(Some(three_tabs())), FakeResolver(None), &config()).unwrap();
        let views = monitor.refresh().await.unwrap();
        assert_eq!(views.len(), 3);
        assert!(views.iter().all(|v| v.display_name.starts_with("pid:")));
    }

    #[tokio::test]
    async fn test_refresh_reports_snapshot_failure() {
        let monitor =
            Monitor::new(FakeSource(None), FakeResolver(Some(HashMap::new())), &config()).unwrap();
        assert!(monitor.refresh().await.is_err());
    }

    #[tokio::test]
    async fn test_refresh_without_app_is_empty() {
        let snapshot = Snapshot::new(vec![ProcessRecord::new(1, 0, 10, "/sbin/launchd")]);
        let monitor =
            Monitor::new(FakeSource(Some(snapshot)), FakeResolver(Some(HashMap::new())), &config())
                .unwrap();
        assert!(monitor.refresh().await.unwrap().is_empty());
    }

    #[test]
    fn test_state_priority_order() {
        assert!(ActivityState::Active < ActivityState::Thinking);
        assert!(ActivityState::Thinking < ActivityState::Waiting);
        assert!(ActivityState::Waiting < ActivityState::Idle);
        assert_eq!(ActivityState::Idle.label(), "idle shell");
    }
}
