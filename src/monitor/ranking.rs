use std::cmp::Reverse;
use std::collections::HashMap;
use std::path::Path;

use super::discovery::DiscoveredSession;
use super::{Activity, SessionView};

/// Classified session waiting for cwd enrichment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedSession {
    pub session: DiscoveredSession,
    pub activity: Activity,
    /// Size of the assistant's process subtree
    pub assistant_subprocesses: usize,
}

/// Last path component of a directory, ignoring trailing separators
pub fn display_name(working_directory: &str, shell_pid: u32) -> String {
    Path::new(working_directory)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| {
            if working_directory.is_empty() {
                format!("pid:{shell_pid}")
            } else {
                working_directory.to_string()
            }
        })
}

/// Merge classification with resolved working directories
pub fn build_views(
    sessions: Vec<ClassifiedSession>,
    cwds: &HashMap<u32, String>,
) -> Vec<SessionView> {
    sessions
        .into_iter()
        .map(|classified| {
            let session = classified.session;
            let working_directory = cwds.get(&session.shell_pid).cloned().unwrap_or_default();
            SessionView {
                login_pid: session.login_pid,
                shell_pid: session.shell_pid,
                uptime_secs: session.uptime_secs,
                display_name: display_name(&working_directory, session.shell_pid),
                working_directory,
                assistant_uptime_secs: session.assistant.map(|a| a.uptime_secs),
                assistant_subprocesses: classified.assistant_subprocesses,
                activity: classified.activity,
            }
        })
        .collect()
}

/// Order by state priority, then longest-running first
pub fn rank_sessions(views: &mut [SessionView]) {
    views.sort_by_key(|v| (v.activity.state, Reverse(v.uptime_secs)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::discovery::AssistantProcess;
    use crate::monitor::ActivityState;

    fn view(state: ActivityState, uptime_secs: u64) -> SessionView {
        SessionView {
            login_pid: 1,
            shell_pid: 2,
            uptime_secs,
            working_directory: String::new(),
            display_name: "pid:2".to_string(),
            assistant_uptime_secs: None,
            assistant_subprocesses: 0,
            activity: Activity {
                state,
                current_action: None,
                background: Vec::new(),
            },
        }
    }

    #[test]
    fn test_rank_by_state_then_uptime() {
        let mut views = vec![
            view(ActivityState::Thinking, 100),
            view(ActivityState::Active, 10),
            view(ActivityState::Idle, 500),
            view(ActivityState::Active, 50),
        ];
        rank_sessions(&mut views);
        let order: Vec<_> = views
            .iter()
            .map(|v| (v.activity.state, v.uptime_secs))
            .collect();
        assert_eq!(
            order,
            vec![
                (ActivityState::Active, 50),
                (ActivityState::Active, 10),
                (ActivityState::Thinking, 100),
                (ActivityState::Idle, 500),
            ]
        );
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("/Users/elle/code/gmon", 7), "gmon");
        assert_eq!(display_name("/Users/elle/code/gmon/", 7), "gmon");
        assert_eq!(display_name("", 7), "pid:7");
        assert_eq!(display_name("/", 7), "/");
    }

    #[test]
    fn test_build_views_enriches_with_cwd() {
        let sessions = vec![
            ClassifiedSession {
                session: DiscoveredSession {
                    login_pid: 20,
                    shell_pid: 21,
                    uptime_secs: 7_200,
                    assistant: Some(AssistantProcess {
                        pid: 22,
                        uptime_secs: 3_600,
                    }),
                },
                activity: Activity {
                    state: ActivityState::Thinking,
                    current_action: None,
                    background: Vec::new(),
                },
                assistant_subprocesses: 3,
            },
            ClassifiedSession {
                session: DiscoveredSession {
                    login_pid: 30,
                    shell_pid: 31,
                    uptime_secs: 60,
                    assistant: None,
                },
                activity: Activity::idle(),
                assistant_subprocesses: 0,
            },
        ];
        let cwds = HashMap::from([(21, "/Users/elle/code/api".to_string())]);

        let views = build_views(sessions, &cwds);
        assert_eq!(views[0].display_name, "api");
        assert_eq!(views[0].working_directory, "/Users/elle/code/api");
        assert!(views[0].has_assistant());
        assert_eq!(views[0].assistant_uptime_secs, Some(3_600));
        assert_eq!(views[1].display_name, "pid:31");
        assert_eq!(views[1].working_directory, "");
        assert!(!views[1].has_assistant());
    }
}
