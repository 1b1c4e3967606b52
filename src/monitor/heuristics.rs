use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Activity, ActivityState};
use crate::process::{ProcessRecord, Snapshot};

/// Longest embedded command shown before truncation
const MAX_LABEL_CHARS: usize = 30;
/// Characters kept from a truncated command
const TRUNCATED_LABEL_CHARS: usize = 27;
const ELLIPSIS: &str = "...";
const PROMPT_MARKER: &str = "$ ";

/// A shell started non-interactively with `-c`, possibly after other short flags
static RE_SHELL_EXEC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|/)(?:zsh|bash|sh)\s+(?:-[A-Za-z]+\s+)*-c(?:\s|$)").unwrap()
});

static RE_SNAPSHOT_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"shell-snapshot").unwrap());

static RE_EVAL_SINGLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"eval '(.+?)'").unwrap());

static RE_EVAL_DOUBLE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"eval "(.+?)""#).unwrap());

/// How a direct child of the assistant counts toward its activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildKind {
    /// Long-lived service (MCP servers and friends), ignored entirely
    AlwaysOn,
    /// Sleep-prevention helper held while the assistant is working
    KeepAwake,
    /// Subshell running one Bash tool invocation
    ShellSnapshot,
    /// Anything else, shown as a background label
    Other,
}

struct ChildRule {
    kind: ChildKind,
    matches: fn(&str) -> bool,
}

/// Ordered rule table; the first matching rule decides the kind
static CHILD_RULES: &[ChildRule] = &[
    ChildRule {
        kind: ChildKind::AlwaysOn,
        matches: is_always_on,
    },
    ChildRule {
        kind: ChildKind::KeepAwake,
        matches: is_keep_awake,
    },
    ChildRule {
        kind: ChildKind::ShellSnapshot,
        matches: is_shell_snapshot,
    },
];

fn is_always_on(cmd: &str) -> bool {
    cmd.to_lowercase().contains("mcp") || cmd.contains("@playwright") || cmd.contains("@supabase")
}

fn is_keep_awake(cmd: &str) -> bool {
    cmd.to_lowercase().contains("caffeinate")
}

fn is_shell_snapshot(cmd: &str) -> bool {
    RE_SHELL_EXEC.is_match(cmd) && RE_SNAPSHOT_REF.is_match(cmd)
}

/// Engine for inferring assistant activity from its child processes
pub struct StateInferenceEngine;

impl StateInferenceEngine {
    /// Assign a child command line to its rule group
    pub fn child_kind(cmd: &str) -> ChildKind {
        CHILD_RULES
            .iter()
            .find(|rule| (rule.matches)(cmd))
            .map(|rule| rule.kind)
            .unwrap_or(ChildKind::Other)
    }

    /// Classify a session from the assistant's direct children at this instant.
    /// `None` means the session has no assistant and is idle.
    pub fn classify_session(snapshot: &Snapshot, assistant_pid: Option<u32>) -> Activity {
        match assistant_pid {
            Some(pid) => Self::analyze(&snapshot.children_of(pid)),
            None => Activity::idle(),
        }
    }

    /// Pure classification over the assistant's direct children
    pub fn analyze(children: &[&ProcessRecord]) -> Activity {
        let mut has_keep_awake = false;
        let mut shell_snapshots: Vec<&ProcessRecord> = Vec::new();
        let mut other_children: Vec<&ProcessRecord> = Vec::new();

        for child in children.iter().copied() {
            match Self::child_kind(&child.command_line) {
                ChildKind::AlwaysOn => {}
                ChildKind::KeepAwake => has_keep_awake = true,
                ChildKind::ShellSnapshot => shell_snapshots.push(child),
                ChildKind::Other => other_children.push(child),
            }
        }

        let other_labels = other_children.iter().map(|c| process_label(&c.command_line));

        match (has_keep_awake, shell_snapshots.is_empty()) {
            (true, false) => {
                // Newest (smallest elapsed) is in flight; the rest are leftover servers.
                // Stable sort keeps discovery order among equal elapsed times.
                shell_snapshots.sort_by_key(|s| s.elapsed_secs);
                let newest = shell_snapshots.remove(0);
                Activity {
                    state: ActivityState::Active,
                    current_action: Some(format!(
                        "{PROMPT_MARKER}{}",
                        snapshot_label(&newest.command_line)
                    )),
                    background: shell_snapshots
                        .iter()
                        .map(|s| snapshot_label(&s.command_line))
                        .chain(other_labels)
                        .collect(),
                }
            }
            (false, false) => Activity {
                state: ActivityState::Waiting,
                current_action: None,
                background: shell_snapshots
                    .iter()
                    .map(|s| snapshot_label(&s.command_line))
                    .chain(other_labels)
                    .collect(),
            },
            (true, true) => Activity {
                state: ActivityState::Thinking,
                current_action: None,
                background: other_labels.collect(),
            },
            (false, true) => Activity {
                state: ActivityState::Waiting,
                current_action: None,
                background: other_labels.collect(),
            },
        }
    }
}

/// Extract the user-facing command embedded in a shell-snapshot invocation
pub fn extract_shell_command(cmd: &str) -> Option<String> {
    let captured = RE_EVAL_SINGLE
        .captures(cmd)
        .or_else(|| RE_EVAL_DOUBLE.captures(cmd))?
        .get(1)?
        .as_str();

    if captured.chars().count() > MAX_LABEL_CHARS {
        let head: String = captured.chars().take(TRUNCATED_LABEL_CHARS).collect();
        Some(format!("{head}{ELLIPSIS}"))
    } else {
        Some(captured.to_string())
    }
}

fn snapshot_label(cmd: &str) -> String {
    extract_shell_command(cmd).unwrap_or_else(|| ELLIPSIS.to_string())
}

/// Executable base name of a command line
pub fn process_label(cmd: &str) -> String {
    match cmd.split_whitespace().next() {
        Some(program) => Path::new(program)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.to_string()),
        None => cmd.to_string(),
    }
}
