mod system;
mod tree;

pub use system::{PsProcessSource, SystemCwdResolver};

use std::collections::HashMap;
use std::future::Future;

use thiserror::Error;

/// One row of the OS process table, captured at a single instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    pub pid: u32,
    pub parent_pid: u32,
    pub elapsed_secs: u64,
    pub command_line: String,
}

impl ProcessRecord {
    pub fn new(pid: u32, parent_pid: u32, elapsed_secs: u64, command_line: impl Into<String>) -> Self {
        Self {
            pid,
            parent_pid,
            elapsed_secs,
            command_line: command_line.into(),
        }
    }
}

/// Immutable point-in-time process table. Built fresh for every refresh pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    records: Vec<ProcessRecord>,
}

impl Snapshot {
    pub fn new(records: Vec<ProcessRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[ProcessRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Failure of an OS collaborator command
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} exited with {status}: {stderr}")]
    Failed {
        command: &'static str,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Source of process-table snapshots
pub trait ProcessSource {
    fn capture(&self) -> impl Future<Output = Result<Snapshot, CollectorError>> + Send;
}

/// Batched, best-effort working directory lookup. PIDs that cannot be
/// resolved are absent from the returned map.
pub trait CwdResolver {
    fn resolve(
        &self,
        pids: &[u32],
    ) -> impl Future<Output = Result<HashMap<u32, String>, CollectorError>> + Send;
}
