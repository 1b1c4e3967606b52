use std::collections::{HashSet, VecDeque};

use super::{ProcessRecord, Snapshot};

impl Snapshot {
    /// Direct children of `pid`, in snapshot order
    pub fn children_of(&self, pid: u32) -> Vec<&ProcessRecord> {
        self.records.iter().filter(|p| p.parent_pid == pid).collect()
    }

    /// Full subtree under `pid` in breadth-first discovery order.
    ///
    /// The snapshot is untrusted: a parent/child cycle (or a record listing
    /// itself as its parent) is cut off by refusing to revisit any PID,
    /// including `pid` itself.
    pub fn descendants_of(&self, pid: u32) -> Vec<&ProcessRecord> {
        let mut visited = HashSet::from([pid]);
        let mut queue = VecDeque::from([pid]);
        let mut found = Vec::new();

        while let Some(parent) = queue.pop_front() {
            for child in self.children_of(parent) {
                if visited.insert(child.pid) {
                    found.push(child);
                    queue.push_back(child.pid);
                }
            }
        }

        found
    }
}
