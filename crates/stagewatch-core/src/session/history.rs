//! Per-node execution history.
//!
//! `HistoryLog` is an append-only trace of pipeline nodes. Entries are never
//! mutated once appended, and a run of consecutive updates for the same node
//! collapses into the first entry of that run.

use serde::{Deserialize, Serialize};

/// One recorded node execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeHistoryEntry {
    pub node: String,
    pub detail: String,
    /// Timestamp reported by the backend (ISO 8601), or the local receipt time
    pub timestamp: String,
}

impl NodeHistoryEntry {
    pub fn new(
        node: impl Into<String>,
        detail: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            node: node.into(),
            detail: detail.into(),
            timestamp: timestamp.into(),
        }
    }
}

/// Display state of a node in the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Active,
    Completed,
    /// The node never appeared in the trace
    Unknown,
}

/// Result of `HistoryLog::append`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// The previous entry already names this node; nothing was written
    Absorbed,
}

/// Append-only, de-duplicated trace of node executions plus the transient
/// "currently active" marker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryLog {
    entries: Vec<NodeHistoryEntry>,
    active: Option<String>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[NodeHistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&NodeHistoryEntry> {
        self.entries.last()
    }

    /// The single node currently marked active, if any.
    pub fn active_node(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Appends an entry unless the immediately preceding entry names the same node.
    ///
    /// The existing entry keeps its original detail when the update is absorbed.
    pub fn append(&mut self, entry: NodeHistoryEntry) -> AppendOutcome {
        if self.last().is_some_and(|last| last.node == entry.node) {
            return AppendOutcome::Absorbed;
        }
        self.entries.push(entry);
        AppendOutcome::Appended
    }

    /// Marks `node` as the active node, implicitly completing the previous one.
    ///
    /// Returns the node that lost its active marker, if it differs from `node`.
    pub fn mark_active(&mut self, node: impl Into<String>) -> Option<String> {
        let node = node.into();
        match self.active.replace(node.clone()) {
            Some(previous) if previous != node => Some(previous),
            _ => None,
        }
    }

    /// Clears the active marker so every node reads as completed.
    pub fn complete_all(&mut self) {
        self.active = None;
    }

    pub fn node_state(&self, node: &str) -> NodeState {
        if self.active.as_deref() == Some(node) {
            NodeState::Active
        } else if self.entries.iter().any(|entry| entry.node == node) {
            NodeState::Completed
        } else {
            NodeState::Unknown
        }
    }

    /// Merges a snapshot's full history with entries already received from the stream.
    ///
    /// The snapshot may be older than the stream, newer than it, or span a
    /// disconnect gap the stream never reported. Both sides are aligned on
    /// their longest common run of nodes, then the parts before and after
    /// that run are aligned the same way. Unmatched snapshot entries are
    /// placed ahead of unmatched streamed ones. Streamed entries are always
    /// kept, in order and untouched; matched snapshot entries are dropped.
    ///
    /// Returns the number of entries added.
    pub fn backfill(&mut self, snapshot_entries: Vec<NodeHistoryEntry>) -> usize {
        if snapshot_entries.is_empty() {
            return 0;
        }
        let before = self.entries.len();
        let streamed = std::mem::take(&mut self.entries);

        let mut aligned = Vec::with_capacity(snapshot_entries.len() + streamed.len());
        align(&snapshot_entries, &streamed, &mut aligned);

        let mut merged: Vec<(NodeHistoryEntry, Origin)> = Vec::with_capacity(aligned.len());
        for (entry, origin) in aligned {
            let seam = merged
                .last()
                .filter(|(last, _)| last.node == entry.node)
                .map(|(_, last_origin)| *last_origin);
            match (seam, origin) {
                // A streamed entry replaces an adjacent snapshot entry for the same node.
                (Some(Origin::Snapshot), Origin::Stream) => {
                    merged.pop();
                    merged.push((entry.clone(), origin));
                }
                (Some(_), Origin::Snapshot) => {}
                _ => merged.push((entry.clone(), origin)),
            }
        }

        self.entries = merged.into_iter().map(|(entry, _)| entry).collect();
        self.entries.len().saturating_sub(before)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Snapshot,
    Stream,
}

/// Recursive longest-common-run alignment of snapshot and streamed entries.
fn align<'a>(
    snapshot: &'a [NodeHistoryEntry],
    streamed: &'a [NodeHistoryEntry],
    out: &mut Vec<(&'a NodeHistoryEntry, Origin)>,
) {
    let Some((i, j, len)) = longest_common_run(snapshot, streamed) else {
        out.extend(snapshot.iter().map(|e| (e, Origin::Snapshot)));
        out.extend(streamed.iter().map(|e| (e, Origin::Stream)));
        return;
    };
    align(&snapshot[..i], &streamed[..j], out);
    out.extend(streamed[j..j + len].iter().map(|e| (e, Origin::Stream)));
    align(&snapshot[i + len..], &streamed[j + len..], out);
}

/// Longest run of equal nodes, as `(snapshot_start, streamed_start, len)`.
/// Ties go to the earliest snapshot position.
fn longest_common_run(
    snapshot: &[NodeHistoryEntry],
    streamed: &[NodeHistoryEntry],
) -> Option<(usize, usize, usize)> {
    let mut best: Option<(usize, usize, usize)> = None;
    for i in 0..snapshot.len() {
        for j in 0..streamed.len() {
            let len = snapshot[i..]
                .iter()
                .zip(&streamed[j..])
                .take_while(|(a, b)| a.node == b.node)
                .count();
            if len > best.map_or(0, |(_, _, best_len)| best_len) {
                best = Some((i, j, len));
            }
        }
    }
    best
}
