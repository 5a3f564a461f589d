use crate::model::GraphBuffer;
use crate::remap::IdMapping;

/// Manages the Undo/Redo history of the graph buffer.
///
/// This implementation uses a simple Full State Snapshot approach: a bounded list of
/// (nodes, edges) copies plus a cursor pointing at the snapshot matching the live
/// buffer. The list is never empty, so the cursor is always a valid index.
#[derive(Clone, Debug)]
pub struct HistoryManager {
    snapshots: Vec<GraphBuffer>,
    cursor: usize,
    pub max_history: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(50, GraphBuffer::default())
    }
}

impl HistoryManager {
    /// Creates a HistoryManager with a specified limit, seeded with `initial`.
    pub fn new(max_history: usize, initial: GraphBuffer) -> Self {
        let mut snapshots = Vec::with_capacity(max_history.max(1));
        snapshots.push(initial);
        Self {
            snapshots,
            cursor: 0,
            max_history: max_history.max(1),
        }
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// The snapshot at the cursor.
    pub fn current(&self) -> &GraphBuffer {
        &self.snapshots[self.cursor]
    }

    /// Records `state` as the newest snapshot.
    ///
    /// No-op if it equals the snapshot at the cursor. Any redo branch is discarded,
    /// and the oldest snapshot is evicted once the bound is exceeded.
    /// Returns true if a snapshot was recorded.
    pub fn push_snapshot(&mut self, state: &GraphBuffer) -> bool {
        if self.current() == state {
            return false;
        }
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(state.clone());
        if self.snapshots.len() > self.max_history {
            self.snapshots.remove(0); // Drop oldest
        }
        self.cursor = self.snapshots.len() - 1;
        true
    }

    /// Moves the cursor back one step and returns the snapshot to restore.
    pub fn undo(&mut self) -> Option<&GraphBuffer> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(&self.snapshots[self.cursor])
    }

    /// Moves the cursor forward one step and returns the snapshot to restore.
    pub fn redo(&mut self) -> Option<&GraphBuffer> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(&self.snapshots[self.cursor])
    }

    /// Collapses the history to a single snapshot.
    pub fn reset(&mut self, state: &GraphBuffer) {
        self.snapshots.clear();
        self.snapshots.push(state.clone());
        self.cursor = 0;
    }

    /// Rewrites node ids in every snapshot so time travel never resurrects temporary ids.
    pub fn remap(&mut self, mapping: &IdMapping) {
        if mapping.is_empty() {
            return;
        }
        for snapshot in &mut self.snapshots {
            mapping.apply_to_buffer(snapshot);
        }
    }
}
