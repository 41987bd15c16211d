//! Bounded undo/redo history of model snapshots.

use std::collections::VecDeque;

use sf_core::Real;
use sf_graph::{Graph, ValueId};
use sf_project::{Snapshot, SolverDef};
use tracing::debug;

use crate::error::AppResult;

pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Snapshot stack with a movable cursor.
///
/// `ptr == entries.len()` means the cursor is at the head (the live model
/// is newer than, or equal to, the top entry). After an undo the cursor
/// sits on the restored entry: the live state is `entries[ptr - 1]`.
pub struct History {
    entries: VecDeque<Snapshot>,
    ptr: usize,
    max_depth: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_depth(DEFAULT_MAX_DEPTH)
    }
}

impl History {
    pub fn with_depth(max_depth: usize) -> Self {
        History {
            entries: VecDeque::new(),
            ptr: 0,
            max_depth: max_depth.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn position(&self) -> usize {
        self.ptr
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.ptr = 0;
    }

    /// Record the current state if it differs semantically from the entry
    /// under the cursor. Returns whether an entry was added. After an undo
    /// the comparison runs against the restored entry, so re-pushing the
    /// restored state is a no-op while a genuine edit is recorded (and
    /// drops the redoable tail above the cursor).
    pub fn push(&mut self, graph: &Graph, solver: SolverDef) -> AppResult<bool> {
        let snap = Snapshot::capture(graph, solver)?;
        if self.ptr > 0 && self.same_state(&self.entries[self.ptr - 1], &snap)? {
            return Ok(false);
        }
        self.entries.truncate(self.ptr);
        self.entries.push_back(snap);
        while self.entries.len() > self.max_depth {
            self.entries.pop_front();
        }
        self.ptr = self.entries.len();
        debug!(depth = self.entries.len(), "history entry pushed");
        Ok(true)
    }

    fn same_state(&self, entry: &Snapshot, snap: &Snapshot) -> AppResult<bool> {
        if entry.bytes() == snap.bytes() {
            return Ok(true);
        }
        // bytes differ; bookmark-only changes still compare equal here
        Ok(entry.structural_form()? == snap.structural_form()?)
    }

    /// Move the cursor `n` entries back (negative `n` moves forward, i.e.
    /// redo) and restore that state into `graph` and `solver`. A cursor
    /// that would land out of range reverts; nothing is restored. Returns
    /// the cursor position.
    pub fn undo(
        &mut self,
        graph: &mut Graph,
        solver: &mut SolverDef,
        n: i32,
    ) -> AppResult<usize> {
        if n > 0 && self.ptr == self.entries.len() {
            // stash the working state so a later redo can come back to it
            self.push(graph, solver.clone())?;
        }
        let target = self.ptr as i64 - n as i64;
        if target < 1 || target as usize > self.entries.len() {
            debug!(target, "undo target out of range, cursor unchanged");
            return Ok(self.ptr);
        }
        self.ptr = target as usize;
        self.restore(self.ptr - 1, graph, solver)?;
        Ok(self.ptr)
    }

    pub fn redo(
        &mut self,
        graph: &mut Graph,
        solver: &mut SolverDef,
        n: i32,
    ) -> AppResult<usize> {
        // saturating: -i32::MIN has no i32 representation
        self.undo(graph, solver, n.saturating_neg())
    }

    fn restore(&mut self, idx: usize, graph: &mut Graph, solver: &mut SolverDef) -> AppResult<()> {
        // bookmarks and displayed values survive time travel
        let bookmarks = std::mem::take(&mut graph.bookmarks);
        let cached: Vec<(ValueId, Real)> = graph
            .values
            .iter()
            .map(|(id, v)| (id.clone(), v.value))
            .collect();
        *solver = self.entries[idx].restore(graph)?;
        graph.bookmarks = bookmarks;
        for (id, value) in cached {
            if let Some(v) = graph.values.get_mut(&id) {
                v.value = value;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sf_graph::{OpKind, VarKind, value_id};

    fn solver() -> SolverDef {
        SolverDef::default()
    }

    #[test]
    fn push_undo_redo_round_trip() {
        let mut g = Graph::new();
        let mut s = solver();
        let mut h = History::default();

        h.push(&g, s.clone()).unwrap();
        g.add_variable(&value_id(None, "a"), VarKind::Parameter, "1");
        assert!(h.push(&g, s.clone()).unwrap());
        g.add_op(OpKind::Time);
        assert!(h.push(&g, s.clone()).unwrap());
        assert_eq!(g.item_count(), 2);

        h.undo(&mut g, &mut s, 1).unwrap();
        assert_eq!(g.item_count(), 1);
        h.undo(&mut g, &mut s, 1).unwrap();
        assert_eq!(g.item_count(), 0);

        h.redo(&mut g, &mut s, 2).unwrap();
        assert_eq!(g.item_count(), 2);
    }

    #[test]
    fn identical_state_does_not_push() {
        let mut g = Graph::new();
        g.add_op(OpKind::Time);
        let mut h = History::default();
        assert!(h.push(&g, solver()).unwrap());
        assert!(!h.push(&g, solver()).unwrap());
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn moving_an_item_is_undoable() {
        let mut g = Graph::new();
        let mut s = solver();
        let item = g.add_op(OpKind::Time);
        let mut h = History::default();
        h.push(&g, s.clone()).unwrap();
        g.move_item(item, 300.0, 12.0).unwrap();
        assert!(h.push(&g, s.clone()).unwrap());

        h.undo(&mut g, &mut s, 1).unwrap();
        assert_eq!(g.item(item).unwrap().x, 0.0);
        assert_eq!(g.item(item).unwrap().y, 0.0);
    }

    #[test]
    fn bookmark_only_change_does_not_push() {
        let mut g = Graph::new();
        g.add_op(OpKind::Time);
        let mut h = History::default();
        h.push(&g, solver()).unwrap();
        g.bookmarks.push(sf_graph::Bookmark {
            name: "view".to_string(),
            x: 5.0,
            y: 5.0,
            zoom: 2.0,
        });
        assert!(!h.push(&g, solver()).unwrap());
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn depth_is_bounded() {
        let mut g = Graph::new();
        let mut h = History::with_depth(5);
        for i in 0..20 {
            g.add_variable(&value_id(None, &format!("v{i}")), VarKind::Parameter, "0");
            h.push(&g, solver()).unwrap();
        }
        assert_eq!(h.len(), 5);
    }

    #[test]
    fn out_of_range_undo_reverts_cursor() {
        let mut g = Graph::new();
        let mut s = solver();
        let mut h = History::default();
        g.add_op(OpKind::Time);
        h.push(&g, s.clone()).unwrap();

        let before = h.position();
        let after = h.undo(&mut g, &mut s, 50).unwrap();
        assert_eq!(before, after);
        assert_eq!(g.item_count(), 1, "nothing was restored");
    }

    #[test]
    fn repushing_the_restored_state_records_nothing() {
        let mut g = Graph::new();
        let mut s = solver();
        let mut h = History::default();
        h.push(&g, s.clone()).unwrap();
        g.add_op(OpKind::Time);
        h.push(&g, s.clone()).unwrap();

        h.undo(&mut g, &mut s, 1).unwrap();
        let len = h.len();
        assert!(!h.push(&g, s.clone()).unwrap());
        assert_eq!(h.len(), len);
    }

    #[test]
    fn edit_after_undo_is_recorded() {
        let mut g = Graph::new();
        let mut s = solver();
        let mut h = History::default();

        g.add_op(OpKind::Time);
        h.push(&g, s.clone()).unwrap();
        g.add_op(OpKind::Neg);
        h.push(&g, s.clone()).unwrap();

        h.undo(&mut g, &mut s, 1).unwrap();
        assert_eq!(g.item_count(), 1);

        // a genuine edit right after the undo must land in the history,
        // replacing the redoable tail
        g.add_op(OpKind::Sqrt);
        assert!(h.push(&g, s.clone()).unwrap());
        assert_eq!(h.len(), 2);

        h.undo(&mut g, &mut s, 1).unwrap();
        assert_eq!(g.item_count(), 1);
        let kind = &g.items().next().unwrap().kind;
        assert!(matches!(kind, sf_graph::ItemKind::Op(OpKind::Time)));
    }

    #[test]
    fn redo_of_extreme_count_reverts_harmlessly() {
        let mut g = Graph::new();
        let mut s = solver();
        let mut h = History::default();
        g.add_op(OpKind::Time);
        h.push(&g, s.clone()).unwrap();

        let before = h.position();
        let after = h.redo(&mut g, &mut s, i32::MIN).unwrap();
        assert_eq!(before, after);
        assert_eq!(g.item_count(), 1);
    }

    #[test]
    fn bookmarks_survive_undo() {
        let mut g = Graph::new();
        let mut s = solver();
        let mut h = History::default();
        h.push(&g, s.clone()).unwrap();
        g.add_op(OpKind::Time);
        h.push(&g, s.clone()).unwrap();

        g.bookmarks.push(sf_graph::Bookmark {
            name: "kept".to_string(),
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        });
        h.undo(&mut g, &mut s, 1).unwrap();
        assert_eq!(g.bookmarks.len(), 1);
        assert_eq!(g.bookmarks[0].name, "kept");
    }
}
