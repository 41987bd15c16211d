//! Opaque serialized model states for the undo history and autosave.

use std::path::Path;

use sf_graph::Graph;

use crate::ProjectResult;
use crate::schema::{ModelFile, SolverDef};

/// A captured model state: canonical JSON bytes of a [`ModelFile`].
///
/// Byte equality of two snapshots of the same model holds because the
/// graph's arenas serialize in id order. The history compares bytes first
/// and falls back to [`Snapshot::structural_form`], which ignores the view
/// state (bookmarks) that deliberately survives an undo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    bytes: Vec<u8>,
}

impl Snapshot {
    pub fn capture(graph: &Graph, solver: SolverDef) -> ProjectResult<Self> {
        let file = ModelFile::from_graph(graph, solver);
        Ok(Snapshot {
            bytes: serde_json::to_vec(&file)?,
        })
    }

    /// Replace `graph` with the snapshotted model; returns the solver
    /// parameters that were captured with it.
    pub fn restore(&self, graph: &mut Graph) -> ProjectResult<SolverDef> {
        let file: ModelFile = serde_json::from_slice(&self.bytes)?;
        file.populate(graph)?;
        Ok(file.solver)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Pretty text form with bookmarks stripped, for the history's
    /// semantic comparison. Item positions and wire routing stay: moving
    /// things around is a model edit and must be undoable.
    pub fn structural_form(&self) -> ProjectResult<String> {
        let mut file: ModelFile = serde_json::from_slice(&self.bytes)?;
        file.bookmarks.clear();
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, &self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sf_graph::{Bookmark, OpKind, VarKind, value_id};

    fn one_var_graph() -> Graph {
        let mut g = Graph::new();
        g.add_variable(&value_id(None, "a"), VarKind::Parameter, "2");
        g
    }

    #[test]
    fn capture_restore_capture_is_stable() {
        let g = one_var_graph();
        let snap = Snapshot::capture(&g, SolverDef::default()).unwrap();
        let mut restored = Graph::new();
        let solver = snap.restore(&mut restored).unwrap();
        assert_eq!(solver, SolverDef::default());
        let again = Snapshot::capture(&restored, SolverDef::default()).unwrap();
        assert_eq!(snap, again);
    }

    #[test]
    fn bookmark_changes_share_a_structural_form() {
        let mut g = one_var_graph();
        let before = Snapshot::capture(&g, SolverDef::default()).unwrap();

        g.bookmarks.push(Bookmark {
            name: "here".to_string(),
            x: 1.0,
            y: 2.0,
            zoom: 2.0,
        });
        let after = Snapshot::capture(&g, SolverDef::default()).unwrap();

        assert_ne!(before, after);
        assert_eq!(
            before.structural_form().unwrap(),
            after.structural_form().unwrap()
        );
    }

    #[test]
    fn moving_an_item_changes_the_structural_form() {
        let mut g = one_var_graph();
        let before = Snapshot::capture(&g, SolverDef::default()).unwrap();

        let id = g.items().next().unwrap().id;
        g.move_item(id, 150.0, -40.0).unwrap();
        let after = Snapshot::capture(&g, SolverDef::default()).unwrap();

        assert_ne!(
            before.structural_form().unwrap(),
            after.structural_form().unwrap()
        );
    }

    #[test]
    fn topology_changes_differ_structurally() {
        let g = one_var_graph();
        let before = Snapshot::capture(&g, SolverDef::default()).unwrap();
        let mut g2 = g.clone();
        g2.add_op(OpKind::Time);
        let after = Snapshot::capture(&g2, SolverDef::default()).unwrap();
        assert_ne!(
            before.structural_form().unwrap(),
            after.structural_form().unwrap()
        );
    }
}
