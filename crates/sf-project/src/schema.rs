//! Model file schema (current version) and graph conversion.

use serde::{Deserialize, Serialize};
use sf_core::{Id, Real};
use sf_graph::{Bookmark, GodleyTable, Graph, ItemKind, OpKind, VarKind};

use crate::{ProjectError, ProjectResult};

pub const SCHEMA_VERSION: u32 = 3;

/// On-disk form of a model. Item and port ids are the graph's own stable
/// indices, so a snapshot restores to an identical graph and a second
/// capture yields identical bytes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelFile {
    pub version: u32,
    #[serde(default)]
    pub solver: SolverDef,
    #[serde(default)]
    pub items: Vec<ItemDef>,
    #[serde(default)]
    pub wires: Vec<WireDef>,
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
}

/// Fixed-step solver parameters carried in the file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolverDef {
    pub t0: Real,
    pub step: Real,
    pub n_steps: usize,
    pub order: usize,
}

impl Default for SolverDef {
    fn default() -> Self {
        Self {
            t0: 0.0,
            step: 0.01,
            n_steps: 1,
            order: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemDef {
    pub id: u32,
    #[serde(default)]
    pub x: Real,
    #[serde(default)]
    pub y: Real,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<u32>,
    #[serde(default)]
    pub ports: Vec<u32>,
    #[serde(flatten)]
    pub kind: ItemDefKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ItemDefKind {
    Op {
        op: OpKind,
    },
    Variable {
        name: String,
        kind: VarKind,
        #[serde(default)]
        init: String,
    },
    Integral {
        name: String,
        #[serde(default)]
        init: String,
    },
    Godley {
        table: GodleyTable,
    },
    Group,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireDef {
    pub id: u32,
    pub from: u32,
    pub to: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub control_points: Vec<(Real, Real)>,
}

impl ModelFile {
    /// Serialize the graph. Items and wires come out in ascending id order
    /// (the arenas are ordered maps), so the result is canonical.
    pub fn from_graph(graph: &Graph, solver: SolverDef) -> Self {
        let items = graph
            .items()
            .map(|it| {
                let kind = match &it.kind {
                    ItemKind::Op(op) => ItemDefKind::Op { op: *op },
                    ItemKind::Variable { value_id, kind } => ItemDefKind::Variable {
                        name: value_id.clone(),
                        kind: *kind,
                        init: graph
                            .values
                            .get(value_id)
                            .map(|v| v.init.clone())
                            .unwrap_or_default(),
                    },
                    ItemKind::Integral { value_id } => ItemDefKind::Integral {
                        name: value_id.clone(),
                        init: graph
                            .values
                            .get(value_id)
                            .map(|v| v.init.clone())
                            .unwrap_or_default(),
                    },
                    ItemKind::Godley(table) => ItemDefKind::Godley {
                        table: table.clone(),
                    },
                    ItemKind::Group => ItemDefKind::Group,
                };
                ItemDef {
                    id: it.id.index(),
                    x: it.x,
                    y: it.y,
                    group: it.group.map(|g| g.index()),
                    ports: it.ports.iter().map(|p| p.index()).collect(),
                    kind,
                }
            })
            .collect();
        let wires = graph
            .wires()
            .map(|w| WireDef {
                id: w.id.index(),
                from: w.from.index(),
                to: w.to.index(),
                control_points: w.control_points.clone(),
            })
            .collect();
        ModelFile {
            version: SCHEMA_VERSION,
            solver,
            items,
            wires,
            bookmarks: graph.bookmarks.clone(),
        }
    }

    /// Replace the graph's contents with this file's model.
    pub fn populate(&self, graph: &mut Graph) -> ProjectResult<()> {
        if self.version != SCHEMA_VERSION {
            return Err(ProjectError::Migration {
                what: format!(
                    "cannot populate from schema version {}, expected {SCHEMA_VERSION}",
                    self.version
                ),
            });
        }
        graph.clear();
        for item in &self.items {
            let kind = match &item.kind {
                ItemDefKind::Op { op } => ItemKind::Op(*op),
                ItemDefKind::Variable { name, kind, .. } => ItemKind::Variable {
                    value_id: name.clone(),
                    kind: *kind,
                },
                ItemDefKind::Integral { name, .. } => ItemKind::Integral {
                    value_id: name.clone(),
                },
                ItemDefKind::Godley { table } => ItemKind::Godley(table.clone()),
                ItemDefKind::Group => ItemKind::Group,
            };
            let ports: Vec<_> = item.ports.iter().map(|p| Id::from_index(*p)).collect();
            graph.restore_item(
                Id::from_index(item.id),
                kind,
                item.x,
                item.y,
                item.group.map(Id::from_index),
                &ports,
            )?;
            match &item.kind {
                ItemDefKind::Variable { name, init, .. }
                | ItemDefKind::Integral { name, init } => {
                    if !init.is_empty() {
                        graph.set_init(name, init)?;
                    }
                }
                _ => {}
            }
        }
        for wire in &self.wires {
            graph.restore_wire(
                Id::from_index(wire.id),
                Id::from_index(wire.from),
                Id::from_index(wire.to),
                wire.control_points.clone(),
            )?;
        }
        graph.bookmarks = self.bookmarks.clone();
        Ok(())
    }
}
