//! Schema migration: older file versions upgrade stepwise to the current
//! one. Each version is its own set of structs; there is no downgrade path.
//!
//! History of the format:
//! - v0: items and wires only;
//! - v1: solver parameters added;
//! - v2: wires gained control points;
//! - v3 (current): groups and bookmarks added, and per-variable initial
//!   conditions moved from a side table into the item definitions.

use std::collections::BTreeMap;

use serde::Deserialize;
use sf_core::Real;
use sf_graph::{GodleyTable, OpKind, VarKind};

use crate::schema::{ItemDef, ItemDefKind, ModelFile, SCHEMA_VERSION, SolverDef, WireDef};
use crate::{ProjectError, ProjectResult};

/// Just enough of any version to read the version number.
#[derive(Deserialize)]
struct VersionProbe {
    #[serde(default)]
    version: u32,
}

// ---- v0..v2 file shapes ----------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct FileV0 {
    #[serde(default)]
    items: Vec<ItemV0>,
    #[serde(default)]
    wires: Vec<WireV0>,
    /// Initial conditions keyed by value id.
    #[serde(default)]
    inits: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
struct FileV1 {
    #[serde(default)]
    solver: SolverDef,
    #[serde(default)]
    items: Vec<ItemV0>,
    #[serde(default)]
    wires: Vec<WireV0>,
    #[serde(default)]
    inits: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
struct FileV2 {
    #[serde(default)]
    solver: SolverDef,
    #[serde(default)]
    items: Vec<ItemV0>,
    #[serde(default)]
    wires: Vec<WireDef>,
    #[serde(default)]
    inits: BTreeMap<String, String>,
}

/// Item shape shared by v0 through v2: no group, no per-item init.
#[derive(Debug, Clone, Deserialize)]
struct ItemV0 {
    id: u32,
    #[serde(default)]
    x: Real,
    #[serde(default)]
    y: Real,
    #[serde(default)]
    ports: Vec<u32>,
    #[serde(flatten)]
    kind: ItemKindV0,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ItemKindV0 {
    Op { op: OpKind },
    Variable { name: String, kind: VarKind },
    Integral { name: String },
    Godley { table: GodleyTable },
}

#[derive(Debug, Clone, Deserialize)]
struct WireV0 {
    id: u32,
    from: u32,
    to: u32,
}

// ---- upgrade steps ---------------------------------------------------------

fn v0_to_v1(file: FileV0) -> FileV1 {
    FileV1 {
        solver: SolverDef::default(),
        items: file.items,
        wires: file.wires,
        inits: file.inits,
    }
}

fn v1_to_v2(file: FileV1) -> FileV2 {
    FileV2 {
        solver: file.solver,
        items: file.items,
        wires: file
            .wires
            .into_iter()
            .map(|w| WireDef {
                id: w.id,
                from: w.from,
                to: w.to,
                control_points: Vec::new(),
            })
            .collect(),
        inits: file.inits,
    }
}

fn v2_to_v3(file: FileV2) -> ModelFile {
    let inits = file.inits;
    let items = file
        .items
        .into_iter()
        .map(|it| {
            let kind = match it.kind {
                ItemKindV0::Op { op } => ItemDefKind::Op { op },
                ItemKindV0::Variable { name, kind } => {
                    let init = inits.get(&name).cloned().unwrap_or_default();
                    ItemDefKind::Variable { name, kind, init }
                }
                ItemKindV0::Integral { name } => {
                    let init = inits.get(&name).cloned().unwrap_or_default();
                    ItemDefKind::Integral { name, init }
                }
                ItemKindV0::Godley { table } => ItemDefKind::Godley { table },
            };
            ItemDef {
                id: it.id,
                x: it.x,
                y: it.y,
                group: None,
                ports: it.ports,
                kind,
            }
        })
        .collect();
    ModelFile {
        version: SCHEMA_VERSION,
        solver: file.solver,
        items,
        wires: file.wires,
        bookmarks: Vec::new(),
    }
}

// ---- entry points ----------------------------------------------------------

pub fn from_json_str(text: &str) -> ProjectResult<ModelFile> {
    let probe: VersionProbe = serde_json::from_str(text)?;
    match probe.version {
        0 => Ok(v2_to_v3(v1_to_v2(v0_to_v1(serde_json::from_str(text)?)))),
        1 => Ok(v2_to_v3(v1_to_v2(serde_json::from_str(text)?))),
        2 => Ok(v2_to_v3(serde_json::from_str(text)?)),
        SCHEMA_VERSION => Ok(serde_json::from_str(text)?),
        v => Err(ProjectError::Migration {
            what: format!("no migration path from version {v}"),
        }),
    }
}

pub fn from_yaml_str(text: &str) -> ProjectResult<ModelFile> {
    let probe: VersionProbe = serde_yaml::from_str(text)?;
    match probe.version {
        0 => Ok(v2_to_v3(v1_to_v2(v0_to_v1(serde_yaml::from_str(text)?)))),
        1 => Ok(v2_to_v3(v1_to_v2(serde_yaml::from_str(text)?))),
        2 => Ok(v2_to_v3(serde_yaml::from_str(text)?)),
        SCHEMA_VERSION => Ok(serde_yaml::from_str(text)?),
        v => Err(ProjectError::Migration {
            what: format!("no migration path from version {v}"),
        }),
    }
}
