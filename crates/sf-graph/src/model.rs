//! Core graph data structures and the mutation API.
//!
//! Items, ports and wires live in arena-style tables keyed by stable
//! integer ids; every cross-reference is an id, never a borrow, so items
//! can be deleted mid-session without dangling pointers. The tables are
//! `BTreeMap`s: iteration order is deterministic, which makes serialized
//! snapshots canonical (the undo history compares them byte-for-byte).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sf_core::{Id, ItemId, PortId, Real, WireId};
use tracing::debug;

use crate::error::{GraphError, GraphResult};
use crate::godley::GodleyTable;
use crate::values::{ValueId, VarKind, VariableValues};

/// Direction/kind of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortKind {
    Input,
    Output,
}

/// A port connects an item to wires.
///
/// An output port may fan out to many wires. An input port accepts exactly
/// one wire unless flagged `multi` (the operand ports of add/subtract and
/// multiply/divide, where fan-in is summed or multiplied).
#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    pub id: PortId,
    pub item: ItemId,
    pub kind: PortKind,
    pub multi: bool,
    pub wires: Vec<WireId>,
}

/// A directed edge from an output port to an input port.
#[derive(Debug, Clone, PartialEq)]
pub struct Wire {
    pub id: WireId,
    pub from: PortId,
    pub to: PortId,
    /// Optional layout hints for the wire's rendered curve.
    pub control_points: Vec<(Real, Real)>,
}

/// Scalar operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpKind {
    Time,
    Neg,
    Sqrt,
    Exp,
    Ln,
    Sin,
    Cos,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl OpKind {
    pub fn input_arity(self) -> usize {
        match self {
            OpKind::Time => 0,
            OpKind::Neg | OpKind::Sqrt | OpKind::Exp | OpKind::Ln | OpKind::Sin | OpKind::Cos => 1,
            OpKind::Add | OpKind::Sub | OpKind::Mul | OpKind::Div | OpKind::Pow => 2,
        }
    }

    /// Operand ports that accept fan-in (summed for add/subtract operands,
    /// multiplied for multiply/divide operands).
    pub fn multi_input(self) -> bool {
        matches!(self, OpKind::Add | OpKind::Sub | OpKind::Mul | OpKind::Div)
    }

    pub fn name(self) -> &'static str {
        match self {
            OpKind::Time => "time",
            OpKind::Neg => "neg",
            OpKind::Sqrt => "sqrt",
            OpKind::Exp => "exp",
            OpKind::Ln => "ln",
            OpKind::Sin => "sin",
            OpKind::Cos => "cos",
            OpKind::Add => "add",
            OpKind::Sub => "subtract",
            OpKind::Mul => "multiply",
            OpKind::Div => "divide",
            OpKind::Pow => "pow",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
    Op(OpKind),
    Variable { value_id: ValueId, kind: VarKind },
    Integral { value_id: ValueId },
    Godley(GodleyTable),
    Group,
}

impl ItemKind {
    /// Stock-like items break the input->output dependency: their outputs
    /// are advanced by the integrator, not evaluated from inputs. This
    /// covers integrals, Godley tables and stock variables (whose defining
    /// wire carries the derivative).
    pub fn breaks_dependency(&self) -> bool {
        match self {
            ItemKind::Integral { .. } | ItemKind::Godley(_) => true,
            ItemKind::Variable { kind, .. } => kind.is_stock_like(),
            _ => false,
        }
    }

    pub fn value_id(&self) -> Option<&ValueId> {
        match self {
            ItemKind::Variable { value_id, .. } | ItemKind::Integral { value_id } => Some(value_id),
            _ => None,
        }
    }
}

/// A node in the model graph.
///
/// Port convention: `ports[0]` is the output (for kinds that have one),
/// inputs follow. Godley tables and groups own no ports.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: ItemId,
    pub kind: ItemKind,
    pub x: Real,
    pub y: Real,
    /// Containing group, if any.
    pub group: Option<ItemId>,
    pub ports: Vec<PortId>,
}

impl Item {
    pub fn output_port(&self) -> Option<PortId> {
        match self.kind {
            ItemKind::Godley(_) | ItemKind::Group => None,
            _ => self.ports.first().copied(),
        }
    }

    pub fn input_ports(&self) -> &[PortId] {
        match self.kind {
            ItemKind::Godley(_) | ItemKind::Group => &[],
            _ => &self.ports[1..],
        }
    }
}

/// A named canvas position preserved across undo/redo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub name: String,
    pub x: Real,
    pub y: Real,
    pub zoom: Real,
}

/// The model graph: arena tables of items/ports/wires plus the variable
/// value registry and UI-adjacent extras (bookmarks).
#[derive(Debug, Clone, Default)]
pub struct Graph {
    items: BTreeMap<ItemId, Item>,
    ports: BTreeMap<PortId, Port>,
    wires: BTreeMap<WireId, Wire>,
    pub values: VariableValues,
    pub bookmarks: Vec<Bookmark>,
    next_item: u32,
    next_port: u32,
    next_wire: u32,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- accessors -------------------------------------------------------

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.values()
    }

    pub fn wires(&self) -> impl Iterator<Item = &Wire> {
        self.wires.values()
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.ports.get(&id)
    }

    pub fn wire(&self, id: WireId) -> Option<&Wire> {
        self.wires.get(&id)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn wire_count(&self) -> usize {
        self.wires.len()
    }

    /// Whether the variable with this value id has a defining wire anywhere
    /// in the graph.
    pub fn input_wired(&self, value_id: &str) -> bool {
        self.items.values().any(|it| {
            it.kind.value_id().is_some_and(|v| v == value_id)
                && it
                    .input_ports()
                    .iter()
                    .any(|p| self.ports.get(p).is_some_and(|p| !p.wires.is_empty()))
        })
    }

    // ---- item construction ----------------------------------------------

    fn alloc_item(&mut self) -> ItemId {
        let id = Id::from_index(self.next_item);
        self.next_item += 1;
        id
    }

    fn alloc_port(&mut self, item: ItemId, kind: PortKind, multi: bool) -> PortId {
        let id = Id::from_index(self.next_port);
        self.next_port += 1;
        self.ports.insert(
            id,
            Port {
                id,
                item,
                kind,
                multi,
                wires: Vec::new(),
            },
        );
        id
    }

    pub fn add_op(&mut self, op: OpKind) -> ItemId {
        let id = self.alloc_item();
        let mut ports = vec![self.alloc_port(id, PortKind::Output, false)];
        for _ in 0..op.input_arity() {
            ports.push(self.alloc_port(id, PortKind::Input, op.multi_input()));
        }
        self.items.insert(
            id,
            Item {
                id,
                kind: ItemKind::Op(op),
                x: 0.0,
                y: 0.0,
                group: None,
                ports,
            },
        );
        id
    }

    pub fn add_variable(&mut self, value_id: &str, kind: VarKind, init: &str) -> ItemId {
        let id = self.alloc_item();
        let ports = vec![
            self.alloc_port(id, PortKind::Output, false),
            self.alloc_port(id, PortKind::Input, false),
        ];
        let v = self.values.ensure(value_id, kind);
        if !init.is_empty() {
            v.init = init.to_string();
        }
        self.items.insert(
            id,
            Item {
                id,
                kind: ItemKind::Variable {
                    value_id: value_id.to_string(),
                    kind,
                },
                x: 0.0,
                y: 0.0,
                group: None,
                ports,
            },
        );
        id
    }

    pub fn add_integral(&mut self, value_id: &str, init: &str) -> ItemId {
        let id = self.alloc_item();
        let ports = vec![
            self.alloc_port(id, PortKind::Output, false),
            self.alloc_port(id, PortKind::Input, false),
        ];
        let v = self.values.ensure(value_id, VarKind::Integral);
        if !init.is_empty() {
            v.init = init.to_string();
        }
        self.items.insert(
            id,
            Item {
                id,
                kind: ItemKind::Integral {
                    value_id: value_id.to_string(),
                },
                x: 0.0,
                y: 0.0,
                group: None,
                ports,
            },
        );
        id
    }

    pub fn add_godley(&mut self, table: GodleyTable) -> ItemId {
        let id = self.alloc_item();
        for col in &table.columns {
            self.values.ensure(&col.stock, VarKind::Stock);
            for (_, flow) in &col.flows {
                self.values.ensure(flow, VarKind::Flow);
            }
        }
        self.items.insert(
            id,
            Item {
                id,
                kind: ItemKind::Godley(table),
                x: 0.0,
                y: 0.0,
                group: None,
                ports: Vec::new(),
            },
        );
        id
    }

    pub fn add_group(&mut self) -> ItemId {
        let id = self.alloc_item();
        self.items.insert(
            id,
            Item {
                id,
                kind: ItemKind::Group,
                x: 0.0,
                y: 0.0,
                group: None,
                ports: Vec::new(),
            },
        );
        id
    }

    /// Place an item inside a group (or back at top level with `None`).
    pub fn set_group(&mut self, item: ItemId, group: Option<ItemId>) -> GraphResult<()> {
        if let Some(g) = group {
            match self.items.get(&g) {
                None => return Err(GraphError::UnknownItem(g)),
                Some(it) if it.kind != ItemKind::Group => return Err(GraphError::NotAGroup(g)),
                _ => {}
            }
        }
        let it = self
            .items
            .get_mut(&item)
            .ok_or(GraphError::UnknownItem(item))?;
        it.group = group;
        Ok(())
    }

    pub fn move_item(&mut self, item: ItemId, x: Real, y: Real) -> GraphResult<()> {
        let it = self
            .items
            .get_mut(&item)
            .ok_or(GraphError::UnknownItem(item))?;
        it.x = x;
        it.y = y;
        Ok(())
    }

    pub fn set_init(&mut self, value_id: &str, init: &str) -> GraphResult<()> {
        let v = self
            .values
            .get_mut(value_id)
            .ok_or_else(|| GraphError::UnknownValue(value_id.to_string()))?;
        v.init = init.to_string();
        Ok(())
    }

    // ---- wires -----------------------------------------------------------

    pub fn add_wire(&mut self, from: PortId, to: PortId) -> GraphResult<WireId> {
        self.add_wire_with_points(from, to, Vec::new())
    }

    pub fn add_wire_with_points(
        &mut self,
        from: PortId,
        to: PortId,
        control_points: Vec<(Real, Real)>,
    ) -> GraphResult<WireId> {
        let from_port = self.ports.get(&from).ok_or(GraphError::UnknownPort(from))?;
        let to_port = self.ports.get(&to).ok_or(GraphError::UnknownPort(to))?;
        if from_port.kind != PortKind::Output || to_port.kind != PortKind::Input {
            return Err(GraphError::WireDirection { from, to });
        }
        if !to_port.multi && !to_port.wires.is_empty() {
            return Err(GraphError::InputOccupied(to));
        }
        // one definition per value id across the whole graph
        let target_item = to_port.item;
        if let Some(vid) = self
            .items
            .get(&target_item)
            .and_then(|it| it.kind.value_id())
            .cloned()
            && self.input_wired(&vid)
        {
            return Err(GraphError::DuplicateDefinition(vid));
        }

        let id = Id::from_index(self.next_wire);
        self.next_wire += 1;
        self.wires.insert(
            id,
            Wire {
                id,
                from,
                to,
                control_points,
            },
        );
        self.ports
            .get_mut(&from)
            .ok_or(GraphError::UnknownPort(from))?
            .wires
            .push(id);
        self.ports
            .get_mut(&to)
            .ok_or(GraphError::UnknownPort(to))?
            .wires
            .push(id);
        Ok(id)
    }

    pub fn remove_wire(&mut self, id: WireId) -> GraphResult<()> {
        let wire = self.wires.remove(&id).ok_or(GraphError::UnknownWire(id))?;
        for pid in [wire.from, wire.to] {
            if let Some(port) = self.ports.get_mut(&pid) {
                port.wires.retain(|w| *w != id);
            }
        }
        Ok(())
    }

    /// Remove an item: wires touching its ports go first, then the ports,
    /// then unreferenced variable values. Children of a removed group are
    /// re-parented to the group's own parent.
    pub fn remove_item(&mut self, id: ItemId) -> GraphResult<()> {
        let item = self.items.remove(&id).ok_or(GraphError::UnknownItem(id))?;
        let touching: Vec<WireId> = item
            .ports
            .iter()
            .filter_map(|p| self.ports.get(p))
            .flat_map(|p| p.wires.iter().copied())
            .collect();
        for w in touching {
            // a wire may touch two ports of the same item
            let _ = self.remove_wire(w);
        }
        for p in &item.ports {
            self.ports.remove(p);
        }
        if item.kind == ItemKind::Group {
            for child in self.items.values_mut() {
                if child.group == Some(id) {
                    child.group = item.group;
                }
            }
        }
        self.garbage_collect();
        Ok(())
    }

    /// Drop temporaries and variable values no longer referenced by any
    /// item, and forget compiled slot assignments.
    pub fn garbage_collect(&mut self) {
        use std::collections::BTreeSet;
        let mut referenced: BTreeSet<ValueId> = BTreeSet::new();
        for it in self.items.values() {
            match &it.kind {
                ItemKind::Variable { value_id, .. } | ItemKind::Integral { value_id } => {
                    referenced.insert(value_id.clone());
                }
                ItemKind::Godley(table) => {
                    for col in &table.columns {
                        referenced.insert(col.stock.clone());
                        for (_, flow) in &col.flows {
                            referenced.insert(flow.clone());
                        }
                    }
                }
                _ => {}
            }
        }
        let dead: Vec<ValueId> = self
            .values
            .iter()
            .filter(|(id, v)| v.kind == VarKind::Temp || !referenced.contains(*id))
            .map(|(id, _)| id.clone())
            .collect();
        if !dead.is_empty() {
            debug!(dropped = dead.len(), "garbage-collected variable values");
        }
        for id in dead {
            self.values.remove(&id);
        }
        self.values.reset_slots();
    }

    /// Clear the whole model (used when repopulating from a snapshot).
    pub fn clear(&mut self) {
        self.items.clear();
        self.ports.clear();
        self.wires.clear();
        self.values.clear();
        self.bookmarks.clear();
        self.next_item = 0;
        self.next_port = 0;
        self.next_wire = 0;
    }

    // ---- snapshot restore ------------------------------------------------

    /// Re-insert an item with explicit ids, as recorded in a snapshot. Port
    /// kinds and multi flags are derived from the item kind; `port_ids` must
    /// match the item's port convention (output first).
    pub fn restore_item(
        &mut self,
        id: ItemId,
        kind: ItemKind,
        x: Real,
        y: Real,
        group: Option<ItemId>,
        port_ids: &[PortId],
    ) -> GraphResult<()> {
        if self.items.contains_key(&id) {
            return Err(GraphError::DuplicateId {
                what: "item",
                index: id.index(),
            });
        }
        let expected = match &kind {
            ItemKind::Op(op) => 1 + op.input_arity(),
            ItemKind::Variable { .. } | ItemKind::Integral { .. } => 2,
            ItemKind::Godley(_) | ItemKind::Group => 0,
        };
        if port_ids.len() != expected {
            return Err(GraphError::Invariant(format!(
                "item {id} restored with {} ports, expected {expected}",
                port_ids.len()
            )));
        }
        for (i, pid) in port_ids.iter().enumerate() {
            if self.ports.contains_key(pid) {
                return Err(GraphError::DuplicateId {
                    what: "port",
                    index: pid.index(),
                });
            }
            let multi = match &kind {
                ItemKind::Op(op) => i > 0 && op.multi_input(),
                _ => false,
            };
            self.ports.insert(
                *pid,
                Port {
                    id: *pid,
                    item: id,
                    kind: if i == 0 {
                        PortKind::Output
                    } else {
                        PortKind::Input
                    },
                    multi,
                    wires: Vec::new(),
                },
            );
            self.next_port = self.next_port.max(pid.index() + 1);
        }
        // variables referenced by the item exist before any wire lands
        match &kind {
            ItemKind::Variable { value_id, kind } => {
                self.values.ensure(value_id, *kind);
            }
            ItemKind::Integral { value_id } => {
                self.values.ensure(value_id, VarKind::Integral);
            }
            ItemKind::Godley(table) => {
                for col in &table.columns {
                    self.values.ensure(&col.stock, VarKind::Stock);
                    for (_, flow) in &col.flows {
                        self.values.ensure(flow, VarKind::Flow);
                    }
                }
            }
            _ => {}
        }
        self.items.insert(
            id,
            Item {
                id,
                kind,
                x,
                y,
                group,
                ports: port_ids.to_vec(),
            },
        );
        self.next_item = self.next_item.max(id.index() + 1);
        Ok(())
    }

    /// Re-insert a wire with an explicit id, validated like `add_wire`.
    pub fn restore_wire(
        &mut self,
        id: WireId,
        from: PortId,
        to: PortId,
        control_points: Vec<(Real, Real)>,
    ) -> GraphResult<()> {
        if self.wires.contains_key(&id) {
            return Err(GraphError::DuplicateId {
                what: "wire",
                index: id.index(),
            });
        }
        let created = self.add_wire_with_points(from, to, control_points)?;
        // rekey to the recorded id
        let mut wire = self
            .wires
            .remove(&created)
            .ok_or(GraphError::UnknownWire(created))?;
        wire.id = id;
        for pid in [wire.from, wire.to] {
            if let Some(port) = self.ports.get_mut(&pid) {
                for w in &mut port.wires {
                    if *w == created {
                        *w = id;
                    }
                }
            }
        }
        self.wires.insert(id, wire);
        self.next_wire = self.next_wire.max(id.index() + 1);
        Ok(())
    }
}
