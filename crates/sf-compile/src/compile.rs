//! Graph-to-equation compilation.
//!
//! The compiler walks every defining item (variables with a defining wire,
//! integrals, Godley tables) and emits evaluation operations in dependency
//! order by post-order recursion over ports. Equal sub-expressions are
//! value-numbered so they share a slot. Slot assignments are
//! back-propagated onto ports and variable values so downstream consumers
//! (displays, plots) know which slot holds the current value of a wire.

use std::collections::{BTreeMap, BTreeSet};

use sf_core::{ItemId, PortId, Real};
use sf_graph::{Graph, Item, ItemKind, OpKind, ValueId, VarKind, find_cycle};
use tracing::debug;

use crate::error::{CompileError, CompileResult};
use crate::eval::{EvalOp, EvalOpKind, Integral, Operand};

/// The executable form of a model: everything the simulator needs,
/// expressed in numeric slots with no references back into the graph.
#[derive(Clone, Debug, Default)]
pub struct CompiledSystem {
    /// Scalar evaluation steps, in dependency order.
    pub equations: Vec<EvalOp>,
    /// Stock derivative definitions; not part of the linear order.
    pub integrals: Vec<Integral>,
    pub n_flow: usize,
    pub n_stock: usize,
    /// Flow slots seeded once at reset (parameters, constants, undefined
    /// flows, operator identity defaults).
    pub param_inits: Vec<(usize, Real)>,
    /// Stock slots and their initial conditions.
    pub stock_inits: Vec<(usize, Real)>,
    /// Slot assignment back-propagated onto every compiled port.
    pub port_slots: BTreeMap<PortId, Operand>,
    /// Diagnostic names, indexed by flow slot.
    pub flow_names: Vec<String>,
    /// Diagnostic names, indexed by stock slot.
    pub stock_names: Vec<String>,
}

impl CompiledSystem {
    /// Seed the value arrays: parameters and initial conditions.
    pub fn apply_inits(&self, flow: &mut [Real], stock: &mut [Real]) {
        flow.fill(0.0);
        for &(slot, v) in &self.param_inits {
            flow[slot] = v;
        }
        for &(slot, v) in &self.stock_inits {
            stock[slot] = v;
        }
    }

    /// One pass over the equation vector.
    pub fn eval_equations(&self, flow: &mut [Real], stock: &[Real], t: Real) {
        for eq in &self.equations {
            eq.eval(flow, stock, t);
        }
    }

    /// Evaluate flows at (t, stock) and collect stock derivatives.
    pub fn derivatives(&self, flow: &mut [Real], stock: &[Real], t: Real, d: &mut [Real]) {
        self.eval_equations(flow, stock, t);
        d.fill(0.0);
        for integ in &self.integrals {
            if let Some(input) = integ.input {
                d[integ.stock] = input.fetch(flow, stock);
            }
        }
    }
}

/// Compile the graph, failing with a structural error on a cyclic network.
/// The graph is untouched (beyond a garbage-collection pass) on failure.
pub fn compile(graph: &mut Graph) -> CompileResult<CompiledSystem> {
    if let Some(item) = find_cycle(graph) {
        return Err(CompileError::CyclicNetwork { item });
    }
    graph.garbage_collect();

    let mut sys = CompiledSystem::default();
    let value_operand = allocate_value_slots(graph, &mut sys)?;

    // Several icons may share one value id; only the one with the defining
    // wire (or the integral item) decides when that value's equation lands.
    let mut definers: BTreeMap<ValueId, ItemId> = BTreeMap::new();
    for it in graph.items() {
        match &it.kind {
            ItemKind::Variable { value_id, .. } => {
                let input = it.input_ports()[0];
                if graph.port(input).is_some_and(|p| !p.wires.is_empty()) {
                    definers.insert(value_id.clone(), it.id);
                }
            }
            ItemKind::Integral { value_id } => {
                definers.insert(value_id.clone(), it.id);
            }
            _ => {}
        }
    }

    let mut em = Emitter {
        graph,
        value_operand,
        definers,
        sys,
        cse: BTreeMap::new(),
        consts: BTreeMap::new(),
        defined: BTreeSet::new(),
    };

    let defining: Vec<ItemId> = em
        .graph
        .items()
        .filter(|it| {
            matches!(
                it.kind,
                ItemKind::Variable { .. } | ItemKind::Integral { .. } | ItemKind::Godley(_)
            )
        })
        .map(|it| it.id)
        .collect();
    for id in defining {
        em.define_item(id)?;
    }

    let sys = em.sys;
    debug!(
        equations = sys.equations.len(),
        integrals = sys.integrals.len(),
        flows = sys.n_flow,
        stocks = sys.n_stock,
        "model compiled"
    );
    Ok(sys)
}

/// Assign every variable value a numeric slot: stock-like values go to the
/// stock array, everything else to the flow array. Initial conditions are
/// recorded; the slot is written back onto the value.
fn allocate_value_slots(
    graph: &mut Graph,
    sys: &mut CompiledSystem,
) -> CompileResult<BTreeMap<ValueId, Operand>> {
    let mut operands = BTreeMap::new();
    let ids: Vec<(ValueId, VarKind)> = graph
        .values
        .iter()
        .map(|(id, v)| (id.clone(), v.kind))
        .collect();
    for (id, kind) in ids {
        let init = graph.values.init_value(&id)?;
        let operand = if kind.is_stock_like() {
            let slot = sys.n_stock;
            sys.n_stock += 1;
            sys.stock_inits.push((slot, init));
            sys.stock_names.push(id.clone());
            Operand::stock(slot)
        } else {
            let slot = sys.n_flow;
            sys.n_flow += 1;
            sys.flow_names.push(id.clone());
            // parameters and constants are seeded once; an undefined flow
            // variable behaves like a constant at its initial value
            if kind != VarKind::Flow || !graph.input_wired(&id) {
                sys.param_inits.push((slot, init));
            }
            Operand::flow(slot)
        };
        if let Some(v) = graph.values.get_mut(&id) {
            v.slot = Some(operand.slot);
        }
        operands.insert(id, operand);
    }
    Ok(operands)
}

struct Emitter<'g> {
    graph: &'g Graph,
    value_operand: BTreeMap<ValueId, Operand>,
    definers: BTreeMap<ValueId, ItemId>,
    sys: CompiledSystem,
    /// Value numbering: equal sub-expressions share a slot.
    cse: BTreeMap<(EvalOpKind, Option<Operand>, Option<Operand>), Operand>,
    /// Shared constant slots, keyed by value bits.
    consts: BTreeMap<u64, Operand>,
    defined: BTreeSet<ItemId>,
}

impl<'g> Emitter<'g> {
    fn item(&self, id: ItemId) -> CompileResult<&'g Item> {
        self.graph
            .item(id)
            .ok_or(CompileError::Graph(sf_graph::GraphError::UnknownItem(id)))
    }

    /// Emit the defining equation(s) of a variable/integral/Godley item.
    fn define_item(&mut self, id: ItemId) -> CompileResult<()> {
        if !self.defined.insert(id) {
            return Ok(());
        }
        let item = self.item(id)?;
        match &item.kind {
            ItemKind::Variable { value_id, kind } => {
                let input = item.input_ports()[0];
                if !self.port_wired(input) {
                    return Ok(());
                }
                let src = self.input_operand(input, EvalOpKind::Add)?;
                let dst = self.value_operand[value_id];
                if kind.is_stock_like() {
                    // a stock wired to a defining flow integrates it
                    self.sys.integrals.push(Integral {
                        stock: dst.slot,
                        input: Some(src),
                    });
                } else {
                    self.sys.equations.push(EvalOp {
                        kind: EvalOpKind::Copy,
                        out: dst.slot,
                        in1: Some(src),
                        in2: None,
                    });
                }
            }
            ItemKind::Integral { value_id } => {
                let input = item.input_ports()[0];
                let src = if self.port_wired(input) {
                    Some(self.input_operand(input, EvalOpKind::Add)?)
                } else {
                    None
                };
                let dst = self.value_operand[value_id];
                self.sys.integrals.push(Integral {
                    stock: dst.slot,
                    input: src,
                });
            }
            ItemKind::Godley(table) => {
                for col in &table.columns {
                    let mut acc: Option<Operand> = None;
                    for (add, flow) in &col.flows {
                        self.define_value(flow)?;
                        let op = self.value_operand[flow];
                        acc = Some(match (acc, add) {
                            (None, true) => op,
                            (None, false) => self.vn_emit(EvalOpKind::Neg, Some(op), None),
                            (Some(a), true) => self.vn_emit(EvalOpKind::Add, Some(a), Some(op)),
                            (Some(a), false) => self.vn_emit(EvalOpKind::Sub, Some(a), Some(op)),
                        });
                    }
                    let stock = self.value_operand[&col.stock];
                    self.sys.integrals.push(Integral {
                        stock: stock.slot,
                        input: acc,
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Emit the defining equation of a value id, if it has one, before its
    /// slot is handed to a consumer. Reading the slot through any icon of
    /// the value must not depend on which icon carries the defining wire.
    fn define_value(&mut self, value_id: &ValueId) -> CompileResult<()> {
        if let Some(&item) = self.definers.get(value_id) {
            self.define_item(item)?;
        }
        Ok(())
    }

    fn port_wired(&self, port: PortId) -> bool {
        self.graph.port(port).is_some_and(|p| !p.wires.is_empty())
    }

    /// Resolve the value arriving at an input port, folding fan-in with the
    /// given operator (sum for add/subtract operands, product for
    /// multiply/divide).
    fn input_operand(&mut self, port: PortId, fold: EvalOpKind) -> CompileResult<Operand> {
        if let Some(op) = self.sys.port_slots.get(&port) {
            return Ok(*op);
        }
        let sources: Vec<PortId> = self
            .graph
            .port(port)
            .map(|p| {
                p.wires
                    .iter()
                    .filter_map(|w| self.graph.wire(*w).map(|w| w.from))
                    .collect()
            })
            .unwrap_or_default();
        let mut acc: Option<Operand> = None;
        for src in sources {
            let op = self.output_operand(src)?;
            acc = Some(match acc {
                None => op,
                Some(a) => self.vn_emit(fold, Some(a), Some(op)),
            });
        }
        let result = acc.ok_or(CompileError::Graph(sf_graph::GraphError::UnknownPort(port)))?;
        self.sys.port_slots.insert(port, result);
        Ok(result)
    }

    /// Resolve an item's output port into an operand, emitting whatever
    /// equations are needed first.
    fn output_operand(&mut self, port: PortId) -> CompileResult<Operand> {
        if let Some(op) = self.sys.port_slots.get(&port) {
            return Ok(*op);
        }
        let owner = self
            .graph
            .port(port)
            .ok_or(CompileError::Graph(sf_graph::GraphError::UnknownPort(port)))?
            .item;
        let item = self.item(owner)?;
        let operand = match &item.kind {
            ItemKind::Variable { value_id, .. } => {
                // the definition, if any, must land before any consumer
                self.define_value(value_id)?;
                self.value_operand[value_id]
            }
            ItemKind::Integral { value_id } => {
                self.define_value(value_id)?;
                self.value_operand[value_id]
            }
            ItemKind::Op(op) => self.emit_op(item, *op)?,
            ItemKind::Godley(_) | ItemKind::Group => {
                return Err(CompileError::Graph(sf_graph::GraphError::UnknownPort(port)));
            }
        };
        self.sys.port_slots.insert(port, operand);
        Ok(operand)
    }

    fn emit_op(&mut self, item: &Item, op: OpKind) -> CompileResult<Operand> {
        let kind = EvalOpKind::from(op);
        match kind.num_args() {
            0 => Ok(self.vn_emit(kind, None, None)),
            1 => {
                let input = item.input_ports()[0];
                if !self.port_wired(input) {
                    return Err(CompileError::UnwiredInput { item: item.id });
                }
                let a = self.input_operand(input, EvalOpKind::Add)?;
                Ok(self.vn_emit(kind, Some(a), None))
            }
            _ => {
                let fold = match op {
                    OpKind::Mul | OpKind::Div => EvalOpKind::Mul,
                    _ => EvalOpKind::Add,
                };
                let a = self.binary_operand(item, op, item.input_ports()[0], fold)?;
                let b = self.binary_operand(item, op, item.input_ports()[1], fold)?;
                Ok(self.vn_emit(kind, Some(a), Some(b)))
            }
        }
    }

    /// A binary operator's unwired operand silently defaults to the
    /// operator's identity element: 0 for add/subtract, 1 for
    /// multiply/divide/pow.
    fn binary_operand(
        &mut self,
        item: &Item,
        op: OpKind,
        port: PortId,
        fold: EvalOpKind,
    ) -> CompileResult<Operand> {
        if self.port_wired(port) {
            self.input_operand(port, fold)
        } else {
            let identity = match op {
                OpKind::Add | OpKind::Sub => 0.0,
                OpKind::Mul | OpKind::Div | OpKind::Pow => 1.0,
                _ => return Err(CompileError::UnwiredInput { item: item.id }),
            };
            Ok(self.const_operand(identity))
        }
    }

    fn const_operand(&mut self, v: Real) -> Operand {
        if let Some(op) = self.consts.get(&v.to_bits()) {
            return *op;
        }
        let slot = self.sys.n_flow;
        self.sys.n_flow += 1;
        self.sys.flow_names.push(format!("const:{v}"));
        self.sys.param_inits.push((slot, v));
        let op = Operand::flow(slot);
        self.consts.insert(v.to_bits(), op);
        op
    }

    /// Value-numbered emission: an op with the same kind and operands as an
    /// earlier one reuses its output slot instead of emitting again.
    fn vn_emit(&mut self, kind: EvalOpKind, in1: Option<Operand>, in2: Option<Operand>) -> Operand {
        if let Some(op) = self.cse.get(&(kind, in1, in2)) {
            return *op;
        }
        let slot = self.sys.n_flow;
        self.sys.n_flow += 1;
        self.sys.flow_names.push(kind.name().to_string());
        self.sys.equations.push(EvalOp {
            kind,
            out: slot,
            in1,
            in2,
        });
        let op = Operand::flow(slot);
        self.cse.insert((kind, in1, in2), op);
        op
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::check_equation_order;
    use sf_graph::{GodleyColumn, GodleyTable};

    fn out(g: &Graph, item: ItemId) -> PortId {
        g.item(item).unwrap().output_port().unwrap()
    }

    fn input(g: &Graph, item: ItemId, i: usize) -> PortId {
        g.item(item).unwrap().input_ports()[i]
    }

    /// constant -> add(+2) -> sink variable
    fn constant_plus_two() -> (Graph, ItemId) {
        let mut g = Graph::new();
        let c = g.add_variable(":c", VarKind::Parameter, "5");
        let two = g.add_variable(":two", VarKind::Constant, "2");
        let add = g.add_op(OpKind::Add);
        let sink = g.add_variable(":display", VarKind::Flow, "");
        g.add_wire(out(&g, c), input(&g, add, 0)).unwrap();
        g.add_wire(out(&g, two), input(&g, add, 1)).unwrap();
        g.add_wire(out(&g, add), input(&g, sink, 0)).unwrap();
        (g, sink)
    }

    #[test]
    fn chain_compiles_and_evaluates() {
        let (mut g, _) = constant_plus_two();
        let sys = compile(&mut g).unwrap();
        assert!(check_equation_order(&sys));

        let mut flow = vec![0.0; sys.n_flow];
        let mut stock = vec![0.0; sys.n_stock];
        sys.apply_inits(&mut flow, &mut stock);
        sys.eval_equations(&mut flow, &stock, 0.0);

        let display = g.values.get(":display").unwrap().slot.unwrap();
        assert_eq!(flow[display], 7.0);
    }

    #[test]
    fn port_slots_cover_the_sink_wire() {
        let (mut g, sink) = constant_plus_two();
        let sys = compile(&mut g).unwrap();
        let sink_in = g.item(sink).unwrap().input_ports()[0];
        let display = g.values.get(":display").unwrap().slot.unwrap();
        // the sink's input port reads the add output, which the Copy
        // forwards into the display slot
        let op = sys.port_slots.get(&sink_in).unwrap();
        assert!(op.is_flow());
        let mut flow = vec![0.0; sys.n_flow];
        let mut stock = vec![0.0; sys.n_stock];
        sys.apply_inits(&mut flow, &mut stock);
        sys.eval_equations(&mut flow, &stock, 0.0);
        assert_eq!(flow[op.slot], flow[display]);
    }

    #[test]
    fn cyclic_network_is_refused_before_slot_assignment() {
        let mut g = Graph::new();
        let a = g.add_op(OpKind::Neg);
        let b = g.add_op(OpKind::Neg);
        g.add_wire(out(&g, a), input(&g, b, 0)).unwrap();
        g.add_wire(out(&g, b), input(&g, a, 0)).unwrap();
        g.add_variable(":x", VarKind::Flow, "3");
        let err = compile(&mut g).unwrap_err();
        assert!(matches!(err, CompileError::CyclicNetwork { .. }));
        // slot assignment untouched by the failed compile
        assert!(g.values.get(":x").unwrap().slot.is_none());
    }

    #[test]
    fn equal_subexpressions_share_a_slot() {
        let mut g = Graph::new();
        let x = g.add_variable(":x", VarKind::Parameter, "3");
        let n1 = g.add_op(OpKind::Neg);
        let n2 = g.add_op(OpKind::Neg);
        let s1 = g.add_variable(":a", VarKind::Flow, "");
        let s2 = g.add_variable(":b", VarKind::Flow, "");
        g.add_wire(out(&g, x), input(&g, n1, 0)).unwrap();
        g.add_wire(out(&g, x), input(&g, n2, 0)).unwrap();
        g.add_wire(out(&g, n1), input(&g, s1, 0)).unwrap();
        g.add_wire(out(&g, n2), input(&g, s2, 0)).unwrap();
        let sys = compile(&mut g).unwrap();
        // one neg + two copies; the second neg is value-numbered away
        let negs = sys
            .equations
            .iter()
            .filter(|e| e.kind == EvalOpKind::Neg)
            .count();
        assert_eq!(negs, 1);
    }

    #[test]
    fn unwired_binary_operand_defaults_to_identity() {
        let mut g = Graph::new();
        let x = g.add_variable(":x", VarKind::Parameter, "8");
        let div = g.add_op(OpKind::Div);
        let sink = g.add_variable(":y", VarKind::Flow, "");
        g.add_wire(out(&g, x), input(&g, div, 0)).unwrap();
        // divisor left unwired: defaults to 1
        g.add_wire(out(&g, div), input(&g, sink, 0)).unwrap();
        let sys = compile(&mut g).unwrap();
        assert!(check_equation_order(&sys));
        let mut flow = vec![0.0; sys.n_flow];
        let mut stock = vec![0.0; sys.n_stock];
        sys.apply_inits(&mut flow, &mut stock);
        sys.eval_equations(&mut flow, &stock, 0.0);
        let y = g.values.get(":y").unwrap().slot.unwrap();
        assert_eq!(flow[y], 8.0);
    }

    #[test]
    fn unwired_unary_input_is_an_error() {
        let mut g = Graph::new();
        let sq = g.add_op(OpKind::Sqrt);
        let sink = g.add_variable(":y", VarKind::Flow, "");
        g.add_wire(out(&g, sq), input(&g, sink, 0)).unwrap();
        let err = compile(&mut g).unwrap_err();
        assert!(matches!(err, CompileError::UnwiredInput { .. }));
    }

    #[test]
    fn integral_definition_is_not_in_the_equation_order() {
        let mut g = Graph::new();
        let pop = g.add_integral(":pop", "100");
        let neg = g.add_op(OpKind::Neg);
        g.add_wire(out(&g, pop), input(&g, neg, 0)).unwrap();
        g.add_wire(out(&g, neg), input(&g, pop, 0)).unwrap();
        let sys = compile(&mut g).unwrap();
        assert_eq!(sys.integrals.len(), 1);
        assert!(sys.integrals[0].input.is_some());
        assert_eq!(sys.n_stock, 1);
        // derivative of pop at t0 is -100
        let mut flow = vec![0.0; sys.n_flow];
        let mut stock = vec![0.0; sys.n_stock];
        let mut d = vec![0.0; sys.n_stock];
        sys.apply_inits(&mut flow, &mut stock);
        sys.derivatives(&mut flow, &stock, 0.0, &mut d);
        assert_eq!(d[sys.integrals[0].stock], -100.0);
    }

    #[test]
    fn godley_columns_become_integrals() {
        let mut g = Graph::new();
        g.add_variable(":lending", VarKind::Flow, "10");
        g.add_godley(GodleyTable {
            columns: vec![
                GodleyColumn {
                    stock: ":deposits".into(),
                    flows: vec![(true, ":lending".into())],
                },
                GodleyColumn {
                    stock: ":loans".into(),
                    flows: vec![(false, ":lending".into())],
                },
            ],
        });
        let sys = compile(&mut g).unwrap();
        assert_eq!(sys.integrals.len(), 2);
        let mut flow = vec![0.0; sys.n_flow];
        let mut stock = vec![0.0; sys.n_stock];
        let mut d = vec![0.0; sys.n_stock];
        sys.apply_inits(&mut flow, &mut stock);
        sys.derivatives(&mut flow, &stock, 0.0, &mut d);
        let deposits = g.values.get(":deposits").unwrap().slot.unwrap();
        let loans = g.values.get(":loans").unwrap().slot.unwrap();
        assert_eq!(d[deposits], 10.0);
        assert_eq!(d[loans], -10.0);
    }

    #[test]
    fn undriven_stock_is_legal() {
        let mut g = Graph::new();
        g.add_integral(":idle", "4");
        let sys = compile(&mut g).unwrap();
        assert_eq!(sys.integrals.len(), 1);
        assert!(sys.integrals[0].input.is_none());
        let mut flow = vec![0.0; sys.n_flow.max(1)];
        let mut stock = vec![0.0; sys.n_stock];
        let mut d = vec![0.0; sys.n_stock];
        sys.apply_inits(&mut flow, &mut stock);
        sys.derivatives(&mut flow, &stock, 0.0, &mut d);
        assert_eq!(d[0], 0.0);
        assert_eq!(stock[0], 4.0);
    }

    #[test]
    fn aliased_variable_compiles_its_definition_first() {
        let mut g = Graph::new();
        // the consumer chain reads :q through a second icon created before
        // the icon that carries the defining wire
        let q_alias = g.add_variable(":q", VarKind::Flow, "");
        let neg = g.add_op(OpKind::Neg);
        let sink = g.add_variable(":y", VarKind::Flow, "");
        g.add_wire(out(&g, q_alias), input(&g, neg, 0)).unwrap();
        g.add_wire(out(&g, neg), input(&g, sink, 0)).unwrap();

        let p = g.add_variable(":p", VarKind::Parameter, "3");
        let q_def = g.add_variable(":q", VarKind::Flow, "");
        g.add_wire(out(&g, p), input(&g, q_def, 0)).unwrap();

        let sys = compile(&mut g).unwrap();
        assert!(check_equation_order(&sys));
        let mut flow = vec![0.0; sys.n_flow];
        let mut stock = vec![0.0; sys.n_stock];
        sys.apply_inits(&mut flow, &mut stock);
        sys.eval_equations(&mut flow, &stock, 0.0);
        let y = g.values.get(":y").unwrap().slot.unwrap();
        assert_eq!(flow[y], -3.0);
    }

    #[test]
    fn godley_sum_follows_wire_defined_flows() {
        let mut g = Graph::new();
        // table first, the flow's defining wire second: the column fold
        // must still land after the flow's copy equation
        g.add_godley(GodleyTable {
            columns: vec![GodleyColumn {
                stock: ":loans".into(),
                flows: vec![(false, ":lending".into())],
            }],
        });
        let r = g.add_variable(":r", VarKind::Parameter, "10");
        let lending = g.add_variable(":lending", VarKind::Flow, "");
        g.add_wire(out(&g, r), input(&g, lending, 0)).unwrap();

        let sys = compile(&mut g).unwrap();
        assert!(check_equation_order(&sys));
        let mut flow = vec![0.0; sys.n_flow];
        let mut stock = vec![0.0; sys.n_stock];
        let mut d = vec![0.0; sys.n_stock];
        sys.apply_inits(&mut flow, &mut stock);
        sys.derivatives(&mut flow, &stock, 0.0, &mut d);
        let loans = g.values.get(":loans").unwrap().slot.unwrap();
        assert_eq!(d[loans], -10.0);
    }

    #[test]
    fn fan_in_is_summed_on_add_operands() {
        let mut g = Graph::new();
        let a = g.add_variable(":a", VarKind::Parameter, "1");
        let b = g.add_variable(":b", VarKind::Parameter, "2");
        let c = g.add_variable(":c", VarKind::Parameter, "4");
        let add = g.add_op(OpKind::Add);
        let sink = g.add_variable(":y", VarKind::Flow, "");
        g.add_wire(out(&g, a), input(&g, add, 0)).unwrap();
        g.add_wire(out(&g, b), input(&g, add, 0)).unwrap();
        g.add_wire(out(&g, c), input(&g, add, 1)).unwrap();
        g.add_wire(out(&g, add), input(&g, sink, 0)).unwrap();
        let sys = compile(&mut g).unwrap();
        let mut flow = vec![0.0; sys.n_flow];
        let mut stock = vec![0.0; sys.n_stock];
        sys.apply_inits(&mut flow, &mut stock);
        sys.eval_equations(&mut flow, &stock, 0.0);
        let y = g.values.get(":y").unwrap().slot.unwrap();
        assert_eq!(flow[y], 7.0);
    }
}
